//! Routes tokens to the registered handlers and writes the result.
//!
//! Document-level handlers run first, then the handlers of every selector
//! that applies, in registration order. Tokens nobody is interested in are
//! copied to the output untouched.

use std::borrow::Cow;

use css::SelectorMatcher;
use encoding_rs::{CoderResult, Decoder, UTF_8};
use html::{
    CommentToken, DoctypeToken, EndTagToken, StartTagToken, TextToken, Token, TokenSink,
};
use tools::mem::SharedMemoryLimiter;

use crate::errors::RewritingError;
use crate::handlers::{Directive, DocumentContentHandlers, ElementContentHandlers};
use crate::rewritable_units::content::ContentContext;
use crate::rewritable_units::element::PendingEnd;
use crate::rewritable_units::{Comment, Doctype, DocumentEnd, Element, EndTag, TextChunk};
use crate::sink::OutputSink;

struct OpenElement<'h> {
    /// Lowercased source name, for matching end tags.
    name: Vec<u8>,
    /// `None` when no element handler saw the element.
    pending: Option<PendingEnd<'h>>,
}

pub(crate) struct Dispatcher<'h, O: OutputSink> {
    output: O,
    ctx: ContentContext,
    document: Vec<DocumentContentHandlers<'h>>,
    selectors: Vec<ElementContentHandlers<'h>>,
    /// `None` when no selector is registered; elements are then not tracked.
    matcher: Option<SelectorMatcher>,
    open_elements: Vec<OpenElement<'h>>,
    /// Index into `open_elements` of the outermost element whose content is
    /// being dropped.
    suppressed_from: Option<usize>,
    text_decoder: Option<Decoder>,
}

/// Fail the call if a handler asked to stop or pushed memory use over the
/// limit.
fn check_handler(directive: Directive, limiter: &SharedMemoryLimiter) -> Result<(), RewritingError> {
    if let Some(err) = limiter.borrow().exceeded() {
        return Err(err.into());
    }
    match directive {
        Directive::Continue => Ok(()),
        Directive::Stop => Err(RewritingError::Stopped),
    }
}

impl<'h, O: OutputSink> Dispatcher<'h, O> {
    pub(crate) fn new(
        output: O,
        ctx: ContentContext,
        document: Vec<DocumentContentHandlers<'h>>,
        selectors: Vec<ElementContentHandlers<'h>>,
        matcher: Option<SelectorMatcher>,
    ) -> Self {
        Self {
            output,
            ctx,
            document,
            selectors,
            matcher,
            open_elements: Vec::new(),
            suppressed_from: None,
            text_decoder: None,
        }
    }

    /// Signal the end of the output.
    pub(crate) fn finish(&mut self) {
        self.output.handle_chunk(&[]);
    }

    fn suppressed(&self) -> bool {
        self.suppressed_from.is_some()
    }

    fn emit(&mut self, bytes: &[u8]) {
        if !self.suppressed() && !bytes.is_empty() {
            self.output.handle_chunk(bytes);
        }
    }

    /// Run `write` against the output, or against nothing inside removed
    /// content.
    fn write_with<T>(
        &mut self,
        write: impl FnOnce(&mut dyn FnMut(&[u8])) -> Result<T, RewritingError>,
    ) -> Result<T, RewritingError> {
        let suppressed = self.suppressed();
        let output = &mut self.output;
        write(&mut |chunk: &[u8]| {
            if !suppressed && !chunk.is_empty() {
                output.handle_chunk(chunk);
            }
        })
    }

    fn within(&self, id: usize) -> bool {
        self.matcher.as_ref().is_some_and(|matcher| matcher.is_within(id))
    }

    fn handle_doctype(&mut self, token: DoctypeToken<'_>) -> Result<(), RewritingError> {
        if self.document.iter().all(|handlers| handlers.doctype.is_none()) {
            self.emit(token.raw);
            return Ok(());
        }
        let mut doctype = Doctype::new(token, &self.ctx);
        for handlers in &mut self.document {
            if let Some(handler) = handlers.doctype.as_mut() {
                check_handler(handler(&mut doctype), &self.ctx.limiter)?;
            }
        }
        self.write_with(|output| doctype.flush(output))
    }

    fn handle_comment(&mut self, token: CommentToken<'_>) -> Result<(), RewritingError> {
        let scoped = (0..self.selectors.len())
            .any(|id| self.selectors[id].comments.is_some() && self.within(id));
        if !scoped && self.document.iter().all(|handlers| handlers.comments.is_none()) {
            self.emit(token.raw);
            return Ok(());
        }

        let mut comment = Comment::new(&token, &self.ctx);
        for handlers in &mut self.document {
            if let Some(handler) = handlers.comments.as_mut() {
                check_handler(handler(&mut comment), &self.ctx.limiter)?;
            }
        }
        if scoped {
            for (id, handlers) in self.selectors.iter_mut().enumerate() {
                if !self.matcher.as_ref().is_some_and(|m| m.is_within(id)) {
                    continue;
                }
                if let Some(handler) = handlers.comments.as_mut() {
                    check_handler(handler(&mut comment), &self.ctx.limiter)?;
                }
            }
        }
        self.write_with(|output| comment.flush(output))
    }

    fn handle_text(&mut self, token: TextToken<'_>) -> Result<(), RewritingError> {
        let scoped = (0..self.selectors.len())
            .any(|id| self.selectors[id].text.is_some() && self.within(id));
        if !scoped && self.document.iter().all(|handlers| handlers.text.is_none()) {
            if token.last_in_text_node {
                self.text_decoder = None;
            }
            self.emit(token.text);
            return Ok(());
        }

        let text = self.decode_text(token.text, token.last_in_text_node);
        let mut chunk = TextChunk::new(&token, text, &self.ctx);
        for handlers in &mut self.document {
            if let Some(handler) = handlers.text.as_mut() {
                check_handler(handler(&mut chunk), &self.ctx.limiter)?;
            }
        }
        if scoped {
            for (id, handlers) in self.selectors.iter_mut().enumerate() {
                if !self.matcher.as_ref().is_some_and(|m| m.is_within(id)) {
                    continue;
                }
                if let Some(handler) = handlers.text.as_mut() {
                    check_handler(handler(&mut chunk), &self.ctx.limiter)?;
                }
            }
        }
        self.write_with(|output| chunk.flush(output))
    }

    /// Text chunks end on character boundaries in UTF-8. Other encodings go
    /// through a decoder that lives as long as the text node.
    fn decode_text<'t>(&mut self, bytes: &'t [u8], last_in_text_node: bool) -> Cow<'t, str> {
        if self.ctx.encoding == UTF_8 && self.text_decoder.is_none() {
            if let Ok(text) = std::str::from_utf8(bytes) {
                return Cow::Borrowed(text);
            }
        }
        let encoding = self.ctx.encoding;
        let decoder = self
            .text_decoder
            .get_or_insert_with(|| encoding.new_decoder_without_bom_handling());
        let capacity = decoder
            .max_utf8_buffer_length(bytes.len())
            .unwrap_or(bytes.len() * 3 + 4);
        let mut text = String::with_capacity(capacity);
        let (result, read, _) = decoder.decode_to_string(bytes, &mut text, last_in_text_node);
        debug_assert!(
            result == CoderResult::InputEmpty && read == bytes.len(),
            "text decoder stopped after {read} of {} bytes",
            bytes.len()
        );
        if last_in_text_node {
            self.text_decoder = None;
        }
        Cow::Owned(text)
    }

    fn handle_start_tag(&mut self, token: StartTagToken<'_>) -> Result<(), RewritingError> {
        let Some(matcher) = self.matcher.as_mut() else {
            self.emit(token.raw);
            return Ok(());
        };
        let matched = matcher.start_element(&token, token.can_have_content)?;
        let handled = matched
            .iter()
            .any(|id| self.selectors[id].element.is_some());

        let pending = if handled {
            let mut element = Element::new(&token, &self.ctx);
            for id in matched.iter() {
                if let Some(handler) = self.selectors[id].element.as_mut() {
                    check_handler(handler(&mut element), &self.ctx.limiter)?;
                }
            }
            self.write_with(|output| element.flush_start(output))?
        } else {
            self.emit(token.raw);
            None
        };

        if token.can_have_content {
            let depth = self.open_elements.len();
            if self.suppressed_from.is_none()
                && pending.as_ref().is_some_and(PendingEnd::suppresses_content)
            {
                self.suppressed_from = Some(depth);
            }
            self.open_elements.push(OpenElement {
                name: token.name.to_ascii_lowercase(),
                pending,
            });
        }
        Ok(())
    }

    fn handle_end_tag(&mut self, token: EndTagToken<'_>) -> Result<(), RewritingError> {
        let position = self
            .open_elements
            .iter()
            .rposition(|open| open.name.eq_ignore_ascii_case(token.name));
        let Some(index) = position else {
            self.emit(token.raw);
            return Ok(());
        };
        while self.open_elements.len() > index + 1 {
            self.close_element(None)?;
        }
        self.close_element(Some(&token))
    }

    /// Pop the innermost open element. `end_tag` is `None` when it is closed
    /// implicitly.
    fn close_element(&mut self, end_tag: Option<&EndTagToken<'_>>) -> Result<(), RewritingError> {
        let Some(open) = self.open_elements.pop() else {
            return Ok(());
        };
        if let Some(matcher) = self.matcher.as_mut() {
            matcher.end_element();
        }
        if self.suppressed_from == Some(self.open_elements.len()) {
            self.suppressed_from = None;
        }

        match (open.pending, end_tag) {
            (None, Some(token)) => {
                self.emit(token.raw);
                Ok(())
            }
            (None, None) => Ok(()),
            (Some(pending), None) => self.write_with(|output| pending.flush(None, output)),
            (Some(mut pending), Some(token)) => {
                let mut end = EndTag::new(token, pending.take_new_name(), &self.ctx);
                for handler in pending.take_handlers() {
                    check_handler(handler(&mut end), &self.ctx.limiter)?;
                }
                self.write_with(|output| pending.flush(Some(&mut end), output))
            }
        }
    }

    fn handle_eof(&mut self) -> Result<(), RewritingError> {
        while !self.open_elements.is_empty() {
            self.close_element(None)?;
        }
        let mut document_end = DocumentEnd::new(&self.ctx);
        for handlers in &mut self.document {
            if let Some(handler) = handlers.end.as_mut() {
                check_handler(handler(&mut document_end), &self.ctx.limiter)?;
            }
        }
        self.write_with(|output| document_end.flush(output))
    }
}

impl<O: OutputSink> TokenSink for Dispatcher<'_, O> {
    type Error = RewritingError;

    fn handle_token(&mut self, token: Token<'_>) -> Result<(), RewritingError> {
        match token {
            Token::Doctype(doctype) => self.handle_doctype(doctype),
            Token::Comment(comment) => self.handle_comment(comment),
            Token::Text(text) => self.handle_text(text),
            Token::StartTag(tag) => self.handle_start_tag(tag),
            Token::EndTag(tag) => self.handle_end_tag(tag),
            Token::Eof(_) => self.handle_eof(),
        }
    }
}
