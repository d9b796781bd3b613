//! Start tags and everything that hangs off them until the end tag.
//!
//! An element's mutations are split in two. Content before the start tag, the
//! start tag itself (or its replacement) and prepended content are written as
//! soon as the element handlers return; appended content, content after the
//! element and end-tag handlers wait in a [`PendingEnd`] until the element is
//! closed.

use std::any::Any;
use std::borrow::Cow;

use encoding_rs::Encoding;
use html::{Namespace, SourceLocation, StartTagToken};

use super::attributes::Attribute;
use super::content::{
    Content, ContentBuffer, ContentContext, ContentType, decode, decode_lowercase, encode_exact,
};
use super::end_tag::EndTag;
use super::mutations::impl_user_data;
use super::streaming::StreamingHandler;
use crate::errors::{InvalidMutationError, RewritingError};
use crate::handlers::{Directive, EndTagHandler};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Removal {
    None,
    /// Tags and content.
    Whole,
    /// Tags only.
    KeepContent,
}

pub struct Element<'r, 'h> {
    name: &'r [u8],
    new_name: Option<Vec<u8>>,
    attributes: Vec<Attribute<'r>>,
    modified: bool,
    self_closing: bool,
    namespace: Namespace,
    can_have_content: bool,
    raw: &'r [u8],
    location: SourceLocation,
    ctx: ContentContext,
    before: ContentBuffer,
    replacement: ContentBuffer,
    prepend: ContentBuffer,
    inner: ContentBuffer,
    inner_replaced: bool,
    append: ContentBuffer,
    after: ContentBuffer,
    removal: Removal,
    end_tag_handlers: Vec<EndTagHandler<'h>>,
    user_data: Option<Box<dyn Any>>,
}

impl<'r, 'h> Element<'r, 'h> {
    pub(crate) fn new(token: &StartTagToken<'r>, ctx: &ContentContext) -> Self {
        Self {
            name: token.name,
            new_name: None,
            attributes: token
                .attributes
                .iter()
                .map(|attr| Attribute::from_token(attr, ctx.encoding))
                .collect(),
            modified: false,
            self_closing: token.self_closing,
            namespace: token.namespace,
            can_have_content: token.can_have_content,
            raw: token.raw,
            location: token.location,
            ctx: ctx.clone(),
            before: ctx.buffer(),
            replacement: ctx.buffer(),
            prepend: ctx.buffer(),
            inner: ctx.buffer(),
            inner_replaced: false,
            append: ctx.buffer(),
            after: ctx.buffer(),
            removal: Removal::None,
            end_tag_handlers: Vec::new(),
            user_data: None,
        }
    }

    fn encoding(&self) -> &'static Encoding {
        self.ctx.encoding
    }

    fn current_name(&self) -> &[u8] {
        self.new_name.as_deref().unwrap_or(self.name)
    }

    /// Lowercased tag name.
    pub fn tag_name(&self) -> String {
        decode_lowercase(self.current_name(), self.encoding())
    }

    pub fn tag_name_preserve_case(&self) -> String {
        decode(self.current_name(), self.encoding())
    }

    /// Rename the element. The end tag, if any, is renamed too.
    pub fn set_tag_name(&mut self, name: &str) -> Result<(), InvalidMutationError> {
        self.new_name = Some(validate_tag_name(name, self.encoding())?);
        self.modified = true;
        Ok(())
    }

    pub fn namespace_uri(&self) -> &'static str {
        self.namespace.uri()
    }

    pub fn attributes(&self) -> &[Attribute<'r>] {
        &self.attributes
    }

    pub fn get_attribute(&self, name: &str) -> Option<String> {
        self.attributes
            .iter()
            .find(|attr| attr.has_name(name.as_bytes()))
            .map(Attribute::value)
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.attributes
            .iter()
            .any(|attr| attr.has_name(name.as_bytes()))
    }

    /// Set an attribute, adding it if it isn't there. New attribute names are
    /// lowercased.
    pub fn set_attribute(&mut self, name: &str, value: &str) -> Result<(), InvalidMutationError> {
        let name = validate_attribute_name(name, self.encoding())?;
        let value = encode_exact(value, self.encoding())?;
        match self.attributes.iter().position(|attr| attr.has_name(&name)) {
            Some(index) => self.attributes[index].set_value(value),
            None => self
                .attributes
                .push(Attribute::new(name, value, self.ctx.encoding)),
        }
        self.modified = true;
        Ok(())
    }

    pub fn remove_attribute(&mut self, name: &str) {
        let len = self.attributes.len();
        self.attributes.retain(|attr| !attr.has_name(name.as_bytes()));
        if self.attributes.len() != len {
            self.modified = true;
        }
    }

    pub fn is_self_closing(&self) -> bool {
        self.self_closing
    }

    /// False for void elements and self-closing SVG or MathML elements.
    /// Such elements ignore `prepend`, `append` and `set_inner_content`.
    pub fn can_have_content(&self) -> bool {
        self.can_have_content
    }

    pub fn source_location(&self) -> SourceLocation {
        self.location
    }

    pub fn before(&mut self, content: &str, content_type: ContentType) {
        let content = self.ctx.content(content, content_type);
        self.before.push_back(content);
    }

    pub fn before_streaming(&mut self, handler: Box<dyn StreamingHandler>) {
        self.before.push_back(Content::Streaming(handler));
    }

    pub fn after(&mut self, content: &str, content_type: ContentType) {
        let content = self.ctx.content(content, content_type);
        self.after.push_front(content);
    }

    pub fn after_streaming(&mut self, handler: Box<dyn StreamingHandler>) {
        self.after.push_front(Content::Streaming(handler));
    }

    /// Insert `content` right after the start tag.
    pub fn prepend(&mut self, content: &str, content_type: ContentType) {
        if self.can_have_content {
            let content = self.ctx.content(content, content_type);
            self.prepend.push_front(content);
        }
    }

    pub fn prepend_streaming(&mut self, handler: Box<dyn StreamingHandler>) {
        if self.can_have_content {
            self.prepend.push_front(Content::Streaming(handler));
        }
    }

    /// Insert `content` right before the end tag.
    pub fn append(&mut self, content: &str, content_type: ContentType) {
        if self.can_have_content {
            let content = self.ctx.content(content, content_type);
            self.append.push_back(content);
        }
    }

    pub fn append_streaming(&mut self, handler: Box<dyn StreamingHandler>) {
        if self.can_have_content {
            self.append.push_back(Content::Streaming(handler));
        }
    }

    /// Replace everything between the tags with `content`.
    pub fn set_inner_content(&mut self, content: &str, content_type: ContentType) {
        let content = self.ctx.content(content, content_type);
        self.replace_inner(content);
    }

    pub fn set_inner_content_streaming(&mut self, handler: Box<dyn StreamingHandler>) {
        self.replace_inner(Content::Streaming(handler));
    }

    fn replace_inner(&mut self, content: Content) {
        if !self.can_have_content {
            return;
        }
        self.prepend.clear();
        self.append.clear();
        self.inner.clear();
        self.inner.push_back(content);
        self.inner_replaced = true;
    }

    /// Replace the element, content included, with `content`.
    pub fn replace(&mut self, content: &str, content_type: ContentType) {
        let content = self.ctx.content(content, content_type);
        self.replace_with(content);
    }

    pub fn replace_streaming(&mut self, handler: Box<dyn StreamingHandler>) {
        self.replace_with(Content::Streaming(handler));
    }

    fn replace_with(&mut self, content: Content) {
        self.replacement.clear();
        self.replacement.push_back(content);
        self.removal = Removal::Whole;
    }

    /// Remove the element and its content.
    pub fn remove(&mut self) {
        self.replacement.clear();
        self.removal = Removal::Whole;
    }

    /// Remove the start and end tags but keep the content.
    pub fn remove_and_keep_content(&mut self) {
        self.replacement.clear();
        self.removal = Removal::KeepContent;
    }

    pub fn removed(&self) -> bool {
        self.removal != Removal::None
    }

    /// Run `handler` when this element's end tag is reached. Elements closed
    /// implicitly, by an ancestor's end tag or the end of input, never run
    /// their end-tag handlers.
    pub fn on_end_tag(
        &mut self,
        handler: impl FnOnce(&mut EndTag<'_>) -> Directive + 'h,
    ) -> Result<(), InvalidMutationError> {
        if !self.can_have_content {
            return Err(InvalidMutationError::NoEndTag);
        }
        self.end_tag_handlers.push(Box::new(handler));
        Ok(())
    }

    fn start_tag(&self) -> Cow<'r, [u8]> {
        if !self.modified {
            return Cow::Borrowed(self.raw);
        }
        let mut tag = Vec::with_capacity(self.raw.len() + 16);
        tag.push(b'<');
        tag.extend_from_slice(self.current_name());
        for attr in &self.attributes {
            tag.push(b' ');
            attr.serialize_into(&mut tag);
        }
        if self.self_closing {
            if !self.attributes.is_empty() {
                tag.push(b' ');
            }
            tag.extend_from_slice(b"/>");
        } else {
            tag.push(b'>');
        }
        Cow::Owned(tag)
    }

    /// Write everything up to the element's content. Returns what has to
    /// wait for the end tag, or `None` for elements without content.
    pub(crate) fn flush_start(
        mut self,
        output: &mut dyn FnMut(&[u8]),
    ) -> Result<Option<PendingEnd<'h>>, RewritingError> {
        self.before.flush(output)?;
        match self.removal {
            Removal::None => output(&self.start_tag()),
            Removal::Whole => self.replacement.flush(output)?,
            Removal::KeepContent => {}
        }

        if !self.can_have_content {
            self.after.flush(output)?;
            return Ok(None);
        }

        if self.removal != Removal::Whole {
            self.prepend.flush(output)?;
            self.inner.flush(output)?;
        }

        Ok(Some(PendingEnd {
            handlers: self.end_tag_handlers,
            new_name: self.new_name,
            append: self.append,
            after: self.after,
            removal: self.removal,
            content_suppressed: self.removal == Removal::Whole || self.inner_replaced,
        }))
    }
}

impl_user_data!(Element<'_, '_>);

/// The part of an element that is written when it is closed.
pub(crate) struct PendingEnd<'h> {
    handlers: Vec<EndTagHandler<'h>>,
    new_name: Option<Vec<u8>>,
    append: ContentBuffer,
    after: ContentBuffer,
    removal: Removal,
    content_suppressed: bool,
}

impl<'h> PendingEnd<'h> {
    /// The original content of the element is not written.
    pub(crate) fn suppresses_content(&self) -> bool {
        self.content_suppressed
    }

    pub(crate) fn take_handlers(&mut self) -> Vec<EndTagHandler<'h>> {
        std::mem::take(&mut self.handlers)
    }

    pub(crate) fn take_new_name(&mut self) -> Option<Vec<u8>> {
        self.new_name.take()
    }

    /// `end_tag` is `None` when the element is closed implicitly.
    pub(crate) fn flush(
        mut self,
        end_tag: Option<&mut EndTag<'_>>,
        output: &mut dyn FnMut(&[u8]),
    ) -> Result<(), RewritingError> {
        if self.removal == Removal::Whole {
            self.append.clear();
        } else {
            self.append.flush(output)?;
        }
        if let Some(end_tag) = end_tag {
            end_tag.flush(self.removal == Removal::None, output)?;
        }
        self.after.flush(output)
    }
}

const FORBIDDEN_NAME_CHARACTERS: [char; 7] = [' ', '\t', '\n', '\r', '\x0C', '/', '>'];

pub(super) fn validate_tag_name(
    name: &str,
    encoding: &'static Encoding,
) -> Result<Vec<u8>, InvalidMutationError> {
    match name.chars().next() {
        None => return Err(InvalidMutationError::EmptyTagName),
        Some(first) if !first.is_ascii_alphabetic() => {
            return Err(InvalidMutationError::InvalidTagNameFirstCharacter);
        }
        Some(_) => {}
    }
    if let Some(ch) = name.chars().find(|ch| FORBIDDEN_NAME_CHARACTERS.contains(ch)) {
        return Err(InvalidMutationError::ForbiddenTagNameCharacter(ch));
    }
    encode_exact(name, encoding)
}

/// Returns the lowercased, encoded name.
fn validate_attribute_name(
    name: &str,
    encoding: &'static Encoding,
) -> Result<Vec<u8>, InvalidMutationError> {
    if name.is_empty() {
        return Err(InvalidMutationError::EmptyAttributeName);
    }
    if let Some(ch) = name
        .chars()
        .find(|&ch| ch == '=' || FORBIDDEN_NAME_CHARACTERS.contains(&ch))
    {
        return Err(InvalidMutationError::ForbiddenAttributeNameCharacter(ch));
    }
    encode_exact(&name.to_ascii_lowercase(), encoding)
}
