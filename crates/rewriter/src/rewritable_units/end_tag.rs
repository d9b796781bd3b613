use std::borrow::Cow;

use html::{EndTagToken, SourceLocation};

use super::content::{Content, ContentBuffer, ContentContext, ContentType, decode, decode_lowercase};
use super::element::validate_tag_name;
use super::streaming::StreamingHandler;
use crate::errors::{InvalidMutationError, RewritingError};

/// The end tag of an element, as seen by the handlers registered with
/// [`super::Element::on_end_tag`].
pub struct EndTag<'r> {
    name: &'r [u8],
    new_name: Option<Vec<u8>>,
    raw: &'r [u8],
    location: SourceLocation,
    ctx: ContentContext,
    before: ContentBuffer,
    replacement: ContentBuffer,
    after: ContentBuffer,
    removed: bool,
}

impl<'r> EndTag<'r> {
    /// `new_name` carries a rename made through the start tag.
    pub(crate) fn new(
        token: &EndTagToken<'r>,
        new_name: Option<Vec<u8>>,
        ctx: &ContentContext,
    ) -> Self {
        Self {
            name: token.name,
            new_name,
            raw: token.raw,
            location: token.location,
            ctx: ctx.clone(),
            before: ctx.buffer(),
            replacement: ctx.buffer(),
            after: ctx.buffer(),
            removed: false,
        }
    }

    fn current_name(&self) -> &[u8] {
        self.new_name.as_deref().unwrap_or(self.name)
    }

    /// Lowercased tag name.
    pub fn name(&self) -> String {
        decode_lowercase(self.current_name(), self.ctx.encoding)
    }

    pub fn name_preserve_case(&self) -> String {
        decode(self.current_name(), self.ctx.encoding)
    }

    pub fn set_name(&mut self, name: &str) -> Result<(), InvalidMutationError> {
        self.new_name = Some(validate_tag_name(name, self.ctx.encoding)?);
        Ok(())
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

    /// Write `content` instead of the end tag.
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
        self.removed = true;
    }

    /// Drop the end tag. Content around it is still written.
    pub fn remove(&mut self) {
        self.replacement.clear();
        self.removed = true;
    }

    pub fn removed(&self) -> bool {
        self.removed
    }

    fn serialize(&self) -> Cow<'r, [u8]> {
        match &self.new_name {
            None => Cow::Borrowed(self.raw),
            Some(name) => {
                let mut tag = Vec::with_capacity(name.len() + 3);
                tag.extend_from_slice(b"</");
                tag.extend_from_slice(name);
                tag.push(b'>');
                Cow::Owned(tag)
            }
        }
    }

    /// `emit_tag` is false when the element itself was removed. A replacement
    /// set by an end-tag handler is written either way.
    pub(crate) fn flush(
        &mut self,
        emit_tag: bool,
        output: &mut dyn FnMut(&[u8]),
    ) -> Result<(), RewritingError> {
        self.before.flush(output)?;
        if self.removed {
            self.replacement.flush(output)?;
        } else if emit_tag {
            output(&self.serialize());
        }
        self.after.flush(output)
    }
}
