use std::any::Any;
use std::borrow::Cow;

use html::{SourceLocation, TextToken, TextType};

use super::content::ContentContext;
use super::mutations::{Mutations, impl_content_mutations, impl_user_data};
use crate::errors::RewritingError;

/// A piece of a text node.
///
/// Text nodes reach handlers in as many chunks as the input was split into,
/// and a chunk never splits a character. The chunk that ends a node has
/// [`TextChunk::last_in_text_node`] set and may be empty.
pub struct TextChunk<'r> {
    text: Cow<'r, str>,
    raw: &'r [u8],
    text_type: TextType,
    last_in_text_node: bool,
    location: SourceLocation,
    mutations: Mutations,
    user_data: Option<Box<dyn Any>>,
}

impl<'r> TextChunk<'r> {
    pub(crate) fn new(token: &TextToken<'r>, text: Cow<'r, str>, ctx: &ContentContext) -> Self {
        Self {
            text,
            raw: token.text,
            text_type: token.text_type,
            last_in_text_node: token.last_in_text_node,
            location: token.location,
            mutations: Mutations::new(ctx),
            user_data: None,
        }
    }

    /// The text as written in the source: character references are not
    /// decoded.
    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn text_type(&self) -> TextType {
        self.text_type
    }

    pub fn last_in_text_node(&self) -> bool {
        self.last_in_text_node
    }

    pub fn source_location(&self) -> SourceLocation {
        self.location
    }

    pub(crate) fn flush(&mut self, output: &mut dyn FnMut(&[u8])) -> Result<(), RewritingError> {
        self.mutations.flush(self.raw, output)
    }
}

impl_content_mutations!(TextChunk);
impl_user_data!(TextChunk<'_>);
