use std::any::Any;

use encoding_rs::Encoding;

use super::content::{Content, ContentBuffer, ContentContext, ContentType};
use crate::errors::RewritingError;

/// Content inserted around a token, and whether the token itself is kept.
pub(crate) struct Mutations {
    ctx: ContentContext,
    before: ContentBuffer,
    replacement: ContentBuffer,
    after: ContentBuffer,
    removed: bool,
}

impl Mutations {
    pub(crate) fn new(ctx: &ContentContext) -> Self {
        Self {
            ctx: ctx.clone(),
            before: ctx.buffer(),
            replacement: ctx.buffer(),
            after: ctx.buffer(),
            removed: false,
        }
    }

    pub(crate) fn encoding(&self) -> &'static Encoding {
        self.ctx.encoding
    }

    pub(crate) fn content(&self, content: &str, content_type: ContentType) -> Content {
        self.ctx.content(content, content_type)
    }

    pub(crate) fn before(&mut self, content: Content) {
        self.before.push_back(content);
    }

    pub(crate) fn after(&mut self, content: Content) {
        self.after.push_front(content);
    }

    pub(crate) fn replace(&mut self, content: Content) {
        self.replacement.clear();
        self.replacement.push_back(content);
        self.removed = true;
    }

    pub(crate) fn remove(&mut self) {
        self.replacement.clear();
        self.removed = true;
    }

    pub(crate) fn removed(&self) -> bool {
        self.removed
    }

    /// Write the token, or its replacement, with the content around it.
    pub(crate) fn flush(
        &mut self,
        token: &[u8],
        output: &mut dyn FnMut(&[u8]),
    ) -> Result<(), RewritingError> {
        self.before.flush(output)?;
        if self.removed {
            self.replacement.flush(output)?;
        } else if !token.is_empty() {
            output(token);
        }
        self.after.flush(output)
    }
}

/// Adds `before`, `after`, `replace` and `remove` to a unit with a
/// `mutations: Mutations` field.
macro_rules! impl_content_mutations {
    ($unit:ident) => {
        impl $unit<'_> {
            /// Insert `content` immediately before the unit.
            pub fn before(&mut self, content: &str, content_type: $crate::ContentType) {
                let content = self.mutations.content(content, content_type);
                self.mutations.before(content);
            }

            pub fn before_streaming(&mut self, handler: Box<dyn $crate::StreamingHandler>) {
                self.mutations
                    .before($crate::rewritable_units::content::Content::Streaming(handler));
            }

            /// Insert `content` immediately after the unit.
            pub fn after(&mut self, content: &str, content_type: $crate::ContentType) {
                let content = self.mutations.content(content, content_type);
                self.mutations.after(content);
            }

            pub fn after_streaming(&mut self, handler: Box<dyn $crate::StreamingHandler>) {
                self.mutations
                    .after($crate::rewritable_units::content::Content::Streaming(handler));
            }

            /// Write `content` instead of the unit.
            pub fn replace(&mut self, content: &str, content_type: $crate::ContentType) {
                let content = self.mutations.content(content, content_type);
                self.mutations.replace(content);
            }

            pub fn replace_streaming(&mut self, handler: Box<dyn $crate::StreamingHandler>) {
                self.mutations
                    .replace($crate::rewritable_units::content::Content::Streaming(handler));
            }

            pub fn remove(&mut self) {
                self.mutations.remove();
            }

            pub fn removed(&self) -> bool {
                self.mutations.removed()
            }
        }
    };
}

pub(crate) use impl_content_mutations;

/// Arbitrary data attached to a unit by one handler and visible to the
/// handlers that see the same unit after it.
pub trait UserData {
    fn user_data(&self) -> Option<&dyn Any>;
    fn user_data_mut(&mut self) -> Option<&mut dyn Any>;
    fn set_user_data(&mut self, data: Box<dyn Any>);
}

macro_rules! impl_user_data {
    ($unit:ty) => {
        impl $crate::rewritable_units::UserData for $unit {
            fn user_data(&self) -> Option<&dyn std::any::Any> {
                self.user_data.as_deref()
            }

            fn user_data_mut(&mut self) -> Option<&mut dyn std::any::Any> {
                self.user_data
                    .as_mut()
                    .map(|data| &mut **data as &mut dyn std::any::Any)
            }

            fn set_user_data(&mut self, data: Box<dyn std::any::Any>) {
                self.user_data = Some(data);
            }
        }
    };
}

pub(crate) use impl_user_data;
