use std::any::Any;

use html::{DoctypeToken, SourceLocation};

use super::content::{ContentContext, decode, decode_lowercase};
use super::mutations::{Mutations, impl_content_mutations, impl_user_data};
use crate::errors::RewritingError;

pub struct Doctype<'r> {
    token: DoctypeToken<'r>,
    mutations: Mutations,
    user_data: Option<Box<dyn Any>>,
}

impl<'r> Doctype<'r> {
    pub(crate) fn new(token: DoctypeToken<'r>, ctx: &ContentContext) -> Self {
        Self {
            token,
            mutations: Mutations::new(ctx),
            user_data: None,
        }
    }

    /// Lowercased doctype name.
    pub fn name(&self) -> Option<String> {
        self.token
            .name
            .map(|name| decode_lowercase(name, self.mutations.encoding()))
    }

    pub fn public_id(&self) -> Option<String> {
        self.token
            .public_id
            .map(|id| decode(id, self.mutations.encoding()))
    }

    pub fn system_id(&self) -> Option<String> {
        self.token
            .system_id
            .map(|id| decode(id, self.mutations.encoding()))
    }

    /// Set for malformed doctypes that put a document into quirks mode.
    pub fn force_quirks(&self) -> bool {
        self.token.force_quirks
    }

    pub fn source_location(&self) -> SourceLocation {
        self.token.location
    }

    pub(crate) fn flush(&mut self, output: &mut dyn FnMut(&[u8])) -> Result<(), RewritingError> {
        self.mutations.flush(self.token.raw, output)
    }
}

impl_content_mutations!(Doctype);
impl_user_data!(Doctype<'_>);
