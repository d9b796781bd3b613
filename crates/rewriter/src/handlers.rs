//! Content handler registrations.

use std::error::Error as StdError;

use crate::rewritable_units::{Comment, Doctype, DocumentEnd, Element, EndTag, TextChunk};

pub type BoxedError = Box<dyn StdError + Send + Sync>;

/// What the rewriter does after a handler returns.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Directive {
    Continue,
    /// Abort the rewrite. The current call fails with
    /// [`crate::RewritingError::Stopped`] and the instance accepts no more
    /// input.
    Stop,
}

pub type DoctypeHandler<'h> = Box<dyn FnMut(&mut Doctype<'_>) -> Directive + 'h>;
pub type CommentHandler<'h> = Box<dyn FnMut(&mut Comment<'_>) -> Directive + 'h>;
pub type TextHandler<'h> = Box<dyn FnMut(&mut TextChunk<'_>) -> Directive + 'h>;
pub type ElementHandler<'h> = Box<dyn for<'r> FnMut(&mut Element<'r, 'h>) -> Directive + 'h>;
pub type EndTagHandler<'h> = Box<dyn FnOnce(&mut EndTag<'_>) -> Directive + 'h>;
pub type DocumentEndHandler<'h> = Box<dyn FnMut(&mut DocumentEnd) -> Directive + 'h>;

/// Handlers that see every construct of their kind in the document.
#[derive(Default)]
pub struct DocumentContentHandlers<'h> {
    pub doctype: Option<DoctypeHandler<'h>>,
    pub comments: Option<CommentHandler<'h>>,
    pub text: Option<TextHandler<'h>>,
    pub end: Option<DocumentEndHandler<'h>>,
}

impl<'h> DocumentContentHandlers<'h> {
    pub fn doctype(mut self, handler: impl FnMut(&mut Doctype<'_>) -> Directive + 'h) -> Self {
        self.doctype = Some(Box::new(handler));
        self
    }

    pub fn comments(mut self, handler: impl FnMut(&mut Comment<'_>) -> Directive + 'h) -> Self {
        self.comments = Some(Box::new(handler));
        self
    }

    pub fn text(mut self, handler: impl FnMut(&mut TextChunk<'_>) -> Directive + 'h) -> Self {
        self.text = Some(Box::new(handler));
        self
    }

    pub fn end(mut self, handler: impl FnMut(&mut DocumentEnd) -> Directive + 'h) -> Self {
        self.end = Some(Box::new(handler));
        self
    }
}

/// Handlers scoped to the elements a selector matches. Comment and text
/// handlers see the content inside those elements.
#[derive(Default)]
pub struct ElementContentHandlers<'h> {
    pub element: Option<ElementHandler<'h>>,
    pub comments: Option<CommentHandler<'h>>,
    pub text: Option<TextHandler<'h>>,
}

impl<'h> ElementContentHandlers<'h> {
    pub fn element(
        mut self,
        handler: impl for<'r> FnMut(&mut Element<'r, 'h>) -> Directive + 'h,
    ) -> Self {
        self.element = Some(Box::new(handler));
        self
    }

    pub fn comments(mut self, handler: impl FnMut(&mut Comment<'_>) -> Directive + 'h) -> Self {
        self.comments = Some(Box::new(handler));
        self
    }

    pub fn text(mut self, handler: impl FnMut(&mut TextChunk<'_>) -> Directive + 'h) -> Self {
        self.text = Some(Box::new(handler));
        self
    }
}
