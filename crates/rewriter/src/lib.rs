//! Streaming HTML rewriting.
//!
//! Handlers are registered on a [`RewriterBuilder`], either for the whole
//! document or scoped to a CSS selector. The built [`HtmlRewriter`] accepts the
//! document in chunks of any size, calls the handlers as the relevant
//! constructs stream by and writes the rewritten markup to an [`OutputSink`].

mod builder;
mod dispatcher;
pub mod errors;
pub mod handlers;
pub mod rewritable_units;
mod rewriter;
pub mod settings;
mod sink;

pub use builder::RewriterBuilder;
pub use errors::{BuildError, InvalidMutationError, RewriteStrError, RewritingError};
pub use handlers::{
    BoxedError, CommentHandler, Directive, DoctypeHandler, DocumentContentHandlers,
    DocumentEndHandler, ElementContentHandlers, ElementHandler, EndTagHandler, TextHandler,
};
pub use rewritable_units::{
    Attribute, Comment, ContentType, Doctype, DocumentEnd, Element, EndTag, StreamingHandler,
    StreamingHandlerSink, TextChunk, UserData, streaming,
};
pub use rewriter::{HtmlRewriter, RewriterState, rewrite_str};
pub use settings::{MemorySettings, Settings};
pub use sink::OutputSink;

pub use css::{Selector, SelectorError};
pub use html::{EncodingError, Namespace, ParsingAmbiguityError, SourceLocation, TextType};
pub use tools::mem::MemoryLimitExceededError;
pub use tools::utf8::Utf8ValidationError;
