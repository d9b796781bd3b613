//! The units handlers see and mutate.
//!
//! A unit borrows its token's bytes for the duration of the handler calls.
//! Mutations are recorded on the unit and applied when the dispatcher writes
//! it out; nothing a handler does touches output that was already written.

mod attributes;
mod comment;
pub(crate) mod content;
mod doctype;
mod document_end;
pub(crate) mod element;
mod end_tag;
mod mutations;
mod streaming;
mod text_chunk;

pub use attributes::Attribute;
pub use comment::Comment;
pub use content::ContentType;
pub use doctype::Doctype;
pub use document_end::DocumentEnd;
pub use element::Element;
pub use end_tag::EndTag;
pub use mutations::UserData;
pub use streaming::{StreamingHandler, StreamingHandlerSink, streaming};
pub use text_chunk::TextChunk;
