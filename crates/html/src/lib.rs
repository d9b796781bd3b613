//! Streaming HTML lexing for the rewriter.
//!
//! The tokenizer only demarcates tokens; it never builds a tree. Everything it
//! emits borrows from the input of the current `write` call and carries byte
//! offsets into the cumulative input stream.

pub mod encoding;
pub mod error;
pub mod names;
pub mod span;
pub mod token;
pub mod tokenizer;

pub use encoding::AsciiCompatibleEncoding;
pub use error::{EncodingError, ParsingAmbiguityError, TokenizerError};
pub use names::{Namespace, TextType};
pub use span::SourceLocation;
pub use token::{
    AttributeToken, CommentToken, DoctypeToken, EndTagToken, StartTagToken, TextToken, Token,
    TokenSink,
};
pub use tokenizer::{Tokenizer, TokenizerConfig, TokenizerStats};
