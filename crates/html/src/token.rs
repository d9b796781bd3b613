//! Token model produced by the tokenizer.
//!
//! Every byte of input ends up in exactly one token's `raw` slice, so writing
//! the raw slices back in order reproduces the input.

use crate::error::TokenizerError;
use crate::names::{Namespace, TextType};
use crate::span::SourceLocation;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AttributeToken<'i> {
    /// Name with its original case.
    pub name: &'i [u8],
    /// Value without surrounding quotes; empty for valueless attributes.
    pub value: &'i [u8],
    /// The attribute as written, from the first name byte to the end of the
    /// value (closing quote included).
    pub raw: &'i [u8],
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StartTagToken<'i> {
    /// Tag name with its original case.
    pub name: &'i [u8],
    pub attributes: Vec<AttributeToken<'i>>,
    pub self_closing: bool,
    pub namespace: Namespace,
    /// False for HTML void elements and self-closing foreign elements.
    pub can_have_content: bool,
    pub raw: &'i [u8],
    pub location: SourceLocation,
}

impl<'i> StartTagToken<'i> {
    /// First attribute whose name matches `name` ASCII case-insensitively.
    pub fn attribute(&self, name: &[u8]) -> Option<&AttributeToken<'i>> {
        self.attributes
            .iter()
            .find(|attr| attr.name.eq_ignore_ascii_case(name))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EndTagToken<'i> {
    pub name: &'i [u8],
    pub raw: &'i [u8],
    pub location: SourceLocation,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TextToken<'i> {
    pub text: &'i [u8],
    pub text_type: TextType,
    /// Set on the chunk that ends a text node. A text node can be split into
    /// any number of chunks; the last one may be empty.
    pub last_in_text_node: bool,
    pub location: SourceLocation,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CommentToken<'i> {
    pub text: &'i [u8],
    pub raw: &'i [u8],
    pub location: SourceLocation,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DoctypeToken<'i> {
    pub name: Option<&'i [u8]>,
    pub public_id: Option<&'i [u8]>,
    pub system_id: Option<&'i [u8]>,
    pub force_quirks: bool,
    pub raw: &'i [u8],
    pub location: SourceLocation,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Token<'i> {
    Doctype(DoctypeToken<'i>),
    Comment(CommentToken<'i>),
    Text(TextToken<'i>),
    StartTag(StartTagToken<'i>),
    EndTag(EndTagToken<'i>),
    /// End of input; the location is the empty range at the stream end.
    Eof(SourceLocation),
}

impl Token<'_> {
    pub fn location(&self) -> SourceLocation {
        match self {
            Token::Doctype(t) => t.location,
            Token::Comment(t) => t.location,
            Token::Text(t) => t.location,
            Token::StartTag(t) => t.location,
            Token::EndTag(t) => t.location,
            Token::Eof(location) => *location,
        }
    }

    /// Input bytes this token was lexed from.
    pub fn raw(&self) -> &[u8] {
        match self {
            Token::Doctype(t) => t.raw,
            Token::Comment(t) => t.raw,
            Token::Text(t) => t.text,
            Token::StartTag(t) => t.raw,
            Token::EndTag(t) => t.raw,
            Token::Eof(_) => &[],
        }
    }
}

/// Receiver of tokens, called synchronously while the tokenizer runs.
pub trait TokenSink {
    type Error: From<TokenizerError>;

    fn handle_token(&mut self, token: Token<'_>) -> Result<(), Self::Error>;
}
