//! Inserted content and the buffers that hold it until the anchor token is
//! written.

use std::borrow::Cow;
use std::collections::VecDeque;
use std::mem::size_of;

use encoding_rs::Encoding;
use tools::mem::SharedMemoryLimiter;

use super::streaming::{StreamingHandler, run_streaming_handler};
use crate::errors::{InvalidMutationError, RewritingError};

/// How inserted content is written.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContentType {
    /// Markup, written as is.
    Html,
    /// Text, with `<`, `>` and `&` escaped.
    Text,
}

pub(crate) fn escape_text(content: &str) -> Cow<'_, str> {
    if !content.contains(['<', '>', '&']) {
        return Cow::Borrowed(content);
    }
    let mut escaped = String::with_capacity(content.len() + 8);
    for ch in content.chars() {
        match ch {
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '&' => escaped.push_str("&amp;"),
            _ => escaped.push(ch),
        }
    }
    Cow::Owned(escaped)
}

/// Append an attribute value for a double-quoted context.
pub(crate) fn push_escaped_attribute_value(value: &[u8], out: &mut Vec<u8>) {
    for chunk in value.split_inclusive(|&b| b == b'"') {
        match chunk.split_last() {
            Some((&b'"', head)) => {
                out.extend_from_slice(head);
                out.extend_from_slice(b"&quot;");
            }
            _ => out.extend_from_slice(chunk),
        }
    }
}

/// Encode `content` for the document. Characters the encoding can't
/// represent become numeric character references.
pub(crate) fn encode_content(
    content: &str,
    content_type: ContentType,
    encoding: &'static Encoding,
) -> Vec<u8> {
    let escaped = match content_type {
        ContentType::Html => Cow::Borrowed(content),
        ContentType::Text => escape_text(content),
    };
    let (bytes, _, _) = encoding.encode(&escaped);
    bytes.into_owned()
}

/// Encode a name or value that must round-trip exactly.
pub(crate) fn encode_exact(
    value: &str,
    encoding: &'static Encoding,
) -> Result<Vec<u8>, InvalidMutationError> {
    let (bytes, _, had_errors) = encoding.encode(value);
    if had_errors {
        return Err(InvalidMutationError::UnencodableCharacter);
    }
    Ok(bytes.into_owned())
}

pub(crate) fn decode(bytes: &[u8], encoding: &'static Encoding) -> String {
    encoding.decode_without_bom_handling(bytes).0.into_owned()
}

pub(crate) fn decode_lowercase(bytes: &[u8], encoding: &'static Encoding) -> String {
    let mut name = decode(bytes, encoding);
    name.make_ascii_lowercase();
    name
}

/// What every unit needs to create content: the document encoding and the
/// limiter buffered content is charged to.
#[derive(Clone, Debug)]
pub(crate) struct ContentContext {
    pub(crate) encoding: &'static Encoding,
    pub(crate) limiter: SharedMemoryLimiter,
}

impl ContentContext {
    pub(crate) fn new(encoding: &'static Encoding, limiter: SharedMemoryLimiter) -> Self {
        Self { encoding, limiter }
    }

    pub(crate) fn buffer(&self) -> ContentBuffer {
        ContentBuffer::new(self.encoding, self.limiter.clone())
    }

    pub(crate) fn content(&self, content: &str, content_type: ContentType) -> Content {
        Content::Static(encode_content(content, content_type, self.encoding))
    }
}

pub(crate) enum Content {
    /// Already encoded bytes.
    Static(Vec<u8>),
    /// Produced when the buffer is flushed.
    Streaming(Box<dyn StreamingHandler>),
}

impl Content {
    fn charge(&self) -> usize {
        match self {
            Content::Static(bytes) => bytes.len(),
            Content::Streaming(_) => size_of::<Box<dyn StreamingHandler>>(),
        }
    }
}

/// Ordered content attached to one side of a token.
///
/// Buffered content is charged to the limiter until it is flushed or
/// dropped. Content that doesn't fit is discarded and leaves the limiter
/// exceeded, which the dispatcher reports once the handler returns.
pub(crate) struct ContentBuffer {
    chunks: VecDeque<Content>,
    charged: usize,
    encoding: &'static Encoding,
    limiter: SharedMemoryLimiter,
}

impl ContentBuffer {
    pub(crate) fn new(encoding: &'static Encoding, limiter: SharedMemoryLimiter) -> Self {
        Self {
            chunks: VecDeque::new(),
            charged: 0,
            encoding,
            limiter,
        }
    }

    #[cfg(test)]
    fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub(crate) fn push_back(&mut self, content: Content) {
        if self.charge(&content) {
            self.chunks.push_back(content);
        }
    }

    pub(crate) fn push_front(&mut self, content: Content) {
        if self.charge(&content) {
            self.chunks.push_front(content);
        }
    }

    pub(crate) fn clear(&mut self) {
        self.chunks.clear();
        self.release();
    }

    /// Write the content in order and empty the buffer.
    pub(crate) fn flush(&mut self, output: &mut dyn FnMut(&[u8])) -> Result<(), RewritingError> {
        let encoding = self.encoding;
        let result = self.chunks.drain(..).try_for_each(|content| match content {
            Content::Static(bytes) => {
                output(&bytes);
                Ok(())
            }
            Content::Streaming(handler) => run_streaming_handler(handler, encoding, output),
        });
        self.release();
        result
    }

    fn charge(&mut self, content: &Content) -> bool {
        let bytes = content.charge();
        if self.limiter.borrow_mut().increase_usage(bytes).is_err() {
            return false;
        }
        self.charged += bytes;
        true
    }

    fn release(&mut self) {
        self.limiter.borrow_mut().decrease_usage(self.charged);
        self.charged = 0;
    }
}

impl Drop for ContentBuffer {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use encoding_rs::{UTF_8, WINDOWS_1251};
    use tools::mem::MemoryLimiter;

    use super::*;

    #[test]
    fn text_content_is_escaped() {
        assert_eq!(escape_text("a < b && c > d"), "a &lt; b &amp;&amp; c &gt; d");
        assert!(matches!(escape_text("plain"), Cow::Borrowed("plain")));
        assert_eq!(encode_content("<b>", ContentType::Html, UTF_8), b"<b>");
        assert_eq!(encode_content("<b>", ContentType::Text, UTF_8), b"&lt;b&gt;");
    }

    #[test]
    fn attribute_values_escape_double_quotes_only() {
        let mut out = Vec::new();
        push_escaped_attribute_value(br#"say "hi" & 'bye'"#, &mut out);
        assert_eq!(out, br#"say &quot;hi&quot; & 'bye'"#);
    }

    #[test]
    fn unencodable_content_becomes_character_references() {
        assert_eq!(
            encode_content("\u{416}\u{1F600}", ContentType::Html, WINDOWS_1251),
            b"\xC6&#128512;"
        );
        assert_eq!(
            encode_exact("\u{1F600}", WINDOWS_1251),
            Err(InvalidMutationError::UnencodableCharacter)
        );
        assert_eq!(encode_exact("\u{416}", WINDOWS_1251), Ok(vec![0xC6]));
    }

    #[test]
    fn buffer_keeps_insertion_order_per_side() {
        let ctx = ContentContext::new(UTF_8, MemoryLimiter::new_shared(usize::MAX));
        let mut buffer = ctx.buffer();
        buffer.push_back(ctx.content("1", ContentType::Html));
        buffer.push_back(ctx.content("2", ContentType::Html));
        buffer.push_front(ctx.content("0", ContentType::Html));
        let mut out = Vec::new();
        buffer.flush(&mut |chunk| out.extend_from_slice(chunk)).unwrap();
        assert_eq!(out, b"012");
        assert!(buffer.is_empty());
    }

    #[test]
    fn buffered_content_is_charged_until_flushed() {
        let limiter = MemoryLimiter::new_shared(usize::MAX);
        let ctx = ContentContext::new(UTF_8, limiter.clone());
        let mut buffer = ctx.buffer();
        buffer.push_back(ctx.content("hello", ContentType::Html));
        assert_eq!(limiter.borrow().current_usage(), 5);
        buffer.flush(&mut |_| {}).unwrap();
        assert_eq!(limiter.borrow().current_usage(), 0);

        buffer.push_back(ctx.content("bye", ContentType::Html));
        drop(buffer);
        assert_eq!(limiter.borrow().current_usage(), 0);
    }

    #[test]
    fn content_over_the_limit_is_dropped_and_reported_by_the_limiter() {
        let limiter = MemoryLimiter::new_shared(4);
        let ctx = ContentContext::new(UTF_8, limiter.clone());
        let mut buffer = ctx.buffer();
        buffer.push_back(ctx.content("12345", ContentType::Html));
        assert!(buffer.is_empty());
        assert!(limiter.borrow().exceeded().is_some());
    }
}
