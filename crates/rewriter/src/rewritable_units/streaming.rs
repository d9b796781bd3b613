//! Content produced lazily, at the moment it is written to the output.

use std::borrow::Cow;

use encoding_rs::Encoding;
use tools::utf8::{Utf8Carry, Utf8ValidationError};

use super::content::{ContentType, escape_text};
use crate::errors::RewritingError;
use crate::handlers::BoxedError;

/// A producer of inserted content.
///
/// The handler runs once, when the content it stands for is due in the
/// output, and writes through the [`StreamingHandlerSink`] it is given.
pub trait StreamingHandler {
    fn write_all(self: Box<Self>, sink: &mut StreamingHandlerSink<'_>) -> Result<(), BoxedError>;
}

impl<F> StreamingHandler for F
where
    F: FnOnce(&mut StreamingHandlerSink<'_>) -> Result<(), BoxedError>,
{
    fn write_all(self: Box<Self>, sink: &mut StreamingHandlerSink<'_>) -> Result<(), BoxedError> {
        (*self)(sink)
    }
}

/// Box a closure as a [`StreamingHandler`].
pub fn streaming<F>(handler: F) -> Box<dyn StreamingHandler>
where
    F: FnOnce(&mut StreamingHandlerSink<'_>) -> Result<(), BoxedError> + 'static,
{
    Box::new(handler)
}

/// Where a [`StreamingHandler`] writes its content.
pub struct StreamingHandlerSink<'o> {
    encoding: &'static Encoding,
    carry: Utf8Carry,
    output: &'o mut dyn FnMut(&[u8]),
}

impl<'o> StreamingHandlerSink<'o> {
    pub(crate) fn new(encoding: &'static Encoding, output: &'o mut dyn FnMut(&[u8])) -> Self {
        Self {
            encoding,
            carry: Utf8Carry::default(),
            output,
        }
    }

    /// Write `content`. Fails if an earlier [`Self::write_utf8_chunk`] left
    /// a character unfinished.
    pub fn write_str(
        &mut self,
        content: &str,
        content_type: ContentType,
    ) -> Result<(), Utf8ValidationError> {
        if !self.carry.is_empty() {
            return Err(Utf8ValidationError::InterleavedWrite);
        }
        write_encoded(content, content_type, self.encoding, &mut *self.output);
        Ok(())
    }

    /// Write UTF-8 bytes that may split a character across calls. Invalid
    /// sequences are rejected.
    pub fn write_utf8_chunk(
        &mut self,
        chunk: &[u8],
        content_type: ContentType,
    ) -> Result<(), Utf8ValidationError> {
        let encoding = self.encoding;
        let output = &mut *self.output;
        self.carry
            .push(chunk, |text| write_encoded(text, content_type, encoding, output))
    }
}

fn write_encoded(
    content: &str,
    content_type: ContentType,
    encoding: &'static Encoding,
    output: &mut dyn FnMut(&[u8]),
) {
    if content.is_empty() {
        return;
    }
    let escaped = match content_type {
        ContentType::Html => Cow::Borrowed(content),
        ContentType::Text => escape_text(content),
    };
    let (bytes, _, _) = encoding.encode(&escaped);
    output(&bytes);
}

pub(crate) fn run_streaming_handler(
    handler: Box<dyn StreamingHandler>,
    encoding: &'static Encoding,
    output: &mut dyn FnMut(&[u8]),
) -> Result<(), RewritingError> {
    let mut sink = StreamingHandlerSink::new(encoding, output);
    handler
        .write_all(&mut sink)
        .map_err(RewritingError::ContentHandler)?;
    sink.carry
        .finish()
        .map_err(|err| RewritingError::ContentHandler(Box::new(err)))
}
