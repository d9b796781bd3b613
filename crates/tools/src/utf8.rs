/// Strict incremental UTF-8 validation for streamed byte sources.
///
/// A producer may split a multi-byte character across writes; the incomplete
/// suffix is carried until the rest arrives. Unlike lossy decoding, invalid
/// bytes are an error and nothing is replaced.
use thiserror::Error;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum Utf8ValidationError {
    #[error("invalid UTF-8 byte sequence")]
    InvalidSequence,
    #[error("content ended in the middle of a UTF-8 sequence")]
    IncompleteSequence,
    #[error("write interleaved with an incomplete UTF-8 sequence")]
    InterleavedWrite,
}

/// Carry state for a UTF-8 sequence split across chunk boundaries.
#[derive(Clone, Copy, Debug, Default)]
pub struct Utf8Carry {
    bytes: [u8; 4],
    len: usize,
}

impl Utf8Carry {
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Validate `bytes` as the continuation of the stream, passing every
    /// complete run of text to `emit`. A trailing incomplete sequence is kept
    /// for the next call.
    pub fn push(
        &mut self,
        bytes: &[u8],
        mut emit: impl FnMut(&str),
    ) -> Result<(), Utf8ValidationError> {
        let mut remaining = bytes;

        if self.len > 0 {
            let expected_len = utf8_seq_len(self.bytes[0]);
            let take = (expected_len - self.len).min(remaining.len());
            self.bytes[self.len..self.len + take].copy_from_slice(&remaining[..take]);
            self.len += take;
            remaining = &remaining[take..];

            let pending = &self.bytes[..self.len];
            match std::str::from_utf8(pending) {
                Ok(ch) => {
                    emit(ch);
                    self.len = 0;
                }
                Err(e) if e.error_len().is_none() => return Ok(()),
                Err(_) => {
                    self.len = 0;
                    return Err(Utf8ValidationError::InvalidSequence);
                }
            }
        }

        match std::str::from_utf8(remaining) {
            Ok(text) => {
                if !text.is_empty() {
                    emit(text);
                }
                Ok(())
            }
            Err(e) => {
                let (valid, rest) = remaining.split_at(e.valid_up_to());
                if let Ok(text) = std::str::from_utf8(valid) {
                    if !text.is_empty() {
                        emit(text);
                    }
                }
                if e.error_len().is_some() {
                    return Err(Utf8ValidationError::InvalidSequence);
                }
                self.bytes[..rest.len()].copy_from_slice(rest);
                self.len = rest.len();
                Ok(())
            }
        }
    }

    /// Fails if the stream stopped in the middle of a character.
    pub fn finish(&mut self) -> Result<(), Utf8ValidationError> {
        if self.len > 0 {
            self.len = 0;
            return Err(Utf8ValidationError::IncompleteSequence);
        }
        Ok(())
    }
}

/// Length of the incomplete UTF-8 sequence at the end of `bytes`, or 0 when
/// `bytes` ends on a character boundary (or with bytes that can never form a
/// character).
pub fn incomplete_suffix_len(bytes: &[u8]) -> usize {
    let len = bytes.len();
    for back in 1..=len.min(3) {
        let byte = bytes[len - back];
        if byte & 0xC0 != 0x80 {
            let expected_len = utf8_seq_len(byte);
            return if expected_len > back { back } else { 0 };
        }
    }
    0
}

fn utf8_seq_len(first: u8) -> usize {
    match first {
        0x00..=0x7F => 1,
        0xC2..=0xDF => 2,
        0xE0..=0xEF => 3,
        0xF0..=0xF4 => 4,
        _ => 0,
    }
}
