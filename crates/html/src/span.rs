//! Byte ranges into the cumulative input stream.

use std::ops::Range;

/// Location of a token in the input stream, counted in bytes from the start
/// of the first chunk ever written.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SourceLocation {
    pub start: usize,
    pub end: usize,
}

impl SourceLocation {
    pub fn new(start: usize, end: usize) -> Self {
        debug_assert!(start <= end, "location start must be <= end");
        Self { start, end }
    }

    pub fn len(self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(self) -> bool {
        self.start == self.end
    }

    pub fn bytes(self) -> Range<usize> {
        self.start..self.end
    }
}
