//! Memory accounting for everything the rewriting pipeline buffers.
//!
//! One limiter is shared by the parsing buffer, the selector matcher frames and
//! the mutation content waiting to be flushed. Once a request is refused the
//! limiter stays exceeded: every later request fails with the same error.

use std::cell::RefCell;
use std::rc::Rc;

use thiserror::Error;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
#[error(
    "memory limit of {max} bytes exceeded: {requested} more bytes requested with {current} bytes in use"
)]
pub struct MemoryLimitExceededError {
    pub requested: usize,
    pub current: usize,
    pub max: usize,
}

#[derive(Debug)]
pub struct MemoryLimiter {
    current: usize,
    max: usize,
    exceeded: Option<MemoryLimitExceededError>,
}

pub type SharedMemoryLimiter = Rc<RefCell<MemoryLimiter>>;

impl MemoryLimiter {
    pub fn new(max: usize) -> Self {
        Self {
            current: 0,
            max,
            exceeded: None,
        }
    }

    pub fn new_shared(max: usize) -> SharedMemoryLimiter {
        Rc::new(RefCell::new(Self::new(max)))
    }

    pub fn current_usage(&self) -> usize {
        self.current
    }

    /// The error that made this limiter refuse requests, if any.
    pub fn exceeded(&self) -> Option<MemoryLimitExceededError> {
        self.exceeded
    }

    pub fn increase_usage(&mut self, bytes: usize) -> Result<(), MemoryLimitExceededError> {
        if let Some(err) = self.exceeded {
            return Err(err);
        }
        match self.current.checked_add(bytes) {
            Some(next) if next <= self.max => {
                self.current = next;
                Ok(())
            }
            _ => {
                let err = MemoryLimitExceededError {
                    requested: bytes,
                    current: self.current,
                    max: self.max,
                };
                self.exceeded = Some(err);
                Err(err)
            }
        }
    }

    pub fn decrease_usage(&mut self, bytes: usize) {
        debug_assert!(bytes <= self.current, "released more memory than charged");
        self.current = self.current.saturating_sub(bytes);
    }
}

/// Byte buffer whose capacity is charged to a [`MemoryLimiter`].
///
/// The charged capacity only grows: it starts at the preallocated size and is
/// raised to the largest length the buffer ever had to hold.
#[derive(Debug)]
pub struct LimitedBuffer {
    bytes: Vec<u8>,
    capacity: usize,
    limiter: SharedMemoryLimiter,
}

impl LimitedBuffer {
    pub fn new(
        limiter: SharedMemoryLimiter,
        preallocated: usize,
    ) -> Result<Self, MemoryLimitExceededError> {
        limiter.borrow_mut().increase_usage(preallocated)?;
        Ok(Self {
            bytes: Vec::with_capacity(preallocated),
            capacity: preallocated,
            limiter,
        })
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    #[cfg(test)]
    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }

    /// Replace the contents with `data`.
    pub fn init_with(&mut self, data: &[u8]) -> Result<(), MemoryLimitExceededError> {
        self.bytes.clear();
        self.append(data)
    }

    pub fn append(&mut self, data: &[u8]) -> Result<(), MemoryLimitExceededError> {
        let required = self.bytes.len() + data.len();
        if required > self.capacity {
            self.limiter
                .borrow_mut()
                .increase_usage(required - self.capacity)?;
            self.bytes.reserve_exact(required - self.bytes.len());
            self.capacity = required;
        }
        self.bytes.extend_from_slice(data);
        Ok(())
    }

    /// Drop the first `consumed` bytes.
    pub fn shift(&mut self, consumed: usize) {
        let consumed = consumed.min(self.bytes.len());
        self.bytes.drain(..consumed);
    }

    /// Move the bytes out so they can be read while the owner is mutated.
    /// Must be paired with [`LimitedBuffer::restore_bytes`].
    pub fn take_bytes(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.bytes)
    }

    pub fn restore_bytes(&mut self, bytes: Vec<u8>) {
        self.bytes = bytes;
    }
}

impl Drop for LimitedBuffer {
    fn drop(&mut self) {
        self.limiter.borrow_mut().decrease_usage(self.capacity);
    }
}
