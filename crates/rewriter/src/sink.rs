/// Receiver of the rewritten document.
///
/// Called synchronously from inside `write` and `end` only. The final call
/// made by `end` passes an empty chunk.
pub trait OutputSink {
    fn handle_chunk(&mut self, chunk: &[u8]);
}

impl<F: FnMut(&[u8])> OutputSink for F {
    fn handle_chunk(&mut self, chunk: &[u8]) {
        self(chunk)
    }
}
