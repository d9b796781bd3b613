use super::content::{Content, ContentBuffer, ContentContext, ContentType};
use super::streaming::StreamingHandler;
use crate::errors::RewritingError;

/// The end of the document, after every other token has been written.
pub struct DocumentEnd {
    ctx: ContentContext,
    appended: ContentBuffer,
}

impl DocumentEnd {
    pub(crate) fn new(ctx: &ContentContext) -> Self {
        Self {
            ctx: ctx.clone(),
            appended: ctx.buffer(),
        }
    }

    /// Add `content` to the end of the document. Later calls land after
    /// earlier ones.
    pub fn append(&mut self, content: &str, content_type: ContentType) {
        let content = self.ctx.content(content, content_type);
        self.appended.push_back(content);
    }

    pub fn append_streaming(&mut self, handler: Box<dyn StreamingHandler>) {
        self.appended.push_back(Content::Streaming(handler));
    }

    pub(crate) fn flush(&mut self, output: &mut dyn FnMut(&[u8])) -> Result<(), RewritingError> {
        self.appended.flush(output)
    }
}
