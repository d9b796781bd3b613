use html::Tokenizer;

use crate::builder::RewriterBuilder;
use crate::dispatcher::Dispatcher;
use crate::errors::{RewriteStrError, RewritingError};
use crate::settings::Settings;
use crate::sink::OutputSink;

/// Lifecycle of an [`HtmlRewriter`]. Only `Active` accepts input.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RewriterState {
    Active,
    /// A handler returned [`crate::Directive::Stop`].
    Stopped,
    /// A call failed.
    Faulted,
    /// `end` completed.
    Ended,
}

/// Rewrites a document fed to it in chunks.
pub struct HtmlRewriter<'h, O: OutputSink> {
    tokenizer: Tokenizer,
    dispatcher: Dispatcher<'h, O>,
    state: RewriterState,
}

impl<'h, O: OutputSink> HtmlRewriter<'h, O> {
    pub(crate) fn new(tokenizer: Tokenizer, dispatcher: Dispatcher<'h, O>) -> Self {
        Self {
            tokenizer,
            dispatcher,
            state: RewriterState::Active,
        }
    }

    pub fn state(&self) -> RewriterState {
        self.state
    }

    /// Feed the next chunk. Chunks may split the document anywhere, even
    /// inside a character.
    pub fn write(&mut self, chunk: &[u8]) -> Result<(), RewritingError> {
        self.ensure_active()?;
        let result = self.tokenizer.write(chunk, &mut self.dispatcher);
        self.settle(result)
    }

    /// Finish the document. Pending output is written, then the sink gets
    /// an empty chunk.
    pub fn end(&mut self) -> Result<(), RewritingError> {
        self.ensure_active()?;
        let result = self.tokenizer.end(&mut self.dispatcher);
        self.settle(result)?;
        self.dispatcher.finish();
        self.state = RewriterState::Ended;
        log::debug!(target: "rewriter", "rewriter ended");
        Ok(())
    }

    fn ensure_active(&self) -> Result<(), RewritingError> {
        match self.state {
            RewriterState::Active => Ok(()),
            RewriterState::Ended => Err(RewritingError::Ended),
            RewriterState::Stopped | RewriterState::Faulted => Err(RewritingError::Poisoned),
        }
    }

    fn settle(&mut self, result: Result<(), RewritingError>) -> Result<(), RewritingError> {
        if let Err(err) = &result {
            self.state = match err {
                RewritingError::Stopped => RewriterState::Stopped,
                _ => RewriterState::Faulted,
            };
            log::debug!(target: "rewriter", "rewriter {:?}: {err}", self.state);
        }
        result
    }
}

/// Rewrite a whole UTF-8 document in one go. The encoding in `settings` is
/// ignored.
pub fn rewrite_str(
    html: &str,
    mut builder: RewriterBuilder<'_>,
    settings: &Settings,
) -> Result<String, RewriteStrError> {
    let settings = Settings {
        encoding: "utf-8",
        ..settings.clone()
    };
    let mut output = Vec::with_capacity(html.len());
    let mut rewriter = builder.build(&settings, |chunk: &[u8]| output.extend_from_slice(chunk))?;
    rewriter.write(html.as_bytes())?;
    rewriter.end()?;
    drop(rewriter);
    Ok(String::from_utf8_lossy(&output).into_owned())
}
