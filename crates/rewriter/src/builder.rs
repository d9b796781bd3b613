use std::mem;

use css::{Selector, SelectorMatcher};
use html::{AsciiCompatibleEncoding, Tokenizer, TokenizerConfig};
use tools::mem::MemoryLimiter;

use crate::dispatcher::Dispatcher;
use crate::errors::BuildError;
use crate::handlers::{DocumentContentHandlers, ElementContentHandlers};
use crate::rewritable_units::content::ContentContext;
use crate::rewriter::HtmlRewriter;
use crate::settings::Settings;
use crate::sink::OutputSink;

/// Collects handler registrations for a rewriter.
#[derive(Default)]
pub struct RewriterBuilder<'h> {
    document: Vec<DocumentContentHandlers<'h>>,
    selectors: Vec<Selector>,
    element: Vec<ElementContentHandlers<'h>>,
}

impl<'h> RewriterBuilder<'h> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_document(&mut self, handlers: DocumentContentHandlers<'h>) -> &mut Self {
        self.document.push(handlers);
        self
    }

    pub fn on(&mut self, selector: &Selector, handlers: ElementContentHandlers<'h>) -> &mut Self {
        self.selectors.push(selector.clone());
        self.element.push(handlers);
        self
    }

    /// Create a rewriter writing to `output`. The registrations move into the
    /// rewriter; if the build fails they stay here.
    pub fn build<O: OutputSink>(
        &mut self,
        settings: &Settings,
        output: O,
    ) -> Result<HtmlRewriter<'h, O>, BuildError> {
        let encoding = AsciiCompatibleEncoding::for_label(settings.encoding)?;
        let memory = settings.memory;
        let preallocation_error = BuildError::PreallocationExceedsLimit {
            preallocated: memory.preallocated_parsing_buffer_size,
            max: memory.max_allowed_memory_usage,
        };
        if memory.preallocated_parsing_buffer_size > memory.max_allowed_memory_usage {
            return Err(preallocation_error);
        }

        let limiter = MemoryLimiter::new_shared(memory.max_allowed_memory_usage);
        let config = TokenizerConfig {
            strict: settings.strict,
            ..TokenizerConfig::default()
        };
        let tokenizer = Tokenizer::new(
            config,
            limiter.clone(),
            memory.preallocated_parsing_buffer_size,
        )
        .map_err(|_| preallocation_error)?;

        let selectors = mem::take(&mut self.selectors);
        let matcher =
            (!selectors.is_empty()).then(|| SelectorMatcher::new(&selectors, limiter.clone()));
        log::debug!(
            target: "rewriter",
            "rewriter built: encoding={}, document handlers={}, selectors={}, memory limit={}",
            encoding.name(),
            self.document.len(),
            selectors.len(),
            memory.max_allowed_memory_usage
        );

        let dispatcher = Dispatcher::new(
            output,
            ContentContext::new(encoding.encoding(), limiter),
            mem::take(&mut self.document),
            mem::take(&mut self.element),
            matcher,
        );
        Ok(HtmlRewriter::new(tokenizer, dispatcher))
    }
}
