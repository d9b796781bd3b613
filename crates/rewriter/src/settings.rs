//! Build-time configuration of a rewriter instance.

/// Memory budget of one rewriter instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MemorySettings {
    /// Parsing buffer capacity allocated (and charged) when the rewriter is
    /// built.
    pub preallocated_parsing_buffer_size: usize,
    /// Ceiling for everything the instance buffers: the parsing buffer, the
    /// selector matching frames and inserted content waiting to be written.
    pub max_allowed_memory_usage: usize,
}

impl Default for MemorySettings {
    fn default() -> Self {
        Self {
            preallocated_parsing_buffer_size: 1024,
            max_allowed_memory_usage: usize::MAX,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Settings {
    /// WHATWG label of the document encoding. Must name an ASCII-compatible
    /// encoding.
    pub encoding: &'static str,
    pub memory: MemorySettings,
    /// Fail on start tags whose effect on lexing can't be determined without
    /// building a tree. When off, the ambiguity is logged and lexing goes on
    /// in the data state.
    pub strict: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            encoding: "utf-8",
            memory: MemorySettings::default(),
            strict: true,
        }
    }
}
