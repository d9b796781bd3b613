use std::fmt;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum BoundaryPolicy {
    /// Only split between UTF-8 sequences.
    Utf8Aligned,
    /// Split anywhere; consumers must carry partial sequences themselves.
    ByteStream,
}

impl fmt::Display for BoundaryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BoundaryPolicy::Utf8Aligned => f.write_str("utf8"),
            BoundaryPolicy::ByteStream => f.write_str("bytes"),
        }
    }
}

/// How an input is cut into the chunks fed to a streaming consumer.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ChunkPlan {
    Whole,
    Fixed {
        size: usize,
        policy: BoundaryPolicy,
    },
    Boundaries {
        indices: Vec<usize>,
        policy: BoundaryPolicy,
    },
}

impl fmt::Display for ChunkPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChunkPlan::Whole => f.write_str("whole"),
            ChunkPlan::Fixed { size, policy } => {
                write!(f, "fixed size={size} policy={policy}")
            }
            ChunkPlan::Boundaries { indices, policy } => {
                write!(
                    f,
                    "boundaries count={} policy={policy} indices={indices:?}",
                    indices.len()
                )
            }
        }
    }
}

impl ChunkPlan {
    pub fn fixed(size: usize) -> Self {
        Self::Fixed {
            size,
            policy: BoundaryPolicy::Utf8Aligned,
        }
    }

    pub fn fixed_unaligned(size: usize) -> Self {
        Self::Fixed {
            size,
            policy: BoundaryPolicy::ByteStream,
        }
    }

    pub fn boundaries(indices: impl Into<Vec<usize>>) -> Self {
        Self::Boundaries {
            indices: indices.into(),
            policy: BoundaryPolicy::Utf8Aligned,
        }
    }

    pub fn boundaries_unaligned(indices: impl Into<Vec<usize>>) -> Self {
        Self::Boundaries {
            indices: indices.into(),
            policy: BoundaryPolicy::ByteStream,
        }
    }

    /// Call `f` with consecutive chunks covering all of `input`. Empty input
    /// yields no chunks.
    pub fn for_each_chunk(&self, input: &[u8], mut f: impl FnMut(&[u8])) {
        match self {
            ChunkPlan::Whole => {
                if !input.is_empty() {
                    f(input);
                }
            }
            ChunkPlan::Fixed { size, policy } => {
                assert!(*size > 0, "chunk size must be > 0");
                let mut offset = 0usize;
                while offset < input.len() {
                    let mut end = (offset + size).min(input.len());
                    if *policy == BoundaryPolicy::Utf8Aligned {
                        end = next_char_boundary(input, end);
                    }
                    f(&input[offset..end]);
                    offset = end;
                }
            }
            ChunkPlan::Boundaries { indices, policy } => {
                let mut points = filter_boundaries_by_policy(input, indices, *policy);
                points.sort_unstable();
                points.dedup();
                let mut last = 0usize;
                for idx in points {
                    f(&input[last..idx]);
                    last = idx;
                }
                if last < input.len() {
                    f(&input[last..]);
                }
            }
        }
    }

    /// Collect the chunks into owned buffers.
    pub fn chunks(&self, input: &[u8]) -> Vec<Vec<u8>> {
        let mut out = Vec::new();
        self.for_each_chunk(input, |chunk| out.push(chunk.to_vec()));
        out
    }
}

fn is_char_boundary(input: &[u8], idx: usize) -> bool {
    idx == 0 || idx >= input.len() || (input[idx] & 0xC0) != 0x80
}

fn next_char_boundary(input: &[u8], mut idx: usize) -> usize {
    while !is_char_boundary(input, idx) {
        idx += 1;
    }
    idx
}

/// Keep interior indices that are valid split points under `policy`.
pub(crate) fn filter_boundaries_by_policy(
    input: &[u8],
    indices: &[usize],
    policy: BoundaryPolicy,
) -> Vec<usize> {
    indices
        .iter()
        .copied()
        .filter(|&idx| idx > 0 && idx < input.len())
        .filter(|&idx| policy == BoundaryPolicy::ByteStream || is_char_boundary(input, idx))
        .collect()
}
