//! Deterministic chunk plans plus seeded random ones, so streaming coverage
//! is reproducible in CI.

use crate::chunk_plan::{BoundaryPolicy, ChunkPlan, filter_boundaries_by_policy};

const DEFAULT_FUZZ_RUNS_LOCAL: usize = 16;
const DEFAULT_FUZZ_RUNS_CI: usize = 64;
const DEFAULT_FUZZ_SEED: u64 = 0x5EED_CAFE_F00D_0001;

#[derive(Clone, Debug)]
pub struct ChunkPlanCase {
    pub label: String,
    pub plan: ChunkPlan,
}

/// Build the whole-input plan, fixed sizes, splits around markup delimiters
/// and `fuzz_runs` seeded random splits.
pub fn build_chunk_plans(
    input: &[u8],
    fuzz_runs: usize,
    fuzz_seed: u64,
    policy: BoundaryPolicy,
) -> Vec<ChunkPlanCase> {
    let mut plans = vec![ChunkPlanCase {
        label: "whole".to_string(),
        plan: ChunkPlan::Whole,
    }];

    for size in [1usize, 2, 3, 4, 7, 16, 64] {
        plans.push(ChunkPlanCase {
            label: format!("fixed size={size}"),
            plan: match policy {
                BoundaryPolicy::Utf8Aligned => ChunkPlan::fixed(size),
                BoundaryPolicy::ByteStream => ChunkPlan::fixed_unaligned(size),
            },
        });
    }

    let markup = markup_boundaries(input, policy);
    if !markup.is_empty() {
        plans.push(ChunkPlanCase {
            label: format!("markup-boundaries count={}", markup.len()),
            plan: boundaries_plan(markup, policy),
        });
    }

    let candidates: Vec<usize> = filter_boundaries_by_policy(
        input,
        &(1..input.len()).collect::<Vec<_>>(),
        policy,
    );
    for i in 0..fuzz_runs {
        let seed = fuzz_seed.wrapping_add(i as u64);
        let mut rng = Lcg::new(seed);
        let plan = if candidates.is_empty() {
            ChunkPlan::Whole
        } else {
            let mut picks = candidates.clone();
            rng.shuffle(&mut picks);
            let count = 1 + rng.gen_range(candidates.len().min(32));
            picks.truncate(count);
            picks.sort_unstable();
            boundaries_plan(picks, policy)
        };
        plans.push(ChunkPlanCase {
            label: format!("fuzz seed=0x{seed:016x}"),
            plan,
        });
    }

    plans
}

/// Plans for tests, sized by `REWRITER_CHUNK_FUZZ_RUNS` and seeded by
/// `REWRITER_CHUNK_FUZZ_SEED` (decimal or `0x` hex).
pub fn chunk_plans_from_env(input: &[u8], policy: BoundaryPolicy) -> Vec<ChunkPlanCase> {
    build_chunk_plans(input, fuzz_runs(), fuzz_seed(), policy)
}

fn fuzz_runs() -> usize {
    if let Ok(value) = std::env::var("REWRITER_CHUNK_FUZZ_RUNS")
        && let Ok(parsed) = value.parse::<usize>()
    {
        return parsed;
    }
    if std::env::var("CI").is_ok() {
        DEFAULT_FUZZ_RUNS_CI
    } else {
        DEFAULT_FUZZ_RUNS_LOCAL
    }
}

fn fuzz_seed() -> u64 {
    let Ok(value) = std::env::var("REWRITER_CHUNK_FUZZ_SEED") else {
        return DEFAULT_FUZZ_SEED;
    };
    let parsed = match value.strip_prefix("0x") {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => value.parse::<u64>(),
    };
    parsed.unwrap_or(DEFAULT_FUZZ_SEED)
}

fn boundaries_plan(indices: Vec<usize>, policy: BoundaryPolicy) -> ChunkPlan {
    match policy {
        BoundaryPolicy::Utf8Aligned => ChunkPlan::boundaries(indices),
        BoundaryPolicy::ByteStream => ChunkPlan::boundaries_unaligned(indices),
    }
}

fn markup_boundaries(input: &[u8], policy: BoundaryPolicy) -> Vec<usize> {
    let mut out = Vec::new();
    for (i, &b) in input.iter().enumerate() {
        if matches!(b, b'<' | b'>' | b'"' | b'\'' | b'=' | b'-' | b'/' | b'!') {
            out.push(i);
            out.push(i + 1);
        }
    }
    out.sort_unstable();
    out.dedup();
    filter_boundaries_by_policy(input, &out, policy)
}

pub struct Lcg {
    state: u64,
}

impl Lcg {
    pub fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    pub fn next_u64(&mut self) -> u64 {
        self.state = self.state.wrapping_mul(6364136223846793005).wrapping_add(1);
        self.state
    }

    pub fn gen_range(&mut self, upper: usize) -> usize {
        if upper == 0 {
            return 0;
        }
        (self.next_u64() >> 32) as usize % upper
    }

    pub fn shuffle<T>(&mut self, items: &mut [T]) {
        if items.len() < 2 {
            return;
        }
        for i in (1..items.len()).rev() {
            let j = self.gen_range(i + 1);
            items.swap(i, j);
        }
    }
}
