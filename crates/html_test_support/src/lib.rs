//! Chunking and diff helpers shared by the streaming tests of the workspace.

mod chunk_plan;
mod chunker;

use std::fmt::Write;

pub use chunk_plan::{BoundaryPolicy, ChunkPlan};
pub use chunker::{ChunkPlanCase, Lcg, build_chunk_plans, chunk_plans_from_env};

/// Render the neighbourhood of the first differing line of two line lists,
/// for assertion messages.
pub fn diff_lines(expected: &[String], actual: &[String]) -> String {
    fn line(lines: &[String], i: usize) -> &str {
        lines.get(i).map_or("<missing>", String::as_str)
    }

    let len = expected.len().max(actual.len());
    let mut out = String::new();

    match (0..len).find(|&i| line(expected, i) != line(actual, i)) {
        Some(first) => {
            let window = first.saturating_sub(2)..(first + 3).min(len);
            let _ = writeln!(
                out,
                "first mismatch at line {} (showing {}..={}):",
                first + 1,
                window.start + 1,
                window.end
            );
            for i in window {
                let marker = if i == first { '>' } else { ' ' };
                let _ = writeln!(out, "{marker} {:>4}  expected: {}", i + 1, line(expected, i));
                let _ = writeln!(out, "{marker} {:>4}    actual: {}", i + 1, line(actual, i));
            }
        }
        None => {
            let _ = writeln!(out, "all {len} lines match");
        }
    }
    let _ = writeln!(
        out,
        "expected {} lines, actual {} lines",
        expected.len(),
        actual.len()
    );
    out
}

#[cfg(test)]
mod tests {
    use super::diff_lines;

    fn lines(src: &[&str]) -> Vec<String> {
        src.iter().map(|line| line.to_string()).collect()
    }

    #[test]
    fn points_at_the_first_mismatch() {
        let report = diff_lines(&lines(&["a", "b", "c"]), &lines(&["a", "x"]));
        assert!(report.starts_with("first mismatch at line 2"), "{report}");
        assert!(report.contains(">    2    actual: x"), "{report}");
        assert!(report.contains("     3    actual: <missing>"), "{report}");
        assert!(report.ends_with("expected 3 lines, actual 2 lines\n"), "{report}");
    }
}
