//! Line utilities shared by the search and mutation engines.
//!
//! ## Coordinate Conventions
//!
//! - Line numbers are **1-indexed** (matching editor and `sed` conventions)
//! - Ranges are **inclusive** on both ends
//! - A line number of 0 is treated as 1 when clamping a range start
//!
//! ## Line Splitting
//!
//! Content is split on `\n`; a `\r` immediately before the `\n` is dropped, so
//! CRLF files yield the same lines as LF files. A trailing newline does not
//! produce an extra empty line. Rewrites always join with `\n`.

use std::ops::RangeInclusive;

/// Split content into lines without their terminators.
pub fn split_lines(content: &str) -> Vec<&str> {
    content.lines().collect()
}

/// Join lines back into file content.
///
/// A non-empty result always ends with `\n`; no lines yields the empty string.
pub fn join_lines<S: AsRef<str>>(lines: &[S]) -> String {
    if lines.is_empty() {
        return String::new();
    }
    let mut out = String::with_capacity(lines.iter().map(|l| l.as_ref().len() + 1).sum());
    for line in lines {
        out.push_str(line.as_ref());
        out.push('\n');
    }
    out
}

/// Clamp a 1-indexed inclusive range to `[1, line_count]`.
///
/// Returns `None` when nothing remains after clamping (empty file, `start`
/// beyond the end, or `end < start`).
pub fn clamp_range(start: usize, end: usize, line_count: usize) -> Option<RangeInclusive<usize>> {
    let start = start.max(1);
    let end = end.min(line_count);
    if start > end {
        None
    } else {
        Some(start..=end)
    }
}

/// Expand matched line numbers into a merged, sorted context window.
///
/// Each match `n` contributes `[n - context, n + context]`, clipped to
/// `[1, line_count]`. Overlapping windows coalesce; the output has no
/// duplicates. `matches` must be sorted ascending.
pub fn expand_context(matches: &[usize], context: usize, line_count: usize) -> Vec<usize> {
    let window = context.saturating_mul(2).saturating_add(1);
    let mut out: Vec<usize> =
        Vec::with_capacity(line_count.min(matches.len().saturating_mul(window)));
    for &line in matches {
        let lo = line.saturating_sub(context).max(1);
        let hi = line.saturating_add(context).min(line_count);
        // Resume after whatever the previous window already covered.
        let from = match out.last() {
            Some(&last) if last >= lo => last + 1,
            _ => lo,
        };
        out.extend(from..=hi);
    }
    out
}

/// Truncate to at most `max_chars` characters, never splitting a code point.
pub fn truncate_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

// ============================================================================
// Tests
// ============================================================================
