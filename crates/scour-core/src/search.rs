//! Line search engine: literal or regex matching, one hit per line.
//!
//! Two entry points:
//!
//! - [`grep_file`] scans one file and can widen the result with a symmetric
//!   context window; overlapping windows coalesce.
//! - [`grep_tree`] scans every file a traversal selects, in enumeration
//!   order, and stops at a global hit limit. Files that cannot be read or
//!   decoded are skipped and reported, never fatal.
//!
//! Line numbers are 1-indexed and always refer to the original file.

use std::fs;
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ExpectedKind, ScourError, ScourResult, Skipped};
use crate::ignore::PatternSet;
use crate::text::{expand_context, split_lines};
use crate::walk::{self, EntryKind, TraversalSpec};

// ============================================================================
// Line Predicate
// ============================================================================

/// A compiled line predicate.
#[derive(Debug, Clone)]
pub enum LineMatcher {
    /// Substring containment. `folded` means `needle` is already lower-cased
    /// and lines are lower-cased before the test.
    Literal { needle: String, folded: bool },
    /// Regex search anywhere in the line.
    Pattern(Regex),
}

impl LineMatcher {
    /// Build a predicate from user input.
    pub fn new(pattern: &str, literal: bool, ignore_case: bool) -> ScourResult<Self> {
        if literal {
            return Ok(LineMatcher::literal(pattern, ignore_case));
        }
        let regex = RegexBuilder::new(pattern)
            .case_insensitive(ignore_case)
            .build()
            .map_err(|e| ScourError::invalid_pattern(pattern, e))?;
        Ok(LineMatcher::Pattern(regex))
    }

    /// Literal substring predicate.
    pub fn literal(needle: &str, ignore_case: bool) -> Self {
        if ignore_case {
            LineMatcher::Literal {
                needle: needle.to_lowercase(),
                folded: true,
            }
        } else {
            LineMatcher::Literal {
                needle: needle.to_string(),
                folded: false,
            }
        }
    }

    /// True if the line satisfies the predicate.
    pub fn is_match(&self, line: &str) -> bool {
        match self {
            LineMatcher::Literal {
                needle,
                folded: false,
            } => line.contains(needle.as_str()),
            LineMatcher::Literal {
                needle,
                folded: true,
            } => line.to_lowercase().contains(needle.as_str()),
            LineMatcher::Pattern(regex) => regex.is_match(line),
        }
    }
}

// ============================================================================
// Hits
// ============================================================================

/// One line of single-file output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineHit {
    /// 1-indexed line number in the original file.
    pub line: usize,
    /// Line text without its terminator.
    pub text: String,
}

/// One matched line in a multi-file search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileHit {
    /// File containing the line.
    pub file: PathBuf,
    /// 1-indexed line number.
    pub line: usize,
    /// Line text without its terminator.
    pub text: String,
}

/// Result of a single-file search.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GrepOutcome {
    /// Matched lines plus context, merged and sorted.
    pub hits: Vec<LineHit>,
    /// Number of lines that matched (context lines excluded).
    pub matched: usize,
}

/// Result of a multi-file search.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RgrepReport {
    /// Hits in file-visit order, then line order.
    pub hits: Vec<FileHit>,
    /// Number of files read.
    pub files_searched: usize,
    /// True if the limit stopped the scan.
    pub truncated: bool,
    /// Files and ignore entries that were skipped.
    pub skipped: Vec<Skipped>,
}

// ============================================================================
// Single File
// ============================================================================

/// Search one file, expanding each match by `context` lines on both sides.
pub fn grep_file(path: &Path, matcher: &LineMatcher, context: usize) -> ScourResult<GrepOutcome> {
    let content = read_text(path)?;
    Ok(grep_text(&content, matcher, context))
}

/// Search in-memory content. Same semantics as [`grep_file`].
pub fn grep_text(content: &str, matcher: &LineMatcher, context: usize) -> GrepOutcome {
    let lines = split_lines(content);
    let matched: Vec<usize> = lines
        .iter()
        .enumerate()
        .filter(|(_, line)| matcher.is_match(line))
        .map(|(idx, _)| idx + 1)
        .collect();

    let selected = if context > 0 {
        expand_context(&matched, context, lines.len())
    } else {
        matched.clone()
    };

    GrepOutcome {
        hits: selected
            .into_iter()
            .map(|line| LineHit {
                line,
                text: lines[line - 1].to_string(),
            })
            .collect(),
        matched: matched.len(),
    }
}

// ============================================================================
// File Tree
// ============================================================================

/// Search every file `spec` selects, stopping after `limit` hits.
///
/// `spec.kind` is forced to files and `spec.limit`/`spec.sort` are ignored:
/// files are visited in enumeration order.
pub fn grep_tree(
    spec: &TraversalSpec,
    matcher: &LineMatcher,
    limit: usize,
) -> ScourResult<RgrepReport> {
    let spec = TraversalSpec {
        kind: EntryKind::File,
        ..spec.clone()
    };
    let patterns = PatternSet::load(&spec.root, &spec.ignore);
    let mut outcome = RgrepReport {
        skipped: patterns.skipped().to_vec(),
        ..RgrepReport::default()
    };
    if limit == 0 {
        walk::visit(&spec, &patterns, |_| ControlFlow::Break(()))?;
        return Ok(outcome);
    }

    let hits = &mut outcome.hits;
    let skipped = &mut outcome.skipped;
    let mut files_searched = 0usize;
    let mut truncated = false;

    let walk_skipped = walk::visit(&spec, &patterns, |path| {
        let content = match read_text(path) {
            Ok(content) => content,
            Err(e) => {
                debug!("rgrep skipping {}: {}", path.display(), e);
                skipped.push(Skipped::new(path, e));
                return ControlFlow::Continue(());
            }
        };
        files_searched += 1;

        for (idx, line) in split_lines(&content).into_iter().enumerate() {
            if matcher.is_match(line) {
                hits.push(FileHit {
                    file: path.to_path_buf(),
                    line: idx + 1,
                    text: line.to_string(),
                });
                if hits.len() >= limit {
                    truncated = true;
                    return ControlFlow::Break(());
                }
            }
        }
        ControlFlow::Continue(())
    })?;

    outcome.files_searched = files_searched;
    outcome.truncated = truncated;
    outcome.skipped.extend(walk_skipped);
    debug!(
        root = %spec.root.display(),
        hits = outcome.hits.len(),
        files = outcome.files_searched,
        skipped = outcome.skipped.len(),
        "rgrep complete"
    );
    Ok(outcome)
}

// ============================================================================
// Helpers
// ============================================================================

/// Read a whole file as UTF-8, classifying failures.
///
/// Directories are a `TypeMismatch`; undecodable content is an `Io` failure
/// with kind `InvalidData`.
pub(crate) fn read_text(path: &Path) -> ScourResult<String> {
    let metadata = fs::metadata(path).map_err(|e| ScourError::from_io(path, e))?;
    if metadata.is_dir() {
        return Err(ScourError::TypeMismatch {
            path: path.to_path_buf(),
            expected: ExpectedKind::File,
        });
    }
    fs::read_to_string(path).map_err(|e| ScourError::from_io(path, e))
}

// ============================================================================
// Tests
// ============================================================================
