//! Line mutation engine: substitution, deletion, insertion, batch rewrites.
//!
//! Every mutation reads the whole file, transforms it in memory, and writes
//! the new content atomically (sibling temp file, then rename). Readers see
//! either the old or the new content, never a partial write. The original
//! permissions are carried over. When the transform leaves the content
//! unchanged, nothing is written.
//!
//! Line-oriented rewrites use the conventions in [`crate::text`]: lines are
//! rejoined with `\n` and a non-empty result ends with `\n`.

use std::fmt;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::{ScourError, ScourResult, Skipped};
use crate::ignore::PatternSet;
use crate::search::{read_text, LineMatcher};
use crate::text::{clamp_range, join_lines, split_lines};
use crate::walk::{self, EntryKind, TraversalSpec};

/// Maximum number of changed files listed in a [`BatchReport`].
pub const CHANGED_PREVIEW_LIMIT: usize = 10;

// ============================================================================
// Regex Flags
// ============================================================================

/// Regex compilation flags for substitutions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegexFlags {
    /// `i`: case-insensitive.
    pub ignore_case: bool,
    /// `m`: `^`/`$` match at line boundaries.
    pub multi_line: bool,
    /// `s`: `.` matches `\n`.
    pub dot_matches_new_line: bool,
    /// `x`: whitespace and `#` comments in the pattern are ignored.
    pub ignore_whitespace: bool,
}

impl RegexFlags {
    /// Compile `pattern` with these flags.
    pub fn compile(&self, pattern: &str) -> ScourResult<Regex> {
        RegexBuilder::new(pattern)
            .case_insensitive(self.ignore_case)
            .multi_line(self.multi_line)
            .dot_matches_new_line(self.dot_matches_new_line)
            .ignore_whitespace(self.ignore_whitespace)
            .build()
            .map_err(|e| ScourError::invalid_pattern(pattern, e))
    }
}

impl FromStr for RegexFlags {
    type Err = ScourError;

    /// Parse a letter string such as `"im"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut flags = RegexFlags::default();
        for ch in s.chars() {
            match ch {
                'i' => flags.ignore_case = true,
                'm' => flags.multi_line = true,
                's' => flags.dot_matches_new_line = true,
                'x' => flags.ignore_whitespace = true,
                other => {
                    return Err(ScourError::invalid_arguments(format!(
                        "unknown regex flag '{}', expected any of i, m, s, x",
                        other
                    )))
                }
            }
        }
        Ok(flags)
    }
}

impl fmt::Display for RegexFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (set, letter) in [
            (self.ignore_case, 'i'),
            (self.multi_line, 'm'),
            (self.dot_matches_new_line, 's'),
            (self.ignore_whitespace, 'x'),
        ] {
            if set {
                write!(f, "{letter}")?;
            }
        }
        Ok(())
    }
}

// ============================================================================
// Substitution
// ============================================================================

/// Pattern for a whole-content substitution.
#[derive(Debug, Clone)]
pub enum Substitution {
    /// Literal text; every non-overlapping occurrence is replaced.
    Literal(String),
    /// Compiled regex; replacement may use `$1` / `${name}`.
    Pattern(Regex),
}

impl Substitution {
    /// Build a substitution from user input.
    pub fn new(pattern: &str, regex: bool, flags: RegexFlags) -> ScourResult<Self> {
        if regex {
            Ok(Substitution::Pattern(flags.compile(pattern)?))
        } else {
            Ok(Substitution::Literal(pattern.to_string()))
        }
    }

    /// Apply to `content`, returning the new content and the replacement count.
    pub fn apply(&self, content: &str, replacement: &str) -> (String, usize) {
        match self {
            Substitution::Literal(needle) => {
                if needle.is_empty() {
                    return (content.to_string(), 0);
                }
                let count = content.matches(needle.as_str()).count();
                if count == 0 {
                    return (content.to_string(), 0);
                }
                (content.replace(needle.as_str(), replacement), count)
            }
            Substitution::Pattern(regex) => {
                let count = regex.find_iter(content).count();
                if count == 0 {
                    return (content.to_string(), 0);
                }
                (regex.replace_all(content, replacement).into_owned(), count)
            }
        }
    }
}

/// Replace every occurrence of `pattern` in one file. Returns the count.
pub fn replace_in_file(
    path: &Path,
    substitution: &Substitution,
    replacement: &str,
) -> ScourResult<usize> {
    let count = substitute_one(path, substitution, replacement)?;
    debug!(path = %path.display(), count, "substitution applied");
    Ok(count)
}

// ============================================================================
// Batch Substitution
// ============================================================================

/// One changed file in a batch report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangedFile {
    /// Rewritten file.
    pub file: PathBuf,
    /// Replacements made in it.
    pub count: usize,
}

/// Result of a batch substitution.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchReport {
    /// Total replacements across all files.
    pub total: usize,
    /// Number of files rewritten.
    pub files_changed: usize,
    /// The first changed files, in visit order.
    pub changed: Vec<ChangedFile>,
    /// Files that could not be read, decoded, or written.
    pub skipped: Vec<Skipped>,
}

/// Substitute in every file `spec` selects.
///
/// Each file is processed independently. Files without a match are never
/// touched. A file that fails to read, decode, or write is recorded in
/// [`BatchReport::skipped`] and contributes nothing to the totals.
pub fn replace_in_tree(
    spec: &TraversalSpec,
    substitution: &Substitution,
    replacement: &str,
) -> ScourResult<BatchReport> {
    let spec = TraversalSpec {
        kind: EntryKind::File,
        ..spec.clone()
    };
    let patterns = PatternSet::load(&spec.root, &spec.ignore);
    let mut report = BatchReport {
        skipped: patterns.skipped().to_vec(),
        ..BatchReport::default()
    };

    let walk_skipped = walk::visit(&spec, &patterns, |path| {
        match substitute_one(path, substitution, replacement) {
            Ok(0) => {}
            Ok(count) => {
                report.total += count;
                report.files_changed += 1;
                if report.changed.len() < CHANGED_PREVIEW_LIMIT {
                    report.changed.push(ChangedFile {
                        file: path.to_path_buf(),
                        count,
                    });
                }
            }
            Err(e) => {
                debug!("rsed skipping {}: {}", path.display(), e);
                report.skipped.push(Skipped::new(path, e));
            }
        }
        std::ops::ControlFlow::Continue(())
    })?;
    report.skipped.extend(walk_skipped);

    debug!(
        root = %spec.root.display(),
        total = report.total,
        files_changed = report.files_changed,
        skipped = report.skipped.len(),
        "batch substitution complete"
    );
    Ok(report)
}

fn substitute_one(
    path: &Path,
    substitution: &Substitution,
    replacement: &str,
) -> ScourResult<usize> {
    let content = read_text(path)?;
    let (updated, count) = substitution.apply(&content, replacement);
    if count > 0 {
        write_if_changed(path, &content, &updated)?;
    }
    Ok(count)
}

// ============================================================================
// Line Operations
// ============================================================================

/// A slice of a file's lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineSlice {
    /// First line returned (after clamping).
    pub start: usize,
    /// Last line returned (after clamping).
    pub end: usize,
    /// Number of lines returned.
    pub count: usize,
    /// The lines joined with `\n`, without a trailing newline.
    pub text: String,
}

/// Return lines `start..=end` (1-indexed, clamped).
///
/// `end` defaults to the last line. An empty range yields empty text.
pub fn extract_lines(path: &Path, start: usize, end: Option<usize>) -> ScourResult<LineSlice> {
    let content = read_text(path)?;
    let lines = split_lines(&content);
    let end = end.unwrap_or(lines.len());
    Ok(match clamp_range(start, end, lines.len()) {
        Some(range) => {
            let selected = &lines[range.start() - 1..*range.end()];
            LineSlice {
                start: *range.start(),
                end: *range.end(),
                count: selected.len(),
                text: selected.join("\n"),
            }
        }
        None => LineSlice {
            start: start.max(1),
            end: end.min(lines.len()),
            count: 0,
            text: String::new(),
        },
    })
}

/// A line range removed by [`delete_lines`], after clamping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineEdit {
    /// First line removed.
    pub start: usize,
    /// Last line removed.
    pub end: usize,
    /// Number of lines removed.
    pub count: usize,
}

/// Delete lines `start..=end` (1-indexed, clamped; `end` defaults to
/// `start`).
pub fn delete_lines(path: &Path, start: usize, end: Option<usize>) -> ScourResult<LineEdit> {
    let content = read_text(path)?;
    let lines = split_lines(&content);
    let end = end.unwrap_or(start);
    let Some(range) = clamp_range(start, end, lines.len()) else {
        return Ok(LineEdit {
            start: start.max(1),
            end: end.min(lines.len()),
            count: 0,
        });
    };

    let edit = LineEdit {
        start: *range.start(),
        end: *range.end(),
        count: range.end() - range.start() + 1,
    };
    let kept: Vec<&str> = lines
        .iter()
        .enumerate()
        .filter(|(idx, _)| !range.contains(&(idx + 1)))
        .map(|(_, line)| *line)
        .collect();
    write_if_changed(path, &content, &join_lines(&kept))?;
    debug!(path = %path.display(), start = edit.start, end = edit.end, "deleted line range");
    Ok(edit)
}

/// Delete every line `matcher` accepts. Returns the number removed.
pub fn delete_matching(path: &Path, matcher: &LineMatcher) -> ScourResult<usize> {
    let content = read_text(path)?;
    let lines = split_lines(&content);
    let kept: Vec<&str> = lines
        .iter()
        .copied()
        .filter(|line| !matcher.is_match(line))
        .collect();
    let removed = lines.len() - kept.len();
    if removed > 0 {
        write_if_changed(path, &content, &join_lines(&kept))?;
    }
    debug!(path = %path.display(), removed, "deleted matching lines");
    Ok(removed)
}

/// Where an inserted block lands relative to the target line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Position {
    /// After line `n`; `n = 0` inserts at the start, past the end appends.
    After,
    /// Before line `n`, so the first inserted line becomes line `n`.
    Before,
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Position::After => write!(f, "after"),
            Position::Before => write!(f, "before"),
        }
    }
}

/// Lines added by [`insert_lines`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Insertion {
    /// Clamped anchor line: the line the block follows (`0` = start of file)
    /// for [`Position::After`], the line the block now starts at for
    /// [`Position::Before`].
    pub line: usize,
    /// Number of lines inserted.
    pub count: usize,
}

/// Insert `text` (one or more lines) at `line`.
pub fn insert_lines(
    path: &Path,
    line: usize,
    text: &str,
    position: Position,
) -> ScourResult<Insertion> {
    let content = read_text(path)?;
    let mut lines = split_lines(&content);
    let block = split_lines(text);
    let (idx, anchor) = match position {
        Position::After => {
            let idx = line.min(lines.len());
            (idx, idx)
        }
        Position::Before => {
            let idx = line.saturating_sub(1).min(lines.len());
            (idx, idx + 1)
        }
    };

    let insertion = Insertion {
        line: anchor,
        count: block.len(),
    };
    lines.splice(idx..idx, block);
    write_if_changed(path, &content, &join_lines(&lines))?;
    debug!(
        path = %path.display(),
        line = anchor,
        inserted = insertion.count,
        %position,
        "inserted lines"
    );
    Ok(insertion)
}

// ============================================================================
// Atomic Write
// ============================================================================

/// Write `updated` over `path` unless it equals `original`.
fn write_if_changed(path: &Path, original: &str, updated: &str) -> ScourResult<()> {
    if original == updated {
        return Ok(());
    }
    atomic_write(path, updated.as_bytes()).map_err(|e| ScourError::from_io(path, e))
}

/// Write content to a file atomically using a sibling temp file + rename.
///
/// Symlinks are resolved first, so the file they point to is rewritten and
/// the link itself stays in place. The temp file lives in the target's
/// directory so the rename never crosses filesystems. Permissions of an
/// existing target are preserved.
fn atomic_write(path: &Path, content: &[u8]) -> std::io::Result<()> {
    let target = match fs::canonicalize(path) {
        Ok(resolved) => resolved,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => path.to_path_buf(),
        Err(e) => return Err(e),
    };
    let dir = match target.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let permissions = fs::metadata(&target).ok().map(|m| m.permissions());

    let mut temp = NamedTempFile::new_in(dir)?;
    temp.write_all(content)?;
    temp.as_file().sync_all()?;
    if let Some(permissions) = permissions {
        fs::set_permissions(temp.path(), permissions)?;
    }
    temp.persist(&target).map_err(|e| e.error)?;
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================
