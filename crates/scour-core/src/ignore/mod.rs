//! Ignore rules: loading `.gitignore`-style patterns and matching paths.
//!
//! This module implements the exclusion semantics shared by every traversal,
//! search, and batch mutation. It supports the common pattern forms only:
//!
//! - Blank lines and `#` comments are skipped
//! - `/pattern` is anchored to the directory holding the ignore file
//! - Any other pattern applies anywhere: to the relative path, to any
//!   relative-path suffix, or to any single path component
//! - A trailing `/` is dropped (the pattern then matches entries of any type)
//! - Negation (`!pattern`) is not supported; such lines are skipped
//! - Built-in patterns for `.git` and `node_modules` always apply
//!
//! Glob syntax is shell-style (`*`, `?`, `[...]`); `*` may cross `/`.
//!
//! ## Usage
//!
//! ```no_run
//! use scour_core::ignore::{LoadOptions, PatternSet};
//! use std::path::Path;
//!
//! let base = Path::new(".");
//! let patterns = PatternSet::load(base, &LoadOptions::default());
//! let excluded = patterns.is_excluded(Path::new("./node_modules/x.js"), base);
//! assert!(excluded);
//! ```

mod loader;
mod matcher;

use std::path::PathBuf;

use globset::{GlobBuilder, GlobMatcher};

use crate::error::{ScourError, ScourResult, Skipped};

pub use loader::{LoadOptions, BUILTIN_PATTERNS, DEFAULT_IGNORE_FILE, MAX_ANCESTOR_LEVELS};
pub use matcher::Exclusion;

/// How an ignore pattern is applied to a candidate path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchMode {
    /// Matches the relative path, any relative-path suffix, or any component.
    Anywhere,
    /// Matches the absolute or relative path directly.
    Anchored,
}

/// A single compiled ignore pattern.
#[derive(Debug, Clone)]
pub struct IgnorePattern {
    glob: String,
    mode: MatchMode,
    /// The glob as written (anywhere) or the absolute glob (anchored).
    direct: GlobMatcher,
    /// `**/<glob>`, only for anywhere patterns.
    deep: Option<GlobMatcher>,
}

impl IgnorePattern {
    /// Compile a pattern that applies anywhere under the base directory.
    pub fn anywhere(glob: &str) -> ScourResult<Self> {
        Ok(IgnorePattern {
            glob: glob.to_string(),
            mode: MatchMode::Anywhere,
            direct: compile(glob)?,
            deep: Some(compile(&format!("**/{glob}"))?),
        })
    }

    /// Compile a pattern anchored to an absolute location.
    pub fn anchored(glob: &str) -> ScourResult<Self> {
        Ok(IgnorePattern {
            glob: glob.to_string(),
            mode: MatchMode::Anchored,
            direct: compile(glob)?,
            deep: None,
        })
    }

    /// The glob text (without the anywhere marker).
    pub fn glob(&self) -> &str {
        &self.glob
    }

    /// The matching mode.
    pub fn mode(&self) -> MatchMode {
        self.mode
    }
}

/// Ordered set of ignore patterns built fresh for one call.
///
/// Exclusion is the logical OR of all patterns. The set also carries the
/// ignore files or lines the loader could not use.
#[derive(Debug, Clone, Default)]
pub struct PatternSet {
    patterns: Vec<IgnorePattern>,
    skipped: Vec<Skipped>,
    ignore_files: Vec<PathBuf>,
}

impl PatternSet {
    /// An empty set (nothing is excluded).
    pub fn empty() -> Self {
        PatternSet::default()
    }

    /// Append a pattern.
    pub fn push(&mut self, pattern: IgnorePattern) {
        self.patterns.push(pattern);
    }

    /// All patterns, in load order.
    pub fn patterns(&self) -> &[IgnorePattern] {
        &self.patterns
    }

    /// Ignore files or lines that were skipped while loading.
    pub fn skipped(&self) -> &[Skipped] {
        &self.skipped
    }

    /// Ignore files that contributed patterns, nearest first.
    pub fn ignore_files(&self) -> &[PathBuf] {
        &self.ignore_files
    }

    /// Number of patterns.
    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    /// True if the set has no patterns.
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    fn has_anchored(&self) -> bool {
        self.patterns.iter().any(|p| p.mode == MatchMode::Anchored)
    }
}

/// Compile a shell glob with fnmatch-style semantics (`*` crosses `/`).
fn compile(glob: &str) -> ScourResult<GlobMatcher> {
    GlobBuilder::new(glob)
        .literal_separator(false)
        .build()
        .map(|g| g.compile_matcher())
        .map_err(|e| ScourError::invalid_pattern(glob, e))
}
