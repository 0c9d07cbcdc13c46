//! Traversal engine: ignore-aware recursive and single-level enumeration.
//!
//! Entries are enumerated depth-first with siblings sorted by file name, so
//! the enumeration order is deterministic. Each entry passes these filters:
//!
//! 1. depth (root is depth 0, its children depth 1) within `[min_depth, max_depth]`
//! 2. hidden: no root-relative component starts with `.` unless hidden is requested
//! 3. ignore rules ([`PatternSet`])
//! 4. type filter (file / dir / any; symlinks are resolved)
//!
//! The entry's root-relative path must also match `**/<pattern>`, where `*`
//! does not cross `/`. Hidden directories and directories excluded by a
//! component match are pruned, since nothing beneath them could pass.
//!
//! [`traverse`] stops after `limit` accepted entries and then sorts;
//! [`visit`] hands entries to a callback in enumeration order.

use std::fmt;
use std::fs;
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::SystemTime;

use globset::{GlobBuilder, GlobMatcher};
use serde::{Deserialize, Serialize};
use tracing::debug;
use walkdir::WalkDir;

use crate::error::{ExpectedKind, ScourError, ScourResult, Skipped};
use crate::ignore::{Exclusion, LoadOptions, PatternSet};

// ============================================================================
// Traversal Parameters
// ============================================================================

/// Entry type filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    /// Anything that is not a directory.
    #[default]
    File,
    /// Directories (including symlinks to directories).
    Dir,
    /// No type filter.
    Any,
}

impl EntryKind {
    fn accepts(self, path: &Path) -> bool {
        match self {
            EntryKind::File => !path.is_dir(),
            EntryKind::Dir => path.is_dir(),
            EntryKind::Any => true,
        }
    }
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntryKind::File => write!(f, "file"),
            EntryKind::Dir => write!(f, "dir"),
            EntryKind::Any => write!(f, "any"),
        }
    }
}

impl FromStr for EntryKind {
    type Err = ScourError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "file" | "f" => Ok(EntryKind::File),
            "dir" | "d" | "directory" => Ok(EntryKind::Dir),
            "any" | "all" => Ok(EntryKind::Any),
            other => Err(ScourError::invalid_arguments(format!(
                "unknown entry type '{}', expected file, dir, or any",
                other
            ))),
        }
    }
}

/// Final ordering of traversal results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    /// Ascending by path.
    #[default]
    Lexical,
    /// Most recently modified first; ties keep enumeration order.
    MtimeDesc,
}

/// Everything one traversal needs. Immutable while the traversal runs.
#[derive(Debug, Clone)]
pub struct TraversalSpec {
    /// Directory to enumerate.
    pub root: PathBuf,
    /// Glob matched against the root-relative path as `**/<pattern>`.
    pub pattern: String,
    /// Type filter.
    pub kind: EntryKind,
    /// Maximum accepted entries (`None` = unbounded).
    pub limit: Option<usize>,
    /// Include entries with a dot-prefixed component.
    pub include_hidden: bool,
    /// Minimum depth (root = 0).
    pub min_depth: Option<usize>,
    /// Maximum depth (root = 0).
    pub max_depth: Option<usize>,
    /// Final ordering.
    pub sort: SortOrder,
    /// How ignore files are discovered.
    pub ignore: LoadOptions,
}

impl TraversalSpec {
    /// A spec matching `pattern` under `root` with default filters.
    pub fn new(root: impl Into<PathBuf>, pattern: impl Into<String>) -> Self {
        TraversalSpec {
            root: root.into(),
            pattern: pattern.into(),
            kind: EntryKind::default(),
            limit: None,
            include_hidden: false,
            min_depth: None,
            max_depth: None,
            sort: SortOrder::default(),
            ignore: LoadOptions::default(),
        }
    }

    /// Set the type filter.
    pub fn kind(mut self, kind: EntryKind) -> Self {
        self.kind = kind;
        self
    }

    /// Cap the number of accepted entries.
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Include hidden entries.
    pub fn hidden(mut self, include_hidden: bool) -> Self {
        self.include_hidden = include_hidden;
        self
    }

    /// Set depth bounds.
    pub fn depth(mut self, min_depth: Option<usize>, max_depth: Option<usize>) -> Self {
        self.min_depth = min_depth;
        self.max_depth = max_depth;
        self
    }

    /// Set the final ordering.
    pub fn sort(mut self, sort: SortOrder) -> Self {
        self.sort = sort;
        self
    }

    /// Set ignore-file discovery options.
    pub fn ignore_options(mut self, ignore: LoadOptions) -> Self {
        self.ignore = ignore;
        self
    }
}

/// Result of a traversal.
#[derive(Debug, Clone, Default)]
pub struct Traversal {
    /// Accepted entries, in final order.
    pub entries: Vec<PathBuf>,
    /// True if the limit stopped the scan.
    pub truncated: bool,
    /// Ignore files and entries that could not be read.
    pub skipped: Vec<Skipped>,
}

// ============================================================================
// Recursive Traversal
// ============================================================================

/// Enumerate, filter, cap, and sort entries under `spec.root`.
pub fn traverse(spec: &TraversalSpec) -> ScourResult<Traversal> {
    let patterns = PatternSet::load(&spec.root, &spec.ignore);
    let mut traversal = Traversal {
        skipped: patterns.skipped().to_vec(),
        ..Traversal::default()
    };

    ensure_dir(&spec.root)?;
    if spec.limit == Some(0) {
        return Ok(traversal);
    }

    let limit = spec.limit;
    let entries = &mut traversal.entries;
    let mut truncated = false;
    let walk_skipped = visit(spec, &patterns, |path| {
        entries.push(path.to_path_buf());
        if limit.is_some_and(|l| entries.len() >= l) {
            truncated = true;
            ControlFlow::Break(())
        } else {
            ControlFlow::Continue(())
        }
    })?;
    traversal.truncated = truncated;
    traversal.skipped.extend(walk_skipped);

    match spec.sort {
        SortOrder::Lexical => traversal.entries.sort(),
        SortOrder::MtimeDesc => sort_by_mtime_desc(&mut traversal.entries),
    }

    debug!(
        root = %spec.root.display(),
        pattern = %spec.pattern,
        accepted = traversal.entries.len(),
        truncated = traversal.truncated,
        "traversal complete"
    );
    Ok(traversal)
}

/// Walk `spec.root` and call `on_match` for each accepted entry, in
/// enumeration order, until it returns `Break`.
///
/// `spec.limit` and `spec.sort` are ignored; callers that need them use
/// [`traverse`]. Returns the entries that could not be read.
pub fn visit<F>(
    spec: &TraversalSpec,
    patterns: &PatternSet,
    mut on_match: F,
) -> ScourResult<Vec<Skipped>>
where
    F: FnMut(&Path) -> ControlFlow<()>,
{
    ensure_dir(&spec.root)?;
    let glob = compile_recursive(&spec.pattern)?;
    let root = spec.root.as_path();
    let mut skipped = Vec::new();

    let mut walker = WalkDir::new(root)
        .min_depth(1)
        .follow_links(false)
        .sort_by_file_name();
    if let Some(max_depth) = spec.max_depth {
        walker = walker.max_depth(max_depth);
    }

    let mut it = walker.into_iter();
    while let Some(next) = it.next() {
        let entry = match next {
            Ok(entry) => entry,
            Err(err) => {
                let path = err
                    .path()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| root.to_path_buf());
                debug!("skipping unreadable entry {}: {}", path.display(), err);
                skipped.push(Skipped::new(path, err));
                continue;
            }
        };

        let path = entry.path();
        let is_dir = entry.file_type().is_dir();

        if !spec.include_hidden && is_hidden(entry.file_name()) {
            if is_dir {
                it.skip_current_dir();
            }
            continue;
        }

        let relative = relative_slash_path(path, root);
        let glob_hit = glob.is_match(&relative);

        let exclusion = if is_dir || glob_hit {
            patterns.exclusion(path, root)
        } else {
            None
        };
        if exclusion == Some(Exclusion::Component) && is_dir {
            it.skip_current_dir();
            continue;
        }
        if !glob_hit || exclusion.is_some() {
            continue;
        }

        let depth = entry.depth();
        if spec.min_depth.is_some_and(|min| depth < min) {
            continue;
        }
        if spec.max_depth.is_some_and(|max| depth > max) {
            continue;
        }

        if !spec.kind.accepts(path) {
            continue;
        }

        if on_match(path).is_break() {
            break;
        }
    }

    Ok(skipped)
}

// ============================================================================
// Single-Level Listing
// ============================================================================

/// List one directory level, applying the hidden (file name) and ignore
/// rules. Both files and directories are returned, sorted by path.
///
/// `pattern` is matched against entry names, so it may not contain a path
/// separator.
pub fn list_dir(
    root: &Path,
    pattern: &str,
    include_hidden: bool,
    ignore: &LoadOptions,
) -> ScourResult<Traversal> {
    if pattern.contains('/') || pattern.contains(std::path::MAIN_SEPARATOR) {
        return Err(ScourError::invalid_arguments(format!(
            "glob pattern '{}' spans directories; use find for nested matches",
            pattern
        )));
    }
    ensure_dir(root)?;
    let glob = compile_glob(pattern)?;
    let patterns = PatternSet::load(root, ignore);
    let mut traversal = Traversal {
        skipped: patterns.skipped().to_vec(),
        ..Traversal::default()
    };

    let read_dir = fs::read_dir(root).map_err(|e| ScourError::from_io(root, e))?;
    for item in read_dir {
        let entry = match item {
            Ok(entry) => entry,
            Err(err) => {
                traversal.skipped.push(Skipped::new(root, err));
                continue;
            }
        };
        let name = entry.file_name();
        if !include_hidden && is_hidden(&name) {
            continue;
        }
        if !glob.is_match(Path::new(&name)) {
            continue;
        }
        let path = entry.path();
        if patterns.is_excluded(&path, root) {
            continue;
        }
        traversal.entries.push(path);
    }

    traversal.entries.sort();
    Ok(traversal)
}

// ============================================================================
// Helpers
// ============================================================================

fn ensure_dir(root: &Path) -> ScourResult<()> {
    let metadata = fs::metadata(root).map_err(|e| ScourError::from_io(root, e))?;
    if !metadata.is_dir() {
        return Err(ScourError::TypeMismatch {
            path: root.to_path_buf(),
            expected: ExpectedKind::Directory,
        });
    }
    Ok(())
}

fn is_hidden(name: &std::ffi::OsStr) -> bool {
    name.to_string_lossy().starts_with('.')
}

/// Root-relative path with `/` separators.
fn relative_slash_path(path: &Path, root: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    let text = relative.to_string_lossy();
    if std::path::MAIN_SEPARATOR == '/' {
        text.into_owned()
    } else {
        text.replace(std::path::MAIN_SEPARATOR, "/")
    }
}

/// Compile a traversal glob (`*` stays within one path segment).
fn compile_glob(pattern: &str) -> ScourResult<GlobMatcher> {
    GlobBuilder::new(pattern)
        .literal_separator(true)
        .build()
        .map(|g| g.compile_matcher())
        .map_err(|e| ScourError::invalid_pattern(pattern, e))
}

/// Compile `pattern` so it matches at any depth.
fn compile_recursive(pattern: &str) -> ScourResult<GlobMatcher> {
    let mut trimmed = pattern;
    while let Some(rest) = trimmed.strip_prefix("**/") {
        trimmed = rest;
    }
    if trimmed.is_empty() || trimmed == "**" {
        return compile_glob("**");
    }
    compile_glob(&format!("**/{trimmed}")).map_err(|e| match e {
        ScourError::InvalidPattern { message, .. } => ScourError::invalid_pattern(pattern, message),
        other => other,
    })
}

fn sort_by_mtime_desc(entries: &mut Vec<PathBuf>) {
    let mut keyed: Vec<(SystemTime, PathBuf)> = entries
        .drain(..)
        .map(|p| {
            let mtime = fs::metadata(&p)
                .and_then(|m| m.modified())
                .unwrap_or(SystemTime::UNIX_EPOCH);
            (mtime, p)
        })
        .collect();
    // Stable: equal mtimes keep enumeration order.
    keyed.sort_by(|a, b| b.0.cmp(&a.0));
    entries.extend(keyed.into_iter().map(|(_, p)| p));
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::TempDir;

    /// Build a small tree:
    ///
    /// ```text
    /// root/
    ///   a.txt
    ///   b.rs
    ///   .hidden.txt
    ///   .cfg/inner.txt
    ///   sub/c.txt
    ///   sub/deeper/d.txt
    ///   a/node_modules/x.txt
    /// ```
    fn fixture() -> TempDir {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        fs::write(root.join("a.txt"), "a\n").unwrap();
        fs::write(root.join("b.rs"), "fn b() {}\n").unwrap();
        fs::write(root.join(".hidden.txt"), "h\n").unwrap();
        fs::create_dir_all(root.join(".cfg")).unwrap();
        fs::write(root.join(".cfg").join("inner.txt"), "i\n").unwrap();
        fs::create_dir_all(root.join("sub").join("deeper")).unwrap();
        fs::write(root.join("sub").join("c.txt"), "c\n").unwrap();
        fs::write(root.join("sub").join("deeper").join("d.txt"), "d\n").unwrap();
        fs::create_dir_all(root.join("a").join("node_modules")).unwrap();
        fs::write(root.join("a").join("node_modules").join("x.txt"), "x\n").unwrap();
        dir
    }

    fn names(traversal: &Traversal, root: &Path) -> Vec<String> {
        traversal
            .entries
            .iter()
            .map(|p| relative_slash_path(p, root))
            .collect()
    }

    #[test]
    fn finds_files_recursively_sorted() {
        let dir = fixture();
        let spec = TraversalSpec::new(dir.path(), "*.txt");
        let result = traverse(&spec).unwrap();
        assert_eq!(
            names(&result, dir.path()),
            vec!["a.txt", "sub/c.txt", "sub/deeper/d.txt"]
        );
        assert!(!result.truncated);
    }

    #[test]
    fn hidden_entries_need_opt_in() {
        let dir = fixture();
        let spec = TraversalSpec::new(dir.path(), "*.txt").hidden(true);
        let found = names(&traverse(&spec).unwrap(), dir.path());
        assert!(found.contains(&".hidden.txt".to_string()));
        assert!(found.contains(&".cfg/inner.txt".to_string()));
    }

    #[test]
    fn node_modules_excluded_for_files_and_dirs() {
        let dir = fixture();
        let files = traverse(&TraversalSpec::new(dir.path(), "*")).unwrap();
        assert!(!names(&files, dir.path()).iter().any(|n| n.contains("node_modules")));

        let dirs = traverse(&TraversalSpec::new(dir.path(), "*").kind(EntryKind::Dir)).unwrap();
        let dir_names = names(&dirs, dir.path());
        assert!(dir_names.contains(&"a".to_string()));
        assert!(!dir_names.iter().any(|n| n.contains("node_modules")));
    }

    #[test]
    fn depth_bounds_are_relative_to_root() {
        let dir = fixture();
        let spec = TraversalSpec::new(dir.path(), "*.txt").depth(Some(2), Some(2));
        assert_eq!(names(&traverse(&spec).unwrap(), dir.path()), vec!["sub/c.txt"]);

        let shallow = TraversalSpec::new(dir.path(), "*.txt").depth(None, Some(1));
        assert_eq!(names(&traverse(&shallow).unwrap(), dir.path()), vec!["a.txt"]);
    }

    #[test]
    fn limit_caps_matches_and_marks_truncation() {
        let dir = fixture();
        let spec = TraversalSpec::new(dir.path(), "*.txt").limit(2);
        let result = traverse(&spec).unwrap();
        assert_eq!(result.entries.len(), 2);
        assert!(result.truncated);

        let none = traverse(&TraversalSpec::new(dir.path(), "*.txt").limit(0)).unwrap();
        assert!(none.entries.is_empty());
    }

    #[test]
    fn lowering_limit_keeps_prefix() {
        let dir = fixture();
        let full = traverse(&TraversalSpec::new(dir.path(), "*").kind(EntryKind::Any)).unwrap();
        assert!(full.entries.len() > 3);
        for limit in 1..full.entries.len() {
            let capped =
                traverse(&TraversalSpec::new(dir.path(), "*").kind(EntryKind::Any).limit(limit))
                    .unwrap();
            assert_eq!(capped.entries, full.entries[..limit].to_vec());
        }
    }

    #[test]
    fn pattern_with_directory_segment() {
        let dir = fixture();
        let spec = TraversalSpec::new(dir.path(), "deeper/*.txt");
        assert_eq!(
            names(&traverse(&spec).unwrap(), dir.path()),
            vec!["sub/deeper/d.txt"]
        );
    }

    #[test]
    fn gitignore_rules_apply() {
        let dir = fixture();
        fs::write(dir.path().join(".gitignore"), "sub\n").unwrap();
        let spec = TraversalSpec::new(dir.path(), "*.txt");
        assert_eq!(names(&traverse(&spec).unwrap(), dir.path()), vec!["a.txt"]);
    }

    #[test]
    fn mtime_sort_newest_first() {
        let dir = TempDir::new().unwrap();
        let old = dir.path().join("old.txt");
        let new = dir.path().join("new.txt");
        fs::write(&old, "o").unwrap();
        fs::write(&new, "n").unwrap();
        let base = SystemTime::now();
        fs::File::options()
            .write(true)
            .open(&old)
            .unwrap()
            .set_modified(base - Duration::from_secs(3600))
            .unwrap();
        fs::File::options()
            .write(true)
            .open(&new)
            .unwrap()
            .set_modified(base)
            .unwrap();

        let spec = TraversalSpec::new(dir.path(), "*.txt").sort(SortOrder::MtimeDesc);
        assert_eq!(names(&traverse(&spec).unwrap(), dir.path()), vec!["new.txt", "old.txt"]);
    }

    #[test]
    fn missing_root_is_not_found() {
        let spec = TraversalSpec::new("/definitely/not/here", "*");
        assert!(matches!(traverse(&spec), Err(ScourError::NotFound { .. })));
    }

    #[test]
    fn file_root_is_type_mismatch() {
        let dir = fixture();
        let spec = TraversalSpec::new(dir.path().join("a.txt"), "*");
        assert!(matches!(
            traverse(&spec),
            Err(ScourError::TypeMismatch {
                expected: ExpectedKind::Directory,
                ..
            })
        ));
    }

    #[test]
    fn malformed_glob_is_invalid_pattern() {
        let dir = fixture();
        let spec = TraversalSpec::new(dir.path(), "[oops");
        assert!(matches!(traverse(&spec), Err(ScourError::InvalidPattern { .. })));
    }

    #[test]
    fn visit_stops_on_break() {
        let dir = fixture();
        let spec = TraversalSpec::new(dir.path(), "*.txt");
        let patterns = PatternSet::load(dir.path(), &spec.ignore);
        let mut seen = Vec::new();
        visit(&spec, &patterns, |p| {
            seen.push(p.to_path_buf());
            ControlFlow::Break(())
        })
        .unwrap();
        assert_eq!(seen.len(), 1);
    }

    #[test]
    fn list_dir_is_single_level() {
        let dir = fixture();
        let result = list_dir(dir.path(), "*", false, &LoadOptions::default()).unwrap();
        assert_eq!(names(&result, dir.path()), vec!["a", "a.txt", "b.rs", "sub"]);

        let txt = list_dir(dir.path(), "*.txt", true, &LoadOptions::default()).unwrap();
        assert_eq!(names(&txt, dir.path()), vec![".hidden.txt", "a.txt"]);
    }

    #[test]
    fn list_dir_rejects_separators() {
        let dir = fixture();
        let err = list_dir(dir.path(), "sub/*.txt", false, &LoadOptions::default()).unwrap_err();
        assert!(matches!(err, ScourError::InvalidArguments { .. }));
    }

    #[test]
    fn entry_kind_parses() {
        assert_eq!("dir".parse::<EntryKind>().unwrap(), EntryKind::Dir);
        assert_eq!("any".parse::<EntryKind>().unwrap(), EntryKind::Any);
        assert!("socket".parse::<EntryKind>().is_err());
    }
}
