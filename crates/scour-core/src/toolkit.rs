//! The exposed operations.
//!
//! [`Toolkit`] binds the engines to a [`StatusSink`] and a resolved
//! [`ToolkitConfig`]. Every successful call emits exactly one status event;
//! failed calls emit nothing and return the error.
//!
//! | Operation | Engine | Result |
//! |-----------|--------|--------|
//! | `find` | [`walk::traverse`] | paths |
//! | `glob_files` | [`walk::list_dir`] | paths |
//! | `grep` | [`search::grep_file`] | line hits |
//! | `rgrep` | [`search::grep_tree`] | [`RgrepReport`] |
//! | `replace`, `sed` | [`mutate::replace_in_file`] | count |
//! | `rsed` | [`mutate::replace_in_tree`] | [`BatchReport`] |
//! | `lines` | [`mutate::extract_lines`] | text |
//! | `delete_lines`, `delete_matching` | [`mutate`] | count |
//! | `insert_at` | [`mutate::insert_lines`] | path |

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::{json, Value};
use tracing::debug;

use crate::config::ToolkitConfig;
use crate::error::{ScourError, ScourResult, Skipped};
use crate::event::{StatusEvent, StatusSink};
use crate::mutate::{self, BatchReport, Position, RegexFlags, Substitution};
use crate::search::{self, LineHit, LineMatcher, RgrepReport};
use crate::text::truncate_chars;
use crate::walk::{self, EntryKind, SortOrder, TraversalSpec};

const MATCH_PREVIEW: usize = 20;
const HIT_PREVIEW: usize = 10;
const GREP_TEXT_PREVIEW: usize = 100;
const RGREP_TEXT_PREVIEW: usize = 80;
const LINES_PREVIEW: usize = 500;

// ============================================================================
// Options
// ============================================================================

/// Options for [`Toolkit::find`].
#[derive(Debug, Clone, Default)]
pub struct FindOptions {
    /// Entry type filter.
    pub kind: EntryKind,
    /// Result cap; `None` uses the configured default.
    pub limit: Option<usize>,
    /// Include dot-prefixed entries.
    pub hidden: bool,
    /// Final ordering.
    pub sort: SortOrder,
    /// Maximum depth (root = 0).
    pub max_depth: Option<usize>,
    /// Minimum depth (root = 0).
    pub min_depth: Option<usize>,
}

/// Options for [`Toolkit::grep`].
#[derive(Debug, Clone, Copy, Default)]
pub struct GrepOptions {
    pub ignore_case: bool,
    /// Treat the pattern as a substring instead of a regex.
    pub literal: bool,
    /// Lines of context on each side of a match.
    pub context: usize,
}

/// Options for [`Toolkit::rgrep`].
#[derive(Debug, Clone)]
pub struct RgrepOptions {
    /// File glob, matched at any depth.
    pub glob: String,
    pub ignore_case: bool,
    pub literal: bool,
    /// Hit cap; `None` uses the configured default.
    pub limit: Option<usize>,
    pub hidden: bool,
}

impl Default for RgrepOptions {
    fn default() -> Self {
        RgrepOptions {
            glob: "*".to_string(),
            ignore_case: false,
            literal: false,
            limit: None,
            hidden: false,
        }
    }
}

/// Options for [`Toolkit::rsed`].
#[derive(Debug, Clone)]
pub struct RsedOptions {
    /// File glob, matched at any depth.
    pub glob: String,
    pub flags: RegexFlags,
    pub hidden: bool,
}

impl Default for RsedOptions {
    fn default() -> Self {
        RsedOptions {
            glob: "*".to_string(),
            flags: RegexFlags::default(),
            hidden: false,
        }
    }
}

// ============================================================================
// Toolkit
// ============================================================================

/// Entry point for every operation.
pub struct Toolkit<'a> {
    sink: &'a dyn StatusSink,
    config: ToolkitConfig,
}

impl<'a> Toolkit<'a> {
    /// Create a toolkit reporting to `sink`.
    pub fn new(sink: &'a dyn StatusSink, config: ToolkitConfig) -> Self {
        Toolkit { sink, config }
    }

    /// The resolved configuration.
    pub fn config(&self) -> &ToolkitConfig {
        &self.config
    }

    fn emit(&self, event: StatusEvent) {
        self.sink.emit(&event);
    }

    // ------------------------------------------------------------------------
    // Search
    // ------------------------------------------------------------------------

    /// Recursive ignore-aware find. Returned paths are absolute.
    ///
    /// Ignore files and entries that could not be read are counted in the
    /// event's `skipped` field and logged at debug level.
    pub fn find(
        &self,
        pattern: &str,
        path: &Path,
        options: &FindOptions,
    ) -> ScourResult<Vec<PathBuf>> {
        let root = fs::canonicalize(path).map_err(|e| ScourError::from_io(path, e))?;
        let limit = options.limit.unwrap_or(self.config.find_limit.value);
        let spec = TraversalSpec::new(&root, pattern)
            .kind(options.kind)
            .limit(limit)
            .hidden(options.hidden)
            .depth(options.min_depth, options.max_depth)
            .sort(options.sort)
            .ignore_options(self.config.load_options());
        let traversal = walk::traverse(&spec)?;
        log_skipped("find", &traversal.skipped);

        self.emit(
            StatusEvent::new("find")
                .with("pattern", pattern)
                .with("path", root.display().to_string())
                .with("count", traversal.entries.len())
                .with("matches", path_preview(&traversal.entries))
                .with("skipped", traversal.skipped.len()),
        );
        Ok(traversal.entries)
    }

    /// Single-level ignore-aware glob. The pattern names entries directly
    /// under `path` and may not contain `/`.
    pub fn glob_files(
        &self,
        pattern: &str,
        path: &Path,
        hidden: bool,
    ) -> ScourResult<Vec<PathBuf>> {
        let listing = walk::list_dir(path, pattern, hidden, &self.config.load_options())?;
        log_skipped("glob", &listing.skipped);

        self.emit(
            StatusEvent::new("glob")
                .with("pattern", pattern)
                .with("path", path.display().to_string())
                .with("count", listing.entries.len())
                .with("matches", path_preview(&listing.entries))
                .with("skipped", listing.skipped.len()),
        );
        Ok(listing.entries)
    }

    /// Search one file.
    pub fn grep(
        &self,
        pattern: &str,
        path: &Path,
        options: GrepOptions,
    ) -> ScourResult<Vec<LineHit>> {
        let matcher = LineMatcher::new(pattern, options.literal, options.ignore_case)?;
        let outcome = search::grep_file(path, &matcher, options.context)?;

        let preview: Vec<Value> = outcome
            .hits
            .iter()
            .take(HIT_PREVIEW)
            .map(|h| json!({ "line": h.line, "text": truncate_chars(&h.text, GREP_TEXT_PREVIEW) }))
            .collect();
        self.emit(
            StatusEvent::new("grep")
                .with("pattern", pattern)
                .with("path", path.display().to_string())
                .with("count", outcome.matched)
                .with("hits", preview),
        );
        Ok(outcome.hits)
    }

    /// Search every file under `path` matching `options.glob`.
    pub fn rgrep(
        &self,
        pattern: &str,
        path: &Path,
        options: &RgrepOptions,
    ) -> ScourResult<RgrepReport> {
        let matcher = LineMatcher::new(pattern, options.literal, options.ignore_case)?;
        let limit = options.limit.unwrap_or(self.config.rgrep_limit.value);
        let spec = TraversalSpec::new(path, options.glob.as_str())
            .hidden(options.hidden)
            .ignore_options(self.config.load_options());
        let report = search::grep_tree(&spec, &matcher, limit)?;

        let preview: Vec<Value> = report
            .hits
            .iter()
            .take(HIT_PREVIEW)
            .map(|h| {
                json!({
                    "file": h.file.display().to_string(),
                    "line": h.line,
                    "text": truncate_chars(&h.text, RGREP_TEXT_PREVIEW),
                })
            })
            .collect();
        self.emit(
            StatusEvent::new("rgrep")
                .with("pattern", pattern)
                .with("path", path.display().to_string())
                .with("count", report.hits.len())
                .with("hits", preview),
        );
        Ok(report)
    }

    // ------------------------------------------------------------------------
    // Find/Replace
    // ------------------------------------------------------------------------

    /// Replace text in one file, literally or as a regex.
    pub fn replace(
        &self,
        path: &Path,
        pattern: &str,
        repl: &str,
        regex: bool,
    ) -> ScourResult<usize> {
        let substitution = Substitution::new(pattern, regex, RegexFlags::default())?;
        let count = mutate::replace_in_file(path, &substitution, repl)?;

        self.emit(
            StatusEvent::new("replace")
                .with("path", path.display().to_string())
                .with("count", count),
        );
        Ok(count)
    }

    /// Regex replace in one file.
    pub fn sed(
        &self,
        path: &Path,
        pattern: &str,
        repl: &str,
        flags: RegexFlags,
    ) -> ScourResult<usize> {
        let substitution = Substitution::new(pattern, true, flags)?;
        let count = mutate::replace_in_file(path, &substitution, repl)?;

        self.emit(
            StatusEvent::new("sed")
                .with("path", path.display().to_string())
                .with("count", count),
        );
        Ok(count)
    }

    /// Regex replace across every file under `path` matching `options.glob`.
    pub fn rsed(
        &self,
        pattern: &str,
        repl: &str,
        path: &Path,
        options: &RsedOptions,
    ) -> ScourResult<BatchReport> {
        let substitution = Substitution::new(pattern, true, options.flags)?;
        let spec = TraversalSpec::new(path, options.glob.as_str())
            .hidden(options.hidden)
            .ignore_options(self.config.load_options());
        let report = mutate::replace_in_tree(&spec, &substitution, repl)?;

        let changed: Vec<Value> = report
            .changed
            .iter()
            .map(|c| json!({ "file": c.file.display().to_string(), "count": c.count }))
            .collect();
        self.emit(
            StatusEvent::new("rsed")
                .with("path", path.display().to_string())
                .with("count", report.total)
                .with("files", report.files_changed)
                .with("changed", changed)
                .with("skipped", report.skipped.len()),
        );
        Ok(report)
    }

    // ------------------------------------------------------------------------
    // Line ops
    // ------------------------------------------------------------------------

    /// Lines `start..=end` (1-indexed, inclusive) joined with `\n`.
    pub fn lines(&self, path: &Path, start: usize, end: Option<usize>) -> ScourResult<String> {
        let slice = mutate::extract_lines(path, start, end)?;

        self.emit(
            StatusEvent::new("lines")
                .with("path", path.display().to_string())
                .with("start", slice.start)
                .with("end", slice.end)
                .with("count", slice.count)
                .with("preview", truncate_chars(&slice.text, LINES_PREVIEW)),
        );
        Ok(slice.text)
    }

    /// Delete lines `start..=end`; `end` defaults to `start`. The event
    /// reports the clamped range.
    pub fn delete_lines(
        &self,
        path: &Path,
        start: usize,
        end: Option<usize>,
    ) -> ScourResult<usize> {
        let edit = mutate::delete_lines(path, start, end)?;

        self.emit(
            StatusEvent::new("delete_lines")
                .with("path", path.display().to_string())
                .with("start", edit.start)
                .with("end", edit.end)
                .with("count", edit.count),
        );
        Ok(edit.count)
    }

    /// Delete lines matching `pattern` (regex, or substring when `regex` is false).
    pub fn delete_matching(&self, path: &Path, pattern: &str, regex: bool) -> ScourResult<usize> {
        let matcher = LineMatcher::new(pattern, !regex, false)?;
        let count = mutate::delete_matching(path, &matcher)?;

        self.emit(
            StatusEvent::new("delete_matching")
                .with("path", path.display().to_string())
                .with("pattern", pattern)
                .with("count", count),
        );
        Ok(count)
    }

    /// Insert `text` after (or before) line `line`. Returns the file path.
    /// The event reports the clamped anchor line.
    pub fn insert_at(
        &self,
        path: &Path,
        line: usize,
        text: &str,
        after: bool,
    ) -> ScourResult<PathBuf> {
        let position = if after { Position::After } else { Position::Before };
        let insertion = mutate::insert_lines(path, line, text, position)?;

        self.emit(
            StatusEvent::new("insert_at")
                .with("path", path.display().to_string())
                .with("line", insertion.line)
                .with("lines_inserted", insertion.count)
                .with("position", position.to_string()),
        );
        Ok(path.to_path_buf())
    }
}

fn path_preview(paths: &[PathBuf]) -> Vec<Value> {
    paths
        .iter()
        .take(MATCH_PREVIEW)
        .map(|p| Value::String(p.display().to_string()))
        .collect()
}

fn log_skipped(op: &str, skipped: &[Skipped]) {
    for item in skipped {
        debug!("{} skipped {}: {}", op, item.path.display(), item.reason);
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CliOverrides, ToolkitConfig};
    use crate::event::RecordingSink;
    use tempfile::TempDir;

    fn config() -> ToolkitConfig {
        ToolkitConfig::resolve_with(|_| None, &CliOverrides::default())
    }

    fn write(dir: &TempDir, rel: &str, content: &str) -> PathBuf {
        let path = dir.path().join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn find_returns_absolute_paths_and_emits() {
        let dir = TempDir::new().unwrap();
        write(&dir, "a.rs", "");
        write(&dir, "src/b.rs", "");
        let sink = RecordingSink::new();
        let kit = Toolkit::new(&sink, config());

        let found = kit.find("*.rs", dir.path(), &FindOptions::default()).unwrap();
        assert_eq!(found.len(), 2);
        assert!(found.iter().all(|p| p.is_absolute()));

        let event = sink.last().unwrap();
        assert_eq!(event.op, "find");
        assert_eq!(event.get("count"), Some(&json!(2)));
        assert_eq!(event.get("matches").unwrap().as_array().unwrap().len(), 2);
    }

    #[test]
    fn find_limit_defaults_from_config() {
        let dir = TempDir::new().unwrap();
        for n in 0..5 {
            write(&dir, &format!("f{n}.txt"), "");
        }
        let sink = RecordingSink::new();
        let overrides = CliOverrides {
            find_limit: Some(3),
            ..Default::default()
        };
        let kit = Toolkit::new(&sink, ToolkitConfig::resolve_with(|_| None, &overrides));
        assert_eq!(kit.find("*.txt", dir.path(), &FindOptions::default()).unwrap().len(), 3);

        let explicit = FindOptions {
            limit: Some(1),
            ..Default::default()
        };
        assert_eq!(kit.find("*.txt", dir.path(), &explicit).unwrap().len(), 1);
    }

    #[test]
    fn find_preview_is_bounded() {
        let dir = TempDir::new().unwrap();
        for n in 0..25 {
            write(&dir, &format!("f{n:02}.txt"), "");
        }
        let sink = RecordingSink::new();
        let kit = Toolkit::new(&sink, config());
        assert_eq!(kit.find("*.txt", dir.path(), &FindOptions::default()).unwrap().len(), 25);
        let event = sink.last().unwrap();
        assert_eq!(event.get("count"), Some(&json!(25)));
        assert_eq!(event.get("matches").unwrap().as_array().unwrap().len(), MATCH_PREVIEW);
    }

    #[test]
    fn grep_event_counts_matched_lines_only() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "f.txt", "a\nb\nhit\nc\nd\n");
        let sink = RecordingSink::new();
        let kit = Toolkit::new(&sink, config());

        let options = GrepOptions {
            context: 1,
            ..Default::default()
        };
        let hits = kit.grep("hit", &path, options).unwrap();
        assert_eq!(hits.iter().map(|h| h.line).collect::<Vec<_>>(), vec![2, 3, 4]);
        let event = sink.last().unwrap();
        assert_eq!(event.get("count"), Some(&json!(1)));
        assert_eq!(event.get("hits").unwrap().as_array().unwrap().len(), 3);
    }

    #[test]
    fn grep_truncates_preview_text() {
        let dir = TempDir::new().unwrap();
        let long = "x".repeat(300);
        let path = write(&dir, "f.txt", &format!("{long}\n"));
        let sink = RecordingSink::new();
        let kit = Toolkit::new(&sink, config());
        kit.grep("x", &path, GrepOptions::default()).unwrap();
        let event = sink.last().unwrap();
        let text = event.get("hits").unwrap()[0]["text"].as_str().unwrap().to_string();
        assert_eq!(text.len(), GREP_TEXT_PREVIEW);
    }

    #[test]
    fn rgrep_uses_configured_limit() {
        let dir = TempDir::new().unwrap();
        write(&dir, "a.txt", "hit\nhit\nhit\n");
        let sink = RecordingSink::new();
        let overrides = CliOverrides {
            rgrep_limit: Some(2),
            ..Default::default()
        };
        let kit = Toolkit::new(&sink, ToolkitConfig::resolve_with(|_| None, &overrides));
        let report = kit.rgrep("hit", dir.path(), &RgrepOptions::default()).unwrap();
        assert_eq!(report.hits.len(), 2);
        assert_eq!(sink.last().unwrap().get("count"), Some(&json!(2)));
    }

    #[test]
    fn replace_literal_and_sed() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "f.txt", "a.b a.b\n");
        let sink = RecordingSink::new();
        let kit = Toolkit::new(&sink, config());

        assert_eq!(kit.replace(&path, "a.b", "c", false).unwrap(), 2);
        assert_eq!(fs::read_to_string(&path).unwrap(), "c c\n");
        assert_eq!(kit.sed(&path, "C", "d", "i".parse().unwrap()).unwrap(), 2);
        assert_eq!(fs::read_to_string(&path).unwrap(), "d d\n");

        let ops: Vec<String> = sink.events().into_iter().map(|e| e.op).collect();
        assert_eq!(ops, vec!["replace", "sed"]);
    }

    #[test]
    fn rsed_event_reports_batch() {
        let dir = TempDir::new().unwrap();
        write(&dir, "a.py", "old = 1\n");
        write(&dir, "b.py", "new = 1\n");
        let sink = RecordingSink::new();
        let kit = Toolkit::new(&sink, config());

        let options = RsedOptions {
            glob: "*.py".to_string(),
            ..Default::default()
        };
        let report = kit.rsed("old", "new", dir.path(), &options).unwrap();
        assert_eq!(report.total, 1);
        let event = sink.last().unwrap();
        assert_eq!(event.get("files"), Some(&json!(1)));
        assert_eq!(event.get("changed").unwrap().as_array().unwrap().len(), 1);
    }

    #[test]
    fn line_ops_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "f.txt", "1\n2\n3\n4\n");
        let sink = RecordingSink::new();
        let kit = Toolkit::new(&sink, config());

        let removed = kit.lines(&path, 2, Some(3)).unwrap();
        assert_eq!(kit.delete_lines(&path, 2, Some(3)).unwrap(), 2);
        assert_eq!(kit.insert_at(&path, 1, &removed, true).unwrap(), path);
        assert_eq!(fs::read_to_string(&path).unwrap(), "1\n2\n3\n4\n");

        let event = sink.last().unwrap();
        assert_eq!(event.op, "insert_at");
        assert_eq!(event.get("position"), Some(&json!("after")));
        assert_eq!(event.get("lines_inserted"), Some(&json!(2)));
    }

    #[test]
    fn delete_matching_literal_mode() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "f.txt", "a.b\naxb\n");
        let sink = RecordingSink::new();
        let kit = Toolkit::new(&sink, config());
        assert_eq!(kit.delete_matching(&path, "a.b", false).unwrap(), 1);
        assert_eq!(fs::read_to_string(&path).unwrap(), "axb\n");
    }

    #[test]
    fn grep_with_unbounded_context_returns_whole_file() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "f.txt", "a\nhit\nc\n");
        let sink = RecordingSink::new();
        let kit = Toolkit::new(&sink, config());

        let options = GrepOptions {
            context: usize::MAX,
            ..Default::default()
        };
        let hits = kit.grep("hit", &path, options).unwrap();
        assert_eq!(hits.iter().map(|h| h.line).collect::<Vec<_>>(), vec![1, 2, 3]);
        assert_eq!(sink.last().unwrap().get("count"), Some(&json!(1)));
    }

    #[test]
    fn find_and_glob_events_count_skipped_ignore_lines() {
        let dir = TempDir::new().unwrap();
        write(&dir, ".gitignore", "!keep.txt\n*.log\n");
        write(&dir, "a.txt", "");
        write(&dir, "b.log", "");
        let sink = RecordingSink::new();
        let kit = Toolkit::new(&sink, config());

        let found = kit.find("*", dir.path(), &FindOptions::default()).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(sink.last().unwrap().get("skipped"), Some(&json!(1)));

        let listed = kit.glob_files("*", dir.path(), false).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(sink.last().unwrap().get("skipped"), Some(&json!(1)));
    }

    #[cfg(unix)]
    #[test]
    fn find_event_counts_unreadable_directories() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        write(&dir, "ok.txt", "");
        let locked = dir.path().join("locked");
        fs::create_dir(&locked).unwrap();
        write(&dir, "locked/inner.txt", "");
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

        let sink = RecordingSink::new();
        let kit = Toolkit::new(&sink, config());
        let result = kit.find("*.txt", dir.path(), &FindOptions::default());
        let readable = fs::read_dir(&locked).is_ok();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

        let found = result.unwrap();
        // Privileged users can still read the directory.
        if !readable {
            assert_eq!(found.len(), 1);
            assert_eq!(sink.last().unwrap().get("skipped"), Some(&json!(1)));
        }
    }

    #[test]
    fn glob_rejects_multi_segment_patterns() {
        let dir = TempDir::new().unwrap();
        write(&dir, "sub/a.txt", "");
        let sink = RecordingSink::new();
        let kit = Toolkit::new(&sink, config());
        assert!(matches!(
            kit.glob_files("sub/*.txt", dir.path(), false),
            Err(ScourError::InvalidArguments { .. })
        ));
        assert!(sink.events().is_empty());
    }

    #[test]
    fn line_edit_events_report_clamped_positions() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "f.txt", "1\n2\n3\n");
        let sink = RecordingSink::new();
        let kit = Toolkit::new(&sink, config());

        assert_eq!(kit.delete_lines(&path, 0, Some(99)).unwrap(), 3);
        let event = sink.last().unwrap();
        assert_eq!(event.get("start"), Some(&json!(1)));
        assert_eq!(event.get("end"), Some(&json!(3)));

        fs::write(&path, "1\n2\n").unwrap();
        kit.insert_at(&path, 50, "tail", true).unwrap();
        assert_eq!(sink.last().unwrap().get("line"), Some(&json!(2)));
        kit.insert_at(&path, 0, "head", false).unwrap();
        assert_eq!(sink.last().unwrap().get("line"), Some(&json!(1)));
        assert_eq!(fs::read_to_string(&path).unwrap(), "head\n1\n2\ntail\n");
    }

    #[test]
    fn failures_emit_nothing() {
        let dir = TempDir::new().unwrap();
        let sink = RecordingSink::new();
        let kit = Toolkit::new(&sink, config());
        assert!(kit.grep("(", &dir.path().join("f.txt"), GrepOptions::default()).is_err());
        assert!(kit.lines(&dir.path().join("missing"), 1, None).is_err());
        assert!(kit.find("*", &dir.path().join("missing"), &FindOptions::default()).is_err());
        assert!(sink.events().is_empty());
    }
}
