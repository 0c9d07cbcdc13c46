//! Binary entry point for the scour CLI.
//!
//! Every toolkit operation is a subcommand. Results are printed to stdout as
//! a JSON envelope; status events go to stderr as JSON lines when `--events`
//! is given.
//!
//! ## Usage
//!
//! ```bash
//! # Recursive find, newest first
//! scour find '*.rs' src --sort mtime
//!
//! # Grep one file with context
//! scour grep 'TODO' src/lib.rs --context 2
//!
//! # Regex replace across a tree
//! scour rsed 'old_name' 'new_name' . --glob '*.py'
//! ```

use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;

use scour::config::{CliOverrides, ToolkitConfig};
use scour::error::{OutputErrorCode, ScourError};
use scour::event::{JsonLinesSink, NullSink, StatusSink};
use scour::output::{emit_response, emit_response_compact, ErrorResponse, OkResponse};
use scour::toolkit::{FindOptions, GrepOptions, RgrepOptions, RsedOptions, Toolkit};
use scour::walk::{EntryKind, SortOrder};

// ============================================================================
// CLI Structure
// ============================================================================

/// Ignore-aware find, grep, and sed for coding agents.
///
/// All output is JSON for easy parsing by LLM agents.
#[derive(Parser, Debug)]
#[command(name = "scour", version, about = "Ignore-aware find, grep, and sed for coding agents")]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,
    #[command(subcommand)]
    command: Command,
}

/// Global arguments shared by all subcommands.
#[derive(Parser, Debug)]
struct GlobalArgs {
    /// Log level for tracing output.
    #[arg(long, global = true, value_enum, default_value = "warn")]
    log_level: LogLevel,

    /// Write status events to stderr as JSON lines.
    #[arg(long, global = true)]
    events: bool,

    /// Default result cap for `find`.
    #[arg(long, global = true)]
    find_limit: Option<usize>,

    /// Default hit cap for `rgrep`.
    #[arg(long, global = true)]
    rgrep_limit: Option<usize>,

    /// Ignore file name read in each ancestor directory.
    #[arg(long, global = true)]
    ignore_file: Option<String>,

    /// Maximum ancestor directories searched for ignore files.
    #[arg(long, global = true)]
    max_ancestors: Option<usize>,

    /// Print compact single-line JSON.
    #[arg(long, global = true)]
    compact: bool,
}

impl GlobalArgs {
    fn overrides(&self) -> CliOverrides {
        CliOverrides {
            find_limit: self.find_limit,
            rgrep_limit: self.rgrep_limit,
            ignore_file: self.ignore_file.clone(),
            max_ancestor_levels: self.max_ancestors,
        }
    }
}

/// Log level for tracing output.
#[derive(Clone, Copy, Debug, ValueEnum)]
enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    fn to_tracing_level(self) -> tracing::Level {
        match self {
            LogLevel::Trace => tracing::Level::TRACE,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Error => tracing::Level::ERROR,
        }
    }
}

/// Sort order for `find`.
#[derive(Clone, Copy, Debug, ValueEnum)]
enum SortArg {
    Path,
    Mtime,
}

impl From<SortArg> for SortOrder {
    fn from(arg: SortArg) -> Self {
        match arg {
            SortArg::Path => SortOrder::Lexical,
            SortArg::Mtime => SortOrder::MtimeDesc,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Recursive glob find. Respects .gitignore.
    Find {
        /// Glob matched at any depth (`*` stays within one path segment).
        pattern: String,
        /// Directory to search.
        #[arg(default_value = ".")]
        path: PathBuf,
        /// Entry type: file, dir, or any.
        #[arg(long = "type", default_value = "file")]
        kind: EntryKind,
        /// Result cap (default from configuration).
        #[arg(long)]
        limit: Option<usize>,
        /// Include dot-prefixed entries.
        #[arg(long)]
        hidden: bool,
        /// Result ordering.
        #[arg(long, value_enum, default_value = "path")]
        sort: SortArg,
        /// Maximum depth (direct children = 1).
        #[arg(long)]
        max_depth: Option<usize>,
        /// Minimum depth (direct children = 1).
        #[arg(long)]
        min_depth: Option<usize>,
    },

    /// Non-recursive glob. Respects .gitignore.
    Glob {
        pattern: String,
        #[arg(default_value = ".")]
        path: PathBuf,
        #[arg(long)]
        hidden: bool,
    },

    /// Grep a single file.
    Grep {
        pattern: String,
        path: PathBuf,
        /// Case-insensitive match.
        #[arg(short = 'i', long)]
        ignore_case: bool,
        /// Treat the pattern as a literal substring.
        #[arg(short = 'F', long)]
        literal: bool,
        /// Lines of context around each match.
        #[arg(short = 'C', long, default_value_t = 0)]
        context: usize,
    },

    /// Recursive grep across files matching a glob. Respects .gitignore.
    Rgrep {
        pattern: String,
        #[arg(default_value = ".")]
        path: PathBuf,
        /// File glob.
        #[arg(long, default_value = "*")]
        glob: String,
        #[arg(short = 'i', long)]
        ignore_case: bool,
        #[arg(short = 'F', long)]
        literal: bool,
        /// Hit cap (default from configuration).
        #[arg(long)]
        limit: Option<usize>,
        #[arg(long)]
        hidden: bool,
    },

    /// Replace text in a file (literal unless --regex).
    Replace {
        path: PathBuf,
        pattern: String,
        replacement: String,
        #[arg(long)]
        regex: bool,
    },

    /// Regex replace in a file (like sed -i).
    Sed {
        path: PathBuf,
        pattern: String,
        replacement: String,
        /// Regex flags: any of i, m, s, x.
        #[arg(long, default_value = "")]
        flags: String,
    },

    /// Recursive sed across files matching a glob. Respects .gitignore.
    Rsed {
        pattern: String,
        replacement: String,
        #[arg(default_value = ".")]
        path: PathBuf,
        #[arg(long, default_value = "*")]
        glob: String,
        #[arg(long, default_value = "")]
        flags: String,
        #[arg(long)]
        hidden: bool,
    },

    /// Extract a line range (1-indexed, inclusive).
    Lines {
        path: PathBuf,
        #[arg(default_value_t = 1)]
        start: usize,
        end: Option<usize>,
    },

    /// Delete a line range (1-indexed, inclusive).
    DeleteLines {
        path: PathBuf,
        start: usize,
        end: Option<usize>,
    },

    /// Delete lines matching a pattern.
    DeleteMatching {
        path: PathBuf,
        pattern: String,
        /// Treat the pattern as a literal substring.
        #[arg(short = 'F', long)]
        literal: bool,
    },

    /// Insert text after (default) or before a line.
    InsertAt {
        path: PathBuf,
        line: usize,
        text: String,
        #[arg(long)]
        before: bool,
    },
}

// ============================================================================
// Main Entry Point
// ============================================================================

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize tracing
    init_tracing(cli.global.log_level);

    let compact = cli.global.compact;
    match execute(cli) {
        Ok(response) => {
            let mut stdout = io::stdout();
            let written = if compact {
                emit_response_compact(&response, &mut stdout)
            } else {
                emit_response(&response, &mut stdout)
            };
            let _ = stdout.flush();
            match written {
                Ok(()) => ExitCode::SUCCESS,
                Err(e) => {
                    tracing::error!("failed to write response: {}", e);
                    ExitCode::from(OutputErrorCode::IoError.code())
                }
            }
        }
        Err(err) => {
            let error_code = OutputErrorCode::from(&err);
            let response = ErrorResponse::from_error(&err);

            // Errors go to stdout as JSON, same as results
            let _ = emit_response(&response, &mut io::stdout());
            let _ = io::stdout().flush();

            ExitCode::from(error_code.code())
        }
    }
}

/// Initialize tracing subscriber.
fn init_tracing(level: LogLevel) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.to_tracing_level().to_string()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

/// Execute the CLI command.
fn execute(cli: Cli) -> Result<OkResponse, ScourError> {
    let config = ToolkitConfig::resolve(&cli.global.overrides());
    let json_sink;
    let sink: &dyn StatusSink = if cli.global.events {
        json_sink = JsonLinesSink::new(io::stderr());
        &json_sink
    } else {
        &NullSink
    };
    let kit = Toolkit::new(sink, config);
    run_command(&kit, cli.command)
}

fn run_command(kit: &Toolkit<'_>, command: Command) -> Result<OkResponse, ScourError> {
    match command {
        Command::Find {
            pattern,
            path,
            kind,
            limit,
            hidden,
            sort,
            max_depth,
            min_depth,
        } => {
            let options = FindOptions {
                kind,
                limit,
                hidden,
                sort: sort.into(),
                max_depth,
                min_depth,
            };
            let matches = kit.find(&pattern, &path, &options)?;
            respond("find", &PathList::new(matches))
        }
        Command::Glob {
            pattern,
            path,
            hidden,
        } => {
            let matches = kit.glob_files(&pattern, &path, hidden)?;
            respond("glob", &PathList::new(matches))
        }
        Command::Grep {
            pattern,
            path,
            ignore_case,
            literal,
            context,
        } => {
            let options = GrepOptions {
                ignore_case,
                literal,
                context,
            };
            let hits = kit.grep(&pattern, &path, options)?;
            respond("grep", &serde_json::json!({ "count": hits.len(), "hits": hits }))
        }
        Command::Rgrep {
            pattern,
            path,
            glob,
            ignore_case,
            literal,
            limit,
            hidden,
        } => {
            let options = RgrepOptions {
                glob,
                ignore_case,
                literal,
                limit,
                hidden,
            };
            let report = kit.rgrep(&pattern, &path, &options)?;
            respond("rgrep", &report)
        }
        Command::Replace {
            path,
            pattern,
            replacement,
            regex,
        } => {
            let count = kit.replace(&path, &pattern, &replacement, regex)?;
            respond("replace", &Count { count })
        }
        Command::Sed {
            path,
            pattern,
            replacement,
            flags,
        } => {
            let count = kit.sed(&path, &pattern, &replacement, flags.parse()?)?;
            respond("sed", &Count { count })
        }
        Command::Rsed {
            pattern,
            replacement,
            path,
            glob,
            flags,
            hidden,
        } => {
            let options = RsedOptions {
                glob,
                flags: flags.parse()?,
                hidden,
            };
            let report = kit.rsed(&pattern, &replacement, &path, &options)?;
            respond("rsed", &report)
        }
        Command::Lines { path, start, end } => {
            let text = kit.lines(&path, start, end)?;
            respond("lines", &serde_json::json!({ "text": text }))
        }
        Command::DeleteLines { path, start, end } => {
            let count = kit.delete_lines(&path, start, end)?;
            respond("delete_lines", &Count { count })
        }
        Command::DeleteMatching {
            path,
            pattern,
            literal,
        } => {
            let count = kit.delete_matching(&path, &pattern, !literal)?;
            respond("delete_matching", &Count { count })
        }
        Command::InsertAt {
            path,
            line,
            text,
            before,
        } => {
            let path = kit.insert_at(&path, line, &text, !before)?;
            respond("insert_at", &serde_json::json!({ "path": path }))
        }
    }
}

// ============================================================================
// Response Payloads
// ============================================================================

#[derive(Serialize)]
struct Count {
    count: usize,
}

#[derive(Serialize)]
struct PathList {
    count: usize,
    matches: Vec<PathBuf>,
}

impl PathList {
    fn new(matches: Vec<PathBuf>) -> Self {
        PathList {
            count: matches.len(),
            matches,
        }
    }
}

fn respond<T: Serialize>(op: &str, payload: &T) -> Result<OkResponse, ScourError> {
    OkResponse::new(op, payload).map_err(|e| ScourError::Internal {
        message: format!("failed to serialize {} response: {}", op, e),
    })
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    mod cli_parsing {
        use super::*;

        #[test]
        fn find_defaults() {
            let cli = Cli::try_parse_from(["scour", "find", "*.rs"]).unwrap();
            match cli.command {
                Command::Find {
                    pattern,
                    path,
                    kind,
                    limit,
                    hidden,
                    sort,
                    ..
                } => {
                    assert_eq!(pattern, "*.rs");
                    assert_eq!(path, PathBuf::from("."));
                    assert_eq!(kind, EntryKind::File);
                    assert_eq!(limit, None);
                    assert!(!hidden);
                    assert!(matches!(sort, SortArg::Path));
                }
                _ => panic!("expected Find"),
            }
        }

        #[test]
        fn find_type_and_depth() {
            let cli = Cli::try_parse_from([
                "scour",
                "find",
                "*",
                "src",
                "--type",
                "dir",
                "--max-depth",
                "2",
                "--sort",
                "mtime",
            ])
            .unwrap();
            match cli.command {
                Command::Find {
                    kind,
                    max_depth,
                    sort,
                    ..
                } => {
                    assert_eq!(kind, EntryKind::Dir);
                    assert_eq!(max_depth, Some(2));
                    assert!(matches!(SortOrder::from(sort), SortOrder::MtimeDesc));
                }
                _ => panic!("expected Find"),
            }
        }

        #[test]
        fn find_rejects_unknown_type() {
            assert!(Cli::try_parse_from(["scour", "find", "*", "--type", "socket"]).is_err());
        }

        #[test]
        fn grep_short_flags() {
            let cli =
                Cli::try_parse_from(["scour", "grep", "todo", "a.txt", "-i", "-F", "-C", "3"])
                    .unwrap();
            match cli.command {
                Command::Grep {
                    ignore_case,
                    literal,
                    context,
                    ..
                } => {
                    assert!(ignore_case);
                    assert!(literal);
                    assert_eq!(context, 3);
                }
                _ => panic!("expected Grep"),
            }
        }

        #[test]
        fn global_overrides_after_subcommand() {
            let cli = Cli::try_parse_from([
                "scour",
                "rgrep",
                "x",
                "--rgrep-limit",
                "5",
                "--ignore-file",
                ".ignore",
                "--events",
            ])
            .unwrap();
            assert!(cli.global.events);
            let overrides = cli.global.overrides();
            assert_eq!(overrides.rgrep_limit, Some(5));
            assert_eq!(overrides.ignore_file.as_deref(), Some(".ignore"));
        }

        #[test]
        fn insert_at_before_flag() {
            let cli = Cli::try_parse_from(["scour", "insert-at", "f.txt", "3", "hello", "--before"])
                .unwrap();
            match cli.command {
                Command::InsertAt { line, before, .. } => {
                    assert_eq!(line, 3);
                    assert!(before);
                }
                _ => panic!("expected InsertAt"),
            }
        }

        #[test]
        fn log_level_default_is_warn() {
            let cli = Cli::try_parse_from(["scour", "lines", "f.txt"]).unwrap();
            assert!(matches!(cli.global.log_level, LogLevel::Warn));
        }
    }

    mod execution {
        use super::*;
        use std::fs;
        use tempfile::TempDir;

        fn run(args: &[&str]) -> Result<OkResponse, ScourError> {
            let cli = Cli::try_parse_from(args).unwrap();
            let config = ToolkitConfig::resolve_with(|_| None, &cli.global.overrides());
            let kit = Toolkit::new(&NullSink, config);
            run_command(&kit, cli.command)
        }

        #[test]
        fn sed_reports_count() {
            let dir = TempDir::new().unwrap();
            let file = dir.path().join("f.txt");
            fs::write(&file, "foo1 foo2").unwrap();
            let path = file.to_str().unwrap();
            let response = run(&["scour", "sed", path, r"foo(\d+)", "bar$1"]).unwrap();
            assert_eq!(response.status, "ok");
            assert_eq!(response.payload["count"], 2);
            assert_eq!(fs::read_to_string(&file).unwrap(), "bar1 bar2");
        }

        #[test]
        fn grep_accepts_maximal_context() {
            let dir = TempDir::new().unwrap();
            let file = dir.path().join("f.txt");
            fs::write(&file, "a\nhit\nc\n").unwrap();
            let max = usize::MAX.to_string();
            let response =
                run(&["scour", "grep", "hit", file.to_str().unwrap(), "-C", &max]).unwrap();
            assert_eq!(response.payload["count"], 3);
        }

        #[test]
        fn bad_flags_are_invalid_arguments() {
            let dir = TempDir::new().unwrap();
            let file = dir.path().join("f.txt");
            fs::write(&file, "x").unwrap();
            let err = run(&["scour", "sed", file.to_str().unwrap(), "x", "y", "--flags", "z"])
                .unwrap_err();
            assert_eq!(OutputErrorCode::from(&err), OutputErrorCode::InvalidArguments);
        }

        #[test]
        fn missing_file_maps_to_resolution_error() {
            let err = run(&["scour", "lines", "/definitely/not/here.txt"]).unwrap_err();
            assert_eq!(OutputErrorCode::from(&err).code(), 3);
            let response = ErrorResponse::from_error(&err);
            assert_eq!(response.error.kind, "NotFound");
        }
    }
}
