//! Ignore-file discovery across ancestor directories.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use super::{IgnorePattern, PatternSet};
use crate::error::Skipped;

/// Ignore file read at each ancestor level.
pub const DEFAULT_IGNORE_FILE: &str = ".gitignore";

/// Upper bound on ancestor levels visited.
pub const MAX_ANCESTOR_LEVELS: usize = 20;

/// Anywhere-patterns present regardless of ignore files.
pub const BUILTIN_PATTERNS: &[&str] = &[".git", ".git/**", "node_modules", "node_modules/**"];

/// Options controlling ignore-file discovery.
#[derive(Debug, Clone)]
pub struct LoadOptions {
    /// File name looked up in each directory.
    pub ignore_file: String,
    /// Maximum number of directories visited, starting with the base.
    pub max_levels: usize,
}

impl Default for LoadOptions {
    fn default() -> Self {
        LoadOptions {
            ignore_file: DEFAULT_IGNORE_FILE.to_string(),
            max_levels: MAX_ANCESTOR_LEVELS,
        }
    }
}

impl PatternSet {
    /// Load built-ins plus every ignore file from `base` upward.
    ///
    /// Never fails: unreadable ignore files and unusable lines are recorded
    /// in [`PatternSet::skipped`] and loading continues with the next level.
    pub fn load(base: &Path, options: &LoadOptions) -> PatternSet {
        let mut set = PatternSet::empty();

        for builtin in BUILTIN_PATTERNS {
            match IgnorePattern::anywhere(builtin) {
                Ok(pattern) => set.push(pattern),
                Err(e) => set.skipped.push(Skipped::new(*builtin, e)),
            }
        }

        let mut current = fs::canonicalize(base).unwrap_or_else(|_| base.to_path_buf());
        for _ in 0..options.max_levels {
            let candidate = current.join(&options.ignore_file);
            if candidate.is_file() {
                match fs::read_to_string(&candidate) {
                    Ok(content) => {
                        set.add_ignore_file(&current, &candidate, &content);
                    }
                    Err(e) => {
                        debug!("skipping unreadable ignore file {}: {}", candidate.display(), e);
                        set.skipped.push(Skipped::new(&candidate, e));
                    }
                }
            }

            match current.parent() {
                Some(parent) if !parent.as_os_str().is_empty() => {
                    current = parent.to_path_buf();
                }
                _ => break,
            }
        }

        debug!(
            base = %base.display(),
            patterns = set.len(),
            ignore_files = set.ignore_files.len(),
            skipped = set.skipped.len(),
            "loaded ignore patterns"
        );
        set
    }

    fn add_ignore_file(&mut self, dir: &Path, file: &Path, content: &str) {
        self.ignore_files.push(file.to_path_buf());

        for (idx, raw) in content.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let location = PathBuf::from(format!("{}:{}", file.display(), idx + 1));
            if line.starts_with('!') {
                self.skipped
                    .push(Skipped::new(location, "negation patterns are not supported"));
                continue;
            }

            let line = match line.strip_suffix('/') {
                Some(stripped) if !stripped.is_empty() => stripped,
                _ => line,
            };

            let compiled = match line.strip_prefix('/') {
                Some(rest) => {
                    let anchored = dir.join(rest);
                    IgnorePattern::anchored(&glob_text(&anchored))
                }
                None => IgnorePattern::anywhere(line),
            };
            match compiled {
                Ok(pattern) => self.push(pattern),
                Err(e) => self.skipped.push(Skipped::new(location, e)),
            }
        }
    }
}

/// Render a path as a `/`-separated glob string.
fn glob_text(path: &Path) -> String {
    let text = path.to_string_lossy();
    if std::path::MAIN_SEPARATOR == '/' {
        text.into_owned()
    } else {
        text.replace(std::path::MAIN_SEPARATOR, "/")
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ignore::MatchMode;
    use tempfile::TempDir;

    #[test]
    fn builtins_always_present() {
        let dir = TempDir::new().unwrap();
        let set = PatternSet::load(dir.path(), &LoadOptions::default());
        let globs: Vec<&str> = set.patterns().iter().map(|p| p.glob()).collect();
        for builtin in BUILTIN_PATTERNS {
            assert!(globs.contains(builtin), "missing builtin {builtin}");
        }
    }

    #[test]
    fn comments_and_blank_lines_skipped() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(".gitignore"), "# comment\n\n   \n*.log\n").unwrap();
        let set = PatternSet::load(dir.path(), &LoadOptions::default());
        let extra: Vec<&str> = set.patterns()[BUILTIN_PATTERNS.len()..]
            .iter()
            .map(|p| p.glob())
            .collect();
        assert_eq!(extra, vec!["*.log"]);
    }

    #[test]
    fn leading_slash_anchors_to_ignore_dir() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(".gitignore"), "/build\n").unwrap();
        let set = PatternSet::load(dir.path(), &LoadOptions::default());
        let anchored: Vec<&IgnorePattern> = set
            .patterns()
            .iter()
            .filter(|p| p.mode() == MatchMode::Anchored)
            .collect();
        assert_eq!(anchored.len(), 1);
        let expected = fs::canonicalize(dir.path()).unwrap().join("build");
        assert_eq!(anchored[0].glob(), glob_text(&expected));
    }

    #[test]
    fn ancestor_ignore_files_are_loaded() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("a").join("b");
        fs::create_dir_all(&nested).unwrap();
        fs::write(dir.path().join(".gitignore"), "outer.txt\n").unwrap();
        fs::write(nested.join(".gitignore"), "inner.txt\n").unwrap();

        let set = PatternSet::load(&nested, &LoadOptions::default());
        let globs: Vec<&str> = set.patterns().iter().map(|p| p.glob()).collect();
        assert!(globs.contains(&"outer.txt"));
        assert!(globs.contains(&"inner.txt"));
        assert!(set.ignore_files().len() >= 2);
    }

    #[test]
    fn max_levels_bounds_the_walk() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("a");
        fs::create_dir_all(&nested).unwrap();
        fs::write(dir.path().join(".gitignore"), "outer.txt\n").unwrap();

        let options = LoadOptions {
            max_levels: 1,
            ..LoadOptions::default()
        };
        let set = PatternSet::load(&nested, &options);
        assert!(!set.patterns().iter().any(|p| p.glob() == "outer.txt"));
    }

    #[test]
    fn negation_and_bad_globs_are_recorded_not_fatal() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(".gitignore"), "!keep.txt\n[unclosed\nok.txt\n").unwrap();
        let set = PatternSet::load(dir.path(), &LoadOptions::default());
        assert!(set.patterns().iter().any(|p| p.glob() == "ok.txt"));
        assert_eq!(set.skipped().len(), 2);
    }

    #[test]
    fn trailing_slash_is_dropped() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(".gitignore"), "dist/\n").unwrap();
        let set = PatternSet::load(dir.path(), &LoadOptions::default());
        assert!(set.patterns().iter().any(|p| p.glob() == "dist"));
    }

    #[test]
    fn missing_base_still_loads_builtins() {
        let set = PatternSet::load(
            Path::new("/definitely/not/a/real/dir"),
            &LoadOptions::default(),
        );
        assert_eq!(set.len(), BUILTIN_PATTERNS.len());
    }

    #[cfg(unix)]
    #[test]
    fn unreadable_ignore_file_is_skipped() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let ignore = dir.path().join(".gitignore");
        fs::write(&ignore, "secret\n").unwrap();
        fs::set_permissions(&ignore, fs::Permissions::from_mode(0o000)).unwrap();

        let set = PatternSet::load(dir.path(), &LoadOptions::default());
        // Root can still read the file; only assert when the read failed.
        if fs::read_to_string(&ignore).is_err() {
            assert!(!set.patterns().iter().any(|p| p.glob() == "secret"));
            assert!(!set.skipped().is_empty());
        }
        fs::set_permissions(&ignore, fs::Permissions::from_mode(0o644)).unwrap();
    }
}
