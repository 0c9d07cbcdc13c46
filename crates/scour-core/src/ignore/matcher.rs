//! Path exclusion checks against a loaded [`PatternSet`].

use std::borrow::Cow;
use std::fs;
use std::path::{Component, Path};

use super::{MatchMode, PatternSet};

/// Why a path was excluded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exclusion {
    /// A single relative-path component matched. Every descendant of the
    /// path is excluded as well.
    Component,
    /// The relative or absolute path as a whole matched.
    Path,
}

impl PatternSet {
    /// True if `path` is excluded relative to `base`.
    pub fn is_excluded(&self, path: &Path, base: &Path) -> bool {
        self.exclusion(path, base).is_some()
    }

    /// The first exclusion that applies to `path`, if any.
    ///
    /// The relative path is `path` with `base` stripped (or `path` itself
    /// when it is not under `base`). Anchored patterns additionally see the
    /// resolved absolute path.
    pub fn exclusion(&self, path: &Path, base: &Path) -> Option<Exclusion> {
        let relative = path.strip_prefix(base).unwrap_or(path);
        let components: Vec<Cow<'_, str>> = relative
            .components()
            .filter_map(|c| match c {
                Component::Normal(name) => Some(name.to_string_lossy()),
                _ => None,
            })
            .collect();
        let rel = slash_join(relative, &components);

        // Only pay for canonicalization when an anchored pattern needs it.
        let absolute = if self.has_anchored() {
            let resolved = fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
            Some(resolved.to_string_lossy().replace(std::path::MAIN_SEPARATOR, "/"))
        } else {
            None
        };

        for pattern in &self.patterns {
            match pattern.mode {
                MatchMode::Anywhere => {
                    if components.iter().any(|c| pattern.direct.is_match(&**c)) {
                        return Some(Exclusion::Component);
                    }
                    let deep = pattern.deep.as_ref().is_some_and(|g| g.is_match(&rel));
                    if deep || pattern.direct.is_match(&rel) {
                        return Some(Exclusion::Path);
                    }
                }
                MatchMode::Anchored => {
                    let abs_hit = absolute
                        .as_deref()
                        .is_some_and(|abs| pattern.direct.is_match(abs));
                    if abs_hit || pattern.direct.is_match(&rel) {
                        return Some(Exclusion::Path);
                    }
                }
            }
        }
        None
    }
}

/// Join normal components with `/`, keeping a leading `/` for absolute paths.
fn slash_join(path: &Path, components: &[Cow<'_, str>]) -> String {
    let joined = components.join("/");
    if path.has_root() {
        format!("/{joined}")
    } else {
        joined
    }
}

// ============================================================================
// Tests
// ============================================================================
