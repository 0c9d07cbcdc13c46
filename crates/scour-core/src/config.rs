//! Toolkit configuration with precedence tracking.
//!
//! Precedence (highest to lowest):
//! 1. CLI flags
//! 2. Environment variables
//! 3. Defaults
//!
//! | Setting | Default | Environment |
//! |---------|---------|-------------|
//! | `find_limit` | 1000 | `SCOUR_FIND_LIMIT` |
//! | `rgrep_limit` | 100 | `SCOUR_RGREP_LIMIT` |
//! | `ignore_file` | `.gitignore` | `SCOUR_IGNORE_FILE` |
//! | `max_ancestor_levels` | 20 | `SCOUR_MAX_ANCESTORS` |

use std::str::FromStr;

use tracing::warn;

use crate::ignore::{LoadOptions, DEFAULT_IGNORE_FILE, MAX_ANCESTOR_LEVELS};

/// Default result cap for `find`.
pub const DEFAULT_FIND_LIMIT: usize = 1000;

/// Default hit cap for `rgrep`.
pub const DEFAULT_RGREP_LIMIT: usize = 100;

pub const ENV_FIND_LIMIT: &str = "SCOUR_FIND_LIMIT";
pub const ENV_RGREP_LIMIT: &str = "SCOUR_RGREP_LIMIT";
pub const ENV_IGNORE_FILE: &str = "SCOUR_IGNORE_FILE";
pub const ENV_MAX_ANCESTORS: &str = "SCOUR_MAX_ANCESTORS";

// ============================================================================
// Configuration Sources
// ============================================================================

/// Configuration value source (for precedence tracking).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ConfigSource {
    /// Built-in default value.
    Default = 0,
    /// From environment variable.
    EnvVar = 1,
    /// From CLI flag (highest precedence).
    CliFlag = 2,
}

/// A configuration value with its source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigValue<T> {
    /// The actual value.
    pub value: T,
    /// Where the value came from.
    pub source: ConfigSource,
}

impl<T> ConfigValue<T> {
    /// Create a new config value with the given source.
    pub fn new(value: T, source: ConfigSource) -> Self {
        ConfigValue { value, source }
    }

    /// Merge with another value, preferring higher precedence.
    pub fn merge(self, other: Self) -> Self {
        if other.source >= self.source {
            other
        } else {
            self
        }
    }
}

// ============================================================================
// Resolved Configuration
// ============================================================================

/// CLI configuration overrides.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    /// --find-limit flag.
    pub find_limit: Option<usize>,
    /// --rgrep-limit flag.
    pub rgrep_limit: Option<usize>,
    /// --ignore-file flag.
    pub ignore_file: Option<String>,
    /// --max-ancestors flag.
    pub max_ancestor_levels: Option<usize>,
}

/// Settings shared by every toolkit operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolkitConfig {
    /// Default `limit` for `find`.
    pub find_limit: ConfigValue<usize>,
    /// Default `limit` for `rgrep`.
    pub rgrep_limit: ConfigValue<usize>,
    /// Ignore file name read at each ancestor level.
    pub ignore_file: ConfigValue<String>,
    /// Maximum ancestor levels searched for ignore files.
    pub max_ancestor_levels: ConfigValue<usize>,
}

impl Default for ToolkitConfig {
    fn default() -> Self {
        ToolkitConfig {
            find_limit: ConfigValue::new(DEFAULT_FIND_LIMIT, ConfigSource::Default),
            rgrep_limit: ConfigValue::new(DEFAULT_RGREP_LIMIT, ConfigSource::Default),
            ignore_file: ConfigValue::new(DEFAULT_IGNORE_FILE.to_string(), ConfigSource::Default),
            max_ancestor_levels: ConfigValue::new(MAX_ANCESTOR_LEVELS, ConfigSource::Default),
        }
    }
}

impl ToolkitConfig {
    /// Resolve configuration from the process environment and CLI flags.
    pub fn resolve(cli_overrides: &CliOverrides) -> Self {
        ToolkitConfig::resolve_with(|key| std::env::var(key).ok(), cli_overrides)
    }

    /// Resolve configuration using `lookup` in place of the process
    /// environment.
    pub fn resolve_with<F>(lookup: F, cli_overrides: &CliOverrides) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = ToolkitConfig::default();
        config.apply_env_vars(lookup);
        config.apply_cli_overrides(cli_overrides);
        config
    }

    fn apply_env_vars<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let source = ConfigSource::EnvVar;
        if let Some(limit) = parse_env(&lookup, ENV_FIND_LIMIT) {
            layer(&mut self.find_limit, limit, source);
        }
        if let Some(limit) = parse_env(&lookup, ENV_RGREP_LIMIT) {
            layer(&mut self.rgrep_limit, limit, source);
        }
        if let Some(name) = lookup(ENV_IGNORE_FILE) {
            if name.trim().is_empty() {
                warn!("ignoring empty {}", ENV_IGNORE_FILE);
            } else {
                layer(&mut self.ignore_file, name, source);
            }
        }
        if let Some(levels) = parse_env(&lookup, ENV_MAX_ANCESTORS) {
            layer(&mut self.max_ancestor_levels, levels, source);
        }
    }

    fn apply_cli_overrides(&mut self, overrides: &CliOverrides) {
        let source = ConfigSource::CliFlag;
        if let Some(limit) = overrides.find_limit {
            layer(&mut self.find_limit, limit, source);
        }
        if let Some(limit) = overrides.rgrep_limit {
            layer(&mut self.rgrep_limit, limit, source);
        }
        if let Some(ref name) = overrides.ignore_file {
            layer(&mut self.ignore_file, name.clone(), source);
        }
        if let Some(levels) = overrides.max_ancestor_levels {
            layer(&mut self.max_ancestor_levels, levels, source);
        }
    }

    /// Ignore-file discovery options derived from this configuration.
    pub fn load_options(&self) -> LoadOptions {
        LoadOptions {
            ignore_file: self.ignore_file.value.clone(),
            max_levels: self.max_ancestor_levels.value,
        }
    }
}

/// Replace `slot` unless it already holds a higher-precedence value.
fn layer<T: Clone>(slot: &mut ConfigValue<T>, value: T, source: ConfigSource) {
    *slot = slot.clone().merge(ConfigValue::new(value, source));
}

fn parse_env<T, F>(lookup: &F, key: &str) -> Option<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(e) => {
            warn!("ignoring {}={:?}: {}", key, raw, e);
            None
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
