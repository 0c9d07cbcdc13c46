//! Scour: ignore-aware find, grep, and sed primitives.
//!
//! A toolkit of file-system and text-manipulation operations for coding
//! agents. Every operation respects `.gitignore`-style rules, keeps
//! 1-indexed line semantics, and reports a structured status event.

// Core engines - re-exported from scour-core
pub use scour_core::config;
pub use scour_core::error;
pub use scour_core::event;
pub use scour_core::ignore;
pub use scour_core::mutate;
pub use scour_core::output;
pub use scour_core::search;
pub use scour_core::text;
pub use scour_core::toolkit;
pub use scour_core::walk;

// Front door for embedders
pub use scour_core::toolkit::Toolkit;
