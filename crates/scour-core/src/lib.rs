//! Core engines for scour.
//!
//! This crate provides the file-system and text primitives behind the
//! toolkit operations:
//! - Ignore-file loading and path exclusion
//! - Ignore-aware traversal (recursive and single-level)
//! - Line search (single file and file tree)
//! - Line mutation with atomic rewrites (single file and file tree)
//! - Status events and sinks
//! - Layered configuration
//! - Error types, error codes, and JSON output envelopes

pub mod config;
pub mod error;
pub mod event;
pub mod ignore;
pub mod mutate;
pub mod output;
pub mod search;
pub mod text;
pub mod toolkit;
pub mod walk;
