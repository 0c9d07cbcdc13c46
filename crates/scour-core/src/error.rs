//! Error types and error code constants for scour.
//!
//! `ScourError` is the single error type surfaced by single-target operations.
//! Batch operations never return it for per-item failures; those become
//! [`Skipped`] entries in the batch report instead.
//!
//! ## Error Code Mapping
//!
//! - `2`: Invalid arguments or malformed pattern (bad input from caller)
//! - `3`: Resolution errors (path not found, wrong entry type)
//! - `4`: I/O failures while reading or writing
//! - `10`: Internal errors

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// Output Error Codes
// ============================================================================

/// Stable error codes for JSON output and CLI exit status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum OutputErrorCode {
    /// Invalid arguments or pattern from caller.
    InvalidArguments = 2,
    /// Path missing or of the wrong type.
    ResolutionError = 3,
    /// Read or write failed.
    IoError = 4,
    /// Bugs, unexpected state.
    InternalError = 10,
}

impl OutputErrorCode {
    /// Get the numeric code value.
    pub fn code(&self) -> u8 {
        *self as u8
    }
}

impl fmt::Display for OutputErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

// ============================================================================
// Unified Error Type
// ============================================================================

/// Kind of filesystem entry an operation expected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExpectedKind {
    File,
    Directory,
}

impl fmt::Display for ExpectedKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExpectedKind::File => write!(f, "file"),
            ExpectedKind::Directory => write!(f, "directory"),
        }
    }
}

/// Unified error type for toolkit operations.
#[derive(Debug, Error)]
pub enum ScourError {
    /// Source path does not exist.
    #[error("not found: {}", path.display())]
    NotFound { path: PathBuf },

    /// A directory was given where a file is required, or vice versa.
    #[error("expected a {expected}: {}", path.display())]
    TypeMismatch { path: PathBuf, expected: ExpectedKind },

    /// Malformed regular expression or glob.
    #[error("invalid pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },

    /// Permission or encoding failure on read or write.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Invalid arguments from the caller.
    #[error("invalid arguments: {message}")]
    InvalidArguments { message: String },

    /// Internal error (bug or unexpected state).
    #[error("internal error: {message}")]
    Internal { message: String },
}

/// Result alias used throughout the crate.
pub type ScourResult<T> = Result<T, ScourError>;

impl ScourError {
    /// Classify an `io::Error` raised while touching `path`.
    ///
    /// `NotFound` gets its own variant; everything else (permissions,
    /// invalid UTF-8 surfaced as `InvalidData`) is an `Io` failure.
    pub fn from_io(path: &Path, err: io::Error) -> Self {
        if err.kind() == io::ErrorKind::NotFound {
            ScourError::NotFound {
                path: path.to_path_buf(),
            }
        } else {
            ScourError::Io {
                path: path.to_path_buf(),
                source: err,
            }
        }
    }

    /// Create an `InvalidPattern` error.
    pub fn invalid_pattern(pattern: impl Into<String>, message: impl fmt::Display) -> Self {
        ScourError::InvalidPattern {
            pattern: pattern.into(),
            message: message.to_string(),
        }
    }

    /// Create an `InvalidArguments` error.
    pub fn invalid_arguments(message: impl Into<String>) -> Self {
        ScourError::InvalidArguments {
            message: message.into(),
        }
    }

    /// Short stable name of the variant, used in JSON error payloads.
    pub fn kind_name(&self) -> &'static str {
        match self {
            ScourError::NotFound { .. } => "NotFound",
            ScourError::TypeMismatch { .. } => "TypeMismatch",
            ScourError::InvalidPattern { .. } => "InvalidPattern",
            ScourError::Io { .. } => "IOFailure",
            ScourError::InvalidArguments { .. } => "InvalidArguments",
            ScourError::Internal { .. } => "InternalError",
        }
    }
}

impl From<&ScourError> for OutputErrorCode {
    fn from(err: &ScourError) -> Self {
        match err {
            ScourError::InvalidArguments { .. } => OutputErrorCode::InvalidArguments,
            ScourError::InvalidPattern { .. } => OutputErrorCode::InvalidArguments,
            ScourError::NotFound { .. } => OutputErrorCode::ResolutionError,
            ScourError::TypeMismatch { .. } => OutputErrorCode::ResolutionError,
            ScourError::Io { .. } => OutputErrorCode::IoError,
            ScourError::Internal { .. } => OutputErrorCode::InternalError,
        }
    }
}

impl From<ScourError> for OutputErrorCode {
    fn from(err: ScourError) -> Self {
        OutputErrorCode::from(&err)
    }
}

// ============================================================================
// Recoverable Per-Item Failures
// ============================================================================

/// One item a loader or batch operation skipped, and why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Skipped {
    /// Path of the skipped item.
    pub path: PathBuf,
    /// Human-readable reason.
    pub reason: String,
}

impl Skipped {
    /// Record a skip with the given reason.
    pub fn new(path: impl Into<PathBuf>, reason: impl fmt::Display) -> Self {
        Skipped {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
