//! JSON output types and serialization for CLI responses.
//!
//! ## Design Principles
//!
//! 1. **Status first:** every response starts with `status` (`"ok"` or `"error"`)
//! 2. **Versioned:** `schema_version` enables forward compatibility
//! 3. **Deterministic:** same input gives the same output (field order, array order)
//! 4. **Flat payloads:** operation results sit next to `status`, not under a wrapper

use std::io::{self, Write};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{OutputErrorCode, ScourError};

/// Current schema version for all responses.
pub const SCHEMA_VERSION: &str = "1";

// ============================================================================
// Success
// ============================================================================

/// Successful response: `{"status":"ok","schema_version":"1","op":..., <payload>}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OkResponse {
    /// Status: "ok".
    pub status: String,
    /// Schema version for compatibility.
    pub schema_version: String,
    /// Operation that produced the payload.
    pub op: String,
    /// Operation-specific result fields.
    #[serde(flatten)]
    pub payload: Map<String, Value>,
}

impl OkResponse {
    /// Create a response for `op`.
    ///
    /// A payload that serializes to an object is flattened into the
    /// response; any other value is stored under `result`.
    pub fn new<T: Serialize>(op: &str, payload: &T) -> Result<Self, serde_json::Error> {
        let payload = match serde_json::to_value(payload)? {
            Value::Object(map) => map,
            other => {
                let mut map = Map::new();
                map.insert("result".to_string(), other);
                map
            }
        };
        Ok(OkResponse {
            status: "ok".to_string(),
            schema_version: SCHEMA_VERSION.to_string(),
            op: op.to_string(),
            payload,
        })
    }
}

// ============================================================================
// Errors
// ============================================================================

/// Error information for error responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Numeric error code (see [`OutputErrorCode`]).
    pub code: u8,
    /// Error kind (`NotFound`, `InvalidPattern`, ...).
    pub kind: String,
    /// Human-readable message.
    pub message: String,
    /// Error-specific structured data.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl ErrorInfo {
    /// Create from a ScourError.
    pub fn from_error(err: &ScourError) -> Self {
        let details = match err {
            ScourError::NotFound { path } => Some(serde_json::json!({ "path": path })),
            ScourError::TypeMismatch { path, expected } => {
                Some(serde_json::json!({ "path": path, "expected": expected }))
            }
            ScourError::InvalidPattern { pattern, .. } => {
                Some(serde_json::json!({ "pattern": pattern }))
            }
            ScourError::Io { path, .. } => Some(serde_json::json!({ "path": path })),
            _ => None,
        };

        ErrorInfo {
            code: OutputErrorCode::from(err).code(),
            kind: err.kind_name().to_string(),
            message: err.to_string(),
            details,
        }
    }
}

/// Error response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Status: "error".
    pub status: String,
    /// Schema version for compatibility.
    pub schema_version: String,
    /// Error information.
    pub error: ErrorInfo,
}

impl ErrorResponse {
    /// Create an error response from a ScourError.
    pub fn from_error(err: &ScourError) -> Self {
        ErrorResponse {
            status: "error".to_string(),
            schema_version: SCHEMA_VERSION.to_string(),
            error: ErrorInfo::from_error(err),
        }
    }

    /// Create an error response with just code and message.
    pub fn new(code: OutputErrorCode, kind: &str, message: impl Into<String>) -> Self {
        ErrorResponse {
            status: "error".to_string(),
            schema_version: SCHEMA_VERSION.to_string(),
            error: ErrorInfo {
                code: code.code(),
                kind: kind.to_string(),
                message: message.into(),
                details: None,
            },
        }
    }
}

// ============================================================================
// Emit
// ============================================================================

/// Emit a response as pretty JSON to a writer.
pub fn emit_response<T: Serialize>(response: &T, writer: &mut impl Write) -> io::Result<()> {
    let json = serde_json::to_string_pretty(response)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    writeln!(writer, "{}", json)
}

/// Emit a response as compact JSON (single line) to a writer.
pub fn emit_response_compact<T: Serialize>(
    response: &T,
    writer: &mut impl Write,
) -> io::Result<()> {
    let json = serde_json::to_string(response)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    writeln!(writer, "{}", json)
}

// ============================================================================
// Tests
// ============================================================================
