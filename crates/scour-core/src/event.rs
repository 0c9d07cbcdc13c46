//! Status events: one structured summary per completed operation.
//!
//! Operations report through a [`StatusSink`] passed in by the caller. Sinks
//! are infallible from the caller's side: a sink that cannot deliver an event
//! logs the failure and drops it.

use std::io::Write;
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, SecondsFormat, Utc};
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};
use tracing::debug;

// ============================================================================
// Event
// ============================================================================

/// A structured status summary for one operation.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusEvent {
    /// Operation name (`find`, `rgrep`, `delete_lines`, ...).
    pub op: String,
    /// When the event was created.
    pub at: DateTime<Utc>,
    /// Operation-specific payload.
    pub fields: Map<String, Value>,
}

impl StatusEvent {
    /// Create an event stamped with the current time.
    pub fn new(op: impl Into<String>) -> Self {
        StatusEvent {
            op: op.into(),
            at: DateTime::<Utc>::from(std::time::SystemTime::now()),
            fields: Map::new(),
        }
    }

    /// Add a field.
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.fields.insert(key.to_string(), value.into());
        self
    }

    /// Look up a field.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }
}

/// Serialized as a flat object: `{"op": ..., "at": ..., <fields>}`.
impl Serialize for StatusEvent {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len() + 2))?;
        map.serialize_entry("op", &self.op)?;
        map.serialize_entry("at", &self.at.to_rfc3339_opts(SecondsFormat::Millis, true))?;
        for (key, value) in &self.fields {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

// ============================================================================
// Sinks
// ============================================================================

/// Receiver of status events.
pub trait StatusSink {
    /// Deliver one event. Must not fail or block the caller on errors.
    fn emit(&self, event: &StatusEvent);
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl StatusSink for NullSink {
    fn emit(&self, _event: &StatusEvent) {}
}

/// Keeps every event in memory.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<StatusEvent>>,
}

impl RecordingSink {
    /// Create an empty recorder.
    pub fn new() -> Self {
        RecordingSink::default()
    }

    /// Snapshot of the recorded events, oldest first.
    pub fn events(&self) -> Vec<StatusEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// The most recent event.
    pub fn last(&self) -> Option<StatusEvent> {
        self.events().pop()
    }
}

impl StatusSink for RecordingSink {
    fn emit(&self, event: &StatusEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event.clone());
    }
}

/// Writes each event as one compact JSON line.
#[derive(Debug)]
pub struct JsonLinesSink<W: Write> {
    writer: Mutex<W>,
}

impl<W: Write> JsonLinesSink<W> {
    /// Wrap a writer.
    pub fn new(writer: W) -> Self {
        JsonLinesSink {
            writer: Mutex::new(writer),
        }
    }

    /// Recover the writer.
    pub fn into_inner(self) -> W {
        self.writer
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl<W: Write> StatusSink for JsonLinesSink<W> {
    fn emit(&self, event: &StatusEvent) {
        let line = match serde_json::to_string(event) {
            Ok(line) => line,
            Err(e) => {
                debug!("dropping {} event: {}", event.op, e);
                return;
            }
        };
        let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        if let Err(e) = writeln!(writer, "{}", line).and_then(|_| writer.flush()) {
            debug!("dropping {} event: {}", event.op, e);
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
