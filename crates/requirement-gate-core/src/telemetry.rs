// crates/requirement-gate-core/src/telemetry.rs
// ============================================================================
// Module: Requirement Gate Telemetry
// Description: Structured gate events and JSON-lines sinks.
// Purpose: Record every fail-open fallback without a logging framework dependency.
// Dependencies: crate::core, serde, serde_json
// ============================================================================

//! ## Overview
//! Gate components never raise on degraded paths; they record a
//! [`GateEvent`] instead. Sinks serialize events as JSON lines so the host
//! can route them anywhere. [`LevelFilter`] drops events below a configured
//! minimum before they reach the wrapped sink.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::fs;
use std::fs::OpenOptions;
use std::io;
use std::io::Write;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use std::sync::Mutex;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::core::Timestamp;

// ============================================================================
// SECTION: Event Payload
// ============================================================================

/// Severity of a gate event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventLevel {
    /// Diagnostic detail.
    Debug,
    /// Normal operation.
    Info,
    /// Degraded but handled.
    Warn,
    /// Unexpected failure that was converted into a fail-open decision.
    Error,
}

impl EventLevel {
    /// Returns the stable label for the level.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for EventLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventLevel {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warn" | "warning" => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            other => Err(format!("unknown log level: {other}")),
        }
    }
}

/// Structured gate event payload.
#[derive(Debug, Clone, Serialize)]
pub struct GateEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Severity.
    pub level: EventLevel,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: i64,
    /// Requirement the event concerns, when any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requirement: Option<String>,
    /// Branch the event concerns, when any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    /// Session the event concerns, when any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session: Option<String>,
    /// Human-readable message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Structured detail.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<Value>,
}

impl GateEvent {
    /// Creates an event with no optional fields set.
    #[must_use]
    pub const fn new(event: &'static str, level: EventLevel, at: Timestamp) -> Self {
        Self {
            event,
            level,
            timestamp_ms: at.as_unix_millis(),
            requirement: None,
            branch: None,
            session: None,
            message: None,
            detail: None,
        }
    }

    /// Sets the requirement field.
    #[must_use]
    pub fn with_requirement(mut self, requirement: impl fmt::Display) -> Self {
        self.requirement = Some(requirement.to_string());
        self
    }

    /// Sets the branch field.
    #[must_use]
    pub fn with_branch(mut self, branch: impl fmt::Display) -> Self {
        self.branch = Some(branch.to_string());
        self
    }

    /// Sets the session field.
    #[must_use]
    pub fn with_session(mut self, session: impl fmt::Display) -> Self {
        self.session = Some(session.to_string());
        self
    }

    /// Sets the message field.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Sets the detail field.
    #[must_use]
    pub fn with_detail(mut self, detail: Value) -> Self {
        self.detail = Some(detail);
        self
    }
}

// ============================================================================
// SECTION: Sinks
// ============================================================================

/// Destination for gate events.
pub trait EventSink: Send + Sync {
    /// Record an event. Must never fail or panic.
    fn record(&self, event: &GateEvent);
}

impl<T: EventSink + ?Sized> EventSink for Arc<T> {
    fn record(&self, event: &GateEvent) {
        (**self).record(event);
    }
}

/// Sink that discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopEventSink;

impl EventSink for NoopEventSink {
    fn record(&self, _event: &GateEvent) {}
}

/// Sink that logs JSON lines to stderr.
#[derive(Debug, Default, Clone, Copy)]
pub struct StderrEventSink;

impl EventSink for StderrEventSink {
    fn record(&self, event: &GateEvent) {
        if let Ok(payload) = serde_json::to_string(event) {
            let _ = writeln!(std::io::stderr(), "{payload}");
        }
    }
}

/// Sink that appends JSON lines to a file.
pub struct FileEventSink {
    /// File handle used for append-only logging.
    file: Mutex<fs::File>,
}

impl FileEventSink {
    /// Opens the event log in append mode, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory or file cannot be created.
    pub fn new(path: &Path) -> io::Result<Self> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }
}

impl EventSink for FileEventSink {
    fn record(&self, event: &GateEvent) {
        if let Ok(payload) = serde_json::to_string(event)
            && let Ok(mut file) = self.file.lock()
        {
            let _ = writeln!(file, "{payload}");
            let _ = file.flush();
        }
    }
}

/// Sink wrapper that drops events below a minimum level.
pub struct LevelFilter<S> {
    /// Lowest level forwarded to `inner`.
    min: EventLevel,
    /// Wrapped sink.
    inner: S,
}

impl<S: EventSink> LevelFilter<S> {
    /// Wraps `inner`, forwarding events at `min` or above.
    #[must_use]
    pub const fn new(min: EventLevel, inner: S) -> Self {
        Self {
            min,
            inner,
        }
    }
}

impl<S: EventSink> EventSink for LevelFilter<S> {
    fn record(&self, event: &GateEvent) {
        if event.level >= self.min {
            self.inner.record(event);
        }
    }
}

/// Sink that keeps events in memory for inspection.
#[derive(Debug, Default)]
pub struct MemoryEventSink {
    /// Recorded events.
    events: Mutex<Vec<GateEvent>>,
}

impl MemoryEventSink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of recorded events.
    #[must_use]
    pub fn events(&self) -> Vec<GateEvent> {
        self.events.lock().map(|events| events.clone()).unwrap_or_default()
    }

    /// Returns true when an event with the given identifier was recorded.
    #[must_use]
    pub fn contains(&self, event: &str) -> bool {
        self.events.lock().is_ok_and(|events| events.iter().any(|item| item.event == event))
    }
}

impl EventSink for MemoryEventSink {
    fn record(&self, event: &GateEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used, reason = "Test fixtures use explicit expects for clarity.")]

    use std::sync::Arc;

    use super::EventLevel;
    use super::EventSink;
    use super::FileEventSink;
    use super::GateEvent;
    use super::LevelFilter;
    use super::MemoryEventSink;
    use crate::core::Timestamp;

    #[test]
    fn level_filter_drops_lower_levels() {
        let memory = Arc::new(MemoryEventSink::new());
        let sink = LevelFilter::new(EventLevel::Warn, Arc::clone(&memory));
        sink.record(&GateEvent::new("quiet", EventLevel::Info, Timestamp::from_unix_millis(1)));
        sink.record(&GateEvent::new("loud", EventLevel::Error, Timestamp::from_unix_millis(2)));
        let events = memory.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event, "loud");
    }

    #[test]
    fn file_sink_appends_json_lines() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("logs").join("events.jsonl");
        let sink = FileEventSink::new(&path).expect("sink");
        sink.record(
            &GateEvent::new("state_corrupt", EventLevel::Warn, Timestamp::from_unix_millis(7))
                .with_branch("feature/x"),
        );
        sink.record(&GateEvent::new("write_dropped", EventLevel::Warn, Timestamp::from_unix_millis(8)));
        let contents = std::fs::read_to_string(&path).expect("read");
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        let first: serde_json::Value = serde_json::from_str(lines[0]).expect("json");
        assert_eq!(first["event"], "state_corrupt");
        assert_eq!(first["branch"], "feature/x");
        assert_eq!(first["level"], "warn");
    }

    #[test]
    fn level_parses_warning_alias() {
        assert_eq!("WARNING".parse::<EventLevel>(), Ok(EventLevel::Warn));
    }
}
