//! Event record types
//!
//! An `Event` is one immutable, sequenced record within a trace.
//! Sequence numbers are 1-based, strictly increasing, and gap-free per
//! trace; they are assigned by the single owning tracer at emit time.
//!
//! `kind` is an open string: the constants in [`kind`] cover the
//! well-known kinds, but instrumentation may emit others and readers
//! must carry them through untouched.

use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Current on-disk schema version. Records without the field (written
/// before framing was introduced) default to this on read.
pub const SCHEMA_VERSION: u32 = 1;

/// Well-known event kinds.
pub mod kind {
    /// First event of every trace; payload carries name and project.
    pub const TRACE_START: &str = "trace_start";
    /// Terminal event; payload carries final status and any error.
    pub const TRACE_END: &str = "trace_end";
    /// A user-supplied input; payload carries `text`.
    pub const USER_INPUT: &str = "user_input";
    /// An outbound model request.
    pub const LLM_REQUEST: &str = "llm_request";
    /// A model response.
    pub const LLM_RESPONSE: &str = "llm_response";
    /// A tool invocation.
    pub const TOOL_CALL: &str = "tool_call";
    /// A tool result.
    pub const TOOL_RESULT: &str = "tool_result";
    /// Start of a span of work.
    pub const SPAN_START: &str = "span_start";
    /// End of a span of work.
    pub const SPAN_END: &str = "span_end";
    /// Start of a retrieval operation.
    pub const RETRIEVAL_START: &str = "retrieval_start";
    /// End of a retrieval operation.
    pub const RETRIEVAL_END: &str = "retrieval_end";
    /// An error observed by instrumentation.
    pub const ERROR: &str = "error";
}

/// Event severity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    /// Normal operation.
    #[default]
    Info,
    /// Something went wrong.
    Error,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Level::Info => write!(f, "info"),
            Level::Error => write!(f, "error"),
        }
    }
}

/// Terminal status of a trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TraceStatus {
    /// Trace is still being written.
    Running,
    /// Trace finished cleanly.
    Ok,
    /// Trace finished with an error.
    Error,
}

impl TraceStatus {
    /// The wire string for this status.
    pub fn as_str(&self) -> &'static str {
        match self {
            TraceStatus::Running => "running",
            TraceStatus::Ok => "ok",
            TraceStatus::Error => "error",
        }
    }
}

impl fmt::Display for TraceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One immutable record within a trace.
///
/// Serializes to a single compact JSON line; the log layer frames that
/// line with a CRC-32C trailer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Event {
    /// On-disk schema version.
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    /// Trace this event belongs to.
    pub trace_id: String,
    /// 1-based, strictly increasing, gap-free per trace.
    pub seq: u64,
    /// Wall-clock timestamp, nanoseconds since the Unix epoch.
    pub ts_unix_ns: u64,
    /// Open string kind; see [`kind`] for the well-known values.
    pub kind: String,
    /// Span this event belongs to, if any.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub span_id: Option<String>,
    /// Parent span for nested operations, if any.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub parent_span_id: Option<String>,
    /// Severity level.
    #[serde(default)]
    pub level: Level,
    /// Small, structured, indexable metadata.
    #[serde(default)]
    pub attrs: BTreeMap<String, Value>,
    /// Free-form data, redacted before it ever reaches this struct.
    #[serde(default = "default_payload")]
    pub payload: Value,
}

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

fn default_payload() -> Value {
    Value::Null
}

impl Event {
    /// Current wall-clock time in nanoseconds since the Unix epoch.
    pub fn now_unix_ns() -> u64 {
        use std::time::{SystemTime, UNIX_EPOCH};
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(0)
    }

    /// Check if this is the trace's opening record.
    pub fn is_trace_start(&self) -> bool {
        self.kind == kind::TRACE_START
    }

    /// Check if this is the trace's terminal record.
    pub fn is_trace_end(&self) -> bool {
        self.kind == kind::TRACE_END
    }

    /// The `text` field of the payload, for input-style events.
    pub fn payload_text(&self) -> Option<&str> {
        self.payload.get("text").and_then(Value::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_event() -> Event {
        Event {
            schema_version: SCHEMA_VERSION,
            trace_id: "t1".to_string(),
            seq: 1,
            ts_unix_ns: Event::now_unix_ns(),
            kind: kind::USER_INPUT.to_string(),
            span_id: None,
            parent_span_id: None,
            level: Level::Info,
            attrs: BTreeMap::new(),
            payload: Value::object([("text", "hi")]),
        }
    }

    #[test]
    fn test_serialize_skips_absent_spans() {
        let line = serde_json::to_string(&sample_event()).expect("serialize failed");
        assert!(!line.contains("span_id"));
        assert!(line.contains("\"level\":\"info\""));
    }

    #[test]
    fn test_deserialize_defaults_schema_version() {
        // A record written before the schema_version field existed.
        let line = r#"{"trace_id":"t1","seq":1,"ts_unix_ns":5,"kind":"user_input","level":"info","attrs":{},"payload":{"text":"hi"}}"#;
        let event: Event = serde_json::from_str(line).expect("parse failed");
        assert_eq!(event.schema_version, SCHEMA_VERSION);
        assert_eq!(event.payload_text(), Some("hi"));
    }

    #[test]
    fn test_roundtrip_preserves_structure() {
        let event = sample_event();
        let line = serde_json::to_string(&event).expect("serialize failed");
        let back: Event = serde_json::from_str(&line).expect("parse failed");
        assert_eq!(event, back);
    }

    #[test]
    fn test_status_wire_strings() {
        assert_eq!(TraceStatus::Ok.as_str(), "ok");
        assert_eq!(TraceStatus::Error.as_str(), "error");
        assert_eq!(TraceStatus::Running.as_str(), "running");
    }
}
