//! Derived metadata index for Tracevault
//!
//! A secondary store mirroring trace-level metadata (name, project,
//! status, event counts) so listing and search do not have to scan
//! every log file. The append-only log is the single source of truth:
//! the index is best-effort acceleration, rebuilt by replaying the log
//! and never consulted for correctness. The core writer and reader
//! work identically with the index absent, stale, or disagreeing.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod error;
mod sqlite;

pub use error::{IndexError, Result};
pub use sqlite::SqliteIndex;

use tracevault_core::{event::kind, Event, Value};
use tracevault_log::{TraceReader, TraceSummary};

/// Contract for a derived trace-metadata store.
///
/// Implementations must serialize their own writes; callers treat
/// every operation as best-effort and fall back to scanning logs when
/// the index is unavailable.
pub trait MetadataIndex {
    /// Register a trace at capture start.
    fn create_trace(
        &self,
        trace_id: &str,
        name: &str,
        project: Option<&str>,
        start_ts: f64,
    ) -> Result<()>;

    /// Record a trace's terminal status and end time.
    fn finish_trace(&self, trace_id: &str, end_ts: f64, status: &str) -> Result<()>;

    /// Mirror one appended event and bump the trace's event count.
    fn record_event(&self, event: &Event) -> Result<()>;

    /// Drop everything the index holds for one trace.
    fn clear_trace(&self, trace_id: &str) -> Result<()>;

    /// List traces, most recently started first.
    fn list_traces(&self, limit: usize) -> Result<Vec<TraceSummary>>;

    /// Find events whose payload or attrs contain `query`.
    fn search_events(&self, query: &str, limit: usize) -> Result<Vec<Event>>;
}

/// Rebuild one trace's index rows by replaying its log.
///
/// The log always wins: existing rows for the trace are dropped and
/// re-derived from the event stream.
pub fn rebuild_from_log<I: MetadataIndex + ?Sized>(
    index: &I,
    reader: &TraceReader,
    trace_id: &str,
) -> Result<()> {
    let events = reader.get_events(trace_id)?;
    index.clear_trace(trace_id)?;

    let mut created = false;
    for event in &events {
        if !created {
            let (name, project) = start_metadata(event, trace_id);
            index.create_trace(
                trace_id,
                &name,
                project.as_deref(),
                event.ts_unix_ns as f64 / 1e9,
            )?;
            created = true;
        }
        index.record_event(event)?;
        if event.is_trace_end() {
            let status = event
                .payload
                .get("status")
                .and_then(Value::as_str)
                .unwrap_or("error");
            index.finish_trace(trace_id, event.ts_unix_ns as f64 / 1e9, status)?;
        }
    }
    Ok(())
}

fn start_metadata(event: &Event, trace_id: &str) -> (String, Option<String>) {
    if event.kind == kind::TRACE_START {
        let name = event
            .payload
            .get("trace_name")
            .and_then(Value::as_str)
            .unwrap_or(trace_id)
            .to_string();
        let project = event
            .payload
            .get("project")
            .and_then(Value::as_str)
            .map(str::to_string);
        (name, project)
    } else {
        (trace_id.to_string(), None)
    }
}
