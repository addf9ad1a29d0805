//! # Tracevault
//!
//! Durable capture, inspection, and deterministic replay of agent
//! execution traces.
//!
//! Every trace is an append-only JSONL log on local disk, one
//! CRC-32C-framed record per event, redacted before anything is
//! persisted. The log is the source of truth; listing, reading,
//! replay, and the optional SQLite metadata index are all derived
//! from it.
//!
//! ## Quick Start
//!
//! ```ignore
//! use tracevault::prelude::*;
//!
//! // Capture
//! let tracer = Tracer::builder("checkout-agent").project("storefront").start()?;
//! tracer.user_input("ship my order")?;
//! tracer.llm_request(Value::object([("prompt", "ship my order")]))?;
//! tracer.llm_response(Value::object([("text", "on it")]))?;
//! tracer.finish(None)?;
//!
//! // Inspect
//! let reader = TraceReader::new(tracevault::config::root_dir());
//! for summary in reader.list_traces()? {
//!     println!("{} {}", summary.id, summary.name);
//! }
//!
//! // Replay
//! let mut replayer = Replayer::load(&reader, tracer.trace_id())?;
//! let input = replayer.consume_input()?;
//! let response = replayer.expect_llm(Some("ship my order"))?;
//! ```
//!
//! ## Layers
//!
//! - [`Tracer`] - capture facade: sequencing, redaction, append
//! - [`TraceReader`] - listing and reading logs, framed or legacy
//! - [`Replayer`] - forward-only deterministic replay cursor
//! - [`diff_traces`] - normalized structural diff of two traces
//! - [`SqliteIndex`] - optional derived metadata index

#![warn(missing_docs)]
#![warn(clippy::all)]

mod error;
mod tracer;

pub mod current;
pub mod prelude;

pub use error::{Error, Result};
pub use tracer::{with_trace, EmitOptions, Tracer, TracerBuilder};

// Core data model
pub use tracevault_core::event::kind;
pub use tracevault_core::{AsFields, Event, Level, TraceStatus, Value, SCHEMA_VERSION};

// Configuration
pub use tracevault_core::config::{self, RedactionConfig};

// Redaction
pub use tracevault_redact::Redactor;

// Log access
pub use tracevault_log::{
    EventIter, IntegrityMode, LogError, ReadOptions, ReadReport, StorageLayout, TraceDetail,
    TraceReadResult, TraceReader, TraceSummary, TraceWriter,
};

// Replay and diffing
pub use tracevault_replay::{diff_traces, DiffChange, DiffEntry, ReplayError, Replayer};

// Metadata index
pub use tracevault_index::{rebuild_from_log, IndexError, MetadataIndex, SqliteIndex};
