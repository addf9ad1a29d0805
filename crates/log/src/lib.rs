//! Event log persistence for Tracevault
//!
//! This crate implements the durable, append-only per-trace event log:
//! - Layout: one subdirectory per trace id, one `events.jsonl` inside
//! - Framing: one compact JSON line per event, suffixed with
//!   `\t` + 8 lowercase hex digits of the line's CRC-32C
//! - Writer: single-owner append handle, fsync per event
//! - Reader: tolerant of framed and legacy (unframed) lines in the
//!   same file, with advisory or strict integrity checking
//!
//! The log file is the single source of truth for a trace. Any derived
//! structure (such as a metadata index) is rebuilt by replaying the
//! log, never the other way around.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod crc;
pub mod error;
pub mod layout;
pub mod reader;
pub mod writer;

pub use error::{LogError, Result};
pub use layout::{StorageLayout, EVENTS_FILE};
pub use reader::{
    EventIter, IntegrityMode, ReadOptions, ReadReport, TraceDetail, TraceReadResult, TraceReader,
    TraceSummary,
};
pub use writer::TraceWriter;
