//! Replay engine for Tracevault
//!
//! Consumes a fully-read trace through a forward-only cursor. The
//! engine is deliberately a linear scanner, not an indexed matcher:
//! traces are small (thousands of events), and left-to-right scanning
//! gives exactly the semantics divergence detection needs. Once an
//! event has been skipped it can never match again, so an agent that
//! asks things in a different order than recorded fails loudly.
//!
//! Divergence, exhaustion, and malformed records are distinct error
//! variants, never host panics, so callers can tell them apart
//! programmatically.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod diff;
mod engine;
mod error;

pub use diff::{diff_traces, normalize_event, DiffChange, DiffEntry};
pub use engine::Replayer;
pub use error::{ReplayError, Result};
