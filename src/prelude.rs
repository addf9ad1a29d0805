//! Convenient imports for Tracevault.
//!
//! Re-exports the types most instrumentation and tooling touch:
//!
//! ```ignore
//! use tracevault::prelude::*;
//!
//! let tracer = Tracer::start("my-agent")?;
//! tracer.user_input("hello")?;
//! tracer.finish(None)?;
//! ```

// Capture
pub use crate::tracer::{with_trace, EmitOptions, Tracer, TracerBuilder};

// Current-tracer binding
pub use crate::current::{bind, current, CurrentGuard};

// Error handling
pub use crate::error::{Error, Result};

// Data model
pub use tracevault_core::event::kind;
pub use tracevault_core::{Event, Level, RedactionConfig, TraceStatus, Value};

// Reading and replay
pub use tracevault_log::{TraceReader, TraceSummary};
pub use tracevault_replay::{diff_traces, Replayer};
