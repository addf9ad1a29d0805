//! Replay error types.
//!
//! Replay's entire value is failing loudly on mismatch, so every
//! failure mode is its own variant and none is ever swallowed.

use thiserror::Error;

/// Errors from replaying a captured trace.
#[derive(Debug, Error)]
pub enum ReplayError {
    /// The referenced trace could not be loaded.
    #[error("trace not found: {0}")]
    TraceNotFound(String),

    /// `consume_input` reached the end of the trace.
    #[error("no more user input in trace")]
    NoInput,

    /// `expect_llm` found no remaining request.
    #[error("expected LLM request, found end of trace")]
    NoRequest,

    /// A request was found but the trace ended before its response.
    #[error("found LLM request but no response in trace")]
    NoResponse,

    /// The agent under replay diverged from the recorded script.
    #[error("replay divergence: expected request containing {expected:?}, got {got}")]
    Divergence {
        /// The substring the caller expected in the request payload.
        expected: String,
        /// Canonical rendering of the recorded request payload.
        got: String,
    },

    /// A matched event is missing a field the operation requires.
    #[error("malformed event at seq {seq}: {reason}")]
    MalformedEvent {
        /// Sequence number of the offending event.
        seq: u64,
        /// What was missing or wrong.
        reason: String,
    },

    /// Reading the trace from disk failed.
    #[error(transparent)]
    Log(#[from] tracevault_log::LogError),
}

impl ReplayError {
    /// Check if this is a divergence (recorded vs. actual mismatch).
    pub fn is_divergence(&self) -> bool {
        matches!(self, ReplayError::Divergence { .. })
    }

    /// Check if this is an exhaustion error (scan hit end of trace).
    pub fn is_exhausted(&self) -> bool {
        matches!(
            self,
            ReplayError::NoInput | ReplayError::NoRequest | ReplayError::NoResponse
        )
    }
}

/// Result type for replay operations.
pub type Result<T> = std::result::Result<T, ReplayError>;
