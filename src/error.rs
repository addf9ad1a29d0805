//! Unified error type for Tracevault.
//!
//! Each subsystem (log, replay, index) keeps its own error enum; this module
//! wraps them into one type so callers of the facade handle a single `Result`.

use thiserror::Error;

use tracevault_index::IndexError;
use tracevault_log::LogError;
use tracevault_replay::ReplayError;

/// All Tracevault errors.
#[derive(Debug, Error)]
pub enum Error {
    /// Event log failure (writer, reader, framing, filesystem).
    #[error(transparent)]
    Log(#[from] LogError),

    /// Replay cursor failure (exhaustion, divergence, malformed event).
    #[error(transparent)]
    Replay(#[from] ReplayError),

    /// Metadata index failure. The index is derived state; callers may
    /// choose to ignore these and fall back to the log.
    #[error(transparent)]
    Index(#[from] IndexError),
}

/// Result type for Tracevault operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Check if this error means a trace does not exist.
    pub fn is_not_found(&self) -> bool {
        match self {
            Error::Log(e) => e.is_not_found(),
            Error::Replay(e) => matches!(e, ReplayError::TraceNotFound(_)),
            Error::Index(_) => false,
        }
    }

    /// Check if this is a replay divergence.
    pub fn is_divergence(&self) -> bool {
        matches!(self, Error::Replay(e) if e.is_divergence())
    }
}
