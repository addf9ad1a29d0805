//! Log-layer error types.

use thiserror::Error;

/// Errors from the event log writer and reader.
#[derive(Debug, Error)]
pub enum LogError {
    /// Referenced trace has no event log file.
    #[error("trace not found: {0}")]
    TraceNotFound(String),

    /// Append attempted after `finish()`.
    #[error("writer for trace {0} is closed")]
    WriterClosed(String),

    /// A record failed integrity or parse checks under strict reading.
    #[error("corrupt record at line {line}: {reason}")]
    Corruption {
        /// 1-based line number in the event file.
        line: usize,
        /// What failed: CRC mismatch or parse error.
        reason: String,
    },

    /// Filesystem error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A record could not be serialized.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl LogError {
    /// Check if this is a not-found error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, LogError::TraceNotFound(_))
    }
}

/// Result type for log operations.
pub type Result<T> = std::result::Result<T, LogError>;
