//! Index error types.

use thiserror::Error;

/// Errors from the metadata index.
#[derive(Debug, Error)]
pub enum IndexError {
    /// Underlying SQLite failure.
    #[error("index store error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Reading the source-of-truth log during a rebuild failed.
    #[error(transparent)]
    Log(#[from] tracevault_log::LogError),

    /// A mirrored row could not be decoded back into an event.
    #[error("corrupt index row: {0}")]
    CorruptRow(String),
}

/// Result type for index operations.
pub type Result<T> = std::result::Result<T, IndexError>;
