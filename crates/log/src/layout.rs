//! On-disk layout.
//!
//! ```text
//! <root>/
//!   <trace_id>/
//!     events.jsonl
//! ```

use std::path::{Path, PathBuf};

/// Name of the per-trace event log file.
pub const EVENTS_FILE: &str = "events.jsonl";

/// Resolves paths under a trace root directory.
#[derive(Debug, Clone)]
pub struct StorageLayout {
    root: PathBuf,
}

impl StorageLayout {
    /// Layout rooted at `root`. Nothing is created yet.
    pub fn new(root: impl AsRef<Path>) -> Self {
        StorageLayout {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// The root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The directory owned by one trace.
    pub fn trace_dir(&self, trace_id: &str) -> PathBuf {
        self.root.join(trace_id)
    }

    /// The event log file for one trace.
    pub fn events_file(&self, trace_id: &str) -> PathBuf {
        self.trace_dir(trace_id).join(EVENTS_FILE)
    }

    /// Create the trace's directory, idempotently.
    pub fn ensure_trace_dir(&self, trace_id: &str) -> std::io::Result<PathBuf> {
        let dir = self.trace_dir(trace_id);
        std::fs::create_dir_all(&dir)?;
        Ok(dir)
    }
}
