//! Append-only trace writer.
//!
//! One `TraceWriter` exclusively owns one trace's event file for the
//! trace's lifetime. Each append serializes the event to a single
//! canonical JSON line, frames it with a CRC-32C trailer, writes it as
//! one buffer, and fsyncs before returning. Durability per event is
//! the explicit trade-off: traces feed audit and replay, so a lost
//! tail must be detectable, not invisible.

use crate::crc;
use crate::error::{LogError, Result};
use crate::layout::StorageLayout;
use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;
use tracevault_core::Event;

/// Single-owner append handle for one trace's event log.
///
/// Appends are serialized through an internal lock, so sharing a
/// writer across threads still yields whole, ordered lines. After
/// [`finish`](TraceWriter::finish) the handle is closed and further
/// appends are rejected with [`LogError::WriterClosed`].
pub struct TraceWriter {
    trace_id: String,
    path: PathBuf,
    file: Mutex<Option<File>>,
}

impl TraceWriter {
    /// Create the trace's directory (idempotently) and open the event
    /// file for appending.
    pub fn create(trace_id: &str, root: impl AsRef<Path>) -> Result<Self> {
        let layout = StorageLayout::new(root);
        layout.ensure_trace_dir(trace_id)?;
        let path = layout.events_file(trace_id);
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        debug!(trace_id, path = %path.display(), "opened trace log");
        Ok(TraceWriter {
            trace_id: trace_id.to_string(),
            path,
            file: Mutex::new(Some(file)),
        })
    }

    /// The trace this writer owns.
    pub fn trace_id(&self) -> &str {
        &self.trace_id
    }

    /// Path of the event file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one event: serialize, frame, write, fsync.
    ///
    /// The caller is responsible for sequence assignment; the writer
    /// guarantees the framed line reaches disk whole and in append
    /// order. Filesystem errors propagate and are never retried, since
    /// a retry could duplicate a sequence number.
    pub fn append(&self, event: &Event) -> Result<()> {
        let record = serde_json::to_string(event)?;
        let trailer = crc::format_hex(crc::checksum(record.as_bytes()));

        let mut line = String::with_capacity(record.len() + 10);
        line.push_str(&record);
        line.push('\t');
        line.push_str(&trailer);
        line.push('\n');

        let mut guard = self.file.lock();
        let file = guard
            .as_mut()
            .ok_or_else(|| LogError::WriterClosed(self.trace_id.clone()))?;
        file.write_all(line.as_bytes())?;
        file.sync_data()?;
        Ok(())
    }

    /// Flush and close the handle. Idempotent.
    pub fn finish(&self) -> Result<()> {
        let mut guard = self.file.lock();
        if let Some(file) = guard.take() {
            file.sync_data()?;
            debug!(trace_id = %self.trace_id, "closed trace log");
        }
        Ok(())
    }

    /// Check if the handle has been closed.
    pub fn is_finished(&self) -> bool {
        self.file.lock().is_none()
    }
}
