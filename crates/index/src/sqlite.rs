//! SQLite-backed metadata index.

use crate::error::{IndexError, Result};
use crate::MetadataIndex;
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;
use tracevault_core::{Event, Level, Value};
use tracevault_log::TraceSummary;

/// Derived trace metadata in a single SQLite database.
///
/// Writes are serialized through an internal lock; one transaction
/// per trace-create, event mirror, or status update.
pub struct SqliteIndex {
    conn: Mutex<Connection>,
}

impl SqliteIndex {
    /// Open (or create) the index database at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path.as_ref())?;
        // WAL keeps readers unblocked while the index is updated.
        let _mode: String = conn.query_row("PRAGMA journal_mode=WAL", [], |row| row.get(0))?;
        let index = SqliteIndex {
            conn: Mutex::new(conn),
        };
        index.init_schema()?;
        debug!(path = %path.as_ref().display(), "opened metadata index");
        Ok(index)
    }

    /// Open an in-memory index, for tests and ephemeral use.
    pub fn in_memory() -> Result<Self> {
        let index = SqliteIndex {
            conn: Mutex::new(Connection::open_in_memory()?),
        };
        index.init_schema()?;
        Ok(index)
    }

    fn init_schema(&self) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS traces (
                 id TEXT PRIMARY KEY,
                 name TEXT NOT NULL,
                 project TEXT,
                 start_ts REAL NOT NULL,
                 end_ts REAL,
                 status TEXT NOT NULL DEFAULT 'running',
                 event_count INTEGER NOT NULL DEFAULT 0
             );
             CREATE TABLE IF NOT EXISTS events (
                 rowid_pk INTEGER PRIMARY KEY AUTOINCREMENT,
                 trace_id TEXT NOT NULL,
                 seq INTEGER NOT NULL,
                 ts_unix_ns INTEGER NOT NULL,
                 kind TEXT NOT NULL,
                 span_id TEXT,
                 parent_span_id TEXT,
                 level TEXT NOT NULL,
                 attrs TEXT NOT NULL,
                 payload TEXT NOT NULL
             );
             CREATE INDEX IF NOT EXISTS idx_events_trace_seq ON events(trace_id, seq);
             CREATE INDEX IF NOT EXISTS idx_traces_start_ts ON traces(start_ts DESC);",
        )?;
        Ok(())
    }

    /// Current event count for a trace, if indexed.
    pub fn event_count(&self, trace_id: &str) -> Result<Option<u64>> {
        let conn = self.conn.lock();
        let count: Option<i64> = conn
            .query_row(
                "SELECT event_count FROM traces WHERE id = ?1",
                params![trace_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(count.map(|c| c as u64))
    }
}

impl MetadataIndex for SqliteIndex {
    fn create_trace(
        &self,
        trace_id: &str,
        name: &str,
        project: Option<&str>,
        start_ts: f64,
    ) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT OR REPLACE INTO traces (id, name, project, start_ts, status, event_count)
             VALUES (?1, ?2, ?3, ?4, 'running', 0)",
            params![trace_id, name, project, start_ts],
        )?;
        Ok(())
    }

    fn finish_trace(&self, trace_id: &str, end_ts: f64, status: &str) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            "UPDATE traces SET end_ts = ?1, status = ?2 WHERE id = ?3",
            params![end_ts, status, trace_id],
        )?;
        Ok(())
    }

    fn record_event(&self, event: &Event) -> Result<()> {
        let attrs = serde_json::to_string(&event.attrs)
            .map_err(|e| IndexError::CorruptRow(e.to_string()))?;
        let payload = event.payload.to_canonical_string();

        let mut conn = self.conn.lock();
        let txn = conn.transaction()?;
        txn.execute(
            "INSERT INTO events
                 (trace_id, seq, ts_unix_ns, kind, span_id, parent_span_id, level, attrs, payload)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                event.trace_id,
                event.seq as i64,
                event.ts_unix_ns as i64,
                event.kind,
                event.span_id,
                event.parent_span_id,
                event.level.to_string(),
                attrs,
                payload,
            ],
        )?;
        txn.execute(
            "UPDATE traces SET event_count = event_count + 1 WHERE id = ?1",
            params![event.trace_id],
        )?;
        txn.commit()?;
        Ok(())
    }

    fn clear_trace(&self, trace_id: &str) -> Result<()> {
        let mut conn = self.conn.lock();
        let txn = conn.transaction()?;
        txn.execute("DELETE FROM events WHERE trace_id = ?1", params![trace_id])?;
        txn.execute("DELETE FROM traces WHERE id = ?1", params![trace_id])?;
        txn.commit()?;
        Ok(())
    }

    fn list_traces(&self, limit: usize) -> Result<Vec<TraceSummary>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT id, name, project, start_ts, event_count, status
             FROM traces ORDER BY start_ts DESC LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit as i64], |row| {
            Ok(TraceSummary {
                id: row.get(0)?,
                name: row.get(1)?,
                project: row.get(2)?,
                start_ts: row.get(3)?,
                event_count: row.get::<_, i64>(4)? as u64,
                status: row.get(5)?,
            })
        })?;
        let mut summaries = Vec::new();
        for row in rows {
            summaries.push(row?);
        }
        Ok(summaries)
    }

    fn search_events(&self, query: &str, limit: usize) -> Result<Vec<Event>> {
        let pattern = format!("%{query}%");
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT trace_id, seq, ts_unix_ns, kind, span_id, parent_span_id, level, attrs, payload
             FROM events
             WHERE payload LIKE ?1 OR attrs LIKE ?1
             ORDER BY ts_unix_ns DESC LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![pattern, limit as i64], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, i64>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, Option<String>>(4)?,
                row.get::<_, Option<String>>(5)?,
                row.get::<_, String>(6)?,
                row.get::<_, String>(7)?,
                row.get::<_, String>(8)?,
            ))
        })?;

        let mut events = Vec::new();
        for row in rows {
            let (trace_id, seq, ts, kind, span_id, parent_span_id, level, attrs, payload) = row?;
            events.push(Event {
                schema_version: tracevault_core::SCHEMA_VERSION,
                trace_id,
                seq: seq as u64,
                ts_unix_ns: ts as u64,
                kind,
                span_id,
                parent_span_id,
                level: if level == "error" {
                    Level::Error
                } else {
                    Level::Info
                },
                attrs: decode_attrs(&attrs)?,
                payload: decode_value(&payload)?,
            });
        }
        Ok(events)
    }
}

fn decode_attrs(raw: &str) -> Result<BTreeMap<String, Value>> {
    serde_json::from_str(raw).map_err(|e| IndexError::CorruptRow(e.to_string()))
}

fn decode_value(raw: &str) -> Result<Value> {
    serde_json::from_str(raw).map_err(|e| IndexError::CorruptRow(e.to_string()))
}
