//! Tolerant trace reader.
//!
//! The reader accepts framed (CRC-suffixed) and legacy (plain JSON)
//! lines within the same file. Integrity checking defaults to
//! advisory: a mismatching or unparsable line is skipped, logged, and
//! counted in the read report, so a partial read is always marked but
//! a damaged trace stays available. Strict mode fails the read on the
//! first bad record instead.
//!
//! The reader never re-sorts events: sequence order is a writer
//! guarantee, and an externally edited file is treated as unchecked
//! input.

use crate::crc::{split_frame, FrameStatus};
use crate::error::{LogError, Result};
use crate::layout::StorageLayout;
use chrono::{DateTime, Utc};
use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::Path;
use tracing::{debug, warn};
use tracevault_core::{event::kind, Event, Value};

/// How the reader treats records that fail integrity or parse checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IntegrityMode {
    /// Skip bad records, log a warning, count them in the report.
    /// A damaged trace remains readable.
    #[default]
    Advisory,
    /// Fail the whole read on the first bad record.
    Strict,
}

/// Reader configuration.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReadOptions {
    /// Integrity policy for CRC mismatches and parse failures.
    pub integrity: IntegrityMode,
}

impl ReadOptions {
    /// Options with strict integrity checking.
    pub fn strict() -> Self {
        ReadOptions {
            integrity: IntegrityMode::Strict,
        }
    }
}

/// Trace-level metadata recovered without a full scan.
#[derive(Debug, Clone)]
pub struct TraceSummary {
    /// Trace identifier (the directory name).
    pub id: String,
    /// Display name from `trace_start`, or the id when unavailable.
    pub name: String,
    /// Project label, if recorded.
    pub project: Option<String>,
    /// Start time, seconds since the Unix epoch.
    pub start_ts: f64,
    /// Number of non-blank lines in the event file.
    pub event_count: u64,
    /// Final status from the terminal `trace_end` event; `None` while
    /// the trace is still being written.
    pub status: Option<String>,
}

impl TraceSummary {
    /// Start time as a UTC datetime, when representable.
    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        let secs = self.start_ts.trunc() as i64;
        let nanos = (self.start_ts.fract() * 1e9) as u32;
        DateTime::from_timestamp(secs, nanos)
    }
}

/// A fully read trace: metadata plus its ordered events.
#[derive(Debug, Clone)]
pub struct TraceDetail {
    /// Trace identifier.
    pub id: String,
    /// Display name from the first `trace_start` event, else the id.
    pub name: String,
    /// Project label, if recorded.
    pub project: Option<String>,
    /// All readable events, in file order.
    pub events: Vec<Event>,
    /// Skip accounting; a partial trace is always marked, never
    /// silently returned whole.
    pub report: ReadReport,
}

/// What an advisory read had to skip.
#[derive(Debug, Clone, Default)]
pub struct ReadReport {
    /// 1-based line numbers that were skipped.
    pub skipped_lines: Vec<usize>,
    /// How many of those skips were CRC mismatches.
    pub crc_mismatches: u64,
}

impl ReadReport {
    /// Check if anything was skipped: the result is a partial trace.
    pub fn is_partial(&self) -> bool {
        !self.skipped_lines.is_empty()
    }
}

/// Events plus the report describing anything the read skipped.
#[derive(Debug, Clone)]
pub struct TraceReadResult {
    /// All readable events, in file order.
    pub events: Vec<Event>,
    /// Skip accounting; empty under strict mode (strict fails instead).
    pub report: ReadReport,
}

/// Read access to every trace under a root directory.
///
/// Readers never mutate. Any number may run concurrently with the
/// single writer of an in-progress trace.
pub struct TraceReader {
    layout: StorageLayout,
    options: ReadOptions,
}

impl TraceReader {
    /// Reader with default (advisory) options.
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self::with_options(root, ReadOptions::default())
    }

    /// Reader with explicit options.
    pub fn with_options(root: impl AsRef<Path>, options: ReadOptions) -> Self {
        TraceReader {
            layout: StorageLayout::new(root),
            options,
        }
    }

    /// The root directory this reader scans.
    pub fn root(&self) -> &Path {
        self.layout.root()
    }

    /// List all traces, most recently started first.
    ///
    /// Only the first line of each log is parsed for metadata; a full
    /// line count supplies `event_count`. A trace that cannot be
    /// parsed degrades to defaults (directory name, file mtime) rather
    /// than failing the listing.
    pub fn list_traces(&self) -> Result<Vec<TraceSummary>> {
        let root = self.layout.root();
        if !root.exists() {
            return Ok(Vec::new());
        }

        let mut summaries = Vec::new();
        for entry in std::fs::read_dir(root)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let id = entry.file_name().to_string_lossy().to_string();
            let mtime = entry
                .metadata()
                .ok()
                .and_then(|m| m.modified().ok())
                .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
                .map(|d| d.as_secs_f64())
                .unwrap_or(0.0);

            let mut summary = TraceSummary {
                id: id.clone(),
                name: id.clone(),
                project: None,
                start_ts: mtime,
                event_count: 0,
                status: None,
            };

            match self.scan_summary(&id, &mut summary) {
                Ok(()) => {}
                Err(err) => {
                    debug!(trace_id = %id, %err, "listing degraded to defaults");
                }
            }
            summaries.push(summary);
        }

        summaries.sort_by(|a, b| {
            b.start_ts
                .partial_cmp(&a.start_ts)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        Ok(summaries)
    }

    fn scan_summary(&self, trace_id: &str, summary: &mut TraceSummary) -> Result<()> {
        let path = self.layout.events_file(trace_id);
        if !path.exists() {
            return Ok(());
        }
        let reader = BufReader::new(File::open(&path)?);
        let mut count: u64 = 0;
        let mut last_line = String::new();
        for line in reader.lines() {
            let line = line?;
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            count += 1;
            if count == 1 {
                let (record, _) = split_frame(trimmed);
                if let Ok(value) = serde_json::from_str::<Value>(record) {
                    apply_start_metadata(&value, summary);
                }
            }
            last_line.clear();
            last_line.push_str(trimmed);
        }
        summary.event_count = count;

        // The terminal record, when present, carries the final status.
        if count > 1 {
            let (record, _) = split_frame(&last_line);
            if let Ok(value) = serde_json::from_str::<Value>(record) {
                if value.get("kind").and_then(Value::as_str) == Some(kind::TRACE_END) {
                    summary.status = value
                        .get("payload")
                        .and_then(|p| p.get("status"))
                        .and_then(Value::as_str)
                        .map(str::to_string);
                }
            }
        }
        Ok(())
    }

    /// Read every event of one trace, with skip accounting.
    pub fn read_trace(&self, trace_id: &str) -> Result<TraceReadResult> {
        let path = self.layout.events_file(trace_id);
        if !path.exists() {
            return Err(LogError::TraceNotFound(trace_id.to_string()));
        }

        let reader = BufReader::new(File::open(&path)?);
        let mut events = Vec::new();
        let mut report = ReadReport::default();

        for (idx, line) in reader.lines().enumerate() {
            let line = line?;
            let line_no = idx + 1;
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            match parse_line(trimmed, line_no, self.options.integrity) {
                Ok(event) => events.push(event),
                Err(Skip::Record { crc_mismatch }) => {
                    report.skipped_lines.push(line_no);
                    if crc_mismatch {
                        report.crc_mismatches += 1;
                    }
                }
                Err(Skip::Fatal(err)) => return Err(err),
            }
        }

        if report.is_partial() {
            warn!(
                trace_id,
                skipped = report.skipped_lines.len(),
                crc_mismatches = report.crc_mismatches,
                "trace read is partial"
            );
        }
        Ok(TraceReadResult { events, report })
    }

    /// Read every event of one trace, in file order.
    ///
    /// Convenience over [`read_trace`](TraceReader::read_trace); use
    /// that when the caller needs to know whether anything was skipped.
    pub fn get_events(&self, trace_id: &str) -> Result<Vec<Event>> {
        Ok(self.read_trace(trace_id)?.events)
    }

    /// Read a trace with its metadata.
    ///
    /// The display name and project come from the first `trace_start`
    /// event when present; otherwise the trace id doubles as the name.
    pub fn get_trace(&self, trace_id: &str) -> Result<TraceDetail> {
        let result = self.read_trace(trace_id)?;
        let mut detail = TraceDetail {
            id: trace_id.to_string(),
            name: trace_id.to_string(),
            project: None,
            events: result.events,
            report: result.report,
        };
        if let Some(start) = detail.events.iter().find(|e| e.kind == kind::TRACE_START) {
            if let Some(name) = start.payload.get("trace_name").and_then(Value::as_str) {
                detail.name = name.to_string();
            }
            detail.project = start
                .payload
                .get("project")
                .and_then(Value::as_str)
                .map(str::to_string);
        }
        Ok(detail)
    }

    /// Iterate a trace's events lazily, line by line.
    pub fn iter_events(&self, trace_id: &str) -> Result<EventIter> {
        let path = self.layout.events_file(trace_id);
        if !path.exists() {
            return Err(LogError::TraceNotFound(trace_id.to_string()));
        }
        Ok(EventIter {
            lines: BufReader::new(File::open(&path)?).lines(),
            line_no: 0,
            integrity: self.options.integrity,
        })
    }
}

fn apply_start_metadata(value: &Value, summary: &mut TraceSummary) {
    if value.get("kind").and_then(Value::as_str) != Some(kind::TRACE_START) {
        return;
    }
    if let Some(payload) = value.get("payload") {
        if let Some(name) = payload.get("trace_name").and_then(Value::as_str) {
            summary.name = name.to_string();
        }
        summary.project = payload
            .get("project")
            .and_then(Value::as_str)
            .map(str::to_string);
    }
    if let Some(ts_ns) = value.get("ts_unix_ns").and_then(Value::as_int) {
        summary.start_ts = ts_ns as f64 / 1e9;
    }
}

enum Skip {
    Record { crc_mismatch: bool },
    Fatal(LogError),
}

fn parse_line(trimmed: &str, line_no: usize, integrity: IntegrityMode) -> std::result::Result<Event, Skip> {
    let (record, status) = split_frame(trimmed);
    if let Some(FrameStatus::Mismatch { stored, computed }) = status {
        let reason = format!("CRC mismatch: stored {stored}, computed {computed}");
        return match integrity {
            IntegrityMode::Strict => Err(Skip::Fatal(LogError::Corruption {
                line: line_no,
                reason,
            })),
            IntegrityMode::Advisory => {
                warn!(line = line_no, %reason, "skipping corrupt record");
                Err(Skip::Record { crc_mismatch: true })
            }
        };
    }
    match serde_json::from_str::<Event>(record) {
        Ok(event) => Ok(event),
        Err(err) => match integrity {
            IntegrityMode::Strict => Err(Skip::Fatal(LogError::Corruption {
                line: line_no,
                reason: format!("parse error: {err}"),
            })),
            IntegrityMode::Advisory => {
                warn!(line = line_no, %err, "skipping unparsable record");
                Err(Skip::Record {
                    crc_mismatch: false,
                })
            }
        },
    }
}

/// Lazy event iterator over one trace's log file.
pub struct EventIter {
    lines: Lines<BufReader<File>>,
    line_no: usize,
    integrity: IntegrityMode,
}

impl Iterator for EventIter {
    type Item = Result<Event>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = match self.lines.next()? {
                Ok(line) => line,
                Err(err) => return Some(Err(err.into())),
            };
            self.line_no += 1;
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            match parse_line(trimmed, self.line_no, self.integrity) {
                Ok(event) => return Some(Ok(event)),
                Err(Skip::Record { .. }) => continue,
                Err(Skip::Fatal(err)) => return Some(Err(err)),
            }
        }
    }
}
