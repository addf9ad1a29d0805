//! Trace capture facade.
//!
//! A [`Tracer`] exclusively owns one trace for its lifetime: it assigns
//! sequence numbers, runs every payload through redaction, and appends
//! framed records via the log layer. All methods take `&self`, so a
//! tracer can be shared across threads behind an `Arc`; the internal
//! lock spans sequence assignment and the append, which keeps file
//! order identical to sequence order.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::warn;
use uuid::Uuid;

use tracevault_core::event::kind;
use tracevault_core::{config, Event, Level, RedactionConfig, Value, SCHEMA_VERSION};
use tracevault_log::TraceWriter;
use tracevault_redact::Redactor;

use crate::current::{self, CurrentGuard};
use crate::error::Result;

/// Mutable tracer state, guarded by one lock so that sequence
/// assignment and the append happen atomically.
struct State {
    seq: u64,
    span_seq: u64,
    finished: bool,
}

/// Per-event options for [`Tracer::emit_with`].
#[derive(Debug, Clone, Default)]
pub struct EmitOptions {
    /// Severity level.
    pub level: Level,
    /// Span this event belongs to.
    pub span_id: Option<String>,
    /// Parent span for nested operations.
    pub parent_span_id: Option<String>,
    /// Small indexed key/value annotations.
    pub attrs: BTreeMap<String, Value>,
}

impl EmitOptions {
    /// Mark the event as an error-level event.
    pub fn error(mut self) -> Self {
        self.level = Level::Error;
        self
    }

    /// Attach the event to a span.
    pub fn span(mut self, span_id: impl Into<String>) -> Self {
        self.span_id = Some(span_id.into());
        self
    }

    /// Set the parent span.
    pub fn parent_span(mut self, span_id: impl Into<String>) -> Self {
        self.parent_span_id = Some(span_id.into());
        self
    }

    /// Add one annotation.
    pub fn attr(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attrs.insert(key.into(), value.into());
        self
    }
}

/// Builder for [`Tracer`].
///
/// ```ignore
/// let tracer = Tracer::builder("checkout-agent")
///     .project("storefront")
///     .start()?;
/// ```
pub struct TracerBuilder {
    name: String,
    project: Option<String>,
    root: Option<PathBuf>,
    redaction: Option<RedactionConfig>,
}

impl TracerBuilder {
    fn new(name: impl Into<String>) -> Self {
        TracerBuilder {
            name: name.into(),
            project: None,
            root: None,
            redaction: None,
        }
    }

    /// Group the trace under a project.
    pub fn project(mut self, project: impl Into<String>) -> Self {
        self.project = Some(project.into());
        self
    }

    /// Override the storage root (default: env, then `~/.tracevault/traces`).
    pub fn root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = Some(root.into());
        self
    }

    /// Override redaction settings (default: from the environment).
    pub fn redaction(mut self, config: RedactionConfig) -> Self {
        self.redaction = Some(config);
        self
    }

    /// Start the trace, bind it as the thread's current tracer, run
    /// `f`, and finish with a status matching the closure's result.
    ///
    /// `Ok` records status `ok`; `Err` records status `error` with the
    /// error's display text. The closure's own result is returned
    /// either way.
    pub fn scoped<T, E, F>(self, f: F) -> Result<std::result::Result<T, E>>
    where
        F: FnOnce(&Tracer) -> std::result::Result<T, E>,
        E: std::fmt::Display,
    {
        let tracer = Arc::new(self.start()?);
        let outcome = {
            let _guard: CurrentGuard = current::bind(Arc::clone(&tracer));
            f(&tracer)
        };
        match &outcome {
            Ok(_) => tracer.finish(None)?,
            Err(e) => tracer.finish(Some(&e.to_string()))?,
        }
        Ok(outcome)
    }

    /// Create the trace directory, open its log, and emit `trace_start`.
    pub fn start(self) -> Result<Tracer> {
        let trace_id = Uuid::new_v4().simple().to_string();
        let root = self.root.unwrap_or_else(config::root_dir);
        let redaction = self.redaction.unwrap_or_else(RedactionConfig::from_env);
        let writer = TraceWriter::create(&trace_id, &root)?;

        let tracer = Tracer {
            trace_id,
            name: self.name,
            project: self.project,
            redactor: Redactor::new(redaction),
            writer,
            state: Mutex::new(State {
                seq: 0,
                span_seq: 0,
                finished: false,
            }),
        };

        let mut start_payload = vec![("trace_name", Value::from(tracer.name.as_str()))];
        if let Some(project) = &tracer.project {
            start_payload.push(("project", Value::from(project.as_str())));
        }
        tracer.emit(kind::TRACE_START, Value::object(start_payload))?;
        Ok(tracer)
    }
}

/// Owns one trace: sequencing, redaction, and the append handle.
pub struct Tracer {
    trace_id: String,
    name: String,
    project: Option<String>,
    redactor: Redactor,
    writer: TraceWriter,
    state: Mutex<State>,
}

impl Tracer {
    /// Start building a tracer with the given trace name.
    pub fn builder(name: impl Into<String>) -> TracerBuilder {
        TracerBuilder::new(name)
    }

    /// Start a tracer with default settings.
    pub fn start(name: impl Into<String>) -> Result<Tracer> {
        TracerBuilder::new(name).start()
    }

    /// The unique id of this trace.
    pub fn trace_id(&self) -> &str {
        &self.trace_id
    }

    /// The human-readable trace name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The project, if set.
    pub fn project(&self) -> Option<&str> {
        self.project.as_deref()
    }

    /// Check if the trace has been finished.
    pub fn is_finished(&self) -> bool {
        self.state.lock().finished
    }

    /// Emit one event with default options.
    pub fn emit(&self, kind: &str, payload: Value) -> Result<Event> {
        self.emit_with(kind, payload, EmitOptions::default())
    }

    /// Emit one event.
    ///
    /// The payload and attrs are redacted before anything is persisted;
    /// raw values never touch disk. The sequence number is reserved
    /// before the write, so a failed append leaves a detectable gap
    /// rather than risking a duplicate.
    pub fn emit_with(&self, kind: &str, payload: Value, opts: EmitOptions) -> Result<Event> {
        let payload = self.redactor.redact(&payload);
        let attrs = self.redactor.redact_attrs(&opts.attrs);

        let mut state = self.state.lock();
        if state.finished {
            return Err(tracevault_log::LogError::WriterClosed(self.trace_id.clone()).into());
        }
        state.seq += 1;
        let event = Event {
            schema_version: SCHEMA_VERSION,
            trace_id: self.trace_id.clone(),
            seq: state.seq,
            ts_unix_ns: Event::now_unix_ns(),
            kind: kind.to_string(),
            span_id: opts.span_id,
            parent_span_id: opts.parent_span_id,
            level: opts.level,
            attrs,
            payload,
        };
        self.writer.append(&event)?;
        Ok(event)
    }

    /// Record a user-supplied input.
    pub fn user_input(&self, text: impl Into<Value>) -> Result<Event> {
        self.emit(kind::USER_INPUT, Value::object([("text", text.into())]))
    }

    /// Record an outbound model request.
    pub fn llm_request(&self, payload: Value) -> Result<Event> {
        self.emit(kind::LLM_REQUEST, payload)
    }

    /// Record a model response.
    pub fn llm_response(&self, payload: Value) -> Result<Event> {
        self.emit(kind::LLM_RESPONSE, payload)
    }

    /// Record a tool invocation.
    pub fn tool_call(&self, tool: &str, args: Value) -> Result<Event> {
        self.emit(
            kind::TOOL_CALL,
            Value::object([("tool", Value::from(tool)), ("args", args)]),
        )
    }

    /// Record a tool result.
    pub fn tool_result(&self, tool: &str, result: Value) -> Result<Event> {
        self.emit(
            kind::TOOL_RESULT,
            Value::object([("tool", Value::from(tool)), ("result", result)]),
        )
    }

    /// Record an error observed by instrumentation. The trace stays
    /// open; only [`finish`](Tracer::finish) closes it.
    pub fn error(&self, message: &str) -> Result<Event> {
        self.emit_with(
            kind::ERROR,
            Value::object([("error", Value::from(message))]),
            EmitOptions::default().error(),
        )
    }

    /// Next span id from the per-trace monotonic counter (`s1`, `s2`, ...).
    ///
    /// Instrumentation that emits its own paired request/response
    /// events calls this directly; [`span_start`](Tracer::span_start)
    /// wraps it for the common case.
    pub fn new_span_id(&self) -> String {
        let mut state = self.state.lock();
        state.span_seq += 1;
        format!("s{}", state.span_seq)
    }

    /// Open a span and return its id for nesting and closing.
    pub fn span_start(&self, name: &str, parent_span_id: Option<&str>) -> Result<String> {
        let span_id = self.new_span_id();
        let mut opts = EmitOptions::default().span(span_id.clone());
        if let Some(parent) = parent_span_id {
            opts = opts.parent_span(parent);
        }
        self.emit_with(
            kind::SPAN_START,
            Value::object([("name", Value::from(name))]),
            opts,
        )?;
        Ok(span_id)
    }

    /// Close a span previously opened with [`span_start`](Tracer::span_start).
    pub fn span_end(&self, span_id: &str) -> Result<Event> {
        self.emit_with(
            kind::SPAN_END,
            Value::Object(BTreeMap::new()),
            EmitOptions::default().span(span_id),
        )
    }

    /// Emit the terminal `trace_end` event and close the log.
    ///
    /// `error` of `None` records status `ok`; `Some(description)`
    /// records status `error` with the description. Idempotent: a
    /// second call is a no-op.
    pub fn finish(&self, error: Option<&str>) -> Result<()> {
        let payload = match error {
            None => Value::object([("status", Value::from("ok"))]),
            Some(description) => Value::object([
                ("status", Value::from("error")),
                ("error", Value::from(description)),
            ]),
        };
        let payload = self.redactor.redact(&payload);

        let mut state = self.state.lock();
        if state.finished {
            return Ok(());
        }
        state.finished = true;
        state.seq += 1;
        let event = Event {
            schema_version: SCHEMA_VERSION,
            trace_id: self.trace_id.clone(),
            seq: state.seq,
            ts_unix_ns: Event::now_unix_ns(),
            kind: kind::TRACE_END.to_string(),
            span_id: None,
            parent_span_id: None,
            level: if error.is_some() {
                Level::Error
            } else {
                Level::Info
            },
            attrs: BTreeMap::new(),
            payload,
        };
        self.writer.append(&event)?;
        self.writer.finish()?;
        Ok(())
    }
}

impl Drop for Tracer {
    /// A dropped-but-unfinished tracer still gets a terminal record, so
    /// readers can distinguish "crashed" from "truncated log".
    fn drop(&mut self) {
        if !self.is_finished() {
            if let Err(e) = self.finish(Some("trace dropped before finish")) {
                warn!(trace_id = %self.trace_id, error = %e, "failed to close dropped trace");
            }
        }
    }
}

/// Run a closure inside a fresh trace with default settings.
///
/// Shorthand for [`Tracer::builder`] followed by
/// [`scoped`](TracerBuilder::scoped); use the builder form to override
/// the root or redaction settings.
pub fn with_trace<T, E, F>(name: &str, f: F) -> Result<std::result::Result<T, E>>
where
    F: FnOnce(&Tracer) -> std::result::Result<T, E>,
    E: std::fmt::Display,
{
    Tracer::builder(name).scoped(f)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;
    use tracevault_log::TraceReader;

    fn reader(root: &std::path::Path) -> TraceReader {
        TraceReader::new(root)
    }

    #[test]
    fn test_start_emits_trace_start() {
        let dir = tempdir().expect("tempdir");
        let tracer = Tracer::builder("demo")
            .project("tests")
            .root(dir.path())
            .start()
            .expect("start");

        let events = reader(dir.path())
            .get_events(tracer.trace_id())
            .expect("read");
        assert_eq!(events.len(), 1);
        let start = &events[0];
        assert_eq!(start.kind, kind::TRACE_START);
        assert_eq!(start.seq, 1);
        assert_eq!(
            start.payload.get("trace_name").and_then(|v| v.as_str()),
            Some("demo")
        );
        assert_eq!(
            start.payload.get("project").and_then(|v| v.as_str()),
            Some("tests")
        );
    }

    #[test]
    fn test_sequences_are_gap_free() {
        let dir = tempdir().expect("tempdir");
        let tracer = Tracer::builder("seq").root(dir.path()).start().expect("start");
        tracer.user_input("hello").expect("input");
        tracer
            .llm_request(Value::object([("prompt", "hello")]))
            .expect("request");
        tracer.finish(None).expect("finish");

        let events = reader(dir.path())
            .get_events(tracer.trace_id())
            .expect("read");
        let seqs: Vec<u64> = events.iter().map(|e| e.seq).collect();
        assert_eq!(seqs, vec![1, 2, 3, 4]);
        assert_eq!(events.last().expect("end").kind, kind::TRACE_END);
    }

    #[test]
    fn test_emit_after_finish_is_rejected() {
        let dir = tempdir().expect("tempdir");
        let tracer = Tracer::builder("closed").root(dir.path()).start().expect("start");
        tracer.finish(None).expect("finish");

        let err = tracer.user_input("late").expect_err("must reject");
        assert!(matches!(
            err,
            crate::error::Error::Log(tracevault_log::LogError::WriterClosed(_))
        ));
        // finish stays idempotent
        tracer.finish(None).expect("second finish");
    }

    #[test]
    fn test_finish_with_error_records_status() {
        let dir = tempdir().expect("tempdir");
        let tracer = Tracer::builder("failing").root(dir.path()).start().expect("start");
        tracer.finish(Some("tool exploded")).expect("finish");

        let events = reader(dir.path())
            .get_events(tracer.trace_id())
            .expect("read");
        let end = events.last().expect("end");
        assert_eq!(end.kind, kind::TRACE_END);
        assert_eq!(end.level, Level::Error);
        assert_eq!(end.payload.get("status").and_then(|v| v.as_str()), Some("error"));
        assert_eq!(
            end.payload.get("error").and_then(|v| v.as_str()),
            Some("tool exploded")
        );
    }

    #[test]
    fn test_payloads_are_redacted_before_persist() {
        let dir = tempdir().expect("tempdir");
        let tracer = Tracer::builder("secrets").root(dir.path()).start().expect("start");
        tracer
            .llm_request(Value::object([
                ("api_key", Value::from("sk-abcdefghijklmnop1234")),
                ("prompt", Value::from("hi")),
            ]))
            .expect("request");
        tracer.finish(None).expect("finish");

        let events = reader(dir.path())
            .get_events(tracer.trace_id())
            .expect("read");
        let request = &events[1];
        assert_eq!(
            request.payload.get("api_key").and_then(|v| v.as_str()),
            Some("<redacted>")
        );
        assert_eq!(request.payload.get("prompt").and_then(|v| v.as_str()), Some("hi"));
    }

    #[test]
    fn test_spans_nest_and_close() {
        let dir = tempdir().expect("tempdir");
        let tracer = Tracer::builder("spans").root(dir.path()).start().expect("start");
        let outer = tracer.span_start("plan", None).expect("outer");
        let inner = tracer.span_start("retrieve", Some(&outer)).expect("inner");
        tracer.span_end(&inner).expect("close inner");
        tracer.span_end(&outer).expect("close outer");
        tracer.finish(None).expect("finish");

        let events = reader(dir.path())
            .get_events(tracer.trace_id())
            .expect("read");
        assert_eq!(events[1].span_id.as_deref(), Some("s1"));
        assert_eq!(events[2].span_id.as_deref(), Some("s2"));
        assert_eq!(events[2].parent_span_id.as_deref(), Some("s1"));
        assert_eq!(events[3].kind, kind::SPAN_END);
    }

    #[test]
    fn test_drop_emits_error_end() {
        let dir = tempdir().expect("tempdir");
        let trace_id = {
            let tracer = Tracer::builder("dropped").root(dir.path()).start().expect("start");
            tracer.user_input("partial work").expect("input");
            tracer.trace_id().to_string()
        };

        let events = reader(dir.path()).get_events(&trace_id).expect("read");
        let end = events.last().expect("end");
        assert_eq!(end.kind, kind::TRACE_END);
        assert_eq!(end.payload.get("status").and_then(|v| v.as_str()), Some("error"));
    }

    #[test]
    fn test_scoped_closes_on_error() {
        let dir = tempdir().expect("tempdir");
        let mut trace_id = String::new();
        let outcome: crate::error::Result<std::result::Result<(), String>> =
            Tracer::builder("scoped").root(dir.path()).scoped(|tracer| {
                trace_id = tracer.trace_id().to_string();
                tracer.user_input("boom incoming").expect("input");
                Err("tool exploded".to_string())
            });

        let inner = outcome.expect("trace machinery");
        assert_eq!(inner.expect_err("closure error"), "tool exploded");

        let events = reader(dir.path()).get_events(&trace_id).expect("read");
        let end = events.last().expect("end");
        assert_eq!(end.kind, kind::TRACE_END);
        assert_eq!(
            end.payload.get("error").and_then(|v| v.as_str()),
            Some("tool exploded")
        );
    }

    #[test]
    fn test_scoped_records_ok_and_unbinds() {
        let dir = tempdir().expect("tempdir");
        let mut trace_id = String::new();
        let outcome: crate::error::Result<std::result::Result<u32, String>> =
            Tracer::builder("scoped-ok").root(dir.path()).scoped(|tracer| {
                assert!(crate::current::current().is_some());
                trace_id = tracer.trace_id().to_string();
                Ok(7)
            });
        assert_eq!(outcome.expect("trace machinery").expect("closure"), 7);
        assert!(crate::current::current().is_none());

        let events = reader(dir.path()).get_events(&trace_id).expect("read");
        let end = events.last().expect("end");
        assert_eq!(end.payload.get("status").and_then(|v| v.as_str()), Some("ok"));
    }
}
