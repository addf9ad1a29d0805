//! Forward-only replay cursor.

use crate::error::{ReplayError, Result};
use tracevault_core::{event::kind, Event, Value};
use tracevault_log::TraceReader;

/// Drives an agent's logic deterministically from a captured trace.
///
/// Holds the trace's fully materialized event sequence and a
/// forward-only cursor. Matching operations consume every event they
/// inspect, matched or not; the cursor never moves backwards.
pub struct Replayer {
    events: Vec<Event>,
    cursor: usize,
}

impl Replayer {
    /// Replay over an already-read event sequence.
    pub fn new(events: Vec<Event>) -> Self {
        Replayer { events, cursor: 0 }
    }

    /// Load a trace through a reader and replay it.
    pub fn load(reader: &TraceReader, trace_id: &str) -> Result<Self> {
        let events = reader.get_events(trace_id).map_err(|err| {
            if err.is_not_found() {
                ReplayError::TraceNotFound(trace_id.to_string())
            } else {
                ReplayError::Log(err)
            }
        })?;
        Ok(Replayer::new(events))
    }

    /// The full event sequence being replayed.
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// Current cursor position.
    pub fn position(&self) -> usize {
        self.cursor
    }

    /// Check if the cursor is at the end of the trace.
    pub fn is_exhausted(&self) -> bool {
        self.cursor >= self.events.len()
    }

    /// The event at the cursor, without advancing. `None` at end.
    pub fn peek(&self) -> Option<&Event> {
        self.events.get(self.cursor)
    }

    /// Advance the cursor by one, saturating at the end.
    pub fn advance(&mut self) {
        if self.cursor < self.events.len() {
            self.cursor += 1;
        }
    }

    /// Scan forward to the next `user_input` event and return its text.
    ///
    /// Every inspected event is consumed, matched or not. Fails with
    /// [`ReplayError::NoInput`] when the trace ends first, and with
    /// [`ReplayError::MalformedEvent`] when a matching event has no
    /// `text` payload field.
    pub fn consume_input(&mut self) -> Result<String> {
        while let Some(event) = self.take_next() {
            if event.kind != kind::USER_INPUT {
                continue;
            }
            return match event.payload_text() {
                Some(text) => Ok(text.to_string()),
                None => Err(ReplayError::MalformedEvent {
                    seq: event.seq,
                    reason: "user_input payload missing 'text'".to_string(),
                }),
            };
        }
        Err(ReplayError::NoInput)
    }

    /// Scan forward for the next request/response pair and return the
    /// response payload, as stored (replay never un-redacts).
    ///
    /// With `prompt_match` set, the request's canonical payload
    /// rendering must contain the substring; otherwise the agent under
    /// replay has diverged from the recorded script and
    /// [`ReplayError::Divergence`] is returned.
    pub fn expect_llm(&mut self, prompt_match: Option<&str>) -> Result<Value> {
        let request = self
            .scan_for(kind::LLM_REQUEST)
            .ok_or(ReplayError::NoRequest)?;

        if let Some(expected) = prompt_match {
            let rendered = request.payload.to_canonical_string();
            if !rendered.contains(expected) {
                return Err(ReplayError::Divergence {
                    expected: expected.to_string(),
                    got: rendered,
                });
            }
        }

        let response = self
            .scan_for(kind::LLM_RESPONSE)
            .ok_or(ReplayError::NoResponse)?;
        Ok(response.payload.clone())
    }

    fn take_next(&mut self) -> Option<&Event> {
        let event = self.events.get(self.cursor)?;
        self.cursor += 1;
        Some(event)
    }

    fn scan_for(&mut self, wanted: &str) -> Option<&Event> {
        while self.cursor < self.events.len() {
            let idx = self.cursor;
            self.cursor += 1;
            if self.events[idx].kind == wanted {
                return Some(&self.events[idx]);
            }
        }
        None
    }
}
