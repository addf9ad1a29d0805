//! Normalized trace diffing.
//!
//! Two captures of the same logical run differ in trace id, sequence
//! numbers, and timestamps even when nothing meaningful changed.
//! Diffing therefore works over *normalized* events: those fields are
//! dropped, and the remaining structure is compared field by field.

use tracevault_core::{Event, Value};

/// One difference between two normalized traces.
#[derive(Debug, Clone, PartialEq)]
pub struct DiffEntry {
    /// Dotted path to the differing field, e.g. `[2].payload.status`.
    pub path: String,
    /// What changed at that path.
    pub change: DiffChange,
}

/// The kind of change at a diff path.
#[derive(Debug, Clone, PartialEq)]
pub enum DiffChange {
    /// Present only on the right side.
    Added(Value),
    /// Present only on the left side.
    Removed(Value),
    /// Present on both sides with different values.
    Changed {
        /// Left-side value.
        from: Value,
        /// Right-side value.
        to: Value,
    },
}

/// Strip the capture-specific fields from an event.
///
/// Drops `trace_id`, `seq`, and `ts_unix_ns`; everything else (kind,
/// span linkage, level, attrs, payload) is compared.
pub fn normalize_event(event: &Event) -> Value {
    let raw = serde_json::to_value(event).unwrap_or(serde_json::Value::Null);
    let mut value = Value::from(raw);
    if let Value::Object(map) = &mut value {
        map.remove("trace_id");
        map.remove("seq");
        map.remove("ts_unix_ns");
    }
    value
}

/// Diff two event sequences pairwise after normalization.
///
/// Events are compared position by position; a length mismatch shows
/// up as `Added`/`Removed` entries for the unpaired tail.
pub fn diff_traces(left: &[Event], right: &[Event]) -> Vec<DiffEntry> {
    let mut entries = Vec::new();
    let common = left.len().min(right.len());

    for i in 0..common {
        let a = normalize_event(&left[i]);
        let b = normalize_event(&right[i]);
        diff_values(&format!("[{i}]"), &a, &b, &mut entries);
    }
    for (i, event) in left.iter().enumerate().skip(common) {
        entries.push(DiffEntry {
            path: format!("[{i}]"),
            change: DiffChange::Removed(normalize_event(event)),
        });
    }
    for (i, event) in right.iter().enumerate().skip(common) {
        entries.push(DiffEntry {
            path: format!("[{i}]"),
            change: DiffChange::Added(normalize_event(event)),
        });
    }
    entries
}

fn diff_values(path: &str, a: &Value, b: &Value, out: &mut Vec<DiffEntry>) {
    match (a, b) {
        (Value::Object(ma), Value::Object(mb)) => {
            for (key, va) in ma {
                let child = format!("{path}.{key}");
                match mb.get(key) {
                    Some(vb) => diff_values(&child, va, vb, out),
                    None => out.push(DiffEntry {
                        path: child,
                        change: DiffChange::Removed(va.clone()),
                    }),
                }
            }
            for (key, vb) in mb {
                if !ma.contains_key(key) {
                    out.push(DiffEntry {
                        path: format!("{path}.{key}"),
                        change: DiffChange::Added(vb.clone()),
                    });
                }
            }
        }
        (Value::Array(va), Value::Array(vb)) if va.len() == vb.len() => {
            for (i, (ea, eb)) in va.iter().zip(vb).enumerate() {
                diff_values(&format!("{path}[{i}]"), ea, eb, out);
            }
        }
        _ => {
            if a != b {
                out.push(DiffEntry {
                    path: path.to_string(),
                    change: DiffChange::Changed {
                        from: a.clone(),
                        to: b.clone(),
                    },
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use tracevault_core::{event::kind, Level, SCHEMA_VERSION};

    fn event(trace_id: &str, seq: u64, kind_name: &str, payload: Value) -> Event {
        Event {
            schema_version: SCHEMA_VERSION,
            trace_id: trace_id.to_string(),
            seq,
            ts_unix_ns: seq * 1000,
            kind: kind_name.to_string(),
            span_id: None,
            parent_span_id: None,
            level: Level::Info,
            attrs: BTreeMap::new(),
            payload,
        }
    }

    fn scripted(trace_id: &str, tool_payload: Value) -> Vec<Event> {
        vec![
            event(trace_id, 1, kind::TRACE_START, Value::object([("trace_name", "demo")])),
            event(trace_id, 2, kind::USER_INPUT, Value::object([("text", "hi")])),
            event(trace_id, 3, kind::TOOL_CALL, tool_payload),
            event(trace_id, 4, kind::TRACE_END, Value::object([("status", "ok")])),
        ]
    }

    #[test]
    fn test_identical_modulo_capture_fields() {
        // Different ids, seqs, timestamps; same content.
        let a = scripted("t1", Value::object([("tool", "search")]));
        let mut b = scripted("t2", Value::object([("tool", "search")]));
        for e in &mut b {
            e.ts_unix_ns += 999;
            e.seq += 10;
        }
        assert!(diff_traces(&a, &b).is_empty());
    }

    #[test]
    fn test_single_payload_difference() {
        let a = scripted("t1", Value::object([("tool", "search"), ("arg", "cats")]));
        let b = scripted("t2", Value::object([("tool", "search"), ("arg", "dogs")]));
        let entries = diff_traces(&a, &b);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].path, "[2].payload.arg");
        assert_eq!(
            entries[0].change,
            DiffChange::Changed {
                from: Value::from("cats"),
                to: Value::from("dogs"),
            }
        );
    }

    #[test]
    fn test_added_and_removed_keys() {
        let a = scripted("t1", Value::object([("tool", "search"), ("old", "x")]));
        let b = scripted("t2", Value::object([("tool", "search"), ("new", "y")]));
        let entries = diff_traces(&a, &b);
        assert_eq!(entries.len(), 2);
        assert!(entries.iter().any(|e| e.path == "[2].payload.old"
            && matches!(e.change, DiffChange::Removed(_))));
        assert!(entries.iter().any(|e| e.path == "[2].payload.new"
            && matches!(e.change, DiffChange::Added(_))));
    }

    #[test]
    fn test_length_mismatch_reported_as_tail() {
        let a = scripted("t1", Value::object([("tool", "search")]));
        let mut b = scripted("t2", Value::object([("tool", "search")]));
        b.push(event("t2", 5, kind::ERROR, Value::object([("error", "boom")])));
        let entries = diff_traces(&a, &b);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].path, "[4]");
        assert!(matches!(entries[0].change, DiffChange::Added(_)));
    }

    #[test]
    fn test_normalize_drops_capture_fields_only() {
        let e = event("t1", 3, kind::USER_INPUT, Value::object([("text", "hi")]));
        let normalized = normalize_event(&e);
        assert!(normalized.get("trace_id").is_none());
        assert!(normalized.get("seq").is_none());
        assert!(normalized.get("ts_unix_ns").is_none());
        assert_eq!(
            normalized.get("kind").and_then(Value::as_str),
            Some(kind::USER_INPUT)
        );
        assert!(normalized.get("payload").is_some());
    }
}
