//! Redaction pipeline for Tracevault
//!
//! Every event's attrs and payload pass through [`Redactor::redact`]
//! immediately before serialization; nothing is ever persisted
//! unredacted. Redaction is irreversible; originals are never kept.
//!
//! The walk is a pure, deterministic, total function of
//! `(value, config)`:
//! - known secret shapes in strings are replaced with a marker
//! - sensitive map keys lose their values regardless of type
//! - long strings are truncated, bytes become placeholders
//! - recursion is depth-capped so pathological inputs stay cheap
//!
//! Redaction is idempotent: running the pipeline over already-redacted
//! output changes nothing.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod redactor;

pub use redactor::{
    Redactor, BYTES_PLACEHOLDER_PREFIX, DEPTH_LIMIT_MARKER, MAX_DEPTH, REDACTED_MARKER,
    TRUNCATION_MARKER,
};
