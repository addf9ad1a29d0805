//! Core types for Tracevault
//!
//! This crate defines the types shared by every layer of the system:
//! - `Value`: the closed recursive value model for event payloads
//! - `Event`: one immutable, sequenced record within a trace
//! - `RedactionConfig`: sanitization settings, loaded once per tracer
//!
//! Payloads are modeled as a closed tagged union rather than an open
//! dynamic type so the redaction walk and the serializer are total
//! functions over a known shape.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod event;
pub mod value;

pub use config::RedactionConfig;
pub use event::{Event, Level, TraceStatus, SCHEMA_VERSION};
pub use value::{AsFields, Value};
