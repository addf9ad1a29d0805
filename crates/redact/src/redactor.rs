//! The redaction walk.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use once_cell::sync::Lazy;
use regex::Regex;
use rustc_hash::FxHashSet;
use std::collections::BTreeMap;
use tracevault_core::{RedactionConfig, Value};

/// Replacement for secret material.
pub const REDACTED_MARKER: &str = "<redacted>";

/// Appended to strings cut at the configured length.
pub const TRUNCATION_MARKER: &str = "...(truncated)";

/// Replacement for values nested deeper than [`MAX_DEPTH`].
pub const DEPTH_LIMIT_MARKER: &str = "<depth_limit>";

/// Prefix of the placeholder emitted for byte payloads.
pub const BYTES_PLACEHOLDER_PREFIX: &str = "<bytes:len=";

/// Recursion depth cap. Bounds worst-case cost on pathological inputs.
pub const MAX_DEPTH: usize = 6;

/// Ordered secret-shape patterns applied to every string field.
///
/// Order matters: raw key material first, then header/assignment forms
/// whose values may already have been replaced.
static PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"sk-[A-Za-z0-9]{16,}",
        r"(?i)bearer\s+[A-Za-z0-9\-\._~\+/]+=*",
        r"(?i)authorization\s*[:=]\s*[^\s,]+",
        r"(?i)api[_-]?key\s*[:=]\s*[^\s,]+",
        r"(?i)password\s*[:=]\s*[^\s,]+",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("built-in redaction pattern"))
    .collect()
});

/// Key names whose values are always redacted, whatever their type.
static SENSITIVE_KEYS: Lazy<FxHashSet<&'static str>> = Lazy::new(|| {
    [
        "authorization",
        "api_key",
        "apikey",
        "password",
        "token",
        "access_token",
        "secret",
        "openai_api_key",
        "anthropic_api_key",
        "bearer",
    ]
    .into_iter()
    .collect()
});

/// Sanitizes arbitrary structured values before they are persisted.
///
/// A `Redactor` is constructed once per tracer and never mutated.
/// [`redact`](Redactor::redact) is pure and never fails.
#[derive(Debug, Clone)]
pub struct Redactor {
    config: RedactionConfig,
}

impl Redactor {
    /// Build a redactor over the given settings.
    pub fn new(config: RedactionConfig) -> Self {
        Redactor { config }
    }

    /// Build a redactor from the environment.
    pub fn from_env() -> Self {
        Redactor::new(RedactionConfig::from_env())
    }

    /// The settings this redactor was built with.
    pub fn config(&self) -> &RedactionConfig {
        &self.config
    }

    /// Sanitize a value. Pure, deterministic, total.
    pub fn redact(&self, value: &Value) -> Value {
        self.sanitize(value, 0)
    }

    /// Sanitize an attrs map. Key checks apply at the top level too.
    pub fn redact_attrs(&self, attrs: &BTreeMap<String, Value>) -> BTreeMap<String, Value> {
        self.sanitize_map(attrs, 1)
    }

    fn sanitize(&self, value: &Value, depth: usize) -> Value {
        if depth > MAX_DEPTH {
            return Value::String(DEPTH_LIMIT_MARKER.to_string());
        }
        match value {
            Value::Null | Value::Bool(_) | Value::Int(_) | Value::Float(_) => value.clone(),
            Value::String(s) => Value::String(self.sanitize_str(s)),
            Value::Bytes(b) => {
                if self.config.store_full {
                    Value::String(BASE64.encode(b))
                } else {
                    Value::String(format!("{}{}>", BYTES_PLACEHOLDER_PREFIX, b.len()))
                }
            }
            Value::Array(items) => {
                Value::Array(items.iter().map(|v| self.sanitize(v, depth + 1)).collect())
            }
            Value::Object(map) => Value::Object(self.sanitize_map(map, depth + 1)),
        }
    }

    fn sanitize_map(&self, map: &BTreeMap<String, Value>, depth: usize) -> BTreeMap<String, Value> {
        map.iter()
            .map(|(key, value)| {
                if self.is_sensitive_key(key) {
                    (key.clone(), Value::String(REDACTED_MARKER.to_string()))
                } else {
                    (key.clone(), self.sanitize(value, depth))
                }
            })
            .collect()
    }

    fn is_sensitive_key(&self, key: &str) -> bool {
        let lowered = key.to_lowercase();
        SENSITIVE_KEYS.contains(lowered.as_str()) || self.config.extra_keys.contains(&lowered)
    }

    /// Scrub and, unless `store_full` is set, cut a string field.
    ///
    /// The truncation marker is excluded from the pattern scan: a cut
    /// landing right after `password=` would otherwise let the marker
    /// itself complete the assignment shape, and a second pass would
    /// mangle the already-sanitized string. Keeping the marker out of
    /// the scanned body makes the whole pipeline a fixed point.
    fn sanitize_str(&self, value: &str) -> String {
        let (body, mut cut) = match value.strip_suffix(TRUNCATION_MARKER) {
            Some(prefix) => (prefix, true),
            None => (value, false),
        };

        let mut redacted = apply_patterns(body);
        if !self.config.store_full {
            // A replacement can push the string back over the limit,
            // and a cut can expose a fresh assignment shape at the new
            // end of string; scrub after every cut until stable. Each
            // pass consumes at least one sensitive-key occurrence, so
            // this terminates.
            while let Some((byte_idx, _)) =
                redacted.char_indices().nth(self.config.max_field_len)
            {
                redacted.truncate(byte_idx);
                cut = true;
                let scrubbed = apply_patterns(&redacted);
                if scrubbed == redacted {
                    break;
                }
                redacted = scrubbed;
            }
        }
        if cut {
            redacted.push_str(TRUNCATION_MARKER);
        }
        redacted
    }
}

/// One pass of the ordered secret-shape substitutions.
fn apply_patterns(value: &str) -> String {
    let mut out = value.to_string();
    for pattern in PATTERNS.iter() {
        if pattern.is_match(&out) {
            out = pattern.replace_all(&out, REDACTED_MARKER).into_owned();
        }
    }
    out
}
