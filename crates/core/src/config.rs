//! Environment-driven configuration
//!
//! Settings are read once, at tracer construction, and are immutable
//! for the life of that tracer:
//!
//! | Variable | Meaning | Default |
//! |----------|---------|---------|
//! | `TRACEVAULT_ROOT` | Root directory for trace logs | `~/.tracevault/traces` |
//! | `TRACEVAULT_STORE_FULL` | Disable truncation, keep full bytes | `false` |
//! | `TRACEVAULT_MAX_FIELD_LEN` | String truncation threshold (chars) | `512` |
//! | `TRACEVAULT_REDACT` | Extra sensitive key names, comma-separated | empty |

use rustc_hash::FxHashSet;
use std::env;
use std::path::PathBuf;

/// Default string truncation threshold, in characters.
pub const DEFAULT_MAX_FIELD_LEN: usize = 512;

/// Floor for the truncation threshold; smaller configured values are
/// clamped up so markers stay readable.
pub const MIN_FIELD_LEN: usize = 64;

/// Redaction settings, immutable once a redactor is constructed.
#[derive(Debug, Clone)]
pub struct RedactionConfig {
    /// Keep full field content: no truncation, bytes kept as base64.
    pub store_full: bool,
    /// Truncation threshold for string fields, in characters.
    pub max_field_len: usize,
    /// Extra key names (lowercased) to redact, unioned with the
    /// built-in sensitive set.
    pub extra_keys: FxHashSet<String>,
}

impl Default for RedactionConfig {
    fn default() -> Self {
        RedactionConfig {
            store_full: false,
            max_field_len: DEFAULT_MAX_FIELD_LEN,
            extra_keys: FxHashSet::default(),
        }
    }
}

impl RedactionConfig {
    /// Load settings from the environment.
    pub fn from_env() -> Self {
        RedactionConfig {
            store_full: parse_bool(env::var("TRACEVAULT_STORE_FULL").ok().as_deref()),
            max_field_len: parse_field_len(env::var("TRACEVAULT_MAX_FIELD_LEN").ok().as_deref()),
            extra_keys: parse_key_list(env::var("TRACEVAULT_REDACT").ok().as_deref()),
        }
    }

    /// Builder-style: keep full content.
    pub fn store_full(mut self) -> Self {
        self.store_full = true;
        self
    }

    /// Builder-style: set the truncation threshold (clamped to the floor).
    pub fn max_field_len(mut self, len: usize) -> Self {
        self.max_field_len = len.max(MIN_FIELD_LEN);
        self
    }

    /// Builder-style: add an extra sensitive key name.
    pub fn redact_key(mut self, key: impl AsRef<str>) -> Self {
        self.extra_keys.insert(key.as_ref().to_lowercase());
        self
    }
}

/// Root directory for trace logs.
///
/// `TRACEVAULT_ROOT` wins; otherwise `~/.tracevault/traces`, falling
/// back to a relative path when no home directory can be determined.
pub fn root_dir() -> PathBuf {
    if let Some(root) = env::var_os("TRACEVAULT_ROOT") {
        return PathBuf::from(root);
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".tracevault")
        .join("traces")
}

fn parse_bool(raw: Option<&str>) -> bool {
    matches!(
        raw.map(|s| s.trim().to_lowercase()).as_deref(),
        Some("1") | Some("true") | Some("yes") | Some("on")
    )
}

fn parse_field_len(raw: Option<&str>) -> usize {
    raw.and_then(|s| s.trim().parse::<usize>().ok())
        .map(|v| v.max(MIN_FIELD_LEN))
        .unwrap_or(DEFAULT_MAX_FIELD_LEN)
}

fn parse_key_list(raw: Option<&str>) -> FxHashSet<String> {
    raw.map(|s| {
        s.split(',')
            .map(|item| item.trim().to_lowercase())
            .filter(|item| !item.is_empty())
            .collect()
    })
    .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RedactionConfig::default();
        assert!(!config.store_full);
        assert_eq!(config.max_field_len, DEFAULT_MAX_FIELD_LEN);
        assert!(config.extra_keys.is_empty());
    }

    #[test]
    fn test_parse_bool_variants() {
        assert!(parse_bool(Some("1")));
        assert!(parse_bool(Some("TRUE")));
        assert!(parse_bool(Some(" yes ")));
        assert!(!parse_bool(Some("0")));
        assert!(!parse_bool(Some("off")));
        assert!(!parse_bool(None));
    }

    #[test]
    fn test_field_len_floor() {
        assert_eq!(parse_field_len(Some("16")), MIN_FIELD_LEN);
        assert_eq!(parse_field_len(Some("1024")), 1024);
        assert_eq!(parse_field_len(Some("junk")), DEFAULT_MAX_FIELD_LEN);
        assert_eq!(parse_field_len(None), DEFAULT_MAX_FIELD_LEN);
    }

    #[test]
    fn test_key_list_lowercased_and_trimmed() {
        let keys = parse_key_list(Some("Session-Token, ,X_SECRET"));
        assert!(keys.contains("session-token"));
        assert!(keys.contains("x_secret"));
        assert_eq!(keys.len(), 2);
    }

    #[test]
    fn test_builder_clamps_len() {
        let config = RedactionConfig::default().max_field_len(8).redact_key("Cookie");
        assert_eq!(config.max_field_len, MIN_FIELD_LEN);
        assert!(config.extra_keys.contains("cookie"));
    }
}
