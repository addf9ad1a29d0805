//! Value model for event payloads and attributes
//!
//! `Value` is the canonical payload type for all Tracevault records.
//! It is a closed enum: the redactor and the serializer are total over
//! these eight variants, and nothing else can appear in a payload.
//!
//! ## Equality Rules
//!
//! - Different variants are never equal (no type coercion)
//! - `Int(1)` != `Float(1.0)`
//! - `String("abc")` != `Bytes([97, 98, 99])`
//!
//! ## Wire Encoding
//!
//! Values serialize to plain JSON. `Bytes` encodes as a base64 string
//! (JSON has no binary type); deserialization therefore never produces
//! `Bytes`. Object keys are kept in a sorted map so a record always
//! serializes to the same line of text, which the CRC framing relies on.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::de::{Deserialize, Deserializer};
use serde::ser::{Serialize, Serializer};
use std::collections::BTreeMap;

/// Canonical payload value.
///
/// The closed set of shapes an event payload or attribute can take.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// JSON null / absence of value
    Null,
    /// Boolean true or false
    Bool(bool),
    /// 64-bit signed integer
    Int(i64),
    /// 64-bit IEEE-754 floating point
    Float(f64),
    /// UTF-8 encoded string
    String(String),
    /// Arbitrary binary data (never survives the wire; see module docs)
    Bytes(Vec<u8>),
    /// Ordered sequence of values
    Array(Vec<Value>),
    /// String-keyed map of values, sorted for canonical output
    Object(BTreeMap<String, Value>),
}

impl Value {
    /// Returns the variant name, for error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "Null",
            Value::Bool(_) => "Bool",
            Value::Int(_) => "Int",
            Value::Float(_) => "Float",
            Value::String(_) => "String",
            Value::Bytes(_) => "Bytes",
            Value::Array(_) => "Array",
            Value::Object(_) => "Object",
        }
    }

    /// Check if this value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Try to get as bool.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Try to get as i64.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Try to get as string slice.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Try to get as array slice.
    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(a) => Some(a),
            _ => None,
        }
    }

    /// Try to get as object reference.
    pub fn as_object(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Object(o) => Some(o),
            _ => None,
        }
    }

    /// Look up a field by key. Returns `None` for non-objects.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.as_object().and_then(|o| o.get(key))
    }

    /// Build an object value from key/value pairs.
    pub fn object<K, V, I>(pairs: I) -> Value
    where
        K: Into<String>,
        V: Into<Value>,
        I: IntoIterator<Item = (K, V)>,
    {
        Value::Object(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Build a value from any producer that exposes a field view.
    pub fn from_fields<T: AsFields>(source: &T) -> Value {
        Value::Object(source.fields())
    }

    /// Canonical single-line JSON rendering.
    ///
    /// This is the textual form replay matches prompt substrings
    /// against, and the form the writer persists.
    pub fn to_canonical_string(&self) -> String {
        // Serialization over the closed enum cannot fail.
        serde_json::to_string(self).unwrap_or_else(|_| "null".to_string())
    }

    /// Convert into the serde_json value model.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Int(i) => serde_json::Value::from(*i),
            Value::Float(f) => serde_json::Value::from(*f),
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::Bytes(b) => serde_json::Value::String(BASE64.encode(b)),
            Value::Array(items) => {
                serde_json::Value::Array(items.iter().map(Value::to_json).collect())
            }
            Value::Object(map) => serde_json::Value::Object(
                map.iter().map(|(k, v)| (k.clone(), v.to_json())).collect(),
            ),
        }
    }
}

/// Capability interface for producers that can be viewed as a mapping
/// of fields.
///
/// Structured types implement this so the redactor can walk them as
/// objects. Anything that cannot provide a field view should be
/// rendered to a string by the producer before it reaches a payload.
pub trait AsFields {
    /// The field-name → value view of this producer.
    fn fields(&self) -> BTreeMap<String, Value>;
}

// =========================================================================
// Conversions
// =========================================================================

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::Int(i)
                } else {
                    Value::Float(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::Array(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => Value::Object(
                map.into_iter().map(|(k, v)| (k, Value::from(v))).collect(),
            ),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl<V: Into<Value>> From<Option<V>> for Value {
    fn from(v: Option<V>) -> Self {
        match v {
            Some(inner) => inner.into(),
            None => Value::Null,
        }
    }
}

impl<V: Into<Value>> From<Vec<V>> for Value {
    fn from(items: Vec<V>) -> Self {
        Value::Array(items.into_iter().map(Into::into).collect())
    }
}

// =========================================================================
// Serde
// =========================================================================

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Int(i) => serializer.serialize_i64(*i),
            Value::Float(f) => serializer.serialize_f64(*f),
            Value::String(s) => serializer.serialize_str(s),
            Value::Bytes(b) => serializer.serialize_str(&BASE64.encode(b)),
            Value::Array(items) => items.serialize(serializer),
            Value::Object(map) => map.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = serde_json::Value::deserialize(deserializer)?;
        Ok(Value::from(raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_no_type_coercion() {
        assert_ne!(Value::Int(1), Value::Float(1.0));
        assert_ne!(
            Value::String("abc".to_string()),
            Value::Bytes(b"abc".to_vec())
        );
    }

    #[test]
    fn test_json_roundtrip() {
        let value = Value::object([
            ("name", Value::from("demo")),
            ("count", Value::Int(3)),
            ("ratio", Value::Float(0.5)),
            ("tags", Value::from(vec!["a", "b"])),
            ("missing", Value::Null),
        ]);

        let line = value.to_canonical_string();
        let back: Value = serde_json::from_str(&line).expect("parse failed");
        assert_eq!(value, back);
    }

    #[test]
    fn test_canonical_output_is_sorted() {
        let mut map = BTreeMap::new();
        map.insert("zeta".to_string(), Value::Int(1));
        map.insert("alpha".to_string(), Value::Int(2));
        let line = Value::Object(map).to_canonical_string();
        assert_eq!(line, r#"{"alpha":2,"zeta":1}"#);
    }

    #[test]
    fn test_bytes_serialize_as_base64() {
        let line = Value::Bytes(b"hi".to_vec()).to_canonical_string();
        assert_eq!(line, format!("\"{}\"", BASE64.encode(b"hi")));
    }

    #[test]
    fn test_from_serde_json_numbers() {
        let value = Value::from(json!({"i": 7, "f": 2.5}));
        assert_eq!(value.get("i"), Some(&Value::Int(7)));
        assert_eq!(value.get("f"), Some(&Value::Float(2.5)));
    }

    #[test]
    fn test_as_fields_view() {
        struct Request {
            model: String,
            temperature: f64,
        }

        impl AsFields for Request {
            fn fields(&self) -> BTreeMap<String, Value> {
                BTreeMap::from([
                    ("model".to_string(), Value::from(self.model.as_str())),
                    ("temperature".to_string(), Value::Float(self.temperature)),
                ])
            }
        }

        let req = Request {
            model: "gpt-4".to_string(),
            temperature: 0.2,
        };
        let value = Value::from_fields(&req);
        assert_eq!(value.get("model").and_then(Value::as_str), Some("gpt-4"));
    }
}
