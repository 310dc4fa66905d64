//! Scalar values exchanged between entities, predicates and the store.
//!
//! Caller input arrives as primitive JSON (strings, integers, booleans) and is
//! coerced into a [`Value`] of the attribute's [`FieldKind`] before it can
//! reach a predicate or a statement.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value as JsonValue;
use thiserror::Error;

/// A store row keyed by static column name.
pub type Row = BTreeMap<&'static str, Value>;

/// Scalar kind of a column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    Text,
    Integer,
    Boolean,
    Timestamp,
}

impl FieldKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Integer => "integer",
            Self::Boolean => "boolean",
            Self::Timestamp => "timestamp",
        }
    }

    /// Coerce an untrusted primitive into this kind.
    ///
    /// Query strings carry everything as text, so numeric and boolean kinds
    /// also accept their textual form. Returns `None` when the input cannot
    /// represent this kind.
    pub fn coerce(&self, raw: &JsonValue) -> Option<Value> {
        match (self, raw) {
            (Self::Text, JsonValue::String(s)) => Some(Value::Text(s.clone())),
            (Self::Text, JsonValue::Number(n)) => Some(Value::Text(n.to_string())),
            (Self::Text, JsonValue::Bool(b)) => Some(Value::Text(b.to_string())),
            (Self::Integer, JsonValue::Number(n)) => n.as_i64().map(Value::Integer),
            (Self::Integer, JsonValue::String(s)) => s.trim().parse().ok().map(Value::Integer),
            (Self::Boolean, JsonValue::Bool(b)) => Some(Value::Boolean(*b)),
            (Self::Boolean, JsonValue::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "1" => Some(Value::Boolean(true)),
                "false" | "0" => Some(Value::Boolean(false)),
                _ => None,
            },
            (Self::Timestamp, JsonValue::String(s)) => DateTime::parse_from_rfc3339(s.trim())
                .ok()
                .map(|dt| Value::Timestamp(dt.with_timezone(&Utc))),
            _ => None,
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A typed scalar
///
/// Serializes untagged, so `Timestamp` renders as RFC 3339 text and `Null`
/// as JSON `null`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Boolean(bool),
    Integer(i64),
    Text(String),
    Timestamp(DateTime<Utc>),
}

impl Value {
    /// Name of the variant, used in decode errors.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Boolean(_) => "boolean",
            Self::Integer(_) => "integer",
            Self::Text(_) => "text",
            Self::Timestamp(_) => "timestamp",
        }
    }

    /// True for `Null` and empty text: an identity that still has to be assigned.
    pub fn is_blank(&self) -> bool {
        match self {
            Self::Null => true,
            Self::Text(s) => s.is_empty(),
            _ => false,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Boolean(b) => write!(f, "{}", b),
            Self::Integer(n) => write!(f, "{}", n),
            Self::Text(s) => f.write_str(s),
            Self::Timestamp(ts) => f.write_str(&ts.to_rfc3339()),
        }
    }
}

/// A value did not have the kind its destination expects
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("expected {expected}, found {found}")]
pub struct ValueError {
    pub expected: FieldKind,
    pub found: &'static str,
}

impl ValueError {
    fn new(expected: FieldKind, found: &Value) -> Self {
        Self {
            expected,
            found: found.kind_name(),
        }
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Text(s.to_owned())
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Self::Integer(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Boolean(b)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(ts: DateTime<Utc>) -> Self {
        Self::Timestamp(ts)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        opt.map(Into::into).unwrap_or(Self::Null)
    }
}

impl TryFrom<Value> for String {
    type Error = ValueError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Text(s) => Ok(s),
            other => Err(ValueError::new(FieldKind::Text, &other)),
        }
    }
}

impl TryFrom<Value> for i64 {
    type Error = ValueError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Integer(n) => Ok(n),
            other => Err(ValueError::new(FieldKind::Integer, &other)),
        }
    }
}

impl TryFrom<Value> for bool {
    type Error = ValueError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Boolean(b) => Ok(b),
            other => Err(ValueError::new(FieldKind::Boolean, &other)),
        }
    }
}

impl TryFrom<Value> for Option<DateTime<Utc>> {
    type Error = ValueError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Timestamp(ts) => Ok(Some(ts)),
            Value::Null => Ok(None),
            other => Err(ValueError::new(FieldKind::Timestamp, &other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn coerces_query_string_text() {
        assert_eq!(FieldKind::Integer.coerce(&json!("2021")), Some(Value::Integer(2021)));
        assert_eq!(FieldKind::Boolean.coerce(&json!("TRUE")), Some(Value::Boolean(true)));
        assert_eq!(FieldKind::Text.coerce(&json!(42)), Some(Value::Text("42".into())));
    }

    #[test]
    fn rejects_uncoercible_input() {
        assert_eq!(FieldKind::Integer.coerce(&json!("abc")), None);
        assert_eq!(FieldKind::Integer.coerce(&json!(1.5)), None);
        assert_eq!(FieldKind::Timestamp.coerce(&json!("yesterday")), None);
        assert_eq!(FieldKind::Text.coerce(&json!(null)), None);
    }

    #[test]
    fn timestamps_normalize_to_utc() {
        let value = FieldKind::Timestamp
            .coerce(&json!("2024-05-01T12:00:00+02:00"))
            .unwrap();
        assert_eq!(value.to_string(), "2024-05-01T10:00:00+00:00");
    }

    #[test]
    fn serializes_untagged() {
        assert_eq!(serde_json::to_value(Value::Null).unwrap(), json!(null));
        assert_eq!(serde_json::to_value(Value::Integer(7)).unwrap(), json!(7));
        assert_eq!(serde_json::to_value(Value::from("x")).unwrap(), json!("x"));
    }

    #[test]
    fn conversion_reports_kinds() {
        let err = String::try_from(Value::Integer(1)).unwrap_err();
        assert_eq!(err.to_string(), "expected text, found integer");
    }

    #[test]
    fn blank_identities() {
        assert!(Value::Null.is_blank());
        assert!(Value::from("").is_blank());
        assert!(!Value::from("abc").is_blank());
        assert!(!Value::Integer(0).is_blank());
    }
}
