use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TripwireError;

/// Typed scalar values carried by grouping terms and merged signal sources.
///
/// Serializes untagged so that a term value lands in JSON as the plain
/// scalar the aggregation engine reported.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum FieldValue {
    Text(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
}

impl FieldValue {
    /// Extract as string, returning None for non-text values.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Canonical string form used when ordering values for identifier hashing.
    pub fn sort_key(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Text(s) => write!(f, "{s}"),
            FieldValue::Integer(i) => write!(f, "{i}"),
            // `{}` prints integral floats without a fraction (5.0 -> "5").
            FieldValue::Float(x) => write!(f, "{x}"),
            FieldValue::Boolean(b) => write!(f, "{b}"),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Text(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::Text(s)
    }
}

impl From<i64> for FieldValue {
    fn from(i: i64) -> Self {
        FieldValue::Integer(i)
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        FieldValue::Boolean(b)
    }
}

impl TryFrom<&serde_json::Value> for FieldValue {
    type Error = TripwireError;

    fn try_from(value: &serde_json::Value) -> Result<Self, Self::Error> {
        match value {
            serde_json::Value::String(s) => Ok(FieldValue::Text(s.clone())),
            serde_json::Value::Bool(b) => Ok(FieldValue::Boolean(*b)),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Ok(FieldValue::Integer(i))
                } else if let Some(x) = n.as_f64() {
                    Ok(FieldValue::Float(x))
                } else {
                    Err(TripwireError::UnsupportedValue(n.to_string()))
                }
            }
            other => Err(TripwireError::UnsupportedValue(other.to_string())),
        }
    }
}

/// One `(field, value)` pair identifying a group at a single grouping level.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Term {
    pub field: String,
    pub value: FieldValue,
}

impl Term {
    /// Build a term, or `None` when the field is absent or empty.
    ///
    /// Fieldless pseudo-groupings produce no term at all rather than a
    /// term with a blank field name.
    pub fn new(field: Option<&str>, value: FieldValue) -> Option<Self> {
        match field {
            Some(f) if !f.is_empty() => Some(Self {
                field: f.to_string(),
                value,
            }),
            _ => None,
        }
    }
}
