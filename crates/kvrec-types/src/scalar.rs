use std::borrow::Cow;
use std::fmt;

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Timestamp with an explicit UTC offset, the value type behind
/// [`ScalarType::TIMESTAMP`].
pub type Timestamp = DateTime<FixedOffset>;

/// Identifier of a scalar type, used as the coercion registry key.
///
/// The built-in identifiers are exposed as associated constants. Hosts may
/// introduce their own (e.g. `"port"`) and register a coercion for them.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ScalarType(Cow<'static, str>);

impl ScalarType {
    /// UTF-8 text, stored verbatim.
    pub const TEXT: ScalarType = ScalarType(Cow::Borrowed("text"));
    /// 64-bit IEEE-754 floating point.
    pub const FLOAT64: ScalarType = ScalarType(Cow::Borrowed("f64"));
    /// 64-bit signed integer.
    pub const INT64: ScalarType = ScalarType(Cow::Borrowed("i64"));
    /// Boolean (`true` / `false`).
    pub const BOOL: ScalarType = ScalarType(Cow::Borrowed("bool"));
    /// RFC 3339 timestamp with offset.
    pub const TIMESTAMP: ScalarType = ScalarType(Cow::Borrowed("timestamp"));

    /// A static type identifier.
    pub const fn from_static(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }

    /// A type identifier built at runtime.
    pub fn new(name: impl Into<String>) -> Self {
        Self(Cow::Owned(name.into()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ScalarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ScalarType({})", self.0)
    }
}

impl fmt::Display for ScalarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A typed field value, the in-memory side of a coercion.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ScalarValue {
    Text(String),
    Float64(f64),
    Int64(i64),
    Bool(bool),
    Timestamp(Timestamp),
}

impl ScalarValue {
    /// Short variant name, used in mismatch diagnostics.
    pub fn variant_name(&self) -> &'static str {
        match self {
            Self::Text(_) => "text",
            Self::Float64(_) => "f64",
            Self::Int64(_) => "i64",
            Self::Bool(_) => "bool",
            Self::Timestamp(_) => "timestamp",
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_timestamp(&self) -> Option<&Timestamp> {
        match self {
            Self::Timestamp(ts) => Some(ts),
            _ => None,
        }
    }

    fn mismatch(&self, expected: &'static str) -> TypeError {
        TypeError::ValueMismatch {
            expected,
            actual: self.variant_name(),
        }
    }
}

impl From<String> for ScalarValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<&str> for ScalarValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<f64> for ScalarValue {
    fn from(v: f64) -> Self {
        Self::Float64(v)
    }
}

impl From<i64> for ScalarValue {
    fn from(v: i64) -> Self {
        Self::Int64(v)
    }
}

impl From<bool> for ScalarValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<Timestamp> for ScalarValue {
    fn from(ts: Timestamp) -> Self {
        Self::Timestamp(ts)
    }
}

impl TryFrom<ScalarValue> for String {
    type Error = TypeError;

    fn try_from(value: ScalarValue) -> Result<Self, Self::Error> {
        match value {
            ScalarValue::Text(s) => Ok(s),
            other => Err(other.mismatch("text")),
        }
    }
}

impl TryFrom<ScalarValue> for f64 {
    type Error = TypeError;

    fn try_from(value: ScalarValue) -> Result<Self, Self::Error> {
        value.as_f64().ok_or_else(|| value.mismatch("f64"))
    }
}

impl TryFrom<ScalarValue> for i64 {
    type Error = TypeError;

    fn try_from(value: ScalarValue) -> Result<Self, Self::Error> {
        value.as_i64().ok_or_else(|| value.mismatch("i64"))
    }
}

impl TryFrom<ScalarValue> for bool {
    type Error = TypeError;

    fn try_from(value: ScalarValue) -> Result<Self, Self::Error> {
        value.as_bool().ok_or_else(|| value.mismatch("bool"))
    }
}

impl TryFrom<ScalarValue> for Timestamp {
    type Error = TypeError;

    fn try_from(value: ScalarValue) -> Result<Self, Self::Error> {
        match value {
            ScalarValue::Timestamp(ts) => Ok(ts),
            other => Err(other.mismatch("timestamp")),
        }
    }
}
