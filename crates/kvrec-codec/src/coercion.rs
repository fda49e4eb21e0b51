//! Scalar ⇄ string coercions, keyed by [`ScalarType`].
//!
//! A [`CoercionRegistry`] is assembled once through its builder and is
//! immutable afterwards, so lookups need no synchronization. Hosts extend it
//! with their own scalar types before handing it to a
//! [`Codec`](crate::Codec).

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use chrono::DateTime;
use kvrec_types::{ScalarType, ScalarValue, Timestamp};
use tracing::debug;

use crate::error::CoercionError;

type ParseFn = dyn Fn(&str) -> Result<ScalarValue, String> + Send + Sync;
type FormatFn = dyn Fn(&ScalarValue) -> Option<String> + Send + Sync;

/// A parse/format pair for one scalar type.
///
/// `parse` reports a human-readable reason on failure. `format` returns
/// `None` when handed a value of a variant it does not handle.
#[derive(Clone)]
pub struct Coercion {
    parse: Arc<ParseFn>,
    format: Arc<FormatFn>,
}

impl Coercion {
    pub fn new<P, F>(parse: P, format: F) -> Self
    where
        P: Fn(&str) -> Result<ScalarValue, String> + Send + Sync + 'static,
        F: Fn(&ScalarValue) -> Option<String> + Send + Sync + 'static,
    {
        Self {
            parse: Arc::new(parse),
            format: Arc::new(format),
        }
    }

    fn text() -> Self {
        Self::new(
            |s| Ok(ScalarValue::Text(s.to_string())),
            |v| v.as_text().map(str::to_string),
        )
    }

    fn float64() -> Self {
        Self::new(
            |s| {
                s.trim()
                    .parse::<f64>()
                    .map(ScalarValue::Float64)
                    .map_err(|e| e.to_string())
            },
            |v| v.as_f64().map(|f| f.to_string()),
        )
    }

    fn int64() -> Self {
        Self::new(
            |s| {
                s.trim()
                    .parse::<i64>()
                    .map(ScalarValue::Int64)
                    .map_err(|e| e.to_string())
            },
            |v| v.as_i64().map(|i| i.to_string()),
        )
    }

    fn boolean() -> Self {
        Self::new(
            |s| match s.trim() {
                "true" => Ok(ScalarValue::Bool(true)),
                "false" => Ok(ScalarValue::Bool(false)),
                other => Err(format!("expected 'true' or 'false', got {other:?}")),
            },
            |v| v.as_bool().map(|b| b.to_string()),
        )
    }

    fn timestamp() -> Self {
        Self::new(
            |s| parse_timestamp(s).map(ScalarValue::Timestamp),
            |v| v.as_timestamp().map(|ts| ts.to_rfc3339()),
        )
    }
}

/// ISO-8601 date-time with an offset.
///
/// Besides RFC 3339 this accepts minute precision (`2016-03-04T10:15+01:00`)
/// and a trailing zone region id (`...+01:00[Europe/Paris]`, `...Z[UTC]`).
/// The region id is dropped; the offset is kept.
fn parse_timestamp(input: &str) -> Result<Timestamp, String> {
    let mut s = input.trim();
    if let Some(open) = s.find('[') {
        if s.ends_with(']') {
            s = &s[..open];
        }
    }
    let rfc3339_err = match DateTime::parse_from_rfc3339(s) {
        Ok(ts) => return Ok(ts),
        Err(e) => e,
    };
    let with_offset = match s.strip_suffix(['Z', 'z']) {
        Some(local) => format!("{local}+00:00"),
        None => s.to_string(),
    };
    DateTime::parse_from_str(&with_offset, "%Y-%m-%dT%H:%M%:z")
        .map_err(|_| rfc3339_err.to_string())
}

impl fmt::Debug for Coercion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Coercion { .. }")
    }
}

/// Immutable mapping from scalar type to its coercion.
#[derive(Clone)]
pub struct CoercionRegistry {
    coercions: HashMap<ScalarType, Coercion>,
}

impl CoercionRegistry {
    /// A builder pre-loaded with the built-in coercions.
    pub fn builder() -> CoercionRegistryBuilder {
        CoercionRegistryBuilder::empty().with_builtins()
    }

    /// The built-in coercions: `text`, `f64`, `i64`, `bool`, `timestamp`.
    pub fn with_builtins() -> Self {
        Self::builder().build()
    }

    /// Returns `true` if a coercion is registered for `scalar_type`.
    pub fn supports(&self, scalar_type: &ScalarType) -> bool {
        self.coercions.contains_key(scalar_type)
    }

    /// Registered scalar types, sorted.
    pub fn scalar_types(&self) -> Vec<ScalarType> {
        let mut types: Vec<ScalarType> = self.coercions.keys().cloned().collect();
        types.sort();
        types
    }

    /// Parse the string form of a `scalar_type` value.
    pub fn parse(
        &self,
        scalar_type: &ScalarType,
        input: &str,
    ) -> Result<ScalarValue, CoercionError> {
        let coercion = self.lookup(scalar_type)?;
        (coercion.parse)(input).map_err(|reason| CoercionError::Invalid {
            scalar_type: scalar_type.clone(),
            input: input.to_string(),
            reason,
        })
    }

    /// Format a value as the string form of `scalar_type`.
    pub fn format(
        &self,
        scalar_type: &ScalarType,
        value: &ScalarValue,
    ) -> Result<String, CoercionError> {
        let coercion = self.lookup(scalar_type)?;
        (coercion.format)(value).ok_or_else(|| CoercionError::ValueMismatch {
            scalar_type: scalar_type.clone(),
            actual: value.variant_name(),
        })
    }

    fn lookup(&self, scalar_type: &ScalarType) -> Result<&Coercion, CoercionError> {
        self.coercions
            .get(scalar_type)
            .ok_or_else(|| CoercionError::UnsupportedType(scalar_type.clone()))
    }
}

impl Default for CoercionRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl fmt::Debug for CoercionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CoercionRegistry")
            .field("scalar_types", &self.scalar_types())
            .finish()
    }
}

/// Assembles a [`CoercionRegistry`].
pub struct CoercionRegistryBuilder {
    coercions: HashMap<ScalarType, Coercion>,
}

impl CoercionRegistryBuilder {
    /// A builder with no coercions at all.
    pub fn empty() -> Self {
        Self {
            coercions: HashMap::new(),
        }
    }

    /// Add the built-in coercions.
    pub fn with_builtins(self) -> Self {
        self.coercion(ScalarType::TEXT, Coercion::text())
            .coercion(ScalarType::FLOAT64, Coercion::float64())
            .coercion(ScalarType::INT64, Coercion::int64())
            .coercion(ScalarType::BOOL, Coercion::boolean())
            .coercion(ScalarType::TIMESTAMP, Coercion::timestamp())
    }

    /// Register a parse/format pair. A later registration for the same type
    /// replaces the earlier one.
    pub fn register<P, F>(self, scalar_type: ScalarType, parse: P, format: F) -> Self
    where
        P: Fn(&str) -> Result<ScalarValue, String> + Send + Sync + 'static,
        F: Fn(&ScalarValue) -> Option<String> + Send + Sync + 'static,
    {
        self.coercion(scalar_type, Coercion::new(parse, format))
    }

    pub fn coercion(mut self, scalar_type: ScalarType, coercion: Coercion) -> Self {
        if self.coercions.insert(scalar_type.clone(), coercion).is_some() {
            debug!(scalar_type = %scalar_type, "coercion replaced");
        }
        self
    }

    pub fn build(self) -> CoercionRegistry {
        CoercionRegistry {
            coercions: self.coercions,
        }
    }
}
