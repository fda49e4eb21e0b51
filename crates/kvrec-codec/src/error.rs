//! Error types for schema building, coercion, and encode/decode.

use kvrec_types::{ScalarType, TypeError};
use thiserror::Error;

/// Errors raised while building an [`EntitySchema`](crate::EntitySchema).
///
/// These are fatal for the type: the cache remembers the failure and every
/// later lookup of the same type returns it again.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SchemaError {
    #[error("entity {class} declares no identity field")]
    MissingIdentityField { class: String },

    #[error("entity {class} declares more than one identity field: {fields:?}")]
    AmbiguousIdentityField { class: String, fields: Vec<String> },

    #[error("key template {pattern:?} repeats {placeholder:?} {occurrences} times")]
    InvalidKeyTemplate {
        pattern: String,
        placeholder: char,
        occurrences: usize,
    },

    #[error("entity {class} declares field {field:?} more than once")]
    DuplicateField { class: String, field: String },

    #[error("entity {class} uses reserved field name {field:?}")]
    ReservedFieldName { class: String, field: String },

    #[error("entity {class} has a cyclic parent chain")]
    InheritanceCycle { class: String },
}

/// Errors raised by the coercion registry.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CoercionError {
    /// No coercion is registered for this scalar type.
    #[error("unsupported scalar type: {0}")]
    UnsupportedType(ScalarType),

    /// The string form could not be parsed.
    #[error("cannot parse {input:?} as {scalar_type}: {reason}")]
    Invalid {
        scalar_type: ScalarType,
        input: String,
        reason: String,
    },

    /// The value is not of the variant the coercion formats.
    #[error("cannot format {actual} value as {scalar_type}")]
    ValueMismatch {
        scalar_type: ScalarType,
        actual: &'static str,
    },
}

/// Errors raised by an entity's own field accessors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FieldAccessError {
    #[error("no such field: {0}")]
    UnknownField(String),

    #[error(transparent)]
    Type(#[from] TypeError),

    #[error("value rejected for {field}: {reason}")]
    Rejected { field: String, reason: String },
}

/// Why an encode failed.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum EncodeCause {
    #[error("entity type is not registered")]
    UnregisteredType,

    #[error("cannot read field {field}: {source}")]
    FieldRead {
        field: String,
        #[source]
        source: FieldAccessError,
    },

    #[error("cannot format field {field}: {source}")]
    Coercion {
        field: String,
        #[source]
        source: CoercionError,
    },
}

/// Errors produced by [`Codec`](crate::Codec) operations.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum CodecError {
    /// The entity type's declaration is invalid. Raised as-is by both
    /// encode and decode.
    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),

    #[error("encode failed: {0}")]
    Encode(#[from] EncodeCause),

    /// The discriminator is missing or names no registered type.
    #[error("cannot resolve entity class {}", .class.as_deref().unwrap_or("<missing>"))]
    ClassResolution { class: Option<String> },

    /// The type was registered without a construction path.
    #[error("entity class {class} cannot be instantiated")]
    Instantiation { class: String },

    #[error("record for {class} has no external key")]
    MissingIdentityKey { class: String },

    /// Strict mode only: the record carries a field the type does not declare.
    #[error("record for {class} carries undeclared field {field:?}")]
    UnknownField { class: String, field: String },

    #[error("cannot decode field {field}: {source}")]
    Coercion {
        field: String,
        #[source]
        source: CoercionError,
    },

    #[error("cannot assign field {field}: {source}")]
    FieldAccess {
        field: String,
        #[source]
        source: FieldAccessError,
    },

    #[error("entity class {class} registered twice")]
    DuplicateClass { class: String },

    #[error("invalid codec configuration: {0}")]
    Config(String),
}

impl CodecError {
    /// Returns `true` if the failure stems from a scalar type with no
    /// registered coercion, on either the encode or decode path.
    pub fn is_unsupported_type(&self) -> bool {
        matches!(
            self,
            Self::Encode(EncodeCause::Coercion {
                source: CoercionError::UnsupportedType(_),
                ..
            }) | Self::Coercion {
                source: CoercionError::UnsupportedType(_),
                ..
            }
        )
    }
}

/// Result alias for schema building.
pub type SchemaResult<T> = Result<T, SchemaError>;

/// Result alias for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;
