//! Foundation types for kvrec.
//!
//! This crate provides the value-level vocabulary shared by every other kvrec
//! crate: the scalar types an entity field may carry, the values themselves,
//! and the flat string record an entity is stored as.
//!
//! # Key Types
//!
//! - [`ScalarType`] -- Identifier a coercion is registered under (`text`, `f64`, ...)
//! - [`ScalarValue`] -- A typed field value
//! - [`Record`] -- Flat field-name → string mapping, plus the reserved
//!   [`KEY_FIELD`] and [`CLASS_FIELD`] entries

pub mod error;
pub mod record;
pub mod scalar;

pub use error::TypeError;
pub use record::{FieldMap, Record, CLASS_FIELD, KEY_FIELD};
pub use scalar::{ScalarType, ScalarValue, Timestamp};
