//! Entity ⇄ flat record codec for kvrec.
//!
//! A host registers its entity types and scalar coercions once at startup.
//! The [`Codec`] then turns any registered entity into a [`Record`] whose
//! external key is derived from the entity's identity through a key
//! template, and turns records back into entities of the type their `class`
//! discriminator names.
//!
//! # Key Types
//!
//! - [`Entity`] -- trait a host type implements to declare and expose its fields
//! - [`TypeRegistry`] -- discriminator → entity type mapping
//! - [`CoercionRegistry`] -- scalar type → string parse/format pair
//! - [`KeyTemplate`] -- `prefix$suffix` external key pattern
//! - [`SchemaCache`] -- per-type schemas, built once on first use
//! - [`Codec`] -- encode, decode, and polymorphic decode
//!
//! # Design Rules
//!
//! 1. The identity field is never stored under its own name; it lives only in
//!    the external key.
//! 2. A record field the resolved type does not declare is ignored unless
//!    [`CodecConfig::strict_fields`] is set.
//! 3. A declared field missing from the record keeps its default value.
//! 4. Identity assignment on decode bypasses the entity's field validation.
//! 5. Any failure fails the whole entity; partial records are never produced.
//!
//! [`Record`]: kvrec_types::Record

pub mod codec;
pub mod coercion;
pub mod config;
pub mod entity;
pub mod error;
#[cfg(any(test, feature = "fixtures"))]
pub mod fixtures;
pub mod registry;
pub mod schema;
pub mod template;

pub use codec::Codec;
pub use coercion::{Coercion, CoercionRegistry, CoercionRegistryBuilder};
pub use config::CodecConfig;
pub use entity::{Entity, EntityDeclaration, FieldDeclaration, FieldRole, ParentDeclaration};
pub use error::{
    CodecError, CodecResult, CoercionError, EncodeCause, FieldAccessError, SchemaError,
    SchemaResult,
};
pub use registry::{EntityKind, TypeRegistry};
pub use schema::{EntitySchema, FieldDescriptor, SchemaCache};
pub use template::{extract_key, KeyTemplate, DEFAULT_PLACEHOLDER};
