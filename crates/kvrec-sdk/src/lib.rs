//! High-level kvrec API.
//!
//! [`Adapter`] pairs a [`Codec`](kvrec_codec::Codec) with a
//! [`KeyValueStore`](kvrec_store::KeyValueStore) and moves batches of
//! entities in and out of the store. Items that fail are logged, reported in
//! the returned [`BatchReport`], and skipped; the rest of the batch proceeds.

pub mod adapter;
pub mod config;
pub mod error;
pub mod report;

pub use adapter::Adapter;
pub use config::AdapterConfig;
pub use error::{SdkError, SdkResult};
pub use report::{BatchFailure, BatchReport};

// Re-export key types
pub use kvrec_codec::{
    Codec, CodecConfig, CoercionRegistry, Entity, EntityDeclaration, TypeRegistry,
};
pub use kvrec_store::{InMemoryHashStore, KeyValueStore};
pub use kvrec_types::{Record, ScalarType, ScalarValue};
