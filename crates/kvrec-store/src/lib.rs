//! Key-value hash storage for kvrec records.
//!
//! A store maps an external key to a flat field map, like a Redis hash. The
//! store never interprets field names or values; the `@key` entry of a
//! [`Record`](kvrec_types::Record) is split off before writing and injected
//! again after reading by the caller.
//!
//! # Storage Backends
//!
//! All backends implement the [`KeyValueStore`] trait:
//!
//! - [`InMemoryHashStore`] -- `HashMap`-based store for tests and embedding

pub mod error;
pub mod memory;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use memory::InMemoryHashStore;
pub use traits::KeyValueStore;
