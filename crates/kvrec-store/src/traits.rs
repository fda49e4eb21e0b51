use kvrec_types::FieldMap;

use crate::error::StoreResult;

/// Hash-per-key store.
///
/// Implementations must satisfy these invariants:
/// - `set_fields` merges into the existing hash; fields not named are kept.
/// - A key that does not exist reads as an empty map, not an error.
/// - Deleting a missing key is a no-op.
/// - All backend errors are propagated, never silently ignored.
pub trait KeyValueStore: Send + Sync {
    /// Write `fields` into the hash stored at `key`.
    fn set_fields(&self, key: &str, fields: &FieldMap) -> StoreResult<()>;

    /// Read every field of the hash at `key`.
    ///
    /// Returns an empty map if the key does not exist.
    fn get_all_fields(&self, key: &str) -> StoreResult<FieldMap>;

    /// Remove the hash at `key`.
    fn delete(&self, key: &str) -> StoreResult<()>;

    /// Write several hashes.
    ///
    /// Default implementation calls `set_fields()` for each entry, one
    /// result per entry. Backends may override to pipeline.
    fn set_fields_batch(&self, entries: &[(String, FieldMap)]) -> Vec<StoreResult<()>> {
        entries
            .iter()
            .map(|(key, fields)| self.set_fields(key, fields))
            .collect()
    }

    /// Read several hashes, one result per key in order.
    fn get_all_fields_batch(&self, keys: &[String]) -> Vec<StoreResult<FieldMap>> {
        keys.iter().map(|key| self.get_all_fields(key)).collect()
    }

    /// Remove several hashes, one result per key in order.
    fn delete_batch(&self, keys: &[String]) -> Vec<StoreResult<()>> {
        keys.iter().map(|key| self.delete(key)).collect()
    }
}
