use std::collections::HashMap;
use std::sync::RwLock;

use kvrec_types::FieldMap;
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::traits::KeyValueStore;

/// In-memory, HashMap-based hash store.
///
/// Intended for tests and embedding. Hashes are held behind a `RwLock` and
/// cloned on read.
pub struct InMemoryHashStore {
    hashes: RwLock<HashMap<String, FieldMap>>,
}

impl InMemoryHashStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            hashes: RwLock::new(HashMap::new()),
        }
    }

    /// Number of keys currently stored.
    pub fn len(&self) -> StoreResult<usize> {
        let map = self.hashes.read().map_err(|_| StoreError::Poisoned)?;
        Ok(map.len())
    }

    /// Returns `true` if the store holds no keys.
    pub fn is_empty(&self) -> StoreResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Remove every key.
    pub fn clear(&self) -> StoreResult<()> {
        let mut map = self.hashes.write().map_err(|_| StoreError::Poisoned)?;
        map.clear();
        Ok(())
    }

    /// Sorted keys starting with `prefix`.
    pub fn keys_with_prefix(&self, prefix: &str) -> StoreResult<Vec<String>> {
        let map = self.hashes.read().map_err(|_| StoreError::Poisoned)?;
        let mut keys: Vec<String> = map
            .keys()
            .filter(|key| key.starts_with(prefix))
            .cloned()
            .collect();
        keys.sort();
        Ok(keys)
    }
}

impl Default for InMemoryHashStore {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyValueStore for InMemoryHashStore {
    fn set_fields(&self, key: &str, fields: &FieldMap) -> StoreResult<()> {
        if key.is_empty() {
            return Err(StoreError::InvalidKey(key.to_string()));
        }
        let mut map = self.hashes.write().map_err(|_| StoreError::Poisoned)?;
        let hash = map.entry(key.to_string()).or_default();
        hash.extend(fields.iter().map(|(k, v)| (k.clone(), v.clone())));
        debug!(key, fields = fields.len(), "hash written");
        Ok(())
    }

    fn get_all_fields(&self, key: &str) -> StoreResult<FieldMap> {
        let map = self.hashes.read().map_err(|_| StoreError::Poisoned)?;
        Ok(map.get(key).cloned().unwrap_or_default())
    }

    fn delete(&self, key: &str) -> StoreResult<()> {
        let mut map = self.hashes.write().map_err(|_| StoreError::Poisoned)?;
        if map.remove(key).is_some() {
            debug!(key, "hash deleted");
        }
        Ok(())
    }
}

impl std::fmt::Debug for InMemoryHashStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let count = self.hashes.read().map(|map| map.len()).ok();
        f.debug_struct("InMemoryHashStore")
            .field("key_count", &count)
            .finish()
    }
}
