//! Flat string records, the storage-side shape of an entity.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Reserved entry holding the fully encoded external key.
pub const KEY_FIELD: &str = "@key";

/// Reserved entry holding the concrete type discriminator.
pub const CLASS_FIELD: &str = "class";

/// Plain field map as exchanged with a key-value store.
pub type FieldMap = BTreeMap<String, String>;

/// Field-name → string-value mapping for one entity.
///
/// Besides the entity's own fields a record carries [`KEY_FIELD`] and
/// [`CLASS_FIELD`]. Records are transient: built fresh for each encode or
/// decode and never retained by the codec.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record {
    entries: FieldMap,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a record from a store read, injecting the key the store does
    /// not return as a field.
    pub fn from_store(key: impl Into<String>, fields: FieldMap) -> Self {
        let mut entries = fields;
        entries.insert(KEY_FIELD.to_string(), key.into());
        Self { entries }
    }

    /// Split into the external key and the fields to persist under it.
    pub fn into_store_parts(mut self) -> Result<(String, FieldMap), TypeError> {
        let key = self
            .entries
            .remove(KEY_FIELD)
            .ok_or(TypeError::MissingReservedKey(KEY_FIELD))?;
        Ok((key, self.entries))
    }

    /// Returns `true` for the two reserved entry names.
    pub fn is_reserved(name: &str) -> bool {
        name == KEY_FIELD || name == CLASS_FIELD
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries.get(name).map(String::as_str)
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.entries.insert(name.into(), value.into())
    }

    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.entries.remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// The external key, if present.
    pub fn key(&self) -> Option<&str> {
        self.get(KEY_FIELD)
    }

    /// The type discriminator, if present.
    pub fn class(&self) -> Option<&str> {
        self.get(CLASS_FIELD)
    }

    pub fn set_key(&mut self, key: impl Into<String>) {
        self.entries.insert(KEY_FIELD.to_string(), key.into());
    }

    pub fn set_class(&mut self, class: impl Into<String>) {
        self.entries.insert(CLASS_FIELD.to_string(), class.into());
    }

    /// Number of entries, reserved ones included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All entries in name order, reserved ones included.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Entity field entries only (reserved entries skipped).
    pub fn fields(&self) -> impl Iterator<Item = (&str, &str)> {
        self.iter().filter(|(k, _)| !Self::is_reserved(k))
    }
}

impl From<FieldMap> for Record {
    fn from(entries: FieldMap) -> Self {
        Self { entries }
    }
}

impl From<Record> for FieldMap {
    fn from(record: Record) -> Self {
        record.entries
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}
