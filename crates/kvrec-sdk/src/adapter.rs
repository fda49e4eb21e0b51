use kvrec_codec::{Codec, CodecError, CodecResult, CoercionRegistry, Entity, TypeRegistry};
use kvrec_store::KeyValueStore;
use kvrec_types::{FieldMap, Record, ScalarValue};
use tracing::{debug, warn};

use crate::config::AdapterConfig;
use crate::error::{SdkError, SdkResult};
use crate::report::BatchReport;

/// Batched create, read, and delete of entities over a hash store.
///
/// Each entity is one hash at its external key. Entities of sibling types
/// may share a key namespace; reads filter by type so a caller asking for
/// one subtype never sees its siblings.
#[derive(Debug)]
pub struct Adapter<S> {
    codec: Codec,
    store: S,
    config: AdapterConfig,
}

impl<S: KeyValueStore> Adapter<S> {
    pub fn new(
        store: S,
        types: TypeRegistry,
        coercions: CoercionRegistry,
        config: AdapterConfig,
    ) -> SdkResult<Self> {
        let codec = Codec::new(types, coercions, config.codec.clone())?;
        Ok(Self {
            codec,
            store,
            config,
        })
    }

    /// An adapter with the built-in coercions and default configuration.
    pub fn with_types(store: S, types: TypeRegistry) -> Self {
        Self {
            codec: Codec::with_types(types),
            store,
            config: AdapterConfig::default(),
        }
    }

    pub fn codec(&self) -> &Codec {
        &self.codec
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &AdapterConfig {
        &self.config
    }

    // ---- Create ----

    /// Encode and write each entity; reports the keys written.
    pub fn create<'a>(
        &self,
        entities: impl IntoIterator<Item = &'a dyn Entity>,
    ) -> BatchReport<String> {
        let mut report = BatchReport::new();
        let mut entries: Vec<(String, FieldMap)> = Vec::new();
        for (index, entity) in entities.into_iter().enumerate() {
            match self.encode_parts(entity) {
                Ok(entry) => entries.push(entry),
                Err(e) => {
                    warn!(index, error = %e, "skipping entity that failed to encode");
                    report.fail(format!("#{index}"), e);
                }
            }
        }

        let results = self.store.set_fields_batch(&entries);
        for ((key, _), result) in entries.into_iter().zip(results) {
            match result {
                Ok(()) => report.push(key),
                Err(e) => {
                    warn!(key = %key, error = %e, "store rejected write");
                    report.fail(key, e);
                }
            }
        }
        report
    }

    fn encode_parts(&self, entity: &dyn Entity) -> SdkResult<(String, FieldMap)> {
        let record = self.codec.encode(entity)?;
        Ok(record.into_store_parts()?)
    }

    // ---- Read ----

    /// Read the hashes at `keys` and keep those that are `base_class` or
    /// descend from it.
    ///
    /// Fails up front only if `base_class` is not registered. Keys with no
    /// hash are dropped when [`AdapterConfig::skip_empty`] is set, and
    /// reported otherwise.
    pub fn read_keys(
        &self,
        base_class: &str,
        keys: &[String],
    ) -> SdkResult<BatchReport<Box<dyn Entity>>> {
        if self.codec.types().by_class(base_class).is_none() {
            return Err(CodecError::ClassResolution {
                class: Some(base_class.to_string()),
            }
            .into());
        }
        Ok(self.read_filtered(keys, |record| {
            self.codec.decode_instance_of(record, base_class)
        }))
    }

    /// Read entities of exactly type `T` by identity value.
    pub fn read_ids<T: Entity>(
        &self,
        ids: impl IntoIterator<Item = impl Into<ScalarValue>>,
    ) -> BatchReport<T> {
        let (keys, mut report) = self.keys_for::<T, _>(ids);
        let decode = |record: &Record| self.codec.decode_as::<T>(record);
        let read = self.read_filtered(&keys, decode);
        report.absorb(read);
        report
    }

    /// Read entities of type `B` or any of its subtypes by identity value.
    ///
    /// Identities are formatted with `B`'s key template, which subtypes
    /// inherit.
    pub fn read_instances_of<B: Entity>(
        &self,
        ids: impl IntoIterator<Item = impl Into<ScalarValue>>,
    ) -> BatchReport<Box<dyn Entity>> {
        let (keys, mut report) = self.keys_for::<B, _>(ids);
        let read = self.read_filtered(&keys, |record| {
            self.codec.decode_instance_of_type::<B>(record)
        });
        report.absorb(read);
        report
    }

    fn keys_for<T: Entity, R>(
        &self,
        ids: impl IntoIterator<Item = impl Into<ScalarValue>>,
    ) -> (Vec<String>, BatchReport<R>) {
        let mut report = BatchReport::new();
        let mut keys = Vec::new();
        for (index, id) in ids.into_iter().enumerate() {
            match self.codec.key_for::<T>(id) {
                Ok(key) => keys.push(key),
                Err(e) => {
                    warn!(index, error = %e, "skipping identity that cannot form a key");
                    report.fail(format!("#{index}"), e);
                }
            }
        }
        (keys, report)
    }

    fn read_filtered<R>(
        &self,
        keys: &[String],
        decode: impl Fn(&Record) -> CodecResult<Option<R>>,
    ) -> BatchReport<R> {
        let mut report = BatchReport::new();
        let results = self.store.get_all_fields_batch(keys);
        for (key, result) in keys.iter().zip(results) {
            let fields = match result {
                Ok(fields) => fields,
                Err(e) => {
                    warn!(key = %key, error = %e, "store read failed");
                    report.fail(key.as_str(), e);
                    continue;
                }
            };
            if fields.is_empty() {
                if self.config.skip_empty {
                    debug!(key = %key, "no hash stored");
                } else {
                    warn!(key = %key, "no hash stored");
                    report.fail(key.as_str(), SdkError::Missing(key.clone()));
                }
                continue;
            }
            match decode(&Record::from_store(key.as_str(), fields)) {
                Ok(Some(entity)) => report.push(entity),
                Ok(None) => debug!(key = %key, "record is not of the requested type"),
                Err(e) => {
                    warn!(key = %key, error = %e, "skipping record that failed to decode");
                    report.fail(key.as_str(), e);
                }
            }
        }
        report
    }

    // ---- Delete ----

    /// Delete the hash of each entity; reports the keys deleted.
    pub fn delete<'a>(
        &self,
        entities: impl IntoIterator<Item = &'a dyn Entity>,
    ) -> BatchReport<String> {
        let mut report = BatchReport::new();
        let mut keys = Vec::new();
        for (index, entity) in entities.into_iter().enumerate() {
            match self.codec.external_key(entity) {
                Ok(key) => keys.push(key),
                Err(e) => {
                    warn!(index, error = %e, "skipping entity with no key");
                    report.fail(format!("#{index}"), e);
                }
            }
        }

        let results = self.store.delete_batch(&keys);
        for (key, result) in keys.into_iter().zip(results) {
            match result {
                Ok(()) => report.push(key),
                Err(e) => {
                    warn!(key = %key, error = %e, "store rejected delete");
                    report.fail(key, e);
                }
            }
        }
        report
    }
}
