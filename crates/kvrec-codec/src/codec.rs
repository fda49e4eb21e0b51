//! Entity ⇄ record encoding with polymorphic decode.

use std::sync::Arc;

use kvrec_types::{Record, ScalarValue};

use crate::coercion::CoercionRegistry;
use crate::config::CodecConfig;
use crate::entity::Entity;
use crate::error::{CodecError, CodecResult, EncodeCause};
use crate::registry::{EntityKind, TypeRegistry};
use crate::schema::{EntitySchema, FieldDescriptor, SchemaCache};

/// Converts entities to flat records and back.
///
/// A `Codec` owns its type registry, coercion registry, and schema cache. It
/// holds no other state, performs no I/O, and is safe to share across
/// threads; batches may be encoded or decoded concurrently in any order.
#[derive(Debug)]
pub struct Codec {
    types: TypeRegistry,
    coercions: CoercionRegistry,
    schemas: SchemaCache,
    config: CodecConfig,
}

impl Codec {
    pub fn new(
        types: TypeRegistry,
        coercions: CoercionRegistry,
        config: CodecConfig,
    ) -> CodecResult<Self> {
        config.validate()?;
        Ok(Self {
            schemas: SchemaCache::with_placeholder(config.placeholder),
            types,
            coercions,
            config,
        })
    }

    /// A codec with the built-in coercions and default configuration.
    pub fn with_types(types: TypeRegistry) -> Self {
        Self {
            types,
            coercions: CoercionRegistry::with_builtins(),
            schemas: SchemaCache::new(),
            config: CodecConfig::default(),
        }
    }

    pub fn types(&self) -> &TypeRegistry {
        &self.types
    }

    pub fn coercions(&self) -> &CoercionRegistry {
        &self.coercions
    }

    pub fn schemas(&self) -> &SchemaCache {
        &self.schemas
    }

    pub fn config(&self) -> &CodecConfig {
        &self.config
    }

    // ---- Schemas ----

    /// Schema of the type registered under `class`.
    pub fn schema_for_class(&self, class: &str) -> CodecResult<Arc<EntitySchema>> {
        let kind = self.kind_for_class(class)?;
        Ok(self.schemas.schema_for(kind)?)
    }

    /// Schema of a registered Rust type.
    pub fn schema_of<T: Entity>(&self) -> CodecResult<Arc<EntitySchema>> {
        let class = self.class_of::<T>()?;
        self.schema_for_class(class)
    }

    fn kind_for_class(&self, class: &str) -> CodecResult<&EntityKind> {
        self.types
            .by_class(class)
            .ok_or_else(|| CodecError::ClassResolution {
                class: Some(class.to_string()),
            })
    }

    fn class_of<T: Entity>(&self) -> CodecResult<&str> {
        self.types
            .class_of_type::<T>()
            .ok_or_else(|| CodecError::ClassResolution {
                class: Some(std::any::type_name::<T>().to_string()),
            })
    }

    // ---- Encoding ----

    /// Encode an entity of a registered type.
    ///
    /// Every non-identity field is stored under its own name, the identity
    /// only inside the external key. On error no record is returned; an
    /// invalid declaration fails with [`CodecError::Schema`], not `Encode`.
    pub fn encode(&self, entity: &dyn Entity) -> CodecResult<Record> {
        let schema = self.schema_of_entity(entity)?;
        let mut record = Record::new();
        for field in schema.value_fields() {
            let text = self.format_field(entity, field)?;
            record.insert(field.name.as_str(), text);
        }
        let identity = self.format_field(entity, schema.identity_field())?;
        record.set_key(schema.key_template().encode(&identity));
        record.set_class(schema.class());
        Ok(record)
    }

    /// The external key of an entity, without encoding its other fields.
    pub fn external_key(&self, entity: &dyn Entity) -> CodecResult<String> {
        let schema = self.schema_of_entity(entity)?;
        let identity = self.format_field(entity, schema.identity_field())?;
        Ok(schema.key_template().encode(&identity))
    }

    /// The external key an entity of `class` with this identity value has.
    pub fn key_for_identity(&self, class: &str, identity: &ScalarValue) -> CodecResult<String> {
        let schema = self.schema_for_class(class)?;
        let field = schema.identity_field();
        let text = self
            .coercions
            .format(&field.scalar_type, identity)
            .map_err(|source| CodecError::Coercion {
                field: field.name.clone(),
                source,
            })?;
        Ok(schema.key_template().encode(&text))
    }

    /// Typed form of [`Codec::key_for_identity`].
    pub fn key_for<T: Entity>(&self, identity: impl Into<ScalarValue>) -> CodecResult<String> {
        let class = self.class_of::<T>()?;
        self.key_for_identity(class, &identity.into())
    }

    fn schema_of_entity(&self, entity: &dyn Entity) -> CodecResult<Arc<EntitySchema>> {
        let kind = self
            .types
            .by_type_id(entity.concrete_type_id())
            .ok_or(EncodeCause::UnregisteredType)?;
        Ok(self.schemas.schema_for(kind)?)
    }

    fn format_field(&self, entity: &dyn Entity, field: &FieldDescriptor) -> CodecResult<String> {
        let value = entity
            .read_field(&field.name)
            .map_err(|source| EncodeCause::FieldRead {
                field: field.name.clone(),
                source,
            })?;
        let text = self
            .coercions
            .format(&field.scalar_type, &value)
            .map_err(|source| EncodeCause::Coercion {
                field: field.name.clone(),
                source,
            })?;
        Ok(text)
    }

    // ---- Decoding ----

    /// Decode a record into an instance of the type its discriminator names.
    ///
    /// Fields absent from the record keep the instance's default value.
    pub fn decode(&self, record: &Record) -> CodecResult<Box<dyn Entity>> {
        self.decode_resolved(record).map(|(entity, _)| entity)
    }

    /// Decode and keep the entity only if its concrete type is exactly `T`.
    pub fn decode_as<T: Entity>(&self, record: &Record) -> CodecResult<Option<T>> {
        let entity = self.decode(record)?;
        Ok(entity.downcast::<T>().map(|concrete| *concrete))
    }

    /// Decode and keep the entity only if its type is `base_class` or
    /// descends from it.
    ///
    /// Reading a shared key namespace by its base type yields every subtype;
    /// reading by one subtype skips records of its siblings.
    pub fn decode_instance_of(
        &self,
        record: &Record,
        base_class: &str,
    ) -> CodecResult<Option<Box<dyn Entity>>> {
        self.kind_for_class(base_class)?;
        let (entity, schema) = self.decode_resolved(record)?;
        Ok(schema.is_instance_of(base_class).then_some(entity))
    }

    /// Typed form of [`Codec::decode_instance_of`].
    pub fn decode_instance_of_type<B: Entity>(
        &self,
        record: &Record,
    ) -> CodecResult<Option<Box<dyn Entity>>> {
        let base_class = self.class_of::<B>()?;
        self.decode_instance_of(record, base_class)
    }

    fn decode_resolved(
        &self,
        record: &Record,
    ) -> CodecResult<(Box<dyn Entity>, Arc<EntitySchema>)> {
        let class = record
            .class()
            .ok_or(CodecError::ClassResolution { class: None })?;
        let kind = self.kind_for_class(class)?;
        let schema = self.schemas.schema_for(kind)?;
        let Some(mut entity) = kind.instantiate() else {
            return Err(CodecError::Instantiation {
                class: class.to_string(),
            });
        };

        if self.config.strict_fields {
            self.reject_undeclared(record, &schema)?;
        }

        for field in schema.value_fields() {
            let Some(raw) = record.get(&field.name) else {
                continue;
            };
            let value = self.parse_field(field, raw)?;
            entity
                .write_field(&field.name, value)
                .map_err(|source| CodecError::FieldAccess {
                    field: field.name.clone(),
                    source,
                })?;
        }

        let Some(key) = record.key() else {
            return Err(CodecError::MissingIdentityKey {
                class: class.to_string(),
            });
        };
        let identity_field = schema.identity_field();
        let raw_identity = schema.key_template().decode(key);
        let identity = self.parse_field(identity_field, &raw_identity)?;
        entity
            .write_identity(identity)
            .map_err(|source| CodecError::FieldAccess {
                field: identity_field.name.clone(),
                source,
            })?;

        Ok((entity, schema))
    }

    fn parse_field(&self, field: &FieldDescriptor, raw: &str) -> CodecResult<ScalarValue> {
        self.coercions
            .parse(&field.scalar_type, raw)
            .map_err(|source| CodecError::Coercion {
                field: field.name.clone(),
                source,
            })
    }

    fn reject_undeclared(&self, record: &Record, schema: &EntitySchema) -> CodecResult<()> {
        for (name, _) in record.fields() {
            let declared = schema.field(name).is_some_and(|f| !f.is_identity);
            if !declared {
                return Err(CodecError::UnknownField {
                    class: schema.class().to_string(),
                    field: name.to_string(),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coercion::CoercionRegistry;
    use crate::error::{CoercionError, FieldAccessError, SchemaError};
    use crate::fixtures::{
        sample_types, DigitalOcean, GoogleHost, Host, Monitor, GOOGLE_COMMON, GOOGLE_CREDENTIALS,
        GOOGLE_TTL, PORT,
    };
    use kvrec_types::{FieldMap, KEY_FIELD};

    fn codec() -> Codec {
        Codec::with_types(sample_types().unwrap())
    }

    /// Codec that knows how to coerce the `port` scalar type.
    fn codec_with_port() -> Codec {
        let coercions = CoercionRegistry::builder()
            .register(
                PORT,
                |s| {
                    s.parse::<u16>()
                        .map(|p| ScalarValue::Int64(i64::from(p)))
                        .map_err(|e| e.to_string())
                },
                |v| v.as_i64().map(|i| i.to_string()),
            )
            .build();
        let types = sample_types().unwrap();
        let config = CodecConfig::default();
        Codec::new(types, coercions, config).unwrap()
    }

    fn host_record(class: &str, hostname: &str) -> Record {
        [
            ("@key", format!("host:{hostname}")),
            ("class", class.to_string()),
            ("aFieldThatDoesNotExists", "nonono".to_string()),
            ("commonProperty", "lorem impsum".to_string()),
            ("sparse", "4230.423".to_string()),
            ("credentialFile", "8923y7 9ryfh9".to_string()),
            ("ttl", "742389.7589234".to_string()),
        ]
        .into_iter()
        .collect()
    }

    // -----------------------------------------------------------------------
    // Encode
    // -----------------------------------------------------------------------

    #[test]
    fn encode_google_host() {
        let record = codec().encode(&GoogleHost::sample("ciaone")).unwrap();

        assert_eq!(record.key(), Some("host:ciaone"));
        assert_eq!(record.class(), Some("hosts.GoogleHost"));
        assert_eq!(record.get("commonProperty"), Some(GOOGLE_COMMON));
        assert_eq!(record.get("credentialFile"), Some(GOOGLE_CREDENTIALS));
        assert_eq!(record.get("ttl"), Some(GOOGLE_TTL.to_string().as_str()));
        assert_eq!(record.get("sparse"), Some("4230.423"));
        // The identity lives only in the key.
        assert!(!record.contains("hostname"));
        assert_eq!(record.len(), 6);
    }

    #[test]
    fn encode_sibling_shares_key_namespace() {
        let record = codec().encode(&DigitalOcean::sample("digiciccio")).unwrap();
        assert_eq!(record.key(), Some("host:digiciccio"));
        assert_eq!(record.class(), Some("hosts.DigitalOcean"));
        assert_eq!(record.get("token"), Some("08f97sa0f9yds908gb"));
    }

    #[test]
    fn encode_unregistered_entity_type() {
        let codec = Codec::with_types(TypeRegistry::new());
        let err = codec.encode(&Host::new("x")).unwrap_err();
        assert_eq!(err, CodecError::Encode(EncodeCause::UnregisteredType));
    }

    #[test]
    fn encode_unsupported_scalar_type_produces_no_record() {
        let monitor = Monitor {
            id: 7,
            healthy: true,
            checked_at: Some("2024-01-01T00:00:00Z".parse().unwrap()),
            port: 8080,
        };
        let err = codec().encode(&monitor).unwrap_err();
        assert!(err.is_unsupported_type());
        assert!(matches!(
            err,
            CodecError::Encode(EncodeCause::Coercion {
                ref field,
                source: CoercionError::UnsupportedType(_),
            }) if field == "port"
        ));
    }

    #[test]
    fn encode_with_custom_coercion() {
        let monitor = Monitor {
            id: 7,
            healthy: true,
            checked_at: Some("2024-01-01T10:00:00+02:00".parse().unwrap()),
            port: 8080,
        };
        let record = codec_with_port().encode(&monitor).unwrap();
        assert_eq!(record.key(), Some("monitor:7:state"));
        assert_eq!(record.get("port"), Some("8080"));
        assert_eq!(record.get("healthy"), Some("true"));
        assert_eq!(record.get("checkedAt"), Some("2024-01-01T10:00:00+02:00"));
    }

    #[test]
    fn encode_field_read_failure() {
        let monitor = Monitor {
            id: 1,
            ..Default::default()
        };
        let err = codec_with_port().encode(&monitor).unwrap_err();
        assert!(matches!(
            err,
            CodecError::Encode(EncodeCause::FieldRead { ref field, .. }) if field == "checkedAt"
        ));
    }

    #[test]
    fn external_key_and_key_for_identity() {
        let codec = codec();
        assert_eq!(
            codec.external_key(&GoogleHost::new("google-01")).unwrap(),
            "host:google-01"
        );
        let key = codec.key_for::<Host>("www.pippo.com").unwrap();
        assert_eq!(key, "host:www.pippo.com");
        let key = codec.key_for::<Monitor>(42_i64).unwrap();
        assert_eq!(key, "monitor:42:state");
        assert!(codec.key_for::<Monitor>("not-a-number").is_err());
    }

    // -----------------------------------------------------------------------
    // Decode
    // -----------------------------------------------------------------------

    #[test]
    fn decode_google_host() {
        let record: Record = [
            ("@key", "host:antonello"),
            ("commonProperty", "this is sparta!"),
            ("ttl", "156.8792398437"),
            ("credentialFile", "this is the content of a file: )"),
            ("sparse", "27.85"),
            ("class", "hosts.GoogleHost"),
        ]
        .into_iter()
        .collect();

        let host = codec()
            .decode_as::<GoogleHost>(&record)
            .unwrap()
            .expect("a GoogleHost");
        assert_eq!(host.host.hostname, "antonello");
        assert_eq!(host.host.common_property, "this is sparta!");
        assert!((host.ttl - 156.8792398437).abs() < 0.001);
        assert_eq!(host.credential_file, "this is the content of a file: )");
        assert!((host.sparse - 27.85).abs() < 0.001);
    }

    #[test]
    fn roundtrip_preserves_every_field() {
        let codec = codec();
        let original = GoogleHost::sample("uno.due.tre.jack:8080");
        let record = codec.encode(&original).unwrap();
        let decoded = codec.decode_as::<GoogleHost>(&record).unwrap().unwrap();
        assert_eq!(decoded, original);

        let ocean = DigitalOcean::sample("ocean-820");
        let record = codec.encode(&ocean).unwrap();
        let decoded = codec.decode_as::<DigitalOcean>(&record).unwrap();
        assert_eq!(decoded, Some(ocean));
    }

    #[test]
    fn roundtrip_through_store_parts() {
        let codec = codec();
        let original = GoogleHost::sample("google-01");
        let (key, fields): (String, FieldMap) =
            codec.encode(&original).unwrap().into_store_parts().unwrap();
        assert!(!fields.contains_key(KEY_FIELD));

        let record = Record::from_store(key, fields);
        let decoded = codec.decode_as::<GoogleHost>(&record).unwrap();
        assert_eq!(decoded, Some(original));
    }

    #[test]
    fn decode_missing_class() {
        let mut record = host_record("hosts.GoogleHost", "x");
        record.remove("class");
        let err = codec().decode(&record).unwrap_err();
        assert_eq!(err, CodecError::ClassResolution { class: None });
    }

    #[test]
    fn decode_unknown_class() {
        let record = host_record("hosts.Mainframe", "x");
        let err = codec().decode(&record).unwrap_err();
        assert_eq!(
            err,
            CodecError::ClassResolution {
                class: Some("hosts.Mainframe".into())
            }
        );
    }

    #[test]
    fn decode_abstract_type_cannot_instantiate() {
        let mut types = TypeRegistry::new();
        types.register_abstract::<Host>().unwrap();
        let codec = Codec::with_types(types);
        let err = codec.decode(&host_record("hosts.Host", "x")).unwrap_err();
        assert_eq!(
            err,
            CodecError::Instantiation {
                class: "hosts.Host".into()
            }
        );
    }

    #[test]
    fn decode_missing_field_keeps_default() {
        let mut record = host_record("hosts.GoogleHost", "google-01");
        record.remove("ttl");
        record.remove("sparse");
        let host = codec().decode_as::<GoogleHost>(&record).unwrap().unwrap();
        assert_eq!(host.ttl, 983.84);
        assert_eq!(host.sparse, 4230.423);
        assert_eq!(host.host.common_property, "lorem impsum");
    }

    #[test]
    fn decode_missing_key() {
        let mut record = host_record("hosts.GoogleHost", "x");
        record.remove("@key");
        let err = codec().decode(&record).unwrap_err();
        assert_eq!(
            err,
            CodecError::MissingIdentityKey {
                class: "hosts.GoogleHost".into()
            }
        );
    }

    #[test]
    fn decode_bad_number_fails_whole_record() {
        let mut record = host_record("hosts.GoogleHost", "x");
        record.insert("ttl", "nonono");
        let err = codec().decode(&record).unwrap_err();
        assert!(matches!(
            err,
            CodecError::Coercion {
                ref field,
                source: CoercionError::Invalid { .. },
            } if field == "ttl"
        ));
    }

    #[test]
    fn decode_unsupported_scalar_type() {
        let record: Record = [
            ("@key", "monitor:1:state"),
            ("class", "monitors.Monitor"),
            ("port", "80"),
        ]
        .into_iter()
        .collect();
        let err = codec().decode(&record).unwrap_err();
        assert!(err.is_unsupported_type());
    }

    #[test]
    fn decode_identity_bypasses_accessor_validation() {
        // `Host::write_field` refuses "hostname"; the identity still lands.
        let mut host = Host::default();
        assert!(matches!(
            host.write_field("hostname", "x".into()),
            Err(FieldAccessError::Rejected { .. })
        ));

        let record: Record = [("@key", "host:direct"), ("class", "hosts.Host")]
            .into_iter()
            .collect();
        let host = codec().decode_as::<Host>(&record).unwrap().unwrap();
        assert_eq!(host.hostname, "direct");
    }

    #[test]
    fn decode_numeric_identity_with_literals() {
        let record: Record = [
            ("@key", "monitor:99:state"),
            ("class", "monitors.Monitor"),
            ("healthy", "false"),
            ("checkedAt", "2024-05-01T08:30:00+00:00"),
            ("port", "443"),
        ]
        .into_iter()
        .collect();
        let decoded = codec_with_port().decode_as::<Monitor>(&record).unwrap();
        let monitor = decoded.unwrap();
        assert_eq!(monitor.id, 99);
        assert!(!monitor.healthy);
        assert_eq!(monitor.port, 443);
        assert_eq!(
            monitor.checked_at.map(|ts| ts.to_rfc3339()),
            Some("2024-05-01T08:30:00+00:00".to_string())
        );
    }

    #[test]
    fn decode_identity_that_fails_to_parse() {
        let record: Record = [("@key", "monitor:abc:state"), ("class", "monitors.Monitor")]
            .into_iter()
            .collect();
        let err = codec_with_port().decode(&record).unwrap_err();
        assert!(matches!(err, CodecError::Coercion { ref field, .. } if field == "id"));
    }

    #[test]
    fn schema_error_surfaces_unwrapped_on_both_paths() {
        use crate::entity::EntityDeclaration;
        use kvrec_types::ScalarType;

        #[derive(Debug, Default)]
        struct Keyless;
        impl Entity for Keyless {
            fn declare() -> EntityDeclaration {
                EntityDeclaration::new("t.Keyless").field("a", ScalarType::TEXT)
            }
            fn read_field(&self, name: &str) -> Result<ScalarValue, FieldAccessError> {
                Err(FieldAccessError::UnknownField(name.into()))
            }
            fn write_field(&mut self, name: &str, _: ScalarValue) -> Result<(), FieldAccessError> {
                Err(FieldAccessError::UnknownField(name.into()))
            }
            fn write_identity(&mut self, _: ScalarValue) -> Result<(), FieldAccessError> {
                Ok(())
            }
        }

        let mut types = TypeRegistry::new();
        types.register::<Keyless>().unwrap();
        let codec = Codec::with_types(types);
        let record: Record = [("@key", "k"), ("class", "t.Keyless")]
            .into_iter()
            .collect();
        assert_eq!(
            codec.decode(&record).unwrap_err(),
            CodecError::Schema(SchemaError::MissingIdentityField {
                class: "t.Keyless".into()
            })
        );
        assert!(matches!(
            codec.encode(&Keyless),
            Err(CodecError::Schema(SchemaError::MissingIdentityField { .. }))
        ));
    }

    // -----------------------------------------------------------------------
    // Strict mode
    // -----------------------------------------------------------------------

    #[test]
    fn lenient_mode_ignores_unknown_fields() {
        let record = host_record("hosts.GoogleHost", "google-01");
        assert!(codec().decode(&record).is_ok());
    }

    #[test]
    fn strict_mode_rejects_unknown_fields() {
        let codec = Codec::new(
            sample_types().unwrap(),
            CoercionRegistry::with_builtins(),
            CodecConfig::strict(),
        )
        .unwrap();
        let err = codec
            .decode(&host_record("hosts.GoogleHost", "google-01"))
            .unwrap_err();
        assert_eq!(
            err,
            CodecError::UnknownField {
                class: "hosts.GoogleHost".into(),
                field: "aFieldThatDoesNotExists".into(),
            }
        );

        let clean = codec.encode(&GoogleHost::sample("google-01")).unwrap();
        assert!(codec.decode(&clean).is_ok());
    }

    // -----------------------------------------------------------------------
    // Polymorphic filtering
    // -----------------------------------------------------------------------

    #[test]
    fn base_type_keeps_all_subtypes() {
        let codec = codec();
        let records = [
            host_record("hosts.GoogleHost", "a"),
            host_record("hosts.DigitalOcean", "b"),
        ];
        let kept: Vec<Box<dyn Entity>> = records
            .iter()
            .filter_map(|r| codec.decode_instance_of_type::<Host>(r).unwrap())
            .collect();
        assert_eq!(kept.len(), 2);
        assert!(kept[0].is::<GoogleHost>());
        assert!(kept[1].is::<DigitalOcean>());
    }

    #[test]
    fn subtype_skips_siblings() {
        let codec = codec();
        let records = [
            host_record("hosts.GoogleHost", "a"),
            host_record("hosts.DigitalOcean", "b"),
        ];
        let google: Vec<_> = records
            .iter()
            .filter_map(|r| codec.decode_instance_of(r, "hosts.GoogleHost").unwrap())
            .collect();
        assert_eq!(google.len(), 1);
        let first = google[0].downcast_ref::<GoogleHost>();
        assert_eq!(first.map(|g| g.host.hostname.as_str()), Some("a"));

        let oceans: Vec<DigitalOcean> = records
            .iter()
            .filter_map(|r| codec.decode_as::<DigitalOcean>(r).unwrap())
            .collect();
        assert_eq!(oceans.len(), 1);
        assert_eq!(oceans[0].host.hostname, "b");
        assert_eq!(oceans[0].token, "");
    }

    #[test]
    fn decode_as_base_type_is_exact() {
        // `decode_as` downcasts, so a GoogleHost is not returned as a Host.
        let record = host_record("hosts.GoogleHost", "a");
        assert!(codec().decode_as::<Host>(&record).unwrap().is_none());
    }

    #[test]
    fn instance_of_unknown_base_is_an_error() {
        let record = host_record("hosts.GoogleHost", "a");
        assert!(matches!(
            codec().decode_instance_of(&record, "hosts.Nope"),
            Err(CodecError::ClassResolution { .. })
        ));
    }

    // -----------------------------------------------------------------------
    // Concurrency
    // -----------------------------------------------------------------------

    #[test]
    fn concurrent_encode_decode_share_one_schema_build() {
        let codec = codec();
        std::thread::scope(|scope| {
            for i in 0..8 {
                let codec = &codec;
                scope.spawn(move || {
                    let original = GoogleHost::sample(format!("node-{i}"));
                    let record = codec.encode(&original).unwrap();
                    let decoded = codec.decode_as::<GoogleHost>(&record).unwrap();
                    assert_eq!(decoded, Some(original));
                });
            }
        });
        assert_eq!(codec.schemas().build_count(), 1);
    }
}
