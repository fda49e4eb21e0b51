//! Per-type entity schemas and the cache that builds them once.

use std::any::TypeId;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock, RwLock};

use kvrec_types::{Record, ScalarType};
use tracing::{debug, warn};

use crate::entity::{EntityDeclaration, FieldRole};
use crate::error::{SchemaError, SchemaResult};
use crate::registry::EntityKind;
use crate::template::{KeyTemplate, DEFAULT_PLACEHOLDER};

/// Longest parent chain accepted before assuming a cycle.
const MAX_LINEAGE_DEPTH: usize = 64;

/// A field as seen by the codec.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldDescriptor {
    pub name: String,
    pub scalar_type: ScalarType,
    pub is_identity: bool,
}

/// Immutable, flattened metadata for one entity type.
#[derive(Debug, PartialEq, Eq)]
pub struct EntitySchema {
    class: String,
    fields: Vec<FieldDescriptor>,
    identity: usize,
    key_template: KeyTemplate,
    lineage: Vec<String>,
}

impl EntitySchema {
    /// Discriminator written under `class`.
    pub fn class(&self) -> &str {
        &self.class
    }

    /// All fields, inherited ones first, the identity included.
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    /// Fields stored under their own name (everything but the identity).
    pub fn value_fields(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.fields.iter().filter(|f| !f.is_identity)
    }

    pub fn identity_field(&self) -> &FieldDescriptor {
        &self.fields[self.identity]
    }

    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn key_template(&self) -> &KeyTemplate {
        &self.key_template
    }

    /// Ancestor discriminators, root first.
    pub fn lineage(&self) -> &[String] {
        &self.lineage
    }

    /// Returns `true` if this type is `class` or descends from it.
    pub fn is_instance_of(&self, class: &str) -> bool {
        self.class == class || self.lineage.iter().any(|c| c == class)
    }

    fn build(kind: &EntityKind, placeholder: char) -> SchemaResult<Self> {
        let chain = resolve_chain(kind)?;
        let leaf = chain.last().map(|d| d.class().to_string()).unwrap_or_default();

        let mut fields = Vec::new();
        let mut seen = HashSet::new();
        let mut identities = Vec::new();
        for decl in &chain {
            for field in decl.fields() {
                if Record::is_reserved(&field.name) {
                    return Err(SchemaError::ReservedFieldName {
                        class: leaf,
                        field: field.name.clone(),
                    });
                }
                if !seen.insert(field.name.clone()) {
                    return Err(SchemaError::DuplicateField {
                        class: leaf,
                        field: field.name.clone(),
                    });
                }
                if let FieldRole::Identity { key_pattern } = &field.role {
                    identities.push((fields.len(), key_pattern.clone()));
                }
                fields.push(FieldDescriptor {
                    name: field.name.clone(),
                    scalar_type: field.scalar_type.clone(),
                    is_identity: field.is_identity(),
                });
            }
        }

        let (identity, key_pattern) = match identities.len() {
            0 => return Err(SchemaError::MissingIdentityField { class: leaf }),
            1 => identities.remove(0),
            _ => {
                return Err(SchemaError::AmbiguousIdentityField {
                    class: leaf,
                    fields: identities
                        .iter()
                        .map(|(i, _)| fields[*i].name.clone())
                        .collect(),
                })
            }
        };
        let key_template = match key_pattern {
            Some(pattern) => KeyTemplate::parse_with(&pattern, placeholder)?,
            None => KeyTemplate::parse_with(&placeholder.to_string(), placeholder)?,
        };

        let lineage = chain[..chain.len() - 1]
            .iter()
            .map(|d| d.class().to_string())
            .collect();

        Ok(Self {
            class: leaf,
            fields,
            identity,
            key_template,
            lineage,
        })
    }
}

/// Declarations from the root ancestor down to `kind` itself.
fn resolve_chain(kind: &EntityKind) -> SchemaResult<Vec<EntityDeclaration>> {
    let leaf = kind.declaration();
    let mut visited = vec![kind.type_id()];
    let mut chain = vec![leaf];
    loop {
        let Some(parent) = chain.last().and_then(|d| d.parent().copied()) else {
            break;
        };
        if visited.contains(&parent.type_id) || chain.len() >= MAX_LINEAGE_DEPTH {
            return Err(SchemaError::InheritanceCycle {
                class: chain[0].class().to_string(),
            });
        }
        visited.push(parent.type_id);
        chain.push((parent.declare)());
    }
    chain.reverse();
    Ok(chain)
}

type SchemaCell = Arc<OnceLock<SchemaResult<Arc<EntitySchema>>>>;

/// Read-through cache of entity schemas, keyed by Rust type.
///
/// Each type gets its own build-once cell. The map lock is only held while
/// finding or inserting a cell, so a slow build never blocks lookups of
/// other types, and concurrent first lookups of one type share one build.
/// Failed builds are cached like successful ones.
#[derive(Debug)]
pub struct SchemaCache {
    placeholder: char,
    cells: RwLock<HashMap<TypeId, SchemaCell>>,
    builds: AtomicUsize,
}

impl SchemaCache {
    pub fn new() -> Self {
        Self::with_placeholder(DEFAULT_PLACEHOLDER)
    }

    /// A cache whose key templates use `placeholder`.
    pub fn with_placeholder(placeholder: char) -> Self {
        Self {
            placeholder,
            cells: RwLock::new(HashMap::new()),
            builds: AtomicUsize::new(0),
        }
    }

    /// The schema for `kind`, building it on first use.
    pub fn schema_for(&self, kind: &EntityKind) -> SchemaResult<Arc<EntitySchema>> {
        let cell = self.cell(kind.type_id());
        cell.get_or_init(|| {
            self.builds.fetch_add(1, Ordering::Relaxed);
            match EntitySchema::build(kind, self.placeholder) {
                Ok(schema) => {
                    debug!(
                        class = %schema.class,
                        fields = schema.fields.len(),
                        key_pattern = %schema.key_template.pattern(),
                        "entity schema built"
                    );
                    Ok(Arc::new(schema))
                }
                Err(e) => {
                    warn!(type_name = kind.type_name(), error = %e, "entity schema rejected");
                    Err(e)
                }
            }
        })
        .clone()
    }

    fn cell(&self, type_id: TypeId) -> SchemaCell {
        if let Some(cell) = self
            .cells
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(&type_id)
        {
            return Arc::clone(cell);
        }
        let mut cells = self
            .cells
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        Arc::clone(cells.entry(type_id).or_default())
    }

    /// Number of builds performed (successful or not).
    pub fn build_count(&self) -> usize {
        self.builds.load(Ordering::Relaxed)
    }

    /// Number of types looked up so far.
    pub fn len(&self) -> usize {
        self.cells
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for SchemaCache {
    fn default() -> Self {
        Self::new()
    }
}
