//! Discriminator → entity type registry supplied by the host at startup.

use std::any::TypeId;
use std::collections::HashMap;
use std::fmt;

use crate::entity::{Entity, EntityDeclaration};
use crate::error::{CodecError, CodecResult};

/// Everything the codec needs to know about one registered entity type.
#[derive(Clone, Copy)]
pub struct EntityKind {
    type_id: TypeId,
    type_name: &'static str,
    declare: fn() -> EntityDeclaration,
    construct: Option<fn() -> Box<dyn Entity>>,
}

impl EntityKind {
    /// A kind that can be declared but not instantiated.
    pub fn of<T: Entity>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
            declare: T::declare,
            construct: None,
        }
    }

    /// A kind instantiated through `T::default()`.
    pub fn constructible<T: Entity + Default>() -> Self {
        Self {
            construct: Some(construct_default::<T>),
            ..Self::of::<T>()
        }
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Rust type name, for diagnostics only.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn declaration(&self) -> EntityDeclaration {
        (self.declare)()
    }

    /// A zero-value instance, or `None` if the kind has no construction path.
    pub fn instantiate(&self) -> Option<Box<dyn Entity>> {
        self.construct.map(|construct| construct())
    }
}

fn construct_default<T: Entity + Default>() -> Box<dyn Entity> {
    Box::new(T::default())
}

impl fmt::Debug for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityKind")
            .field("type_name", &self.type_name)
            .field("constructible", &self.construct.is_some())
            .finish()
    }
}

/// Registered entity kinds, by discriminator and by Rust type.
#[derive(Default)]
pub struct TypeRegistry {
    by_class: HashMap<String, EntityKind>,
    by_type: HashMap<TypeId, String>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a type decodable through `T::default()`.
    pub fn register<T: Entity + Default>(&mut self) -> CodecResult<&mut Self> {
        self.insert(EntityKind::constructible::<T>())
    }

    /// Register a type that can be encoded and used as a filter base, but
    /// not instantiated. Decoding a record naming it fails with
    /// [`CodecError::Instantiation`].
    pub fn register_abstract<T: Entity>(&mut self) -> CodecResult<&mut Self> {
        self.insert(EntityKind::of::<T>())
    }

    fn insert(&mut self, kind: EntityKind) -> CodecResult<&mut Self> {
        let class = kind.declaration().class().to_string();
        if self.by_class.contains_key(&class) || self.by_type.contains_key(&kind.type_id) {
            return Err(CodecError::DuplicateClass { class });
        }
        self.by_type.insert(kind.type_id, class.clone());
        self.by_class.insert(class, kind);
        Ok(self)
    }

    pub fn by_class(&self, class: &str) -> Option<&EntityKind> {
        self.by_class.get(class)
    }

    pub fn by_type_id(&self, type_id: TypeId) -> Option<&EntityKind> {
        self.class_of(type_id)
            .and_then(|class| self.by_class.get(class))
    }

    /// Discriminator of a registered Rust type.
    pub fn class_of(&self, type_id: TypeId) -> Option<&str> {
        self.by_type.get(&type_id).map(String::as_str)
    }

    pub fn class_of_type<T: Entity>(&self) -> Option<&str> {
        self.class_of(TypeId::of::<T>())
    }

    pub fn len(&self) -> usize {
        self.by_class.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_class.is_empty()
    }

    /// Registered discriminators, sorted.
    pub fn classes(&self) -> Vec<&str> {
        let mut classes: Vec<&str> = self.by_class.keys().map(String::as_str).collect();
        classes.sort_unstable();
        classes
    }
}

impl fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeRegistry")
            .field("classes", &self.classes())
            .finish()
    }
}
