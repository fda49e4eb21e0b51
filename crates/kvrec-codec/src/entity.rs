//! The entity contract and its static declaration.
//!
//! Entities describe themselves through an [`EntityDeclaration`]: their
//! discriminator, their fields with scalar types, which field is the identity
//! and the key pattern that embeds it. Field values move through the
//! [`Entity`] accessors, so no runtime reflection is involved.

use std::any::{Any, TypeId};
use std::fmt;

use kvrec_types::{ScalarType, ScalarValue};

use crate::error::FieldAccessError;

/// A structured record type that can be stored as a flat record.
///
/// Implementations are plain structs with scalar fields:
///
/// ```
/// use kvrec_codec::{Entity, EntityDeclaration, FieldAccessError};
/// use kvrec_types::{ScalarType, ScalarValue};
///
/// #[derive(Debug, Default)]
/// struct Host {
///     hostname: String,
///     common_property: String,
/// }
///
/// impl Entity for Host {
///     fn declare() -> EntityDeclaration {
///         EntityDeclaration::new("hosts.Host")
///             .identity_with_key("hostname", ScalarType::TEXT, "host:$")
///             .field("commonProperty", ScalarType::TEXT)
///     }
///
///     fn read_field(&self, name: &str) -> Result<ScalarValue, FieldAccessError> {
///         match name {
///             "hostname" => Ok(self.hostname.as_str().into()),
///             "commonProperty" => Ok(self.common_property.as_str().into()),
///             other => Err(FieldAccessError::UnknownField(other.into())),
///         }
///     }
///
///     fn write_field(&mut self, name: &str, value: ScalarValue) -> Result<(), FieldAccessError> {
///         match name {
///             "commonProperty" => self.common_property = value.try_into()?,
///             other => return Err(FieldAccessError::UnknownField(other.into())),
///         }
///         Ok(())
///     }
///
///     fn write_identity(&mut self, value: ScalarValue) -> Result<(), FieldAccessError> {
///         self.hostname = value.try_into()?;
///         Ok(())
///     }
/// }
/// ```
pub trait Entity: Any + Send + Sync + fmt::Debug {
    /// The static shape of this type.
    fn declare() -> EntityDeclaration
    where
        Self: Sized;

    /// Read a declared field, the identity included.
    fn read_field(&self, name: &str) -> Result<ScalarValue, FieldAccessError>;

    /// Assign a declared non-identity field. Implementations may validate.
    fn write_field(&mut self, name: &str, value: ScalarValue) -> Result<(), FieldAccessError>;

    /// Assign the identity directly, without the validation `write_field`
    /// may apply.
    fn write_identity(&mut self, value: ScalarValue) -> Result<(), FieldAccessError>;
}

impl dyn Entity {
    /// Returns `true` if the concrete type is `T`.
    pub fn is<T: Entity>(&self) -> bool {
        let any: &dyn Any = self;
        any.is::<T>()
    }

    pub fn downcast_ref<T: Entity>(&self) -> Option<&T> {
        let any: &dyn Any = self;
        any.downcast_ref::<T>()
    }

    pub fn downcast_mut<T: Entity>(&mut self) -> Option<&mut T> {
        let any: &mut dyn Any = self;
        any.downcast_mut::<T>()
    }

    /// Take ownership of the concrete value. Returns `None`, dropping the
    /// entity, if its concrete type is not `T`.
    pub fn downcast<T: Entity>(self: Box<Self>) -> Option<Box<T>> {
        let any: Box<dyn Any> = self;
        any.downcast::<T>().ok()
    }

    /// `TypeId` of the concrete type behind the trait object.
    pub fn concrete_type_id(&self) -> TypeId {
        let any: &dyn Any = self;
        any.type_id()
    }
}

/// What a declared field is used for.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FieldRole {
    /// Stored under its own name in the record.
    Value,
    /// Embedded in the external key. `None` means the bare placeholder.
    Identity { key_pattern: Option<String> },
}

/// One declared field.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldDeclaration {
    pub name: String,
    pub scalar_type: ScalarType,
    pub role: FieldRole,
}

impl FieldDeclaration {
    pub fn is_identity(&self) -> bool {
        matches!(self.role, FieldRole::Identity { .. })
    }
}

/// Link from a declaration to the type it extends.
#[derive(Clone, Copy)]
pub struct ParentDeclaration {
    pub type_id: TypeId,
    pub type_name: &'static str,
    pub declare: fn() -> EntityDeclaration,
}

impl fmt::Debug for ParentDeclaration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParentDeclaration")
            .field("type_name", &self.type_name)
            .finish()
    }
}

/// The static shape of an entity type, built with a small fluent API.
#[derive(Clone, Debug)]
pub struct EntityDeclaration {
    class: String,
    parent: Option<ParentDeclaration>,
    fields: Vec<FieldDeclaration>,
}

impl EntityDeclaration {
    /// Start a declaration for the discriminator `class`.
    pub fn new(class: impl Into<String>) -> Self {
        Self {
            class: class.into(),
            parent: None,
            fields: Vec::new(),
        }
    }

    /// Inherit the fields, identity, and key pattern of `P`.
    pub fn extends<P: Entity>(mut self) -> Self {
        self.parent = Some(ParentDeclaration {
            type_id: TypeId::of::<P>(),
            type_name: std::any::type_name::<P>(),
            declare: P::declare,
        });
        self
    }

    /// Declare a plain field.
    pub fn field(mut self, name: impl Into<String>, scalar_type: ScalarType) -> Self {
        self.fields.push(FieldDeclaration {
            name: name.into(),
            scalar_type,
            role: FieldRole::Value,
        });
        self
    }

    /// Declare the identity field; its external key is the bare value.
    pub fn identity(mut self, name: impl Into<String>, scalar_type: ScalarType) -> Self {
        self.fields.push(FieldDeclaration {
            name: name.into(),
            scalar_type,
            role: FieldRole::Identity { key_pattern: None },
        });
        self
    }

    /// Declare the identity field with a key pattern such as `host:$`.
    pub fn identity_with_key(
        mut self,
        name: impl Into<String>,
        scalar_type: ScalarType,
        pattern: impl Into<String>,
    ) -> Self {
        self.fields.push(FieldDeclaration {
            name: name.into(),
            scalar_type,
            role: FieldRole::Identity {
                key_pattern: Some(pattern.into()),
            },
        });
        self
    }

    pub fn class(&self) -> &str {
        &self.class
    }

    pub fn parent(&self) -> Option<&ParentDeclaration> {
        self.parent.as_ref()
    }

    pub fn fields(&self) -> &[FieldDeclaration] {
        &self.fields
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{DigitalOcean, GoogleHost, Host};

    #[test]
    fn downcast_to_concrete_type() {
        let entity: Box<dyn Entity> = Box::new(GoogleHost::sample("google-01"));
        assert!(entity.is::<GoogleHost>());
        assert!(!entity.is::<Host>());
        assert_eq!(entity.concrete_type_id(), TypeId::of::<GoogleHost>());

        let google = entity.downcast::<GoogleHost>().expect("a GoogleHost");
        assert_eq!(google.host.hostname, "google-01");
    }

    #[test]
    fn downcast_to_other_type_is_none() {
        let entity: Box<dyn Entity> = Box::new(DigitalOcean::sample("ocean-820"));
        assert!(entity.downcast_ref::<GoogleHost>().is_none());
        assert!(entity.downcast::<GoogleHost>().is_none());
    }

    #[test]
    fn downcast_mut_edits_in_place() {
        let mut entity: Box<dyn Entity> = Box::new(Host::new("a"));
        if let Some(host) = entity.downcast_mut::<Host>() {
            host.common_property = "edited".into();
        }
        assert_eq!(
            entity.read_field("commonProperty"),
            Ok(ScalarValue::from("edited"))
        );
    }

    #[test]
    fn parent_declaration_carries_parent_shape() {
        let declaration = GoogleHost::declare();
        let parent = declaration.parent().expect("extends Host");
        assert_eq!(parent.type_id, TypeId::of::<Host>());
        assert_eq!((parent.declare)().class(), "hosts.Host");
    }
}
