//! Sample entities used by the test suites of this and downstream crates.
//!
//! `GoogleHost` and `DigitalOcean` both extend `Host`, so they share the
//! `host:$` key namespace while carrying different discriminators.

use kvrec_types::{ScalarType, ScalarValue, Timestamp};

use crate::entity::{Entity, EntityDeclaration};
use crate::error::{CodecResult, FieldAccessError};
use crate::registry::TypeRegistry;

pub const GOOGLE_COMMON: &str = "lorem impsum";
pub const GOOGLE_CREDENTIALS: &str = "8923y7 9ryfh9 dshfvp9asdh vpz è";
pub const GOOGLE_TTL: f64 = 742389.7589234;

/// Scalar type with no built-in coercion.
pub const PORT: ScalarType = ScalarType::from_static("port");

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Host {
    pub hostname: String,
    pub common_property: String,
}

impl Host {
    pub fn new(hostname: impl Into<String>) -> Self {
        Self {
            hostname: hostname.into(),
            ..Default::default()
        }
    }
}

impl Entity for Host {
    fn declare() -> EntityDeclaration {
        EntityDeclaration::new("hosts.Host")
            .identity_with_key("hostname", ScalarType::TEXT, "host:$")
            .field("commonProperty", ScalarType::TEXT)
    }

    fn read_field(&self, name: &str) -> Result<ScalarValue, FieldAccessError> {
        match name {
            "hostname" => Ok(self.hostname.as_str().into()),
            "commonProperty" => Ok(self.common_property.as_str().into()),
            other => Err(FieldAccessError::UnknownField(other.into())),
        }
    }

    fn write_field(&mut self, name: &str, value: ScalarValue) -> Result<(), FieldAccessError> {
        match name {
            "commonProperty" => self.common_property = value.try_into()?,
            "hostname" => {
                return Err(FieldAccessError::Rejected {
                    field: name.into(),
                    reason: "hostname is immutable once created".into(),
                })
            }
            other => return Err(FieldAccessError::UnknownField(other.into())),
        }
        Ok(())
    }

    fn write_identity(&mut self, value: ScalarValue) -> Result<(), FieldAccessError> {
        self.hostname = value.try_into()?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GoogleHost {
    pub host: Host,
    pub credential_file: String,
    pub ttl: f64,
    pub sparse: f64,
}

impl GoogleHost {
    pub fn new(hostname: impl Into<String>) -> Self {
        Self {
            host: Host::new(hostname),
            ..Default::default()
        }
    }

    /// A fully populated sample.
    pub fn sample(hostname: impl Into<String>) -> Self {
        let mut google = Self::new(hostname);
        google.host.common_property = GOOGLE_COMMON.into();
        google.credential_file = GOOGLE_CREDENTIALS.into();
        google.ttl = GOOGLE_TTL;
        google
    }
}

impl Default for GoogleHost {
    fn default() -> Self {
        Self {
            host: Host::default(),
            credential_file: String::new(),
            ttl: 983.84,
            sparse: 4230.423,
        }
    }
}

impl Entity for GoogleHost {
    fn declare() -> EntityDeclaration {
        EntityDeclaration::new("hosts.GoogleHost")
            .extends::<Host>()
            .field("credentialFile", ScalarType::TEXT)
            .field("ttl", ScalarType::FLOAT64)
            .field("sparse", ScalarType::FLOAT64)
    }

    fn read_field(&self, name: &str) -> Result<ScalarValue, FieldAccessError> {
        match name {
            "credentialFile" => Ok(self.credential_file.as_str().into()),
            "ttl" => Ok(self.ttl.into()),
            "sparse" => Ok(self.sparse.into()),
            other => self.host.read_field(other),
        }
    }

    fn write_field(&mut self, name: &str, value: ScalarValue) -> Result<(), FieldAccessError> {
        match name {
            "credentialFile" => self.credential_file = value.try_into()?,
            "ttl" => self.ttl = value.try_into()?,
            "sparse" => self.sparse = value.try_into()?,
            other => return self.host.write_field(other, value),
        }
        Ok(())
    }

    fn write_identity(&mut self, value: ScalarValue) -> Result<(), FieldAccessError> {
        self.host.write_identity(value)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DigitalOcean {
    pub host: Host,
    pub token: String,
}

impl DigitalOcean {
    pub fn sample(hostname: impl Into<String>) -> Self {
        let mut ocean = Self {
            host: Host::new(hostname),
            token: "08f97sa0f9yds908gb".into(),
        };
        ocean.host.common_property = "ocean-common".into();
        ocean
    }
}

impl Entity for DigitalOcean {
    fn declare() -> EntityDeclaration {
        EntityDeclaration::new("hosts.DigitalOcean")
            .extends::<Host>()
            .field("token", ScalarType::TEXT)
    }

    fn read_field(&self, name: &str) -> Result<ScalarValue, FieldAccessError> {
        match name {
            "token" => Ok(self.token.as_str().into()),
            other => self.host.read_field(other),
        }
    }

    fn write_field(&mut self, name: &str, value: ScalarValue) -> Result<(), FieldAccessError> {
        match name {
            "token" => self.token = value.try_into()?,
            other => return self.host.write_field(other, value),
        }
        Ok(())
    }

    fn write_identity(&mut self, value: ScalarValue) -> Result<(), FieldAccessError> {
        self.host.write_identity(value)
    }
}

/// An entity with a numeric identity, a timestamp, and a field of the
/// unregistered [`PORT`] type.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Monitor {
    pub id: i64,
    pub healthy: bool,
    pub checked_at: Option<Timestamp>,
    pub port: i64,
}

impl Entity for Monitor {
    fn declare() -> EntityDeclaration {
        EntityDeclaration::new("monitors.Monitor")
            .identity_with_key("id", ScalarType::INT64, "monitor:$:state")
            .field("healthy", ScalarType::BOOL)
            .field("checkedAt", ScalarType::TIMESTAMP)
            .field("port", PORT)
    }

    fn read_field(&self, name: &str) -> Result<ScalarValue, FieldAccessError> {
        match name {
            "id" => Ok(self.id.into()),
            "healthy" => Ok(self.healthy.into()),
            "checkedAt" => self.checked_at.map(ScalarValue::from).ok_or_else(|| {
                FieldAccessError::Rejected {
                    field: name.into(),
                    reason: "monitor was never checked".into(),
                }
            }),
            "port" => Ok(self.port.into()),
            other => Err(FieldAccessError::UnknownField(other.into())),
        }
    }

    fn write_field(&mut self, name: &str, value: ScalarValue) -> Result<(), FieldAccessError> {
        match name {
            "healthy" => self.healthy = value.try_into()?,
            "checkedAt" => self.checked_at = Some(value.try_into()?),
            "port" => self.port = value.try_into()?,
            other => return Err(FieldAccessError::UnknownField(other.into())),
        }
        Ok(())
    }

    fn write_identity(&mut self, value: ScalarValue) -> Result<(), FieldAccessError> {
        self.id = value.try_into()?;
        Ok(())
    }
}

/// Registry holding every sample type.
pub fn sample_types() -> CodecResult<TypeRegistry> {
    let mut types = TypeRegistry::new();
    types
        .register::<Host>()?
        .register::<GoogleHost>()?
        .register::<DigitalOcean>()?
        .register::<Monitor>()?;
    Ok(types)
}
