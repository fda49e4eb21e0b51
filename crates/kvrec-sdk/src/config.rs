use kvrec_codec::CodecConfig;
use serde::{Deserialize, Serialize};

use crate::error::{SdkError, SdkResult};

/// Configuration for an [`Adapter`](crate::Adapter).
///
/// ```toml
/// skip_empty = true
///
/// [codec]
/// strict_fields = false
/// placeholder = "$"
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdapterConfig {
    pub codec: CodecConfig,
    /// Drop keys the store has no hash for instead of reporting them.
    pub skip_empty: bool,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            codec: CodecConfig::default(),
            skip_empty: true,
        }
    }
}

impl AdapterConfig {
    pub fn from_toml_str(s: &str) -> SdkResult<Self> {
        let config: Self = toml::from_str(s).map_err(|e| SdkError::Config(e.to_string()))?;
        config.codec.validate()?;
        Ok(config)
    }
}
