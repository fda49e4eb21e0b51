use serde::{Deserialize, Serialize};

use crate::error::{CodecError, CodecResult};
use crate::template::DEFAULT_PLACEHOLDER;

/// Configuration for a [`Codec`](crate::Codec).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodecConfig {
    /// Reject record fields the resolved type does not declare. When `false`
    /// such fields are ignored, which lets old readers consume newer records.
    pub strict_fields: bool,
    /// Placeholder character in key patterns.
    pub placeholder: char,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            strict_fields: false,
            placeholder: DEFAULT_PLACEHOLDER,
        }
    }
}

impl CodecConfig {
    /// A configuration that rejects undeclared record fields.
    pub fn strict() -> Self {
        Self {
            strict_fields: true,
            ..Default::default()
        }
    }

    /// Parse a TOML document; missing keys take their default.
    pub fn from_toml_str(s: &str) -> CodecResult<Self> {
        let config: Self = toml::from_str(s).map_err(|e| CodecError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> CodecResult<()> {
        if self.placeholder.is_whitespace() || self.placeholder.is_control() {
            return Err(CodecError::Config(format!(
                "placeholder must be a visible character, got {:?}",
                self.placeholder
            )));
        }
        Ok(())
    }
}
