use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

use crate::errors::ConfigError;

const DEFAULT_MAX_RESOLUTION_DEPTH: usize = 256;

/// Container configuration
///
/// Every field is optional in TOML; missing fields fall back to the defaults.
///
/// ```toml
/// cycle_detection = true
/// max_resolution_depth = 256
/// ```
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ContainerConfig {
    /// Fail with `CyclicDependency` as soon as a contract re-enters its own resolution chain
    pub cycle_detection: bool,
    /// Upper bound on nested activations for one top-level resolve
    pub max_resolution_depth: usize,
}

impl Default for ContainerConfig {
    fn default() -> Self {
        Self {
            cycle_detection: true,
            max_resolution_depth: DEFAULT_MAX_RESOLUTION_DEPTH,
        }
    }
}

impl ContainerConfig {
    /// Parse configuration from a TOML string
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Self::parse(content, "<inline>")
    }

    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = path.to_string_lossy().to_string();

        let content =
            fs::read_to_string(path).map_err(|e| ConfigError::FileRead(source.clone(), e))?;
        let config = Self::parse(&content, &source)?;

        tracing::debug!(path = %source, ?config, "Container configuration loaded");
        Ok(config)
    }

    fn parse(content: &str, source: &str) -> Result<Self, ConfigError> {
        let config: ContainerConfig = toml::from_str(content)
            .map_err(|e| ConfigError::TomlParse(source.to_string(), e))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate field values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_resolution_depth == 0 {
            return Err(ConfigError::Invalid {
                field: "max_resolution_depth",
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}
