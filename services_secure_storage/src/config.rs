//! Build-time configuration of the storage service

use crate::error::ConfigError;
use serde::Deserialize;

/// Default size of the staging buffer used by the message path
pub const DEFAULT_STAGING_BUFFER_SIZE: usize = 16;

/// Storage service configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Bytes moved per chunk between transport and object store
    pub staging_buffer_size: usize,
    /// Whether reads and writes may start at a non-zero offset
    pub partial_asset_rw: bool,
    /// Wipe and retry once when the object store fails to prepare
    pub create_layout_on_failure: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            staging_buffer_size: DEFAULT_STAGING_BUFFER_SIZE,
            partial_asset_rw: true,
            create_layout_on_failure: false,
        }
    }
}

impl StorageConfig {
    /// Loads a configuration from JSON; missing fields take their defaults
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: StorageConfig = serde_json::from_str(json)
            .map_err(|err| ConfigError::InvalidDocument(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Checks the configuration is usable
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.staging_buffer_size == 0 {
            return Err(ConfigError::ZeroStagingBuffer);
        }
        Ok(())
    }
}
