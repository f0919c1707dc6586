use std::path::Path;
use thiserror::Error;

use super::types::ManagerSettings;

/// Largest offset a zone may have from UTC, exclusive
const MAX_ZONE_OFFSET_SECONDS: i32 = 86_400;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read settings file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse settings: {0}")]
    ParseError(#[from] serde_json::Error),
    #[error("Channel capacity must be at least 1")]
    ZeroCapacity,
    #[error("Zone offset out of range: {0}s")]
    ZoneOffset(i32),
}

/// Load manager settings from a JSON file
pub fn load_settings<P: AsRef<Path>>(path: P) -> Result<ManagerSettings, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    load_settings_from_str(&content)
}

/// Load settings from a JSON string
pub fn load_settings_from_str(json: &str) -> Result<ManagerSettings, ConfigError> {
    let settings: ManagerSettings = serde_json::from_str(json)?;
    settings.validate()?;
    Ok(settings)
}

/// Load the default embedded settings
pub fn load_default_settings() -> Result<ManagerSettings, ConfigError> {
    let default_settings = include_str!("default_settings.json");
    load_settings_from_str(default_settings)
}

impl ManagerSettings {
    /// Validate the settings
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.engine.channel_capacity == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        if self.zone_offset_seconds.abs() >= MAX_ZONE_OFFSET_SECONDS {
            return Err(ConfigError::ZoneOffset(self.zone_offset_seconds));
        }
        Ok(())
    }
}
