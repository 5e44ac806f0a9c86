use crate::error::{ConfigError, ConfigResult};
use crate::toml_parser::TomlValue;
use std::collections::HashMap;
use std::path::PathBuf;

/// Default buffered length, in characters, that triggers a chunk write
pub const DEFAULT_CHUNK_THRESHOLD: usize = 32 * 1024;

/// File I/O settings
#[derive(Debug, Clone, PartialEq)]
pub struct IoSettings {
    /// Buffered characters that trigger a chunk write
    pub chunk_threshold: usize,
    /// Suffix for the temp file written beside the target
    pub temp_suffix: String,
    /// Fsync on flush
    pub sync_on_flush: bool,
    /// Base for relative paths; home directory when unset
    pub base_dir: Option<PathBuf>,
}

impl Default for IoSettings {
    fn default() -> Self {
        Self {
            chunk_threshold: DEFAULT_CHUNK_THRESHOLD,
            temp_suffix: ".tmp".to_string(),
            sync_on_flush: true,
            base_dir: None,
        }
    }
}

impl IoSettings {
    /// Load settings from TOML values
    pub fn from_toml(values: &HashMap<String, TomlValue>) -> ConfigResult<Self> {
        let mut settings = Self::default();

        if let Some(value) = values.get("io.chunk_threshold") {
            let threshold = value.as_integer()?;
            settings.chunk_threshold = usize::try_from(threshold).map_err(|_| {
                ConfigError::Validation(format!("Invalid chunk threshold: {}", threshold))
            })?;
        }
        if let Some(value) = values.get("io.temp_suffix") {
            settings.temp_suffix = value.as_string()?.to_string();
        }
        if let Some(value) = values.get("io.sync_on_flush") {
            settings.sync_on_flush = value.as_bool()?;
        }
        if let Some(value) = values.get("io.base_dir") {
            settings.base_dir = Some(PathBuf::from(value.as_string()?));
        }

        Ok(settings)
    }

    /// Convert settings to TOML values
    pub fn to_toml(&self) -> HashMap<String, TomlValue> {
        let mut values = HashMap::new();

        values.insert(
            "io.chunk_threshold".to_string(),
            TomlValue::Integer(self.chunk_threshold as i64),
        );
        values.insert(
            "io.temp_suffix".to_string(),
            TomlValue::String(self.temp_suffix.clone()),
        );
        values.insert(
            "io.sync_on_flush".to_string(),
            TomlValue::Bool(self.sync_on_flush),
        );
        if let Some(base_dir) = &self.base_dir {
            values.insert(
                "io.base_dir".to_string(),
                TomlValue::String(base_dir.to_string_lossy().into_owned()),
            );
        }

        values
    }
}

/// Logging settings
#[derive(Debug, Clone, PartialEq)]
pub struct LogSettings {
    /// Filter directive used when `RUST_LOG` is unset
    pub level: String,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl LogSettings {
    pub fn from_toml(values: &HashMap<String, TomlValue>) -> ConfigResult<Self> {
        let mut settings = Self::default();
        if let Some(value) = values.get("log.level") {
            settings.level = value.as_string()?.to_string();
        }
        Ok(settings)
    }

    pub fn to_toml(&self) -> HashMap<String, TomlValue> {
        HashMap::from([(
            "log.level".to_string(),
            TomlValue::String(self.level.clone()),
        )])
    }
}
