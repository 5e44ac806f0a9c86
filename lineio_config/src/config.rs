use crate::error::{ConfigError, ConfigResult};
use crate::settings::{IoSettings, LogSettings};
use crate::toml_parser::{TomlParser, TomlValue, escape_basic_string};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

/// Main configuration structure for lineio
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Config {
    /// File I/O settings
    pub io: IoSettings,
    /// Logging settings
    pub log: LogSettings,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Load configuration from TOML string
    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        let values = TomlParser::parse(content)?;

        Ok(Self {
            io: IoSettings::from_toml(&values)?,
            log: LogSettings::from_toml(&values)?,
        })
    }

    /// Export configuration as TOML string
    pub fn to_toml_string(&self) -> String {
        let mut values = self.io.to_toml();
        values.extend(self.log.to_toml());
        Self::format_toml(&values)
    }

    fn format_toml(values: &HashMap<String, TomlValue>) -> String {
        // Sorted so output is stable
        let mut sections: BTreeMap<&str, BTreeMap<&str, &TomlValue>> = BTreeMap::new();
        for (key, value) in values {
            let (section, name) = key.split_once('.').unwrap_or(("", key.as_str()));
            sections.entry(section).or_default().insert(name, value);
        }

        let mut output = String::new();
        for (section, entries) in sections {
            if !section.is_empty() {
                output.push_str(&format!("[{}]\n", section));
            }
            for (key, value) in entries {
                output.push_str(&format!("{} = {}\n", key, Self::format_toml_value(value)));
            }
            output.push('\n');
        }
        output
    }

    fn format_toml_value(value: &TomlValue) -> String {
        match value {
            TomlValue::String(s) => format!("\"{}\"", escape_basic_string(s)),
            TomlValue::Integer(i) => format!("{}", i),
            TomlValue::Bool(b) => format!("{}", b),
        }
    }

    /// Get configuration file search paths
    pub fn config_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();

        // User-specific config
        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".lineio").join("config.toml"));
            paths.push(home.join(".config").join("lineio").join("config.toml"));
        }

        // System-wide config
        paths.push(PathBuf::from("/etc/lineio/config.toml"));

        // Current directory
        if let Ok(current_dir) = std::env::current_dir() {
            paths.push(current_dir.join("lineio.toml"));
        }

        paths
    }

    /// Load configuration with automatic path discovery
    pub fn load() -> ConfigResult<Self> {
        Self::load_with_paths(&Self::config_paths())
    }

    /// Load the first existing file in `paths`, or the defaults
    pub fn load_with_paths(paths: &[PathBuf]) -> ConfigResult<Self> {
        for path in paths {
            if path.exists() {
                return Self::from_file(path);
            }
        }

        Ok(Self::default())
    }

    /// Validate the configuration
    pub fn validate(&self) -> ConfigResult<()> {
        if self.io.chunk_threshold == 0 {
            return Err(ConfigError::Validation(
                "Chunk threshold must be greater than 0".to_string(),
            ));
        }
        let suffix = &self.io.temp_suffix;
        if suffix.is_empty() {
            return Err(ConfigError::Validation(
                "Temp suffix must not be empty".to_string(),
            ));
        }
        if suffix.contains(['/', '\\']) {
            return Err(ConfigError::Validation(format!(
                "Temp suffix must not contain a path separator: {}",
                suffix
            )));
        }
        if self.log.level.trim().is_empty() {
            return Err(ConfigError::Validation(
                "Log level must not be empty".to_string(),
            ));
        }

        Ok(())
    }
}

/// Configuration builder for creating custom configurations
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn io<F>(mut self, f: F) -> Self
    where
        F: FnOnce(&mut IoSettings),
    {
        f(&mut self.config.io);
        self
    }

    pub fn log<F>(mut self, f: F) -> Self
    where
        F: FnOnce(&mut LogSettings),
    {
        f(&mut self.config.log);
        self
    }

    /// Build and validate
    pub fn build(self) -> ConfigResult<Config> {
        self.config.validate()?;
        Ok(self.config)
    }
}
