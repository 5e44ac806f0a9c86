/// Configuration-related errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing errors
    #[error("TOML parsing error: {0}")]
    Toml(String),
    /// Configuration validation errors
    #[error("Configuration validation error: {0}")]
    Validation(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;
