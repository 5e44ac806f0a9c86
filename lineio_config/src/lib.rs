#![warn(clippy::unwrap_used)]

pub mod config;
pub mod error;
pub mod settings;
pub mod toml_parser;

pub use config::*;
pub use error::*;
pub use settings::*;
pub use toml_parser::*;
