//! Error types for baseline-sync

use thiserror::Error;

/// Result type alias using the common Error
pub type Result<T> = std::result::Result<T, Error>;

/// Configuration-class errors. None of these are retried.
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Config parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid project name: {0}")]
    InvalidProject(String),

    #[error("Invalid tag value for {dimension}: {value:?}")]
    InvalidTagValue { dimension: String, value: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}
