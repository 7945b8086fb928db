use crate::config::ConfigError;
use thiserror::Error;

/// Top-level error for building a transport.
///
/// Nothing on the write or flush path returns this; those failures go to the
/// diagnostic sink instead.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("HTTP client error: {0}")]
    Client(String),

    #[error("Transport must be created inside a Tokio runtime: {0}")]
    Runtime(String),
}

/// A raw entry could not be interpreted as a log entry.
#[derive(Error, Debug)]
pub enum OptimizationError {
    #[error("Invalid log entry JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("Log entry must be a JSON object, got {0}")]
    NotAnObject(&'static str),
}
