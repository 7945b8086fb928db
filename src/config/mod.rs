//! Transport configuration.
//!
//! A [`TransportConfig`] is produced once by [`ConfigResolver`] from three
//! layers (defaults, environment, explicit overrides) and never changes after.

mod env;
mod overrides;
mod resolver;
mod validation;

use reqwest::Method;
use reqwest::header::HeaderMap;
use std::time::Duration;
use thiserror::Error;
use url::Url;

pub use env::{
    ENV_BATCH_SIZE, ENV_FLUSH_INTERVAL, ENV_HEADERS, ENV_INCLUDE_METADATA, ENV_METHOD,
    ENV_MINIMAL, ENV_PREFIX, ENV_RETRIES, ENV_RETRY_DELAY, ENV_TIMEOUT, ENV_URL, parse_headers,
};
pub use overrides::ConfigOverrides;
pub use resolver::{ConfigResolver, EnvLookup};
pub use validation::{MAX_BATCH_SIZE, MAX_TIMEOUT_MS, MIN_BATCH_SIZE, MIN_TIMEOUT_MS};

pub const DEFAULT_BATCH_SIZE: usize = 50;
pub const DEFAULT_FLUSH_INTERVAL_MS: u64 = 10_000;
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;
pub const DEFAULT_RETRIES: u32 = 3;
pub const DEFAULT_RETRY_DELAY_MS: u64 = 1_000;
pub const DEFAULT_METHOD: &str = "POST";
pub const DEFAULT_USER_AGENT: &str = concat!("rask-log-transport/", env!("CARGO_PKG_VERSION"));

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("HTTP URL is required for HTTP transport")]
    MissingUrl,
    #[error("Invalid HTTP URL: {0}")]
    InvalidUrl(String),
    #[error("Invalid batch size: {0}. Must be between 1 and 1000")]
    InvalidBatchSize(usize),
    #[error("Invalid timeout: {0}. Must be between 1000ms and 300000ms")]
    InvalidTimeout(u64),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("Invalid HTTP method: {0}")]
    InvalidMethod(String),
    #[error("Invalid HTTP header: {0}")]
    InvalidHeader(String),
    #[error("Environment error: {0}")]
    EnvError(String),
    #[error("File error: {0}")]
    FileError(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    ParseError(#[from] toml::de::Error),
}

/// Payload scope sent to the destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    Full,
    Minimal,
}

impl Scope {
    pub fn as_str(self) -> &'static str {
        match self {
            Scope::Full => "full",
            Scope::Minimal => "minimal",
        }
    }
}

/// Resolved, validated transport configuration.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    url: Url,
    batch_size: usize,
    flush_interval: Duration,
    timeout: Duration,
    retries: u32,
    retry_delay: Duration,
    headers: HeaderMap,
    method: Method,
    minimal: bool,
    include_metadata: bool,
}

impl TransportConfig {
    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn flush_interval(&self) -> Duration {
        self.flush_interval
    }

    /// Per-attempt request timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Total number of delivery attempts per flush.
    pub fn retries(&self) -> u32 {
        self.retries
    }

    /// Base delay of the exponential backoff.
    pub fn retry_delay(&self) -> Duration {
        self.retry_delay
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn minimal(&self) -> bool {
        self.minimal
    }

    pub fn include_metadata(&self) -> bool {
        self.include_metadata
    }

    pub fn scope(&self) -> Scope {
        if self.minimal {
            Scope::Minimal
        } else {
            Scope::Full
        }
    }
}
