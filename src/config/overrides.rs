use super::{
    ConfigError, DEFAULT_BATCH_SIZE, DEFAULT_FLUSH_INTERVAL_MS, DEFAULT_METHOD, DEFAULT_RETRIES,
    DEFAULT_RETRY_DELAY_MS, DEFAULT_TIMEOUT_MS, DEFAULT_USER_AGENT,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// One partial configuration layer.
///
/// Every field is optional; a `None` leaves the value of the lower layer in
/// place. Durations are milliseconds. Keys are camelCase in TOML and JSON.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ConfigOverrides {
    pub url: Option<String>,
    pub batch_size: Option<usize>,
    pub flush_interval: Option<u64>,
    pub timeout: Option<u64>,
    pub retries: Option<u32>,
    pub retry_delay: Option<u64>,
    pub headers: Option<BTreeMap<String, String>>,
    pub method: Option<String>,
    pub minimal: Option<bool>,
    pub include_metadata: Option<bool>,
}

impl ConfigOverrides {
    /// The built-in defaults as a fully populated layer (no URL).
    pub fn defaults() -> Self {
        let headers = BTreeMap::from([
            ("Content-Type".to_string(), "application/json".to_string()),
            ("User-Agent".to_string(), DEFAULT_USER_AGENT.to_string()),
        ]);

        Self {
            url: None,
            batch_size: Some(DEFAULT_BATCH_SIZE),
            flush_interval: Some(DEFAULT_FLUSH_INTERVAL_MS),
            timeout: Some(DEFAULT_TIMEOUT_MS),
            retries: Some(DEFAULT_RETRIES),
            retry_delay: Some(DEFAULT_RETRY_DELAY_MS),
            headers: Some(headers),
            method: Some(DEFAULT_METHOD.to_string()),
            minimal: Some(false),
            include_metadata: Some(true),
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Layers `higher` on top of `self`. Headers are replaced as a whole.
    pub fn merge(self, higher: ConfigOverrides) -> Self {
        Self {
            url: higher.url.or(self.url),
            batch_size: higher.batch_size.or(self.batch_size),
            flush_interval: higher.flush_interval.or(self.flush_interval),
            timeout: higher.timeout.or(self.timeout),
            retries: higher.retries.or(self.retries),
            retry_delay: higher.retry_delay.or(self.retry_delay),
            headers: higher.headers.or(self.headers),
            method: higher.method.or(self.method),
            minimal: higher.minimal.or(self.minimal),
            include_metadata: higher.include_metadata.or(self.include_metadata),
        }
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }
}
