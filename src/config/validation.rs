use super::{ConfigError, ConfigOverrides, TransportConfig};
use super::{
    DEFAULT_BATCH_SIZE, DEFAULT_FLUSH_INTERVAL_MS, DEFAULT_METHOD, DEFAULT_RETRIES,
    DEFAULT_RETRY_DELAY_MS, DEFAULT_TIMEOUT_MS,
};
use reqwest::Method;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use std::collections::BTreeMap;
use std::time::Duration;
use url::Url;

pub const MIN_BATCH_SIZE: usize = 1;
pub const MAX_BATCH_SIZE: usize = 1000;
pub const MIN_TIMEOUT_MS: u64 = 1_000;
pub const MAX_TIMEOUT_MS: u64 = 300_000;

impl TryFrom<ConfigOverrides> for TransportConfig {
    type Error = ConfigError;

    /// Validates a merged layer. Fields left unset fall back to the defaults.
    fn try_from(merged: ConfigOverrides) -> Result<Self, Self::Error> {
        let url = validate_url(merged.url.as_deref())?;

        let batch_size = merged.batch_size.unwrap_or(DEFAULT_BATCH_SIZE);
        if !(MIN_BATCH_SIZE..=MAX_BATCH_SIZE).contains(&batch_size) {
            return Err(ConfigError::InvalidBatchSize(batch_size));
        }

        let timeout_ms = merged.timeout.unwrap_or(DEFAULT_TIMEOUT_MS);
        if !(MIN_TIMEOUT_MS..=MAX_TIMEOUT_MS).contains(&timeout_ms) {
            return Err(ConfigError::InvalidTimeout(timeout_ms));
        }

        let flush_interval_ms = merged.flush_interval.unwrap_or(DEFAULT_FLUSH_INTERVAL_MS);
        if flush_interval_ms == 0 {
            return Err(ConfigError::InvalidConfig(
                "Flush interval must be greater than 0".to_string(),
            ));
        }

        let retries = merged.retries.unwrap_or(DEFAULT_RETRIES);
        if retries == 0 {
            return Err(ConfigError::InvalidConfig(
                "Retries must be greater than 0".to_string(),
            ));
        }

        let method = validate_method(merged.method.as_deref().unwrap_or(DEFAULT_METHOD))?;
        let headers = build_headers(merged.headers.unwrap_or_default())?;

        Ok(TransportConfig {
            url,
            batch_size,
            flush_interval: Duration::from_millis(flush_interval_ms),
            timeout: Duration::from_millis(timeout_ms),
            retries,
            retry_delay: Duration::from_millis(
                merged.retry_delay.unwrap_or(DEFAULT_RETRY_DELAY_MS),
            ),
            headers,
            method,
            minimal: merged.minimal.unwrap_or(false),
            include_metadata: merged.include_metadata.unwrap_or(true),
        })
    }
}

fn validate_url(raw: Option<&str>) -> Result<Url, ConfigError> {
    let raw = raw.map(str::trim).filter(|s| !s.is_empty());
    let Some(raw) = raw else {
        return Err(ConfigError::MissingUrl);
    };

    let url = Url::parse(raw).map_err(|_| ConfigError::InvalidUrl(raw.to_string()))?;
    match url.scheme() {
        "http" | "https" if url.host_str().is_some() => Ok(url),
        _ => Err(ConfigError::InvalidUrl(raw.to_string())),
    }
}

fn validate_method(raw: &str) -> Result<Method, ConfigError> {
    Method::from_bytes(raw.trim().to_ascii_uppercase().as_bytes())
        .map_err(|_| ConfigError::InvalidMethod(raw.to_string()))
}

fn build_headers(headers: BTreeMap<String, String>) -> Result<HeaderMap, ConfigError> {
    let mut map = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        let header_name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| ConfigError::InvalidHeader(format!("'{name}': {e}")))?;
        let header_value = HeaderValue::from_str(&value)
            .map_err(|e| ConfigError::InvalidHeader(format!("value of '{name}': {e}")))?;
        map.insert(header_name, header_value);
    }
    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::CONTENT_TYPE;

    fn layer(url: &str) -> ConfigOverrides {
        ConfigOverrides::defaults().with_url(url)
    }

    #[test]
    fn test_valid_config_uses_defaults() {
        let config = TransportConfig::try_from(layer("https://logs.example.com/v1")).unwrap();
        assert_eq!(config.batch_size(), 50);
        assert_eq!(config.flush_interval(), Duration::from_secs(10));
        assert_eq!(config.timeout(), Duration::from_secs(30));
        assert_eq!(config.retries(), 3);
        assert_eq!(config.retry_delay(), Duration::from_secs(1));
        assert_eq!(config.method(), &Method::POST);
        assert_eq!(config.headers().get(CONTENT_TYPE).unwrap(), "application/json");
        assert!(!config.minimal());
        assert!(config.include_metadata());
    }

    #[test]
    fn test_missing_url() {
        let result = TransportConfig::try_from(ConfigOverrides::defaults());
        assert!(matches!(result, Err(ConfigError::MissingUrl)));
    }

    #[test]
    fn test_non_http_schemes_are_rejected() {
        for url in ["ftp://logs.example.com", "file:///var/log/x", "ws://host/", "not a url"] {
            let result = TransportConfig::try_from(layer(url));
            assert!(
                matches!(result, Err(ConfigError::InvalidUrl(_))),
                "{url} should be rejected"
            );
        }
    }

    #[test]
    fn test_batch_size_bounds() {
        for (size, ok) in [(0, false), (1, true), (1000, true), (1001, false)] {
            let overrides = ConfigOverrides {
                batch_size: Some(size),
                ..layer("http://localhost:8080")
            };
            assert_eq!(TransportConfig::try_from(overrides).is_ok(), ok, "batch size {size}");
        }
    }

    #[test]
    fn test_timeout_bounds() {
        for (timeout, ok) in [(999, false), (1000, true), (300_000, true), (300_001, false)] {
            let overrides = ConfigOverrides {
                timeout: Some(timeout),
                ..layer("http://localhost:8080")
            };
            let result = TransportConfig::try_from(overrides);
            assert_eq!(result.is_ok(), ok, "timeout {timeout}");
            if !ok {
                assert!(matches!(result, Err(ConfigError::InvalidTimeout(t)) if t == timeout));
            }
        }
    }

    #[test]
    fn test_zero_retries_and_interval_rejected() {
        let no_retries = ConfigOverrides {
            retries: Some(0),
            ..layer("http://localhost:8080")
        };
        assert!(TransportConfig::try_from(no_retries).is_err());

        let no_interval = ConfigOverrides {
            flush_interval: Some(0),
            ..layer("http://localhost:8080")
        };
        assert!(TransportConfig::try_from(no_interval).is_err());
    }

    #[test]
    fn test_method_is_normalized_and_validated() {
        let put = ConfigOverrides {
            method: Some("put".to_string()),
            ..layer("http://localhost:8080")
        };
        assert_eq!(TransportConfig::try_from(put).unwrap().method(), &Method::PUT);

        let bad = ConfigOverrides {
            method: Some("PO ST".to_string()),
            ..layer("http://localhost:8080")
        };
        assert!(matches!(
            TransportConfig::try_from(bad),
            Err(ConfigError::InvalidMethod(_))
        ));
    }

    #[test]
    fn test_invalid_header_name_rejected() {
        let overrides = ConfigOverrides {
            headers: Some(BTreeMap::from([("Bad Header".to_string(), "x".to_string())])),
            ..layer("http://localhost:8080")
        };
        assert!(matches!(
            TransportConfig::try_from(overrides),
            Err(ConfigError::InvalidHeader(_))
        ));
    }
}
