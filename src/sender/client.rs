use super::serialization::Payload;
use crate::config::TransportConfig;
use reqwest::header::{CONTENT_LENGTH, HeaderMap, HeaderValue};
use reqwest::{Client, ClientBuilder, Method};
use std::time::Duration;
use thiserror::Error;
use url::Url;

const MAX_ERROR_BODY_CHARS: usize = 512;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}

/// Failure of a single delivery attempt. Every variant is retryable.
#[derive(Error, Debug)]
pub enum DeliveryError {
    #[error("HTTP {status}: {body}")]
    HttpError { status: u16, body: String },
    #[error("HTTP request timeout after {}ms", .0.as_millis())]
    Timeout(Duration),
    #[error("HTTP request failed: {0}")]
    NetworkError(#[source] reqwest::Error),
}

/// HTTP client bound to one destination.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    url: Url,
    method: Method,
    headers: HeaderMap,
    timeout: Duration,
}

impl HttpClient {
    pub fn new(config: &TransportConfig) -> Result<Self, ClientError> {
        let client = ClientBuilder::new()
            .connect_timeout(config.timeout())
            .pool_max_idle_per_host(2)
            .build()
            .map_err(|e| {
                ClientError::InvalidConfiguration(format!("Failed to build HTTP client: {e}"))
            })?;

        Ok(Self {
            client,
            url: config.url().clone(),
            method: config.method().clone(),
            headers: config.headers().clone(),
            timeout: config.timeout(),
        })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// One request, bounded by the per-attempt timeout. Returns the status
    /// code of a 2xx response.
    pub async fn execute(&self, payload: &Payload) -> Result<u16, DeliveryError> {
        let mut headers = self.headers.clone();
        headers.insert(CONTENT_LENGTH, HeaderValue::from(payload.len()));

        let response = self
            .client
            .request(self.method.clone(), self.url.clone())
            .headers(headers)
            .timeout(self.timeout)
            .body(payload.body().clone())
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        if status.is_success() {
            return Ok(status.as_u16());
        }

        let body = response.text().await.unwrap_or_default();
        Err(DeliveryError::HttpError {
            status: status.as_u16(),
            body: body.chars().take(MAX_ERROR_BODY_CHARS).collect(),
        })
    }

    fn classify(&self, error: reqwest::Error) -> DeliveryError {
        if error.is_timeout() {
            DeliveryError::Timeout(self.timeout)
        } else {
            DeliveryError::NetworkError(error)
        }
    }
}
