use super::client::{DeliveryError, HttpClient};
use super::metrics::TransportStats;
use super::retry::RetryPolicy;
use super::serialization::{BatchSerializer, Payload, SerializationError, ServiceType};
use crate::buffer::Batch;
use crate::config::{Scope, TransportConfig};
use crate::diagnostics::{Diagnostic, DiagnosticSink};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum TransmissionError {
    #[error("Serialization failed: {0}")]
    SerializationFailed(#[from] SerializationError),
    #[error("Delivery failed after {attempts} attempt(s): {source}")]
    DeliveryFailed {
        attempts: u32,
        #[source]
        source: DeliveryError,
    },
}

#[derive(Debug, Clone)]
pub struct TransmissionResult {
    pub status_code: u16,
    pub latency: Duration,
    pub batch_id: String,
    pub entries: usize,
    pub bytes_sent: usize,
    pub attempts: u32,
    pub service_type: ServiceType,
}

/// Formats batches for the destination and delivers them with retries.
#[derive(Clone)]
pub struct BatchTransmitter {
    client: HttpClient,
    serializer: BatchSerializer,
    retry: RetryPolicy,
    scope: Scope,
    diagnostics: Arc<dyn DiagnosticSink>,
    stats: Arc<TransportStats>,
}

impl BatchTransmitter {
    pub fn new(
        client: HttpClient,
        config: &TransportConfig,
        diagnostics: Arc<dyn DiagnosticSink>,
        stats: Arc<TransportStats>,
    ) -> Self {
        Self {
            client,
            serializer: BatchSerializer::new(),
            retry: RetryPolicy::new(config.retries(), config.retry_delay()),
            scope: config.scope(),
            diagnostics,
            stats,
        }
    }

    pub fn service_type(&self) -> ServiceType {
        ServiceType::detect(self.client.url())
    }

    pub fn prepare_payload(&self, batch: &Batch) -> Result<Payload, SerializationError> {
        self.serializer
            .serialize(batch.entries(), self.scope, self.client.url())
    }

    pub async fn send_batch(&self, batch: &Batch) -> Result<TransmissionResult, TransmissionError> {
        let start = Instant::now();
        let payload = self.prepare_payload(batch)?;

        debug!(
            "Sending batch {} with {} entries ({} bytes, {} format, {:?})",
            batch.id(),
            batch.size(),
            payload.len(),
            payload.service_type(),
            batch.trigger()
        );

        let (status_code, attempts) = self
            .send_with_retry(&payload)
            .await
            .map_err(|(attempts, source)| TransmissionError::DeliveryFailed { attempts, source })?;

        let latency = start.elapsed();
        info!(
            "Successfully sent batch {} ({} entries, {} bytes) in {:?}",
            batch.id(),
            batch.size(),
            payload.len(),
            latency
        );

        Ok(TransmissionResult {
            status_code,
            latency,
            batch_id: batch.id().to_string(),
            entries: batch.size(),
            bytes_sent: payload.len(),
            attempts,
            service_type: payload.service_type(),
        })
    }

    /// Attempts delivery up to the configured count, backing off
    /// exponentially between attempts. On exhaustion returns the number of
    /// attempts made and the last error.
    pub async fn send_with_retry(
        &self,
        payload: &Payload,
    ) -> Result<(u16, u32), (u32, DeliveryError)> {
        let mut attempt = 1;
        loop {
            self.stats.record_attempt();
            let error = match self.client.execute(payload).await {
                Ok(status) => return Ok((status, attempt)),
                Err(error) => error,
            };

            if !self.retry.should_retry(attempt) {
                warn!("HTTP request attempt {} failed, giving up: {}", attempt, error);
                return Err((attempt, error));
            }

            let delay = self.retry.calculate_delay(attempt);
            self.diagnostics.report(Diagnostic::RetryScheduled {
                attempt,
                delay,
                error: error.to_string(),
            });
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}

impl std::fmt::Debug for BatchTransmitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchTransmitter")
            .field("client", &self.client)
            .field("retry", &self.retry)
            .field("scope", &self.scope)
            .finish()
    }
}
