//! The HTTP log transport: batching, timed flushing and shutdown.
//!
//! ```text
//!   write(entry) ──> ScopeOptimizer ──> BatchAccumulator
//!                                          │  size threshold / timer / flush() / close()
//!                                          v
//!                                   BatchTransmitter ──> destination
//!                                          │  failure after retries
//!                                          └──> requeue in front + diagnostic
//! ```
//!
//! Only one flush runs at a time. A flush takes its snapshot after it owns
//! the flush guard, so writes made while a batch is in flight land in the
//! fresh batch and are picked up by the next flush.

use crate::buffer::{BatchAccumulator, FlushTrigger};
use crate::config::{ConfigResolver, TransportConfig};
use crate::diagnostics::{Diagnostic, DiagnosticSink, TracingSink};
use crate::domain::{LogEntry, LogLevel, OptimizationError, TransportError};
use crate::scope::{OutboundEntry, ScopeOptimizer};
use crate::sender::{
    BatchTransmitter, HttpClient, ServiceType, StatsSnapshot, TransportStats,
};
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

pub struct HttpTransport {
    inner: Arc<Inner>,
    timer: Mutex<Option<JoinHandle<()>>>,
    shutdown: CancellationToken,
}

struct Inner {
    config: TransportConfig,
    optimizer: ScopeOptimizer,
    accumulator: BatchAccumulator,
    transmitter: BatchTransmitter,
    diagnostics: Arc<dyn DiagnosticSink>,
    stats: Arc<TransportStats>,
    flush_guard: tokio::sync::Mutex<()>,
    flush_scheduled: AtomicBool,
    closed: AtomicBool,
    runtime: Handle,
}

impl HttpTransport {
    /// Builds a transport that reports through `tracing`. Must be called
    /// from within a Tokio runtime; the flush timer starts immediately.
    pub fn new(config: TransportConfig) -> Result<Self, TransportError> {
        Self::with_diagnostics(config, Arc::new(TracingSink))
    }

    pub fn with_diagnostics(
        config: TransportConfig,
        diagnostics: Arc<dyn DiagnosticSink>,
    ) -> Result<Self, TransportError> {
        let runtime = Handle::try_current().map_err(|e| TransportError::Runtime(e.to_string()))?;
        let client =
            HttpClient::new(&config).map_err(|e| TransportError::Client(e.to_string()))?;
        let stats = Arc::new(TransportStats::new());
        let transmitter =
            BatchTransmitter::new(client, &config, diagnostics.clone(), stats.clone());

        let inner = Arc::new(Inner {
            optimizer: ScopeOptimizer::from_config(&config),
            accumulator: BatchAccumulator::new(config.batch_size()),
            transmitter,
            diagnostics,
            stats,
            flush_guard: tokio::sync::Mutex::new(()),
            flush_scheduled: AtomicBool::new(false),
            closed: AtomicBool::new(false),
            runtime,
            config,
        });

        let shutdown = CancellationToken::new();
        let timer = spawn_flush_timer(Arc::clone(&inner), shutdown.clone());

        debug!(
            "HTTP transport started: url={}, format={}, scope={}",
            inner.config.url(),
            inner.transmitter.service_type(),
            inner.config.scope().as_str()
        );

        Ok(Self {
            inner,
            timer: Mutex::new(Some(timer)),
            shutdown,
        })
    }

    /// Resolves the configuration from the process environment.
    pub fn from_env() -> Result<Self, TransportError> {
        let config = ConfigResolver::new().resolve()?;
        Self::new(config)
    }

    pub fn config(&self) -> &TransportConfig {
        &self.inner.config
    }

    /// Format selected for the configured destination.
    pub fn service_type(&self) -> ServiceType {
        self.inner.transmitter.service_type()
    }

    /// Number of entries waiting for the next flush.
    pub fn pending(&self) -> usize {
        self.inner.accumulator.len()
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.inner.stats.snapshot()
    }

    /// Whether an entry at `level` passes the configured `threshold`, e.g.
    /// `warn` passes `info` but `debug` does not.
    pub fn should_log(&self, level: LogLevel, threshold: LogLevel) -> bool {
        level.should_log(threshold)
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }

    /// Queues an entry. Never blocks on the network and never fails; a full
    /// batch schedules a flush in the background.
    pub fn write(&self, entry: LogEntry) {
        let outbound = self.inner.optimizer.optimize(entry);
        self.enqueue(outbound);
    }

    /// Queues a raw JSON entry. Entries that are not valid log entries are
    /// dropped and reported.
    pub fn write_value(&self, value: Value) {
        match self.inner.optimizer.optimize_value(value) {
            Ok(outbound) => self.enqueue(outbound),
            Err(error) => self.drop_entry(&error),
        }
    }

    pub fn write_json(&self, line: &str) {
        match serde_json::from_str::<Value>(line) {
            Ok(value) => self.write_value(value),
            Err(error) => self.drop_entry(&OptimizationError::from(error)),
        }
    }

    /// Flushes whatever is pending and returns once it has been attempted.
    pub async fn flush(&self) {
        self.inner.flush_batch(FlushTrigger::Manual).await;
    }

    /// Stops the flush timer, waits for an in-flight flush and then flushes
    /// the remaining entries. Entries written after `close` are accepted but
    /// only leave with an explicit [`flush`](Self::flush).
    pub async fn close(&self) {
        if self.inner.closed.swap(true, Ordering::AcqRel) {
            debug!("HTTP transport already closed");
        }
        self.shutdown.cancel();

        let timer = self.timer.lock().take();
        if let Some(timer) = timer
            && let Err(e) = timer.await
        {
            warn!("Flush timer ended abnormally: {}", e);
        }

        self.inner.flush_batch(FlushTrigger::Shutdown).await;
    }

    fn enqueue(&self, entry: OutboundEntry) {
        let inner = &self.inner;
        inner.stats.record_write();
        let pending = inner.accumulator.push(entry);

        if pending >= inner.config.batch_size()
            && !inner.closed.load(Ordering::Acquire)
            && !inner.flush_scheduled.swap(true, Ordering::AcqRel)
        {
            let inner = Arc::clone(inner);
            self.inner.runtime.spawn(async move {
                inner.flush_batch(FlushTrigger::SizeBased).await;
            });
        }
    }

    fn drop_entry(&self, error: &OptimizationError) {
        self.inner.stats.record_dropped();
        self.inner.diagnostics.report(Diagnostic::WriteFailed {
            reason: error.to_string(),
        });
    }
}

impl Inner {
    async fn flush_batch(&self, trigger: FlushTrigger) {
        let _guard = self.flush_guard.lock().await;
        self.flush_scheduled.store(false, Ordering::Release);

        let Some(batch) = self.accumulator.take(trigger) else {
            return;
        };

        match self.transmitter.send_batch(&batch).await {
            Ok(result) => {
                self.stats
                    .record_batch_sent(result.entries, result.bytes_sent);
            }
            Err(error) => {
                let batch_id = batch.id().to_string();
                let entries = batch.size();
                let outcome = self.accumulator.requeue_front(batch);
                self.stats
                    .record_batch_failed(outcome.requeued, outcome.discarded);
                self.diagnostics.report(Diagnostic::FlushFailed {
                    batch_id,
                    entries,
                    requeued: outcome.requeued,
                    discarded: outcome.discarded,
                    error: error.to_string(),
                });
            }
        }
    }
}

fn spawn_flush_timer(inner: Arc<Inner>, shutdown: CancellationToken) -> JoinHandle<()> {
    let period = inner.config.flush_interval();
    let runtime = inner.runtime.clone();

    runtime.spawn(async move {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately.
        ticker.tick().await;

        loop {
            tokio::select! {
                biased;
                () = shutdown.cancelled() => break,
                _ = ticker.tick() => {
                    if !inner.accumulator.is_empty() {
                        inner.flush_batch(FlushTrigger::TimeBased).await;
                    }
                }
            }
        }
        debug!("Flush timer stopped");
    })
}

impl Drop for HttpTransport {
    fn drop(&mut self) {
        self.shutdown.cancel();
        let pending = self.inner.accumulator.len();
        if pending > 0 && !self.is_closed() {
            warn!(
                "HTTP transport dropped without close(); {} entries were not flushed",
                pending
            );
        }
    }
}

impl std::fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTransport")
            .field("config", &self.inner.config)
            .field("pending", &self.pending())
            .field("closed", &self.is_closed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigOverrides;
    use crate::diagnostics::CollectingSink;
    use serde_json::json;

    fn config(url: &str) -> TransportConfig {
        ConfigResolver::new()
            .without_env()
            .with_explicit(ConfigOverrides {
                url: Some(url.to_string()),
                batch_size: Some(100),
                flush_interval: Some(60_000),
                ..Default::default()
            })
            .resolve()
            .unwrap()
    }

    #[test]
    fn test_requires_runtime() {
        let result = HttpTransport::new(config("http://127.0.0.1:9/logs"));
        assert!(matches!(result, Err(TransportError::Runtime(_))));
    }

    #[tokio::test]
    async fn test_invalid_raw_entries_are_reported_not_queued() {
        let sink = Arc::new(CollectingSink::new());
        let transport =
            HttpTransport::with_diagnostics(config("http://127.0.0.1:9/logs"), sink.clone())
                .unwrap();

        transport.write_json("{not json");
        transport.write_value(json!("just a string"));
        transport.write(LogEntry::new(LogLevel::Info, "kept"));

        assert_eq!(transport.pending(), 1);
        let stats = transport.stats();
        assert_eq!(stats.entries_written, 1);
        assert_eq!(stats.entries_dropped, 2);
        assert!(matches!(
            sink.diagnostics().as_slice(),
            [Diagnostic::WriteFailed { .. }, Diagnostic::WriteFailed { .. }]
        ));
    }

    #[tokio::test]
    async fn test_service_type_follows_url() {
        let transport =
            HttpTransport::new(config("https://http-intake.logs.datadoghq.com/api/v2/logs"))
                .unwrap();
        assert_eq!(transport.service_type(), ServiceType::Datadog);
        transport.close().await;
        assert!(transport.is_closed());
    }

    #[tokio::test]
    async fn test_flush_on_empty_batch_is_a_no_op() {
        let transport = HttpTransport::new(config("http://127.0.0.1:9/logs")).unwrap();
        transport.flush().await;
        transport.close().await;
        assert_eq!(transport.stats().requests_attempted, 0);
    }

    #[tokio::test]
    async fn test_should_log_follows_level_order() {
        let transport = HttpTransport::new(config("http://127.0.0.1:9/logs")).unwrap();

        assert!(transport.should_log(LogLevel::Error, LogLevel::Info));
        assert!(transport.should_log(LogLevel::Info, LogLevel::Info));
        assert!(!transport.should_log(LogLevel::Debug, LogLevel::Info));
        assert!(!transport.should_log(LogLevel::Warn, LogLevel::Error));
        assert!(transport.should_log(LogLevel::Debug, LogLevel::Debug));
    }
}
