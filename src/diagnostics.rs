//! Side channel for failures that must never reach the log producer.
//!
//! The transport reports write errors, flush failures, retries and malformed
//! header overrides through a [`DiagnosticSink`]. Sinks are fire-and-forget:
//! `report` must not block and must not panic.

use parking_lot::Mutex;
use std::fmt;
use std::time::Duration;
use tracing::{error, warn};

#[derive(Debug, Clone, PartialEq)]
pub enum Diagnostic {
    /// An entry was dropped before reaching the batch.
    WriteFailed { reason: String },
    /// A flush exhausted its retries.
    FlushFailed {
        batch_id: String,
        entries: usize,
        requeued: usize,
        discarded: usize,
        error: String,
    },
    /// A delivery attempt failed and another one is scheduled.
    RetryScheduled {
        attempt: u32,
        delay: Duration,
        error: String,
    },
    /// Header overrides from the environment were unusable and ignored.
    HeaderParseWarning { variable: String, reason: String },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::WriteFailed { reason } => {
                write!(f, "HTTP transport write error: {reason}")
            }
            Diagnostic::FlushFailed {
                batch_id,
                entries,
                requeued,
                discarded,
                error,
            } => write!(
                f,
                "HTTP batch flush failed (batch {batch_id}, {entries} entries, {requeued} requeued, {discarded} discarded): {error}"
            ),
            Diagnostic::RetryScheduled {
                attempt,
                delay,
                error,
            } => write!(
                f,
                "HTTP request attempt {attempt} failed, retrying in {}ms: {error}",
                delay.as_millis()
            ),
            Diagnostic::HeaderParseWarning { variable, reason } => write!(
                f,
                "Invalid HTTP headers JSON in {variable} ({reason}), using defaults"
            ),
        }
    }
}

pub trait DiagnosticSink: Send + Sync {
    fn report(&self, diagnostic: Diagnostic);
}

/// Default sink: turns diagnostics into `tracing` events.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn report(&self, diagnostic: Diagnostic) {
        match &diagnostic {
            Diagnostic::WriteFailed { .. } | Diagnostic::FlushFailed { .. } => {
                error!(target: "rask_log_transport::diagnostics", "{diagnostic}");
            }
            Diagnostic::RetryScheduled { .. } | Diagnostic::HeaderParseWarning { .. } => {
                warn!(target: "rask_log_transport::diagnostics", "{diagnostic}");
            }
        }
    }
}

/// Keeps every reported diagnostic in memory.
#[derive(Debug, Default)]
pub struct CollectingSink {
    reported: Mutex<Vec<Diagnostic>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.reported.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.reported.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.reported.lock().is_empty()
    }

    pub fn flush_failures(&self) -> usize {
        self.count(|d| matches!(d, Diagnostic::FlushFailed { .. }))
    }

    pub fn retries(&self) -> usize {
        self.count(|d| matches!(d, Diagnostic::RetryScheduled { .. }))
    }

    fn count(&self, predicate: impl Fn(&Diagnostic) -> bool) -> usize {
        self.reported.lock().iter().filter(|d| predicate(d)).count()
    }
}

impl DiagnosticSink for CollectingSink {
    fn report(&self, diagnostic: Diagnostic) {
        self.reported.lock().push(diagnostic);
    }
}
