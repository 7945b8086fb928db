use std::sync::atomic::{AtomicU64, Ordering};

/// Point-in-time copy of the transport counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub entries_written: u64,
    pub entries_dropped: u64,
    pub entries_sent: u64,
    pub entries_requeued: u64,
    pub entries_discarded: u64,
    pub batches_sent: u64,
    pub batches_failed: u64,
    pub requests_attempted: u64,
    pub bytes_sent: u64,
}

#[derive(Debug, Default)]
pub struct TransportStats {
    entries_written: AtomicU64,
    entries_dropped: AtomicU64,
    entries_sent: AtomicU64,
    entries_requeued: AtomicU64,
    entries_discarded: AtomicU64,
    batches_sent: AtomicU64,
    batches_failed: AtomicU64,
    requests_attempted: AtomicU64,
    bytes_sent: AtomicU64,
}

impl TransportStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_write(&self) {
        self.entries_written.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_dropped(&self) {
        self.entries_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_attempt(&self) {
        self.requests_attempted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_batch_sent(&self, entries: usize, bytes: usize) {
        self.batches_sent.fetch_add(1, Ordering::Relaxed);
        self.entries_sent.fetch_add(entries as u64, Ordering::Relaxed);
        self.bytes_sent.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    pub fn record_batch_failed(&self, requeued: usize, discarded: usize) {
        self.batches_failed.fetch_add(1, Ordering::Relaxed);
        self.entries_requeued
            .fetch_add(requeued as u64, Ordering::Relaxed);
        self.entries_discarded
            .fetch_add(discarded as u64, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            entries_written: self.entries_written.load(Ordering::Relaxed),
            entries_dropped: self.entries_dropped.load(Ordering::Relaxed),
            entries_sent: self.entries_sent.load(Ordering::Relaxed),
            entries_requeued: self.entries_requeued.load(Ordering::Relaxed),
            entries_discarded: self.entries_discarded.load(Ordering::Relaxed),
            batches_sent: self.batches_sent.load(Ordering::Relaxed),
            batches_failed: self.batches_failed.load(Ordering::Relaxed),
            requests_attempted: self.requests_attempted.load(Ordering::Relaxed),
            bytes_sent: self.bytes_sent.load(Ordering::Relaxed),
        }
    }
}
