use crate::scope::OutboundEntry;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::time::Instant;
use uuid::Uuid;

/// What caused a batch to be drained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushTrigger {
    SizeBased,
    TimeBased,
    Manual,
    Shutdown,
}

/// A drained snapshot of the live batch, in write order.
#[derive(Debug, Clone)]
pub struct Batch {
    id: String,
    entries: Vec<OutboundEntry>,
    trigger: FlushTrigger,
    created_at: Instant,
}

impl Batch {
    pub fn new(entries: Vec<OutboundEntry>, trigger: FlushTrigger) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            entries,
            trigger,
            created_at: Instant::now(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn size(&self) -> usize {
        self.entries.len()
    }

    pub fn entries(&self) -> &[OutboundEntry] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<OutboundEntry> {
        self.entries
    }

    pub fn trigger(&self) -> FlushTrigger {
        self.trigger
    }

    pub fn created_at(&self) -> Instant {
        self.created_at
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Result of putting a failed batch back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Requeued {
    pub requeued: usize,
    pub discarded: usize,
}

/// The live batch: entries waiting for the next flush.
#[derive(Debug)]
pub struct BatchAccumulator {
    pending: Mutex<VecDeque<OutboundEntry>>,
    batch_size: usize,
}

impl BatchAccumulator {
    pub fn new(batch_size: usize) -> Self {
        Self {
            pending: Mutex::new(VecDeque::with_capacity(batch_size)),
            batch_size,
        }
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Appends an entry and returns the new pending length.
    pub fn push(&self, entry: OutboundEntry) -> usize {
        let mut pending = self.pending.lock();
        pending.push_back(entry);
        pending.len()
    }

    pub fn len(&self) -> usize {
        self.pending.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.lock().is_empty()
    }

    /// Swaps the live batch for an empty one. Returns `None` when nothing is
    /// pending.
    pub fn take(&self, trigger: FlushTrigger) -> Option<Batch> {
        let entries = {
            let mut pending = self.pending.lock();
            if pending.is_empty() {
                return None;
            }
            std::mem::take(&mut *pending)
        };
        Some(Batch::new(Vec::from(entries), trigger))
    }

    /// Puts the oldest `batch_size` entries of a failed batch back in front of
    /// anything written since, keeping their order. The rest are dropped.
    pub fn requeue_front(&self, batch: Batch) -> Requeued {
        let mut entries = batch.into_entries();
        let discarded = entries.len().saturating_sub(self.batch_size);
        entries.truncate(self.batch_size);
        let requeued = entries.len();

        let mut pending = self.pending.lock();
        for entry in entries.into_iter().rev() {
            pending.push_front(entry);
        }

        Requeued {
            requeued,
            discarded,
        }
    }
}
