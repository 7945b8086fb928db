pub mod batch;

pub use batch::{Batch, BatchAccumulator, FlushTrigger, Requeued};
