use thiserror::Error;

use crate::timing::Side;

/// Every way a differential run can stop before producing a result.
///
/// None of these are recoverable: a run either completes and reports full
/// statistics or aborts with one of these.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BenchError {
    #[error("{side} allocator couldn't allocate a block of size {size} at step {step}")]
    AllocationFailed { side: Side, size: usize, step: usize },
    #[error("requested live block #{rank}, but only {live} blocks are live")]
    RankOutOfRange { rank: usize, live: usize },
    #[error("block registry is full ({capacity} slots)")]
    CapacityExceeded { capacity: usize },
    #[error("operation count {requested} is outside the supported range 0..={max}")]
    InvalidOperationCount { requested: usize, max: usize },
    #[error("registries diverged at step {step}: slot {candidate} vs slot {baseline}")]
    Desynchronized {
        step: usize,
        candidate: usize,
        baseline: usize,
    },
}
