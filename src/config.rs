use derive_builder::Builder;
use serde::{Deserialize, Serialize};

use crate::{
    error::BenchError,
    workload::{SizeMode, WorkloadGenerator, MAX_BLOCK_SIZE},
};

/// Upper bound on the number of steps in one run.
pub const MAX_OPERATION_COUNT: usize = 100_000;

/// Parameters of a single differential run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Builder, Serialize, Deserialize)]
pub struct RunConfig {
    pub mode: SizeMode,
    pub operation_count: usize,
    /// Fixed seed for a reproducible workload. Without one the wall clock is used.
    #[builder(default, setter(strip_option))]
    #[serde(default)]
    pub seed: Option<u64>,
}

impl RunConfig {
    pub fn new(mode: SizeMode, operation_count: usize) -> Self {
        RunConfig {
            mode,
            operation_count,
            seed: None,
        }
    }

    pub fn validate(&self) -> Result<(), BenchError> {
        if self.operation_count > MAX_OPERATION_COUNT {
            return Err(BenchError::InvalidOperationCount {
                requested: self.operation_count,
                max: MAX_OPERATION_COUNT,
            });
        }
        Ok(())
    }

    /// Bytes the candidate may need if every step allocates the largest block.
    pub fn arena_bytes(&self) -> usize {
        self.operation_count.saturating_mul(MAX_BLOCK_SIZE)
    }

    pub fn generator(&self) -> WorkloadGenerator {
        match self.seed {
            Some(seed) => WorkloadGenerator::from_seed(seed),
            None => WorkloadGenerator::from_time(),
        }
    }
}
