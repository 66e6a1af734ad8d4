//! Differential allocator benchmarking.
//!
//! A candidate allocator and a baseline allocator are driven through the same
//! randomized sequence of allocate and free requests, and the time each spends
//! inside its own calls is totalled.
//!
//! ```
//! use alloc_diff::{alloc, DualAllocatorDriver, SizeMode, WorkloadGenerator};
//!
//! let mut driver = DualAllocatorDriver::new(
//!     alloc::tracing_system(),
//!     alloc::system(),
//!     WorkloadGenerator::from_seed(42),
//! );
//! let summary = driver.run(SizeMode::Small, 1_000).unwrap();
//! assert_eq!(summary.allocations + summary.frees, 1_000);
//! println!("{summary}");
//! ```

pub mod alloc;
pub mod config;
pub mod driver;
pub mod error;
pub mod registry;
#[cfg(feature = "cli")]
pub mod report;
pub mod threshold;
pub mod timing;
pub mod workload;

pub use config::{RunConfig, RunConfigBuilder, MAX_OPERATION_COUNT};
pub use driver::{DualAllocatorDriver, RunSummary};
pub use error::BenchError;
pub use registry::LiveBlockRegistry;
pub use timing::{RelativeSpeed, RunResult, Side, TimingAccumulator};
pub use workload::{SizeMode, WorkloadGenerator, WorkloadStep, MAX_BLOCK_SIZE};
