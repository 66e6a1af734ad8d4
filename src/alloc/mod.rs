use std::alloc::System;

use self::{
    allocator::{GlobalAllocator, TracingAllocator},
    measure::MemoryTracingHooks,
};

pub mod allocator;
pub mod measure;

pub use allocator::{Allocator, Block};
pub use measure::MemoryStats;

/// The platform allocator, used as the baseline.
pub type SystemAllocator = GlobalAllocator<System>;

/// The platform allocator with per-instance memory accounting.
pub type TracingSystemAllocator = GlobalAllocator<TracingAllocator<MemoryTracingHooks, System>>;

pub const fn system() -> SystemAllocator {
    GlobalAllocator::new(System)
}

pub const fn tracing_system() -> TracingSystemAllocator {
    GlobalAllocator::new(TracingAllocator::new(MemoryTracingHooks::new(), System))
}
