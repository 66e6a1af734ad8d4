use std::cell::Cell;

use derive_more::Display;
use serde::{Deserialize, Serialize};

use super::allocator::AllocHooks;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
#[display(fmt = r#"Currently allocated (B): {current}
Maximum allocated (B): {peak}
Total amount of claimed memory (B): {total_size}
Total number of allocations: (N): {total_num}
"#)]
pub struct MemoryStats {
    pub current: usize,
    pub peak: usize,
    pub total_size: usize,
    pub total_num: usize,
}

const EMPTY: MemoryStats = MemoryStats {
    current: 0,
    peak: 0,
    total_size: 0,
    total_num: 0,
};

/// Counts bytes and calls going through one [`TracingAllocator`].
///
/// Stats live in the hooks value, so two tracing allocators never share
/// counters.
///
/// [`TracingAllocator`]: super::allocator::TracingAllocator
#[derive(Debug, Default)]
pub struct MemoryTracingHooks {
    stats: Cell<MemoryStats>,
}

impl MemoryTracingHooks {
    pub const fn new() -> Self {
        MemoryTracingHooks {
            stats: Cell::new(EMPTY),
        }
    }

    pub fn stats(&self) -> MemoryStats {
        self.stats.get()
    }

    pub fn reset(&self) -> MemoryStats {
        self.stats.replace(EMPTY)
    }

    fn update<F: FnOnce(&mut MemoryStats)>(&self, f: F) {
        let mut stats = self.stats.get();
        f(&mut stats);
        self.stats.set(stats);
    }
}

unsafe impl AllocHooks for MemoryTracingHooks {
    fn on_alloc(&self, pointer: *mut u8, size: usize, _align: usize) {
        if pointer.is_null() {
            return;
        }
        self.update(|s| {
            s.current += size;
            s.total_size += size;
            s.total_num += 1;
            s.peak = s.peak.max(s.current);
        });
    }

    fn on_dealloc(&self, _pointer: *mut u8, size: usize, _align: usize) {
        self.update(|s| s.current = s.current.saturating_sub(size));
    }
}
