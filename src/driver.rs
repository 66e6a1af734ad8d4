//! Applies one randomized workload to two allocators in lockstep.

use std::fmt;

use rand::{rngs::SmallRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, trace};

use crate::{
    alloc::Allocator,
    config::RunConfig,
    error::BenchError,
    registry::LiveBlockRegistry,
    timing::{RunResult, Side, TimingAccumulator},
    workload::{Action, SizeMode, WorkloadGenerator, WorkloadStep},
};

/// Everything a completed run reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub mode: SizeMode,
    pub seed: u64,
    pub operation_count: usize,
    pub allocations: usize,
    pub frees: usize,
    pub peak_live: usize,
    pub result: RunResult,
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "mode {} with {} operations (seed {}): {} allocations, {} frees, \
             at most {} live blocks",
            self.mode,
            self.operation_count,
            self.seed,
            self.allocations,
            self.frees,
            self.peak_live
        )?;
        write!(f, "{}", self.result)
    }
}

/// Per-run state: one registry per allocator plus the timers.
struct RunState<C, B> {
    candidate: LiveBlockRegistry<C>,
    baseline: LiveBlockRegistry<B>,
    timer: TimingAccumulator,
    allocations: usize,
    frees: usize,
    peak_live: usize,
}

impl<C, B> RunState<C, B> {
    fn new(operation_count: usize) -> Self {
        RunState {
            candidate: LiveBlockRegistry::with_capacity(operation_count),
            baseline: LiveBlockRegistry::with_capacity(operation_count),
            timer: TimingAccumulator::new(),
            allocations: 0,
            frees: 0,
            peak_live: 0,
        }
    }
}

pub struct DualAllocatorDriver<C, B, R = SmallRng> {
    candidate: C,
    baseline: B,
    generator: WorkloadGenerator<R>,
}

impl<C, B> DualAllocatorDriver<C, B, SmallRng>
where
    C: Allocator,
    B: Allocator,
{
    /// Builds a driver whose workload is seeded the way `config` asks.
    pub fn from_config(config: &RunConfig, candidate: C, baseline: B) -> Self {
        Self::new(candidate, baseline, config.generator())
    }
}

impl<C, B, R> DualAllocatorDriver<C, B, R>
where
    C: Allocator,
    B: Allocator,
    R: Rng + SeedableRng,
{
    pub fn new(candidate: C, baseline: B, generator: WorkloadGenerator<R>) -> Self {
        DualAllocatorDriver {
            candidate,
            baseline,
            generator,
        }
    }

    pub fn candidate(&self) -> &C {
        &self.candidate
    }

    pub fn baseline(&self) -> &B {
        &self.baseline
    }

    pub fn into_parts(self) -> (C, B) {
        (self.candidate, self.baseline)
    }

    /// Runs `operation_count` steps of `mode` against both allocators.
    ///
    /// Every block still live at the end is released and the candidate is
    /// torn down, whether the run completed or aborted.
    ///
    /// Each run is seeded on its own; the seed in the summary replays it on a
    /// fresh driver.
    pub fn run(
        &mut self,
        mode: SizeMode,
        operation_count: usize,
    ) -> Result<RunSummary, BenchError> {
        let config = RunConfig::new(mode, operation_count);
        config.validate()?;

        let seed = self.generator.begin_run();
        info!(%mode, operation_count, seed, "starting differential run");

        self.candidate.prepare(config.arena_bytes());
        let mut state = RunState::new(operation_count);
        let outcome = self.drive(&mut state, mode, operation_count);
        self.release_all(&mut state);
        self.candidate.teardown();

        if let Err(e) = &outcome {
            error!(%e, "run aborted");
        }
        outcome?;

        let summary = RunSummary {
            mode,
            seed,
            operation_count,
            allocations: state.allocations,
            frees: state.frees,
            peak_live: state.peak_live,
            result: state.timer.report(),
        };
        info!(
            candidate_ns = summary.result.candidate_ns,
            baseline_ns = summary.result.baseline_ns,
            "run finished"
        );
        Ok(summary)
    }

    fn drive(
        &mut self,
        state: &mut RunState<C::Handle, B::Handle>,
        mode: SizeMode,
        operation_count: usize,
    ) -> Result<(), BenchError> {
        for step in 1..=operation_count {
            let next = self.next_step(state, mode);
            self.apply(state, step, next)?;
        }
        Ok(())
    }

    /// Draws one step from the candidate registry's view; both registries
    /// always agree on what is live.
    fn next_step(
        &mut self,
        state: &RunState<C::Handle, B::Handle>,
        mode: SizeMode,
    ) -> WorkloadStep {
        match self.generator.decide_action(state.candidate.has_live_blocks()) {
            Action::Allocate => WorkloadStep::Allocate(self.generator.size_for(mode)),
            Action::Free => {
                WorkloadStep::Free(self.generator.rank_below(state.candidate.live_count()))
            }
        }
    }

    fn apply(
        &mut self,
        state: &mut RunState<C::Handle, B::Handle>,
        step: usize,
        next: WorkloadStep,
    ) -> Result<(), BenchError> {
        trace!(step, ?next);
        match next {
            WorkloadStep::Allocate(size) => self.allocate(state, step, size)?,
            WorkloadStep::Free(rank) => self.free(state, step, rank)?,
        }
        debug_assert_eq!(state.candidate.live_count(), state.baseline.live_count());
        Ok(())
    }

    fn allocate(
        &mut self,
        state: &mut RunState<C::Handle, B::Handle>,
        step: usize,
        size: usize,
    ) -> Result<(), BenchError> {
        if state.candidate.is_full() || state.baseline.is_full() {
            return Err(BenchError::CapacityExceeded {
                capacity: state.candidate.capacity(),
            });
        }

        let candidate = state
            .timer
            .time(Side::Candidate, || self.candidate.allocate(size))
            .ok_or(BenchError::AllocationFailed {
                side: Side::Candidate,
                size,
                step,
            })?;
        let baseline = match state.timer.time(Side::Baseline, || self.baseline.allocate(size)) {
            Some(handle) => handle,
            None => {
                self.candidate.release(candidate);
                return Err(BenchError::AllocationFailed {
                    side: Side::Baseline,
                    size,
                    step,
                });
            }
        };

        let c = state.candidate.append(candidate)?;
        let b = state.baseline.append(baseline)?;
        if c != b {
            return Err(BenchError::Desynchronized {
                step,
                candidate: c,
                baseline: b,
            });
        }

        state.allocations += 1;
        state.peak_live = state.peak_live.max(state.candidate.live_count());
        Ok(())
    }

    fn free(
        &mut self,
        state: &mut RunState<C::Handle, B::Handle>,
        step: usize,
        rank: usize,
    ) -> Result<(), BenchError> {
        let c = state.candidate.rank_to_index(rank)?;
        let b = state.baseline.rank_to_index(rank)?;
        let desync = BenchError::Desynchronized {
            step,
            candidate: c,
            baseline: b,
        };
        if c != b {
            return Err(desync);
        }

        let candidate = state.candidate.release(c).ok_or_else(|| desync.clone())?;
        let baseline = state.baseline.release(b).ok_or(desync)?;
        state
            .timer
            .time(Side::Candidate, || self.candidate.release(candidate));
        state
            .timer
            .time(Side::Baseline, || self.baseline.release(baseline));

        state.frees += 1;
        Ok(())
    }

    fn release_all(&mut self, state: &mut RunState<C::Handle, B::Handle>) {
        let mut released = 0;
        for handle in state.candidate.drain() {
            self.candidate.release(handle);
            released += 1;
        }
        for handle in state.baseline.drain() {
            self.baseline.release(handle);
        }
        debug!(released, "released remaining live blocks");
    }
}
