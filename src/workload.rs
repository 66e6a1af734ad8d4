use std::{
    str::FromStr,
    time::{SystemTime, UNIX_EPOCH},
};

use derive_more::Display;
use rand::{rngs::SmallRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Largest block any [`SizeMode`] can request.
pub const MAX_BLOCK_SIZE: usize = 1 << 14;

/// Block size distribution used for allocation steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SizeMode {
    /// Uniform in `20..40`.
    #[display(fmt = "small")]
    Small,
    /// One of `100, 200, ..., 1000`.
    #[display(fmt = "large")]
    Large,
    /// A power of two in `16..=16384`.
    #[display(fmt = "random")]
    Random,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unrecognized test mode `{0}`, expected 1, 2, 3, small, large or random")]
pub struct ParseModeError(String);

impl FromStr for SizeMode {
    type Err = ParseModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "1" | "small" => Ok(SizeMode::Small),
            "2" | "large" => Ok(SizeMode::Large),
            "3" | "random" | "pow2" => Ok(SizeMode::Random),
            _ => Err(ParseModeError(s.to_owned())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Allocate,
    Free,
}

/// One logical operation, applied verbatim to both allocators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkloadStep {
    Allocate(usize),
    /// Release the `rank`-th live block.
    Free(usize),
}

/// Draws block sizes and alloc/free decisions from a seeded generator.
#[derive(Debug, Clone)]
pub struct WorkloadGenerator<R = SmallRng> {
    rng: R,
    seed: u64,
    started: bool,
}

impl WorkloadGenerator<SmallRng> {
    pub fn from_seed(seed: u64) -> Self {
        WorkloadGenerator {
            rng: SmallRng::seed_from_u64(seed),
            seed,
            started: false,
        }
    }

    /// Seeds from the wall clock. The seed is kept so the run can be replayed.
    pub fn from_time() -> Self {
        Self::from_seed(time_seed())
    }
}

impl<R: Rng> WorkloadGenerator<R> {
    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn size_for(&mut self, mode: SizeMode) -> usize {
        match mode {
            SizeMode::Small => self.rng.gen_range(20..40),
            SizeMode::Large => self.rng.gen_range(1..=10) * 100,
            SizeMode::Random => 1usize << self.rng.gen_range(4u32..=14),
        }
    }

    /// Flips a fair coin; a free with nothing live becomes an allocation.
    pub fn decide_action(&mut self, has_live_blocks: bool) -> Action {
        if self.rng.gen_bool(0.5) && has_live_blocks {
            Action::Free
        } else {
            Action::Allocate
        }
    }

    /// Picks the rank of the live block to free.
    pub fn rank_below(&mut self, live_count: usize) -> usize {
        self.rng.gen_range(0..live_count)
    }
}

impl<R: Rng + SeedableRng> WorkloadGenerator<R> {
    /// Seeds the generator for the next run and returns the seed that replays it.
    ///
    /// The first run uses the configured seed; each later run draws a fresh one.
    pub fn begin_run(&mut self) -> u64 {
        if self.started {
            self.seed = self.rng.gen();
        }
        self.started = true;
        self.rng = R::seed_from_u64(self.seed);
        self.seed
    }
}

fn time_seed() -> u64 {
    // a clock before the epoch only costs us entropy
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sizes_stay_in_bounds() {
        let mut g = WorkloadGenerator::from_seed(7);
        for _ in 0..10_000 {
            let s = g.size_for(SizeMode::Small);
            assert!((20..40).contains(&s), "small size {s}");

            let l = g.size_for(SizeMode::Large);
            assert!(l % 100 == 0 && (100..=1000).contains(&l), "large size {l}");

            let r = g.size_for(SizeMode::Random);
            assert!(
                r.is_power_of_two() && (16..=MAX_BLOCK_SIZE).contains(&r),
                "random size {r}"
            );
        }
    }

    #[test]
    fn every_large_size_shows_up() {
        let mut g = WorkloadGenerator::from_seed(1);
        let mut seen = [false; 10];
        for _ in 0..5_000 {
            seen[g.size_for(SizeMode::Large) / 100 - 1] = true;
        }
        assert!(seen.iter().all(|s| *s));
    }

    #[test]
    fn never_frees_from_empty() {
        let mut g = WorkloadGenerator::from_seed(99);
        for _ in 0..1_000 {
            assert_eq!(g.decide_action(false), Action::Allocate);
        }
    }

    #[test]
    fn both_actions_when_blocks_are_live() {
        let mut g = WorkloadGenerator::from_seed(3);
        let actions: Vec<_> = (0..200).map(|_| g.decide_action(true)).collect();
        assert!(actions.contains(&Action::Allocate));
        assert!(actions.contains(&Action::Free));
    }

    #[test]
    fn free_rank_is_below_live_count() {
        let mut g = WorkloadGenerator::from_seed(5);
        let ranks: Vec<_> = (0..1_000).map(|_| g.rank_below(5)).collect();
        assert!(ranks.iter().all(|r| *r < 5));
        assert!(ranks.contains(&0) && ranks.contains(&4));
    }

    #[test]
    fn same_seed_same_sequence() {
        let mut a = WorkloadGenerator::from_seed(0xcafebabe);
        let mut b = WorkloadGenerator::from_seed(0xcafebabe);
        for live in 1..500 {
            assert_eq!(a.decide_action(true), b.decide_action(true));
            assert_eq!(a.size_for(SizeMode::Large), b.size_for(SizeMode::Large));
            assert_eq!(a.rank_below(live), b.rank_below(live));
        }
        assert_eq!(a.seed(), 0xcafebabe);
    }

    fn draws(g: &mut WorkloadGenerator) -> Vec<usize> {
        (0..20).map(|_| g.size_for(SizeMode::Random)).collect()
    }

    #[test]
    fn later_runs_get_their_own_seed() {
        let mut g = WorkloadGenerator::from_seed(7);
        // draws before the first run do not shift it
        g.size_for(SizeMode::Small);
        assert_eq!(g.begin_run(), 7);
        let first = draws(&mut g);

        let second_seed = g.begin_run();
        let second = draws(&mut g);
        assert_eq!(g.seed(), second_seed);

        let mut replay = WorkloadGenerator::from_seed(7);
        replay.begin_run();
        assert_eq!(draws(&mut replay), first);

        let mut replay = WorkloadGenerator::from_seed(second_seed);
        replay.begin_run();
        assert_eq!(draws(&mut replay), second);
    }

    #[test]
    fn parse_mode() {
        assert_eq!("1".parse::<SizeMode>(), Ok(SizeMode::Small));
        assert_eq!("Large".parse::<SizeMode>(), Ok(SizeMode::Large));
        assert_eq!(" 3 ".parse::<SizeMode>(), Ok(SizeMode::Random));
        assert!("4".parse::<SizeMode>().is_err());
        assert_eq!(SizeMode::Random.to_string(), "random");
    }
}
