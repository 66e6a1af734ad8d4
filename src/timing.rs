use std::{fmt, time::Duration};

use derive_more::Display;
use serde::{Deserialize, Serialize};

#[cfg(not(target_arch = "wasm32"))]
pub type Instant = std::time::Instant;

#[cfg(target_arch = "wasm32")]
pub type Instant = wasm_instant::Instant;

#[cfg(target_arch = "wasm32")]
pub mod wasm_instant {
    use std::{ops::Sub, time::Duration};

    use wasm_bindgen::prelude::wasm_bindgen;

    #[wasm_bindgen(inline_js = r#"
export function performance_now() {
  return performance.now();
}"#)]
    extern "C" {
        fn performance_now() -> f64;
    }

    /// Monotonic microsecond clock backed by `performance.now()`.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
    pub struct Instant(u64);

    impl Instant {
        pub fn now() -> Self {
            Self((performance_now() * 1000.0) as u64)
        }
        pub fn duration_since(&self, earlier: Instant) -> Duration {
            Duration::from_micros(self.0.saturating_sub(earlier.0))
        }
        pub fn elapsed(&self) -> Duration {
            Self::now().duration_since(*self)
        }
    }

    impl Sub<Instant> for Instant {
        type Output = Duration;
        fn sub(self, other: Instant) -> Duration {
            self.duration_since(other)
        }
    }
}

/// Which of the two allocators a measurement belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    #[display(fmt = "candidate")]
    Candidate,
    #[display(fmt = "baseline")]
    Baseline,
}

/// Runs `f` between two clock readings.
pub fn measure<F: FnOnce() -> O, O>(f: F) -> (O, Duration) {
    let then = Instant::now();
    let out = f();
    (out, Instant::now() - then)
}

#[derive(Debug, Default, Clone)]
pub struct TimingAccumulator {
    candidate: Duration,
    baseline: Duration,
}

impl TimingAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, side: Side, elapsed: Duration) {
        match side {
            Side::Candidate => self.candidate += elapsed,
            Side::Baseline => self.baseline += elapsed,
        }
    }

    /// Measures `f` and charges the elapsed time to `side`.
    pub fn time<F: FnOnce() -> O, O>(&mut self, side: Side, f: F) -> O {
        let (out, elapsed) = measure(f);
        self.add(side, elapsed);
        out
    }

    pub fn total(&self, side: Side) -> Duration {
        match side {
            Side::Candidate => self.candidate,
            Side::Baseline => self.baseline,
        }
    }

    pub fn report(&self) -> RunResult {
        RunResult {
            candidate_ns: saturating_nanos(self.candidate),
            baseline_ns: saturating_nanos(self.baseline),
        }
    }
}

fn saturating_nanos(d: Duration) -> u64 {
    d.as_nanos().try_into().unwrap_or(u64::MAX)
}

/// Aggregate wall-clock cost of each allocator over one run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunResult {
    pub candidate_ns: u64,
    pub baseline_ns: u64,
}

/// Baseline time as a share of candidate time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RelativeSpeed {
    Percent(f64),
    /// The candidate total was zero, so there is nothing to divide by.
    Unmeasurable,
}

impl fmt::Display for RelativeSpeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RelativeSpeed::Percent(p) => write!(f, "{p:.2}%"),
            RelativeSpeed::Unmeasurable => f.write_str("n/a"),
        }
    }
}

impl RunResult {
    pub fn candidate(&self) -> Duration {
        Duration::from_nanos(self.candidate_ns)
    }

    pub fn baseline(&self) -> Duration {
        Duration::from_nanos(self.baseline_ns)
    }

    pub fn relative(&self) -> RelativeSpeed {
        if self.candidate_ns == 0 {
            return RelativeSpeed::Unmeasurable;
        }
        RelativeSpeed::Percent(100.0 * self.baseline_ns as f64 / self.candidate_ns as f64)
    }
}

impl fmt::Display for RunResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "It took the baseline allocator {:.3} ms to run, while the candidate took {:.3} ms.\n\
             Baseline time relative to candidate: {}",
            self.baseline().as_secs_f64() * 1000.0,
            self.candidate().as_secs_f64() * 1000.0,
            self.relative()
        )
    }
}
