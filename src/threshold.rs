use std::fmt::{self, Display};

use num::{bigint::ToBigInt, rational::Ratio, Integer, ToPrimitive};
use thiserror::Error;

use crate::timing::RunResult;

/// How far a value may exceed its reference before it counts as a regression.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Threshold<T: Display + Integer + ToBigInt + ToPrimitive + Clone> {
    #[default]
    None,
    /// Allowance relative to the reference.
    Ratio(Ratio<T>),
}

impl<T> Display for Threshold<T>
where
    T: Clone + Integer + ToBigInt + ToPrimitive + Display,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Threshold::None => f.write_str("none"),
            Threshold::Ratio(r) => match r.to_f64() {
                Some(v) => write!(f, "{:.2}%", v * 100.0),
                None => write!(f, "{r}"),
            },
        }
    }
}

impl<T> Threshold<T>
where
    T: Clone + Integer + ToBigInt + ToPrimitive + Display,
{
    pub fn ratio(numer: T, denom: T) -> Self {
        Threshold::Ratio(Ratio::new(numer, denom))
    }

    fn check_ratio(ratio: &Ratio<T>, value: &T, ref_value: &T) -> bool {
        if value <= ref_value {
            return true;
        }
        // anything above a zero reference is an unbounded slowdown
        !ref_value.is_zero()
            && Ratio::new(value.clone() - ref_value.clone(), ref_value.clone()) <= *ratio
    }

    pub fn check(&self, value: &T, ref_value: &T) -> Result<(), ThresholdError<T>> {
        let within = match self {
            Threshold::None => true,
            Threshold::Ratio(ratio) => Self::check_ratio(ratio, value, ref_value),
        };
        if within {
            Ok(())
        } else {
            Err(ThresholdError {
                limit: self.clone(),
                value: value.clone(),
                ref_value: ref_value.clone(),
            })
        }
    }
}

#[derive(Debug, Error)]
#[error("{value} exceeds {ref_value} by more than {limit}")]
pub struct ThresholdError<T: Display + Integer + ToBigInt + ToPrimitive + Clone> {
    limit: Threshold<T>,
    value: T,
    ref_value: T,
}

pub trait ThresholdFor<T> {
    type Error;
    fn check_threshold(&self, value: &T) -> Result<(), Self::Error>;
}

/// Bounds how much slower the candidate may be than the baseline.
#[derive(Debug, Clone, Copy, Default)]
pub struct SlowdownThreshold(pub Threshold<u64>);

impl SlowdownThreshold {
    /// Allows the candidate to take up to `percent` percent longer than the baseline.
    pub fn percent(percent: u64) -> Self {
        SlowdownThreshold(Threshold::ratio(percent, 100))
    }
}

#[derive(Debug, Error)]
#[error("candidate time in ns: {0}")]
pub struct SlowdownError(ThresholdError<u64>);

impl ThresholdFor<RunResult> for SlowdownThreshold {
    type Error = SlowdownError;

    fn check_threshold(&self, value: &RunResult) -> Result<(), Self::Error> {
        self.0
            .check(&value.candidate_ns, &value.baseline_ns)
            .map_err(SlowdownError)
    }
}
