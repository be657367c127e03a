//! Random process generator for inter-arrival gaps and service durations

use rand::Rng;
use rand_distr::{Distribution, Exp};
use thiserror::Error;

/// Probability of drawing from the slow phase of the hyperexponential mixture
pub const H2_SLOW_WEIGHT: f64 = 0.25;
/// Mean of the slow phase (rate 1/5)
pub const H2_SLOW_MEAN: f64 = 5.0;
/// Mean of the fast phase (rate 1)
pub const H2_FAST_MEAN: f64 = 1.0;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProcessError {
    #[error("exponential mean must be positive and finite, got {0}")]
    InvalidMean(f64),

    #[error("deterministic duration must be non-negative and finite, got {0}")]
    InvalidDuration(f64),
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Shape {
    Exponential { mean: f64, dist: Exp<f64> },
    Deterministic { value: f64 },
    Hyperexponential { slow: Exp<f64>, fast: Exp<f64> },
}

/// A source of non-negative durations
///
/// Parameters are checked when the process is built, so `sample` never fails.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Process {
    shape: Shape,
}

fn exp_with_mean(mean: f64) -> Result<Exp<f64>, ProcessError> {
    if !(mean.is_finite() && mean > 0.0) {
        return Err(ProcessError::InvalidMean(mean));
    }
    Exp::new(1.0 / mean).map_err(|_| ProcessError::InvalidMean(mean))
}

impl Process {
    /// Markovian durations with the given mean
    pub fn exponential(mean: f64) -> Result<Process, ProcessError> {
        Ok(Process {
            shape: Shape::Exponential {
                mean,
                dist: exp_with_mean(mean)?,
            },
        })
    }

    /// Every sample is exactly `value`
    pub fn deterministic(value: f64) -> Result<Process, ProcessError> {
        if !(value.is_finite() && value >= 0.0) {
            return Err(ProcessError::InvalidDuration(value));
        }
        Ok(Process {
            shape: Shape::Deterministic { value },
        })
    }

    /// Two-phase mixture: mean 5 with probability 0.25, mean 1 otherwise
    ///
    /// The phases are fixed and do not depend on any configured mean.
    pub fn hyperexponential() -> Result<Process, ProcessError> {
        Ok(Process {
            shape: Shape::Hyperexponential {
                slow: exp_with_mean(H2_SLOW_MEAN)?,
                fast: exp_with_mean(H2_FAST_MEAN)?,
            },
        })
    }

    pub fn sample<R: Rng>(&self, rng: &mut R) -> f64 {
        match &self.shape {
            Shape::Exponential { dist, .. } => dist.sample(rng),
            Shape::Deterministic { value } => *value,
            Shape::Hyperexponential { slow, fast } => {
                if rng.random::<f64>() < H2_SLOW_WEIGHT {
                    slow.sample(rng)
                } else {
                    fast.sample(rng)
                }
            }
        }
    }

    /// Long-run mean of the samples
    pub fn mean(&self) -> f64 {
        match &self.shape {
            Shape::Exponential { mean, .. } => *mean,
            Shape::Deterministic { value } => *value,
            Shape::Hyperexponential { .. } => {
                H2_SLOW_WEIGHT * H2_SLOW_MEAN + (1.0 - H2_SLOW_WEIGHT) * H2_FAST_MEAN
            }
        }
    }

    /// Kendall notation symbol
    pub fn kendall(&self) -> &'static str {
        match &self.shape {
            Shape::Exponential { .. } => "M",
            Shape::Deterministic { .. } => "D",
            Shape::Hyperexponential { .. } => "H2",
        }
    }
}
