//! Delay schedules for respectful fetching.
//!
//! Spreads a batch of requests over time by giving every item its own
//! start delay, shaped by one of three curves:
//!
//! - [`DelayAlgorithm::Constant`]: a short ramp over the first eight items,
//!   then a flat `max_duration`.
//! - [`DelayAlgorithm::Linear`]: `y = x / 5` until it meets `max_duration`,
//!   flat afterwards.
//! - [`DelayAlgorithm::Sigmoid`]: a Richards (generalised logistic) curve
//!   that starts near zero and approaches `max_duration`.
//!
//! The raw curve is then floored at `min_duration`, optionally randomised,
//! rounded to milliseconds, and the first delay is always zero so the batch
//! starts right away.
//!
//! # Example
//!
//! ```rust
//! use funnel_core::delay::{DelayAlgorithm, DelayConfig, calculate_delays};
//!
//! let config = DelayConfig::new(DelayAlgorithm::Linear, 2.0);
//! let delays = calculate_delays(12, &config).unwrap();
//! assert_eq!(delays.len(), 12);
//! assert_eq!(delays[0], 0.0);
//! assert_eq!(delays[11], 2.0);
//! ```

use std::fmt;
use std::str::FromStr;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Number of leading items that get a ramp in the constant curve.
const RAMP_LEN: usize = 8;

/// Ceilings below this use a ramp increment scaled to the ceiling.
const SMALL_CEILING: f64 = 1.5;

/// Slope of the linear curve (`y = x / 5`).
const LINEAR_DIVISOR: f64 = 5.0;

/// Shape of the delay curve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum DelayAlgorithm {
    Constant,
    Linear,
    Sigmoid,
}

impl DelayAlgorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            DelayAlgorithm::Constant => "constant",
            DelayAlgorithm::Linear => "linear",
            DelayAlgorithm::Sigmoid => "sigmoid",
        }
    }

    /// Generate the raw curve for `count` items under the given ceiling.
    fn curve(&self, count: usize, max_duration: f64) -> Vec<f64> {
        match self {
            DelayAlgorithm::Constant => constant_curve(count, max_duration),
            DelayAlgorithm::Linear => linear_curve(count, max_duration),
            DelayAlgorithm::Sigmoid => sigmoid_curve(count, max_duration),
        }
    }
}

impl fmt::Display for DelayAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for DelayAlgorithm {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "constant" => Ok(DelayAlgorithm::Constant),
            "linear" => Ok(DelayAlgorithm::Linear),
            "sigmoid" => Ok(DelayAlgorithm::Sigmoid),
            _ => Err(AppError::UnsupportedAlgorithm(s.to_string())),
        }
    }
}

impl TryFrom<String> for DelayAlgorithm {
    type Error = AppError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Configuration for delay schedules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DelayConfig {
    /// Curve used to shape the schedule.
    pub algorithm: DelayAlgorithm,

    /// Ceiling of the curve, in seconds.
    pub max_duration: f64,

    /// Floor applied to the leading part of the curve, in seconds.
    /// Zero disables the floor.
    pub min_duration: f64,

    /// Draw each delay uniformly around the curve instead of using it as is.
    pub random: bool,

    /// With `random`, draw between the curve and `max_duration` rather than
    /// between `min_delay` and the curve.
    pub converge: bool,

    /// Lower bound of the random draw when not converging, in seconds.
    pub min_delay: f64,
}

impl DelayConfig {
    /// Create a deterministic config with the given curve and ceiling and
    /// no floor.
    pub fn new(algorithm: DelayAlgorithm, max_duration: f64) -> Self {
        Self {
            algorithm,
            max_duration,
            min_duration: 0.0,
            random: false,
            converge: false,
            min_delay: 0.0,
        }
    }

    /// Replace the curve by parsing an algorithm tag such as `"sigmoid"`.
    pub fn with_algorithm_tag(mut self, tag: &str) -> Result<Self, AppError> {
        self.algorithm = tag.parse()?;
        Ok(self)
    }

    pub fn with_min_duration(mut self, min_duration: f64) -> Self {
        self.min_duration = min_duration;
        self
    }

    /// Enable random draws, bounded below by `min_delay`.
    pub fn with_random(mut self, min_delay: f64) -> Self {
        self.random = true;
        self.min_delay = min_delay;
        self
    }

    /// Enable random draws that converge towards `max_duration`.
    pub fn with_converge(mut self) -> Self {
        self.random = true;
        self.converge = true;
        self
    }

    /// Check that the configuration is internally consistent.
    pub fn validate(&self) -> Result<(), AppError> {
        for (name, value) in [
            ("max_duration", self.max_duration),
            ("min_duration", self.min_duration),
            ("min_delay", self.min_delay),
        ] {
            if !value.is_finite() {
                return Err(AppError::ConfigError(format!(
                    "{name} must be a finite number, got {value}"
                )));
            }
        }

        if self.max_duration <= 0.0 {
            return Err(AppError::ConfigError(format!(
                "max_duration must be greater than 0, got {}",
                self.max_duration
            )));
        }
        if self.min_duration < 0.0 {
            return Err(AppError::ConfigError(format!(
                "min_duration must not be negative, got {}",
                self.min_duration
            )));
        }
        if self.min_duration >= self.max_duration {
            return Err(AppError::ConfigError(format!(
                "min_duration ({}) must be less than max_duration ({})",
                self.min_duration, self.max_duration
            )));
        }
        if self.min_delay < 0.0 {
            return Err(AppError::ConfigError(format!(
                "min_delay must not be negative, got {}",
                self.min_delay
            )));
        }
        if self.min_delay > self.max_duration {
            return Err(AppError::ConfigError(format!(
                "min_delay ({}) must not exceed max_duration ({})",
                self.min_delay, self.max_duration
            )));
        }
        Ok(())
    }
}

impl Default for DelayConfig {
    /// Linear curve up to 5 seconds with a 1 second floor, no randomness.
    fn default() -> Self {
        Self {
            algorithm: DelayAlgorithm::Linear,
            max_duration: 5.0,
            min_duration: 1.0,
            random: false,
            converge: false,
            min_delay: 0.0,
        }
    }
}

/// Compute one delay (in seconds) per item.
///
/// The result has exactly `count` entries, each rounded to three decimals,
/// and the first entry is always `0.0`.
pub fn calculate_delays(count: usize, config: &DelayConfig) -> Result<Vec<f64>, AppError> {
    calculate_delays_with_rng(count, config, &mut rand::thread_rng())
}

/// Same as [`calculate_delays`], drawing random delays from `rng`.
pub fn calculate_delays_with_rng<R: Rng>(
    count: usize,
    config: &DelayConfig,
    rng: &mut R,
) -> Result<Vec<f64>, AppError> {
    config.validate()?;
    if count == 0 {
        return Ok(Vec::new());
    }

    let mut curve = config.algorithm.curve(count, config.max_duration);
    apply_floor(&mut curve, config.min_duration);

    let mut delays: Vec<f64> = if !config.random {
        curve.into_iter().map(round_millis).collect()
    } else if config.converge {
        curve
            .into_iter()
            .map(|x| round_millis(uniform(rng, x, config.max_duration)))
            .collect()
    } else {
        curve
            .into_iter()
            .map(|x| round_millis(uniform(rng, config.min_delay, x)))
            .collect()
    };

    delays[0] = 0.0;

    tracing::debug!(
        count,
        algorithm = %config.algorithm,
        random = config.random,
        converge = config.converge,
        "Calculated delay schedule"
    );
    Ok(delays)
}

/// Flat `max_duration` with a ramp over the first eight items.
pub(crate) fn constant_curve(count: usize, max_duration: f64) -> Vec<f64> {
    let mut delays = vec![max_duration; count];
    let ramp = count.min(RAMP_LEN);

    // Small ceilings would ramp through zero with the default increment.
    let (inc, offset) = if max_duration < SMALL_CEILING {
        let inc = max_duration / RAMP_LEN as f64;
        (inc, ramp as f64 * inc)
    } else {
        (0.2, ramp as f64 / 5.0)
    };

    for (i, delay) in delays.iter_mut().take(ramp).enumerate() {
        *delay = max_duration - offset + i as f64 * inc;
    }
    delays
}

/// `x / 5` up to its intersection with `max_duration`, then flat.
pub(crate) fn linear_curve(count: usize, max_duration: f64) -> Vec<f64> {
    let intersection = LINEAR_DIVISOR * max_duration;
    if intersection <= 1.0 {
        return constant_curve(count, max_duration);
    }

    let intersection = intersection.ceil() as usize;
    (0..count)
        .map(|i| {
            if i < intersection {
                i as f64 / LINEAR_DIVISOR
            } else {
                max_duration
            }
        })
        .collect()
}

/// Richards curve rising from near zero towards `max_duration`.
pub(crate) fn sigmoid_curve(count: usize, max_duration: f64) -> Vec<f64> {
    let growth_rate = max_duration.sqrt() * 4.0;
    let y0 = (4.0 * max_duration).ln();
    (0..count)
        .map(|i| max_duration * logistic(i as f64 / growth_rate - y0))
        .collect()
}

fn logistic(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

/// Raise the leading values to `floor`, stopping at the first value above it.
fn apply_floor(delays: &mut [f64], floor: f64) {
    if floor <= 0.0 {
        return;
    }
    for delay in delays.iter_mut() {
        if *delay > floor {
            break;
        }
        *delay = floor;
    }
}

/// Uniform draw between two bounds given in either order.
fn uniform<R: Rng>(rng: &mut R, a: f64, b: f64) -> f64 {
    let (low, high) = if a <= b { (a, b) } else { (b, a) };
    if low == high {
        return low;
    }
    rng.gen_range(low..=high)
}

/// Round to three decimals, half-to-even on the exact binary value.
fn round_millis(value: f64) -> f64 {
    format!("{value:.3}").parse().unwrap_or(value)
}
