//! Random processes used to fuzz simulated energies.
//!
//! Generators are owned by their callers and passed in explicitly. Every draw takes the
//! `rng` it should consume, so a measurement seeded with [`measurement_seed`] produces
//! the same numbers no matter which worker thread integrates it.

use crate::error;
use crate::util::Result;
use rand::Rng;
use rand_distr::{Distribution, StandardNormal};
use serde::{Deserialize, Serialize};
use snafu::ensure;

/// Draws from `N(mean, variance)`.
pub fn gaussian<R: Rng + ?Sized>(mean: f64, variance: f64, rng: &mut R) -> Result<f64> {
    ensure!(
        variance >= 0.0 && variance.is_finite(),
        error::InvalidDistribution {
            distribution: "Gaussian",
            reason: format!("variance {variance}")
        }
    );
    let z: f64 = StandardNormal.sample(rng);
    Ok(mean + variance.sqrt() * z)
}

/// Draws from the Gamma distribution with the given mean and variance.
///
/// The result is never negative. A vanishing variance returns the mean unchanged, a
/// non-positive mean returns 0.
pub fn gamma<R: Rng + ?Sized>(mean: f64, variance: f64, rng: &mut R) -> Result<f64> {
    ensure!(
        mean.is_finite() && variance.is_finite() && variance >= 0.0,
        error::InvalidDistribution {
            distribution: "Gamma",
            reason: format!("mean {mean}, variance {variance}")
        }
    );
    if mean <= 0.0 {
        return Ok(0.0);
    }
    if variance == 0.0 {
        return Ok(mean);
    }

    let shape = mean * mean / variance;
    let scale = variance / mean;
    let distribution =
        rand_distr::Gamma::new(shape, scale).map_err(|e| error::Error::InvalidDistribution {
            distribution: "Gamma",
            reason: e.to_string(),
        })?;
    Ok(distribution.sample(rng))
}

/// First order Gauss-Markov process: successive samples decorrelate with
/// `rho = exp(-|dt| / correlation_time)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeCorrelatedGaussian {
    pub mean: f64,
    pub variance: f64,
    /// s
    pub correlation_time: f64,
    #[serde(skip)]
    previous: Option<(f64, f64)>,
}

impl TimeCorrelatedGaussian {
    pub fn new(mean: f64, variance: f64, correlation_time: f64) -> Result<Self> {
        ensure!(
            variance >= 0.0 && correlation_time > 0.0,
            error::InvalidDistribution {
                distribution: "time correlated Gaussian",
                reason: format!("variance {variance}, correlation time {correlation_time}")
            }
        );
        Ok(Self {
            mean,
            variance,
            correlation_time,
            previous: None,
        })
    }

    pub fn sample<R: Rng + ?Sized>(&mut self, time: f64, rng: &mut R) -> Result<f64> {
        let value = match self.previous {
            None => gaussian(self.mean, self.variance, rng)?,
            Some((previous_time, previous_value)) => {
                let rho = (-(time - previous_time).abs() / self.correlation_time).exp();
                let innovation = gaussian(0.0, self.variance * (1.0 - rho * rho), rng)?;
                self.mean + rho * (previous_value - self.mean) + innovation
            }
        };
        self.previous = Some((time, value));
        Ok(value)
    }

    /// Forgets the previous sample, the next one is drawn from the stationary distribution.
    pub fn reset(&mut self) {
        self.previous = None;
    }
}

/// The closed set of noise sources of the simulator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum RandomProcess {
    Uniform { low: f64, high: f64 },
    Gaussian { mean: f64, variance: f64 },
    Gamma { mean: f64, variance: f64 },
    TimeCorrelatedGaussian(TimeCorrelatedGaussian),
}

impl RandomProcess {
    /// Draws the next number. `time` only matters for time correlated processes.
    pub fn sample<R: Rng + ?Sized>(&mut self, time: f64, rng: &mut R) -> Result<f64> {
        match self {
            Self::Uniform { low, high } => {
                let (low, high) = (*low, *high);
                ensure!(
                    low <= high,
                    error::InvalidDistribution {
                        distribution: "uniform",
                        reason: format!("[{low}, {high}]")
                    }
                );
                if low < high {
                    Ok(rng.gen_range(low..high))
                } else {
                    Ok(low)
                }
            }
            Self::Gaussian { mean, variance } => gaussian(*mean, *variance, rng),
            Self::Gamma { mean, variance } => gamma(*mean, *variance, rng),
            Self::TimeCorrelatedGaussian(process) => process.sample(time, rng),
        }
    }
}

/// Seed of the generator of one measurement, independent of the processing order.
pub fn measurement_seed(base_seed: u64, spot: u64, measurement: u64) -> u64 {
    splitmix64(splitmix64(base_seed ^ splitmix64(spot)) ^ measurement)
}

fn splitmix64(value: u64) -> u64 {
    let mut z = value.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}
