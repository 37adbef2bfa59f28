use super::Table;
use crate::constants::{AZIMUTH_BINS, NOMINAL_ORBIT_PERIOD, ORBIT_POSITION_BINS, ORBIT_TIME_STEP};
use crate::error::{self, Error};
use crate::util::Result;
use serde::{Deserialize, Serialize};
use snafu::ensure;
use std::f64::consts::TAU;

/// Discretization of the orbit-time × antenna-azimuth plane shared by the X and Fbb tables.
///
/// Azimuth is periodic. Orbit time is binned with `time_step` but the orbit closes after
/// `orbit_period`, so the last bin interpolates towards bin 0 over a shorter distance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OrbitAzimuthGrid {
    pub orbit_bins: usize,
    pub azimuth_bins: usize,
    pub time_step: f64,
    pub orbit_period: f64,
}

impl Default for OrbitAzimuthGrid {
    fn default() -> Self {
        Self {
            orbit_bins: ORBIT_POSITION_BINS,
            azimuth_bins: AZIMUTH_BINS,
            time_step: ORBIT_TIME_STEP,
            orbit_period: NOMINAL_ORBIT_PERIOD,
        }
    }
}

/// The four surrounding grid cells of a continuous (orbit time, azimuth) position and
/// their complementary weights.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BinWeights {
    pub orbit: [usize; 2],
    pub orbit_weights: [f64; 2],
    pub azimuth: [usize; 2],
    pub azimuth_weights: [f64; 2],
}

impl BinWeights {
    /// Bilinear blend of the values `value(orbit_bin, azimuth_bin)` of the surrounding cells.
    pub fn blend<F>(&self, mut value: F) -> Result<f64>
    where
        F: FnMut(usize, usize) -> Result<f64>,
    {
        let mut sum = 0.0;
        for (&t, &ct) in self.orbit.iter().zip(&self.orbit_weights) {
            for (&a, &ca) in self.azimuth.iter().zip(&self.azimuth_weights) {
                sum += ct * ca * value(t, a)?;
            }
        }
        Ok(sum)
    }
}

impl OrbitAzimuthGrid {
    pub fn new(
        orbit_bins: usize,
        azimuth_bins: usize,
        time_step: f64,
        orbit_period: f64,
    ) -> Result<Self> {
        ensure!(
            orbit_bins > 0
                && azimuth_bins > 0
                && time_step > 0.0
                && (time_step * (orbit_bins - 1) as f64) < orbit_period
                && orbit_period <= time_step * orbit_bins as f64,
            error::MalformedTable {
                table: "orbit/azimuth",
                reason: format!(
                    "{orbit_bins} bins of {time_step} s do not cover an orbit of {orbit_period} s"
                )
            }
        );

        Ok(Self {
            orbit_bins,
            azimuth_bins,
            time_step,
            orbit_period,
        })
    }

    pub fn azimuth_step(&self) -> f64 {
        TAU / self.azimuth_bins as f64
    }

    /// Nominal time since the ascending node for a fraction of the orbit.
    pub fn orbit_time(&self, orbit_position: f64) -> f64 {
        self.orbit_period * orbit_position
    }

    pub fn weights(&self, orbit_time: f64, azimuth: f64) -> Result<BinWeights> {
        ensure!(
            orbit_time.is_finite() && (0.0..=self.orbit_period).contains(&orbit_time),
            error::TableIndexOutOfRange {
                table: "orbit/azimuth",
                axis: "orbit time",
                value: orbit_time
            }
        );
        ensure!(
            azimuth.is_finite(),
            error::TableIndexOutOfRange {
                table: "orbit/azimuth",
                axis: "azimuth",
                value: azimuth
            }
        );

        let fazi = azimuth.rem_euclid(TAU) / self.azimuth_step();
        let a1 = fazi.floor();
        let a2 = a1 + 1.0;

        let ftime = orbit_time / self.time_step;
        let t1 = ftime.floor();
        let t1_idx = t1 as usize;
        if t1_idx >= self.orbit_bins {
            return Err(Error::TableIndexOutOfRange {
                table: "orbit/azimuth",
                axis: "orbit time",
                value: orbit_time,
            });
        }

        let orbit_weights = if t1_idx + 1 < self.orbit_bins {
            [t1 + 1.0 - ftime, ftime - t1]
        } else {
            // closing segment towards bin 0
            let end_t = self.orbit_period / self.time_step;
            [(end_t - ftime) / (end_t - t1), (ftime - t1) / (end_t - t1)]
        };

        Ok(BinWeights {
            orbit: [t1_idx, (t1_idx + 1) % self.orbit_bins],
            orbit_weights,
            azimuth: [
                a1 as usize % self.azimuth_bins,
                a2 as usize % self.azimuth_bins,
            ],
            azimuth_weights: [a2 - fazi, fazi - a1],
        })
    }

    /// Interpolates a `[orbit][azimuth]` table.
    pub fn interpolate(&self, table: &Table<2>, orbit_time: f64, azimuth: f64) -> Result<f64> {
        self.weights(orbit_time, azimuth)?
            .blend(|t, a| table.get([t, a]))
    }
}
