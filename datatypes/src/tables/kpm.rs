use crate::error::{self, Error};
use crate::primitives::MeasType;
use crate::util::Result;
use crate::util::binary::{BinaryTableReader, f32_le_bytes};
use snafu::{ResultExt, ensure};
use std::path::Path;

const TABLE_NAME: &str = "Kpm";

/// Kpm of the cross-polarized measurement types (0.7 dB).
pub const CROSS_POL_KPM: f64 = 0.1749;

/// Evenly spaced wind speed axis (m/s) with clipped linear interpolation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpeedIndex {
    pub min: f64,
    pub max: f64,
    pub bins: usize,
}

impl SpeedIndex {
    pub fn new(min: f64, max: f64, bins: usize) -> Result<Self> {
        ensure!(
            bins >= 2 && max > min,
            error::MalformedTable {
                table: TABLE_NAME,
                reason: format!("speed index [{min}, {max}] with {bins} bins")
            }
        );
        Ok(Self { min, max, bins })
    }

    pub fn step(&self) -> f64 {
        (self.max - self.min) / (self.bins - 1) as f64
    }

    /// Surrounding bins and their weights, with `value` clipped to the axis.
    pub fn linear_coefficients(&self, value: f64) -> ([usize; 2], [f64; 2]) {
        let position = (value.clamp(self.min, self.max) - self.min) / self.step();
        let lower = (position.floor() as usize).min(self.bins - 2);
        let upper_weight = position - lower as f64;
        ([lower, lower + 1], [1.0 - upper_weight, upper_weight])
    }
}

/// Model function error (Kpm) versus wind speed for VV and HH measurements.
#[derive(Debug, Clone, PartialEq)]
pub struct KpmTable {
    speed_index: SpeedIndex,
    /// `[VV, HH]`
    values: [Vec<f64>; 2],
}

impl KpmTable {
    pub fn new(speed_index: SpeedIndex, vv: Vec<f64>, hh: Vec<f64>) -> Result<Self> {
        ensure!(
            vv.len() == speed_index.bins && hh.len() == speed_index.bins,
            error::TableShapeMismatch {
                expected: vec![speed_index.bins, speed_index.bins],
                found: vec![vv.len(), hh.len()]
            }
        );
        Ok(Self {
            speed_index,
            values: [vv, hh],
        })
    }

    /// Reads the `f32 min_speed, f32 max_speed, u32 bins` header and the VV and HH rows.
    pub fn read(path: &Path) -> Result<Self> {
        let mut reader = BinaryTableReader::open(path)?;
        let min = f64::from(reader.read_f32()?);
        let max = f64::from(reader.read_f32()?);
        let bins = reader.read_u32()? as usize;
        let speed_index = SpeedIndex::new(min, max, bins)?;

        let vv = reader.read_f32_vec(bins)?;
        let hh = reader.read_f32_vec(bins)?;
        Self::new(speed_index, vv, hh)
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        let mut bytes = f32_le_bytes(&[self.speed_index.min as f32, self.speed_index.max as f32]);
        bytes.extend_from_slice(&(self.speed_index.bins as u32).to_le_bytes());
        for row in &self.values {
            let row: Vec<f32> = row.iter().map(|&v| v as f32).collect();
            bytes.extend(f32_le_bytes(&row));
        }
        std::fs::write(path, bytes).context(error::TableIo { path })
    }

    pub fn kpm(&self, meas_type: MeasType, speed: f64) -> Result<f64> {
        let row = match meas_type {
            MeasType::Vv => &self.values[0],
            MeasType::Hh => &self.values[1],
            t if t.is_cross_polarized() => return Ok(CROSS_POL_KPM),
            meas_type => return Err(Error::UnsupportedMeasType { meas_type }),
        };

        let ([i0, i1], [c0, c1]) = self.speed_index.linear_coefficients(speed);
        Ok(row[i0] * c0 + row[i1] * c1)
    }
}
