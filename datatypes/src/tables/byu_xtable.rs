use super::{OrbitAzimuthGrid, Table};
use crate::constants::FFT_BIN_SIZE;
use crate::error::{self, Error};
use crate::util::Result;
use crate::util::binary::{BinaryTableReader, parse_token, read_text_rows};
use serde::{Deserialize, Serialize};
use snafu::ensure;
use std::path::Path;

/// Slices per beam in the BYU tables: 12 science slices on each side of the
/// carrier plus one guard slice per side.
pub const BYU_SLICES: usize = 26;

const TABLE_NAME: &str = "BYU X";

/// Order of the Doppler polynomial stored per (slice, orbit bin, azimuth bin).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PolynomialOrder {
    /// `Xnom + A + B d + C d² + D d³`
    Third,
    /// `A + B d + C d² + D d³ + E d⁴ + F d⁵`
    Fifth,
}

impl PolynomialOrder {
    /// Detects the order from the number of coefficient rows of one beam file.
    pub fn from_rows(rows: usize) -> Result<Self> {
        match rows {
            r if r == BYU_SLICES * 5 => Ok(Self::Third),
            r if r == BYU_SLICES * 6 => Ok(Self::Fifth),
            rows => Err(Error::UnsupportedXTableOrder { rows }),
        }
    }

    pub fn coefficients(self) -> usize {
        match self {
            Self::Third => 5,
            Self::Fifth => 6,
        }
    }

    /// Evaluates the dB correction at `delta_bin` Doppler bins off the nominal frequency.
    pub fn evaluate(self, coefficients: &[f64], delta_bin: f64) -> f64 {
        let polynomial = match self {
            Self::Third => &coefficients[1..],
            Self::Fifth => coefficients,
        };
        let value = polynomial
            .iter()
            .rev()
            .fold(0.0, |acc, &c| acc * delta_bin + c);
        match self {
            Self::Third => coefficients[0] + value,
            Self::Fifth => value,
        }
    }
}

/// Dimensions of a ground-system X table file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroundSystemLayout {
    pub modes: usize,
    pub beams: usize,
    pub slices: usize,
}

/// X correction table in the BYU layout, one `[slice][coefficient][orbit][azimuth]`
/// table per beam.
#[derive(Debug, Clone, PartialEq)]
pub struct ByuXTable {
    grid: OrbitAzimuthGrid,
    order: PolynomialOrder,
    beams: Vec<Table<4>>,
}

impl ByuXTable {
    pub fn from_tables(
        grid: OrbitAzimuthGrid,
        order: PolynomialOrder,
        beams: Vec<Table<4>>,
    ) -> Result<Self> {
        let expected = [
            BYU_SLICES,
            order.coefficients(),
            grid.orbit_bins,
            grid.azimuth_bins,
        ];
        for beam in &beams {
            ensure!(
                beam.shape() == expected,
                error::TableShapeMismatch {
                    expected: expected.to_vec(),
                    found: beam.shape().to_vec()
                }
            );
        }

        Ok(Self { grid, order, beams })
    }

    /// Reads one ASCII file per beam. Every non-empty line holds the orbit-major grid of one
    /// (slice, coefficient) pair; the line count decides the polynomial order.
    pub fn read_ascii<P: AsRef<Path>>(grid: OrbitAzimuthGrid, beam_files: &[P]) -> Result<Self> {
        let cells = grid.orbit_bins * grid.azimuth_bins;
        let mut order = None;
        let mut beams = Vec::with_capacity(beam_files.len());

        for path in beam_files {
            let path = path.as_ref();
            let rows = read_text_rows(path)?;
            let beam_order = PolynomialOrder::from_rows(rows.len())?;
            ensure!(
                order.is_none_or(|o| o == beam_order),
                error::MalformedTable {
                    table: TABLE_NAME,
                    reason: format!("{} has a different order than the other beams", path.display())
                }
            );
            order = Some(beam_order);

            let mut data = Vec::with_capacity(rows.len() * cells);
            for row in &rows {
                ensure!(
                    row.len() == cells,
                    error::MalformedTable {
                        table: TABLE_NAME,
                        reason: format!(
                            "{} has a row of {} values, expected {cells}",
                            path.display(),
                            row.len()
                        )
                    }
                );
                for token in row {
                    data.push(parse_token(TABLE_NAME, token)?);
                }
            }

            beams.push(Table::new(
                [
                    BYU_SLICES,
                    beam_order.coefficients(),
                    grid.orbit_bins,
                    grid.azimuth_bins,
                ],
                data,
            )?);
            log::debug!("read {} rows of {TABLE_NAME} table {}", rows.len(), path.display());
        }

        let order = order.ok_or(Error::MalformedTable {
            table: TABLE_NAME,
            reason: "no beam files given".to_owned(),
        })?;
        Self::from_tables(grid, order, beams)
    }

    /// Reads the third-order tables of one instrument `mode` from a ground-system file laid out
    /// as `[mode][beam][slice][orbit][azimuth][coefficient]` little-endian `f32`.
    pub fn read_ground_system(
        grid: OrbitAzimuthGrid,
        path: &Path,
        layout: GroundSystemLayout,
        mode: usize,
    ) -> Result<Self> {
        ensure!(
            mode < layout.modes && layout.slices == BYU_SLICES,
            error::MalformedTable {
                table: "ground system X",
                reason: format!("mode {mode} of {layout:?} is not readable")
            }
        );

        let order = PolynomialOrder::Third;
        let coefficients = order.coefficients();
        let cells = grid.orbit_bins * grid.azimuth_bins;
        let slice_values = cells * coefficients;
        let mut reader = BinaryTableReader::open(path)?;

        let mut beams = Vec::with_capacity(layout.beams);
        for beam in 0..layout.beams {
            let mut table = Table::new_filled(
                [BYU_SLICES, coefficients, grid.orbit_bins, grid.azimuth_bins],
                0.0,
            );
            for slice in 0..BYU_SLICES {
                let record = (mode * layout.beams + beam) * layout.slices + slice;
                reader.seek((record * slice_values * std::mem::size_of::<f32>()) as u64)?;
                let values = reader.read_f32_vec(slice_values)?;

                for (cell, chunk) in values.chunks_exact(coefficients).enumerate() {
                    let (orbit, azimuth) = (cell / grid.azimuth_bins, cell % grid.azimuth_bins);
                    for (c, &value) in chunk.iter().enumerate() {
                        table.set([slice, c, orbit, azimuth], value)?;
                    }
                }
            }
            beams.push(table);
        }

        log::debug!(
            "read mode {mode} of ground system X table {}",
            path.display()
        );
        Self::from_tables(grid, order, beams)
    }

    pub fn order(&self) -> PolynomialOrder {
        self.order
    }

    pub fn grid(&self) -> &OrbitAzimuthGrid {
        &self.grid
    }

    pub fn num_beams(&self) -> usize {
        self.beams.len()
    }

    /// Interpolated polynomial coefficients of a slice.
    pub fn coefficients(
        &self,
        beam: usize,
        azimuth: f64,
        orbit_position: f64,
        slice: usize,
    ) -> Result<Vec<f64>> {
        let table = self.beams.get(beam).ok_or(Error::InvalidBeam {
            beam,
            beams: self.beams.len(),
        })?;
        ensure!(
            slice < BYU_SLICES,
            error::InvalidSlice {
                slice: slice as i32,
                slices: BYU_SLICES
            }
        );

        let weights = self
            .grid
            .weights(self.grid.orbit_time(orbit_position), azimuth)?;
        (0..self.order.coefficients())
            .map(|c| weights.blend(|t, a| table.get([slice, c, t, a])))
            .collect()
    }

    /// Linear X correction `10^(0.1 p(delta_freq / FFT_BIN_SIZE))`.
    ///
    /// `delta_freq` is the Doppler offset of the slice in Hz, including any topographic
    /// correction.
    pub fn get_x(
        &self,
        beam: usize,
        azimuth: f64,
        orbit_position: f64,
        slice: usize,
        delta_freq: f64,
    ) -> Result<f64> {
        let coefficients = self.coefficients(beam, azimuth, orbit_position, slice)?;
        let delta_bin = delta_freq / FFT_BIN_SIZE;
        Ok(10_f64.powf(0.1 * self.order.evaluate(&coefficients, delta_bin)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::approx_eq;

    #[test]
    fn order_from_row_count() {
        assert_eq!(PolynomialOrder::from_rows(130).unwrap(), PolynomialOrder::Third);
        assert_eq!(PolynomialOrder::from_rows(156).unwrap(), PolynomialOrder::Fifth);
        assert!(matches!(
            PolynomialOrder::from_rows(131),
            Err(Error::UnsupportedXTableOrder { rows: 131 })
        ));
    }

    #[test]
    fn polynomial_evaluation() {
        let third = PolynomialOrder::Third.evaluate(&[1.0, 2.0, 3.0, 4.0, 5.0], 2.0);
        assert!(approx_eq!(f64, third, 1.0 + 2.0 + 6.0 + 16.0 + 40.0));

        let fifth = PolynomialOrder::Fifth.evaluate(&[1.0, 1.0, 1.0, 1.0, 1.0, 1.0], 2.0);
        assert!(approx_eq!(f64, fifth, 63.0));
    }

    #[test]
    fn constant_coefficients() {
        let grid = OrbitAzimuthGrid::default();
        let mut table = Table::new_filled([BYU_SLICES, 5, grid.orbit_bins, grid.azimuth_bins], 0.0);
        for t in 0..grid.orbit_bins {
            for a in 0..grid.azimuth_bins {
                table.set([3, 0, t, a], 10.0).unwrap();
            }
        }
        let xtable = ByuXTable::from_tables(grid, PolynomialOrder::Third, vec![table]).unwrap();

        assert!(approx_eq!(
            f64,
            xtable.get_x(0, 1.0, 0.3, 3, 5000.0).unwrap(),
            10.0,
            epsilon = 1e-9
        ));
        assert!(xtable.get_x(1, 1.0, 0.3, 3, 0.0).is_err());
        assert!(xtable.get_x(0, 1.0, 0.3, BYU_SLICES, 0.0).is_err());
    }

    #[test]
    fn shapes_are_checked() {
        let grid = OrbitAzimuthGrid::default();
        let table = Table::new_filled([BYU_SLICES, 6, grid.orbit_bins, grid.azimuth_bins], 0.0);
        assert!(ByuXTable::from_tables(grid, PolynomialOrder::Third, vec![table]).is_err());
    }
}
