use super::{OrbitAzimuthGrid, Table};
use crate::constants::FFT_BIN_SIZE;
use crate::error::{self, Error};
use crate::util::Result;
use crate::util::binary::{parse_token, read_text_rows};
use snafu::ensure;
use std::path::Path;

const TABLE_NAME: &str = "Fbb";
const TOKENS_PER_CELL: usize = 6;
const COEFFICIENTS: usize = 4;

/// Baseband frequency compensation table: cubic coefficients in Doppler bin offset per
/// beam, orbit bin and azimuth bin.
#[derive(Debug, Clone, PartialEq)]
pub struct FbbTable {
    grid: OrbitAzimuthGrid,
    /// `[coefficient][orbit][azimuth]` per beam
    beams: Vec<Table<3>>,
}

impl FbbTable {
    /// Reads one file per beam. The file is a sequence of `orbit_time azimuth_deg A B C D`
    /// records, orbit-major, and each record must sit on its grid point.
    pub fn read<P: AsRef<Path>>(grid: OrbitAzimuthGrid, beam_files: &[P]) -> Result<Self> {
        let mut beams = Vec::with_capacity(beam_files.len());

        for path in beam_files {
            let path = path.as_ref();
            let tokens: Vec<String> = read_text_rows(path)?.into_iter().flatten().collect();
            let cells = grid.orbit_bins * grid.azimuth_bins;
            ensure!(
                tokens.len() >= cells * TOKENS_PER_CELL,
                error::MalformedTable {
                    table: TABLE_NAME,
                    reason: format!(
                        "{} holds {} values, expected {}",
                        path.display(),
                        tokens.len(),
                        cells * TOKENS_PER_CELL
                    )
                }
            );

            let mut table =
                Table::new_filled([COEFFICIENTS, grid.orbit_bins, grid.azimuth_bins], 0.0);
            for (cell, record) in tokens.chunks_exact(TOKENS_PER_CELL).take(cells).enumerate() {
                let (orbit_bin, azimuth_bin) = (cell / grid.azimuth_bins, cell % grid.azimuth_bins);
                let orbit_time = parse_token(TABLE_NAME, &record[0])?;
                let azimuth = parse_token(TABLE_NAME, &record[1])?.to_radians();

                ensure!(
                    (orbit_bin as f64 * grid.time_step - orbit_time).abs() <= 0.01
                        && (azimuth_bin as f64 * grid.azimuth_step() - azimuth).abs() <= 1e-4,
                    error::TableSanityCheck {
                        table: TABLE_NAME,
                        orbit_bin,
                        azimuth_bin
                    }
                );

                for (c, token) in record[2..].iter().enumerate() {
                    table.set([c, orbit_bin, azimuth_bin], parse_token(TABLE_NAME, token)?)?;
                }
            }
            beams.push(table);
        }

        Ok(Self { grid, beams })
    }

    pub fn from_tables(grid: OrbitAzimuthGrid, beams: Vec<Table<3>>) -> Result<Self> {
        let expected = [COEFFICIENTS, grid.orbit_bins, grid.azimuth_bins];
        for beam in &beams {
            ensure!(
                beam.shape() == expected,
                error::TableShapeMismatch {
                    expected: expected.to_vec(),
                    found: beam.shape().to_vec()
                }
            );
        }
        Ok(Self { grid, beams })
    }

    /// `A + B d + C d² + D d³` with `d = delta_freq / FFT_BIN_SIZE`.
    pub fn get_fbb(
        &self,
        beam: usize,
        azimuth: f64,
        orbit_position: f64,
        delta_freq: f64,
    ) -> Result<f64> {
        let table = self.beams.get(beam).ok_or(Error::InvalidBeam {
            beam,
            beams: self.beams.len(),
        })?;
        let weights = self
            .grid
            .weights(self.grid.orbit_time(orbit_position), azimuth)?;

        let d = delta_freq / FFT_BIN_SIZE;
        let mut fbb = 0.0;
        for c in (0..COEFFICIENTS).rev() {
            fbb = fbb * d + weights.blend(|t, a| table.get([c, t, a]))?;
        }
        Ok(fbb)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::approx_eq;
    use std::io::Write;

    fn write_table(grid: &OrbitAzimuthGrid, corrupt: bool) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        for t in 0..grid.orbit_bins {
            for a in 0..grid.azimuth_bins {
                let azimuth_deg = if corrupt && t == 1 && a == 2 {
                    99.0
                } else {
                    a as f64 * 360.0 / grid.azimuth_bins as f64
                };
                writeln!(
                    file,
                    "{} {} 1.0 2.0 0.0 0.5",
                    t as f64 * grid.time_step,
                    azimuth_deg
                )
                .unwrap();
            }
        }
        file.flush().unwrap();
        file
    }

    #[test]
    fn it_reads_and_evaluates() {
        let grid = OrbitAzimuthGrid::default();
        let file = write_table(&grid, false);
        let fbb = FbbTable::read(grid, &[file.path()]).unwrap();

        let value = fbb.get_fbb(0, 0.7, 0.4, 2.0 * FFT_BIN_SIZE).unwrap();
        assert!(approx_eq!(f64, value, 1.0 + 4.0 + 4.0, epsilon = 1e-9));
        assert!(fbb.get_fbb(1, 0.7, 0.4, 0.0).is_err());
    }

    #[test]
    fn it_fails_the_sanity_check() {
        let grid = OrbitAzimuthGrid::default();
        let file = write_table(&grid, true);
        assert!(matches!(
            FbbTable::read(grid, &[file.path()]),
            Err(Error::TableSanityCheck {
                orbit_bin: 1,
                azimuth_bin: 2,
                ..
            })
        ));
    }
}
