use super::Table;
use crate::error::{self, Error};
use crate::util::Result;
use crate::util::binary::{BinaryTableReader, f32_le_bytes};
use serde::{Deserialize, Serialize};
use snafu::{ResultExt, ensure};
use std::f64::consts::TAU;
use std::io::{BufWriter, Write};
use std::path::Path;

const TABLE_NAME: &str = "X";

/// Frequencies up to this far past the top edge still resolve to the last slice.
const TOP_EDGE_TOLERANCE_HZ: f64 = 1.0;

/// Converts a relative slice index into an absolute one.
///
/// Relative indices are centered on the carrier: `-n/2 ..= -1, 1 ..= n/2` for an even
/// slice count and `-(n-1)/2 ..= (n-1)/2` for an odd one.
pub fn rel_to_abs_slice(rel: i32, slices: usize) -> Option<usize> {
    let half = (slices / 2) as i32;
    let abs = if slices % 2 == 0 {
        match rel {
            0 => return None,
            r if r < 0 => r + half,
            r => r + half - 1,
        }
    } else {
        rel + half
    };
    (0..slices as i32).contains(&abs).then_some(abs as usize)
}

pub fn abs_to_rel_slice(abs: usize, slices: usize) -> Option<i32> {
    if abs >= slices {
        return None;
    }
    let half = (slices / 2) as i32;
    let abs = abs as i32;
    Some(if slices % 2 == 0 {
        if abs < half { abs - half } else { abs - half + 1 }
    } else {
        abs - half
    })
}

/// Slice layout of an [`XTable`]. Slices are ordered by frequency: guard slices, science
/// slices, guard slices, centered on zero baseband frequency.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct XTableHeader {
    pub beams: usize,
    pub azimuth_bins: usize,
    pub science_slices: usize,
    pub guard_slices_each_side: usize,
    /// Hz
    pub science_bandwidth: f64,
    /// Hz
    pub guard_bandwidth: f64,
}

impl XTableHeader {
    pub fn num_slices(&self) -> usize {
        self.science_slices + 2 * self.guard_slices_each_side
    }

    fn is_science(&self, slice: usize) -> bool {
        (self.guard_slices_each_side..self.guard_slices_each_side + self.science_slices)
            .contains(&slice)
    }

    fn read(reader: &mut BinaryTableReader) -> Result<Self> {
        let mut count = || -> Result<usize> {
            let value = reader.read_i32()?;
            usize::try_from(value).map_err(|_| Error::MalformedTable {
                table: TABLE_NAME,
                reason: format!("negative dimension {value} in header"),
            })
        };
        let (beams, azimuth_bins, science_slices, guard_slices_each_side) =
            (count()?, count()?, count()?, count()?);

        Ok(Self {
            beams,
            azimuth_bins,
            science_slices,
            guard_slices_each_side,
            science_bandwidth: f64::from(reader.read_f32()?),
            guard_bandwidth: f64::from(reader.read_f32()?),
        })
    }

    fn to_bytes(self) -> Vec<u8> {
        let mut bytes = Vec::new();
        for count in [
            self.beams,
            self.azimuth_bins,
            self.science_slices,
            self.guard_slices_each_side,
        ] {
            bytes.extend_from_slice(&(count as i32).to_le_bytes());
        }
        bytes.extend(f32_le_bytes(&[
            self.science_bandwidth as f32,
            self.guard_bandwidth as f32,
        ]));
        bytes
    }
}

/// Per beam, azimuth bin and slice calibration values: either true X factors or the
/// K factors that correct an estimated X.
#[derive(Debug, Clone, PartialEq)]
pub struct XTable {
    header: XTableHeader,
    values: Table<3>,
    filled: Vec<bool>,
}

impl XTable {
    pub fn new(header: XTableHeader) -> Result<Self> {
        ensure!(
            header.beams > 0 && header.azimuth_bins > 0 && header.num_slices() > 0,
            error::MalformedTable {
                table: TABLE_NAME,
                reason: format!("empty layout {header:?}")
            }
        );

        let shape = [header.beams, header.azimuth_bins, header.num_slices()];
        Ok(Self {
            header,
            values: Table::new_filled(shape, 0.0),
            filled: vec![false; shape.iter().product()],
        })
    }

    pub fn read(path: &Path) -> Result<Self> {
        let mut reader = BinaryTableReader::open(path)?;
        let header = XTableHeader::read(&mut reader)?;
        let shape = [header.beams, header.azimuth_bins, header.num_slices()];
        let values = Table::new(shape, reader.read_f32_vec(shape.iter().product())?)?;
        log::debug!("read {TABLE_NAME} table {} with {header:?}", path.display());

        Ok(Self {
            header,
            filled: vec![true; values.data().len()],
            values,
        })
    }

    /// Writes the table. Every entry must have been set.
    pub fn write(&self, path: &Path) -> Result<()> {
        ensure!(
            self.is_complete(),
            error::MalformedTable {
                table: TABLE_NAME,
                reason: "cannot write a table with empty entries".to_owned()
            }
        );

        let file = std::fs::File::create(path).context(error::TableIo { path })?;
        let mut writer = BufWriter::new(file);
        let values: Vec<f32> = self.values.data().iter().map(|&v| v as f32).collect();
        writer
            .write_all(&self.header.to_bytes())
            .and_then(|()| writer.write_all(&f32_le_bytes(&values)))
            .and_then(|()| writer.flush())
            .context(error::TableIo { path })
    }

    pub fn header(&self) -> &XTableHeader {
        &self.header
    }

    pub fn is_complete(&self) -> bool {
        self.filled.iter().all(|&f| f)
    }

    fn azimuth_bin(&self, azimuth: f64) -> Result<usize> {
        ensure!(
            azimuth.is_finite(),
            error::TableIndexOutOfRange {
                table: TABLE_NAME,
                axis: "azimuth",
                value: azimuth
            }
        );
        let bins = self.header.azimuth_bins;
        Ok((azimuth.rem_euclid(TAU) * bins as f64 / TAU) as usize % bins)
    }

    fn check_beam_and_slice(&self, beam: usize, slice: usize) -> Result<()> {
        ensure!(
            beam < self.header.beams,
            error::InvalidBeam {
                beam,
                beams: self.header.beams
            }
        );
        ensure!(
            slice < self.header.num_slices(),
            error::InvalidSlice {
                slice: slice as i32,
                slices: self.header.num_slices()
            }
        );
        Ok(())
    }

    /// Lowest frequency (Hz) of the whole table.
    pub fn min_frequency(&self) -> f64 {
        -(self.header.science_slices as f64) / 2.0 * self.header.science_bandwidth
            - self.header.guard_slices_each_side as f64 * self.header.guard_bandwidth
    }

    pub fn max_frequency(&self) -> f64 {
        -self.min_frequency()
    }

    pub fn bandwidth(&self, slice: usize) -> Result<f64> {
        self.check_beam_and_slice(0, slice)?;
        Ok(if self.header.is_science(slice) {
            self.header.science_bandwidth
        } else {
            self.header.guard_bandwidth
        })
    }

    /// Lower edge frequency of a slice.
    pub fn slice_frequency(&self, slice: usize) -> Result<f64> {
        self.check_beam_and_slice(0, slice)?;
        let mut frequency = self.min_frequency();
        for s in 0..slice {
            frequency += self.bandwidth(s)?;
        }
        Ok(frequency)
    }

    /// Slice containing `frequency`, `None` outside the table.
    pub fn find_slice_number(&self, frequency: f64) -> Option<usize> {
        if frequency < self.min_frequency() {
            return None;
        }

        let mut lower = self.min_frequency();
        for slice in 0..self.header.num_slices() {
            let upper = lower + self.bandwidth(slice).ok()?;
            if frequency < upper {
                return Some(slice);
            }
            lower = upper;
        }

        (frequency < lower + TOP_EDGE_TOLERANCE_HZ).then(|| self.header.num_slices() - 1)
    }

    pub fn retrieve_by_slice(&self, beam: usize, azimuth: f64, slice: usize) -> Result<f64> {
        self.check_beam_and_slice(beam, slice)?;
        self.values.get([beam, self.azimuth_bin(azimuth)?, slice])
    }

    pub fn retrieve_by_relative_slice(&self, beam: usize, azimuth: f64, rel_slice: i32) -> Result<f64> {
        let slice = rel_to_abs_slice(rel_slice, self.header.num_slices()).ok_or(
            Error::InvalidSlice {
                slice: rel_slice,
                slices: self.header.num_slices(),
            },
        )?;
        self.retrieve_by_slice(beam, azimuth, slice)
    }

    /// Sums the table slices overlapping `[min_frequency, min_frequency + bandwidth)`, each
    /// weighted by the fraction of it that lies inside the band.
    pub fn retrieve_by_slice_frequency(
        &self,
        beam: usize,
        azimuth: f64,
        min_frequency: f64,
        bandwidth: f64,
    ) -> Result<f64> {
        let max_frequency = min_frequency + bandwidth;
        ensure!(
            bandwidth > 0.0
                && min_frequency >= self.min_frequency()
                && max_frequency <= self.max_frequency() + TOP_EDGE_TOLERANCE_HZ,
            error::TableIndexOutOfRange {
                table: TABLE_NAME,
                axis: "slice frequency",
                value: min_frequency
            }
        );

        let mut x = 0.0;
        let mut lower = self.min_frequency();
        for slice in 0..self.header.num_slices() {
            let slice_bandwidth = self.bandwidth(slice)?;
            let upper = lower + slice_bandwidth;
            let overlap = upper.min(max_frequency) - lower.max(min_frequency);
            if overlap > 0.0 {
                x += self.retrieve_by_slice(beam, azimuth, slice)? * overlap / slice_bandwidth;
            }
            lower = upper;
        }
        Ok(x)
    }

    /// Stores a value unless the entry has already been set.
    pub fn set(&mut self, value: f64, beam: usize, azimuth: f64, slice: usize) -> Result<()> {
        self.check_beam_and_slice(beam, slice)?;
        let index = [beam, self.azimuth_bin(azimuth)?, slice];
        let linear = self.values.linear_index(index)?;
        if !self.filled[linear] {
            self.filled[linear] = true;
            self.values.set(index, value)?;
        }
        Ok(())
    }

    /// K factor table `K = X_true / X_estimated`, resampled to the slices of the estimate.
    pub fn make_kfactor_table(true_x: &XTable, estimated_x: &XTable) -> Result<XTable> {
        ensure!(
            true_x.header.beams == estimated_x.header.beams
                && true_x.header.azimuth_bins == estimated_x.header.azimuth_bins,
            error::TableShapeMismatch {
                expected: estimated_x.values.shape().to_vec(),
                found: true_x.values.shape().to_vec()
            }
        );

        let header = estimated_x.header;
        let mut kfactor = XTable::new(header)?;
        for beam in 0..header.beams {
            for a in 0..header.azimuth_bins {
                let azimuth = a as f64 * TAU / header.azimuth_bins as f64;
                for slice in 0..header.num_slices() {
                    let x_true = true_x.retrieve_by_slice_frequency(
                        beam,
                        azimuth,
                        estimated_x.slice_frequency(slice)?,
                        estimated_x.bandwidth(slice)?,
                    )?;
                    let x_est = estimated_x.values.get([beam, a, slice])?;
                    kfactor.set(x_true / x_est, beam, azimuth, slice)?;
                }
            }
        }
        Ok(kfactor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::approx_eq;

    fn header() -> XTableHeader {
        XTableHeader {
            beams: 2,
            azimuth_bins: 4,
            science_slices: 4,
            guard_slices_each_side: 1,
            science_bandwidth: 10.0,
            guard_bandwidth: 5.0,
        }
    }

    fn filled(value: impl Fn(usize, usize, usize) -> f64) -> XTable {
        let header = header();
        let mut table = XTable::new(header).unwrap();
        for b in 0..header.beams {
            for a in 0..header.azimuth_bins {
                for s in 0..header.num_slices() {
                    let azimuth = a as f64 * TAU / header.azimuth_bins as f64;
                    table.set(value(b, a, s), b, azimuth, s).unwrap();
                }
            }
        }
        table
    }

    #[test]
    fn relative_slices() {
        assert_eq!(rel_to_abs_slice(-6, 12), Some(0));
        assert_eq!(rel_to_abs_slice(-1, 12), Some(5));
        assert_eq!(rel_to_abs_slice(1, 12), Some(6));
        assert_eq!(rel_to_abs_slice(6, 12), Some(11));
        assert_eq!(rel_to_abs_slice(0, 12), None);
        assert_eq!(rel_to_abs_slice(7, 12), None);
        assert_eq!(rel_to_abs_slice(0, 5), Some(2));

        for abs in 0..12 {
            let rel = abs_to_rel_slice(abs, 12).unwrap();
            assert_eq!(rel_to_abs_slice(rel, 12), Some(abs));
        }
    }

    #[test]
    fn slice_frequencies() {
        let table = XTable::new(header()).unwrap();
        assert!(approx_eq!(f64, table.min_frequency(), -25.0));
        assert!(approx_eq!(f64, table.slice_frequency(0).unwrap(), -25.0));
        assert!(approx_eq!(f64, table.slice_frequency(1).unwrap(), -20.0));
        assert!(approx_eq!(f64, table.slice_frequency(5).unwrap(), 20.0));
        assert!(approx_eq!(f64, table.bandwidth(3).unwrap(), 10.0));
        assert!(approx_eq!(f64, table.bandwidth(5).unwrap(), 5.0));

        assert_eq!(table.find_slice_number(-30.0), None);
        assert_eq!(table.find_slice_number(-22.0), Some(0));
        assert_eq!(table.find_slice_number(0.0), Some(3));
        assert_eq!(table.find_slice_number(25.5), Some(5));
        assert_eq!(table.find_slice_number(40.0), None);
    }

    #[test]
    fn set_keeps_first_value() {
        let mut table = XTable::new(header()).unwrap();
        table.set(1.0, 0, 0.1, 2).unwrap();
        table.set(2.0, 0, 0.1, 2).unwrap();
        assert!(approx_eq!(f64, table.retrieve_by_slice(0, 0.1, 2).unwrap(), 1.0));
        assert!(!table.is_complete());
        assert!(table.set(1.0, 2, 0.1, 2).is_err());
    }

    #[test]
    fn azimuth_wraps() {
        let table = filled(|_, a, _| a as f64);
        let value = table.retrieve_by_slice(0, -0.1, 0).unwrap();
        assert!(approx_eq!(f64, value, 3.0));
        let value = table.retrieve_by_slice(0, TAU + 0.1, 0).unwrap();
        assert!(approx_eq!(f64, value, 0.0));
    }

    #[test]
    fn frequency_retrieval_weights_partial_slices() {
        let table = filled(|_, _, s| s as f64);
        // half of slice 1 and half of slice 2
        let value = table.retrieve_by_slice_frequency(0, 0.0, -15.0, 10.0).unwrap();
        assert!(approx_eq!(f64, value, 0.5 * 1.0 + 0.5 * 2.0, epsilon = 1e-12));
        assert!(table.retrieve_by_slice_frequency(0, 0.0, -40.0, 10.0).is_err());
    }

    #[test]
    fn kfactor_of_identical_tables_is_one() {
        let x = filled(|b, a, s| 1.0 + (b + a + s) as f64);
        let k = XTable::make_kfactor_table(&x, &x).unwrap();
        assert!(k.is_complete());
        assert!(k.values.data().iter().all(|&v| approx_eq!(f64, v, 1.0, epsilon = 1e-12)));
    }

    #[test]
    fn it_writes_and_reads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kfactor.dat");
        let table = filled(|b, a, s| (b * 100 + a * 10 + s) as f64);
        table.write(&path).unwrap();

        let read = XTable::read(&path).unwrap();
        assert_eq!(read.header(), table.header());
        assert!(approx_eq!(
            f64,
            read.retrieve_by_relative_slice(1, 0.0, 1).unwrap(),
            103.0
        ));
        assert!(XTable::new(header()).unwrap().write(&path).is_err());
    }
}
