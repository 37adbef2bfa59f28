use crate::error::{self, Error};
use crate::geometry::Vector3;
use crate::util::Result;
use crate::util::binary::{BinaryTableReader, parse_token, read_text_rows};
use snafu::ensure;
use std::path::Path;

const TABLE_NAME: &str = "point target response";
const AUX_COLUMNS: usize = 16;

/// Auxiliary records around the nearest orbit time that are searched for the scan angle.
const SCAN_ANGLE_SEARCH_RECORDS: usize = 10;

/// One line of the auxiliary file: the geometry of a simulated point target block.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PtrAuxRecord {
    /// s since the ascending node
    pub time: f64,
    /// deg
    pub scan_angle: f64,
    pub range_pixels: usize,
    pub azimuth_pixels: usize,
    pub sc_position: Vector3,
    pub target_position: Vector3,
    pub range_unit: Vector3,
    pub azimuth_unit: Vector3,
}

/// Half widths (km) of a point target response.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PtrWidths {
    /// range
    pub semi_minor: f64,
    /// azimuth
    pub semi_major: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PtrBeamTable {
    aux: Vec<PtrAuxRecord>,
    /// first data record of each aux block
    block_offsets: Vec<usize>,
    /// `[range_offset, azimuth_offset, semi_minor, semi_major]` in m
    samples: Vec<[f64; 4]>,
}

impl PtrBeamTable {
    pub fn read(aux_path: &Path, data_path: &Path) -> Result<Self> {
        let aux = read_text_rows(aux_path)?
            .iter()
            .map(|row| parse_aux_row(row))
            .collect::<Result<Vec<_>>>()?;

        let mut reader = BinaryTableReader::open(data_path)?;
        let mut samples = Vec::new();
        while !reader.at_end()? {
            let values = reader.read_f32_vec(4)?;
            samples.push([values[0], values[1], values[2], values[3]]);
        }

        log::debug!(
            "read {} auxiliary and {} data records of {TABLE_NAME} table {}",
            aux.len(),
            samples.len(),
            data_path.display()
        );
        Self::new(aux, samples)
    }

    pub fn new(aux: Vec<PtrAuxRecord>, samples: Vec<[f64; 4]>) -> Result<Self> {
        let block_offsets: Vec<usize> = aux
            .iter()
            .scan(0, |offset, record| {
                let start = *offset;
                *offset += record.range_pixels * record.azimuth_pixels;
                Some(start)
            })
            .collect();
        let needed = aux
            .last()
            .zip(block_offsets.last())
            .map_or(0, |(r, &o)| o + r.range_pixels * r.azimuth_pixels);
        ensure!(
            !aux.is_empty() && needed <= samples.len(),
            error::MalformedTable {
                table: TABLE_NAME,
                reason: format!(
                    "{} auxiliary records need {needed} data records, found {}",
                    aux.len(),
                    samples.len()
                )
            }
        );

        Ok(Self {
            aux,
            block_offsets,
            samples,
        })
    }

    pub fn aux_records(&self) -> &[PtrAuxRecord] {
        &self.aux
    }

    /// Nearest-neighbour lookup: nearest orbit time, then nearest scan angle close to it,
    /// then the nearest range/azimuth offset (km) within that block.
    pub fn lookup(
        &self,
        range: f64,
        azimuth: f64,
        scan_angle: f64,
        orbit_time: f64,
    ) -> Result<PtrWidths> {
        let time_index = nearest(self.aux.iter().map(|r| (r.time - orbit_time).abs()), 0);

        let first = time_index.saturating_sub(SCAN_ANGLE_SEARCH_RECORDS);
        let last = (time_index + SCAN_ANGLE_SEARCH_RECORDS).min(self.aux.len());
        let scan_angle_deg = scan_angle.to_degrees();
        let block = nearest(
            self.aux[first..last]
                .iter()
                .map(|r| (r.scan_angle - scan_angle_deg).abs()),
            first,
        );

        let record = &self.aux[block];
        let start = self.block_offsets[block];
        let end = start + record.range_pixels * record.azimuth_pixels;
        ensure!(
            end > start,
            error::MalformedTable {
                table: TABLE_NAME,
                reason: format!("block {block} is empty")
            }
        );

        let range_m = range * 1000.0;
        let azimuth_m = azimuth * 1000.0;
        let sample = nearest(
            self.samples[start..end].iter().map(|s| {
                (range_m - s[0]).powi(2) + (azimuth_m - s[1]).powi(2)
            }),
            start,
        );

        let [_, _, semi_minor, semi_major] = self.samples[sample];
        Ok(PtrWidths {
            semi_minor: semi_minor / 1000.0,
            semi_major: semi_major / 1000.0,
        })
    }
}

fn nearest(distances: impl Iterator<Item = f64>, offset: usize) -> usize {
    distances
        .enumerate()
        .fold((offset, f64::INFINITY), |best, (i, d)| {
            if d < best.1 { (offset + i, d) } else { best }
        })
        .0
}

fn parse_aux_row(row: &[String]) -> Result<PtrAuxRecord> {
    ensure!(
        row.len() == AUX_COLUMNS,
        error::MalformedTable {
            table: TABLE_NAME,
            reason: format!("auxiliary row has {} columns, expected {AUX_COLUMNS}", row.len())
        }
    );
    let values = row
        .iter()
        .map(|token| parse_token(TABLE_NAME, token))
        .collect::<Result<Vec<_>>>()?;
    let vector = |i: usize| Vector3::new(values[i], values[i + 1], values[i + 2]);
    let count = |v: f64| {
        if v >= 0.0 && v.fract() == 0.0 {
            Ok(v as usize)
        } else {
            Err(Error::MalformedTable {
                table: TABLE_NAME,
                reason: format!("{v} is not a pixel count"),
            })
        }
    };

    Ok(PtrAuxRecord {
        time: values[0],
        scan_angle: values[1],
        range_pixels: count(values[2])?,
        azimuth_pixels: count(values[3])?,
        sc_position: vector(4),
        target_position: vector(7),
        range_unit: vector(10),
        azimuth_unit: vector(13),
    })
}

/// Point target response widths for every beam.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PtrTable {
    beams: Vec<PtrBeamTable>,
}

impl PtrTable {
    pub fn new(beams: Vec<PtrBeamTable>) -> Self {
        Self { beams }
    }

    /// Reads `(aux, data)` file pairs, one per beam.
    pub fn read<P: AsRef<Path>>(beam_files: &[(P, P)]) -> Result<Self> {
        beam_files
            .iter()
            .map(|(aux, data)| PtrBeamTable::read(aux.as_ref(), data.as_ref()))
            .collect::<Result<Vec<_>>>()
            .map(Self::new)
    }

    pub fn lookup(
        &self,
        beam: usize,
        range: f64,
        azimuth: f64,
        scan_angle: f64,
        orbit_time: f64,
    ) -> Result<PtrWidths> {
        self.beams
            .get(beam)
            .ok_or(Error::InvalidBeam {
                beam,
                beams: self.beams.len(),
            })?
            .lookup(range, azimuth, scan_angle, orbit_time)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::binary::f32_le_bytes;
    use float_cmp::approx_eq;
    use std::io::Write;

    /// Two blocks at t = 0 s / 10° and t = 100 s / 20°, 2 × 1 pixels each.
    fn write_beam(dir: &Path) -> (std::path::PathBuf, std::path::PathBuf) {
        let aux_path = dir.join("beam1.aux");
        let data_path = dir.join("beam1.dat");

        let mut aux = std::fs::File::create(&aux_path).unwrap();
        writeln!(aux, "0.0 10.0 2 1 0 0 7000 0 0 6378 1 0 0 0 1 0").unwrap();
        writeln!(aux, "100.0 20.0 2 1 0 0 7000 0 0 6378 1 0 0 0 1 0").unwrap();

        let data = f32_le_bytes(&[
            -1000.0, 0.0, 100.0, 500.0, //
            1000.0, 0.0, 110.0, 510.0, //
            -1000.0, 0.0, 200.0, 600.0, //
            1000.0, 0.0, 210.0, 610.0,
        ]);
        std::fs::write(&data_path, data).unwrap();
        (aux_path, data_path)
    }

    #[test]
    fn it_finds_the_nearest_sample() {
        let dir = tempfile::tempdir().unwrap();
        let table = PtrTable::read(&[write_beam(dir.path())]).unwrap();

        let widths = table.lookup(0, 0.9, 0.0, 20_f64.to_radians(), 90.0).unwrap();
        assert!(approx_eq!(f64, widths.semi_minor, 0.21, epsilon = 1e-6));
        assert!(approx_eq!(f64, widths.semi_major, 0.61, epsilon = 1e-6));

        let widths = table.lookup(0, -2.0, 0.3, 10_f64.to_radians(), 0.0).unwrap();
        assert!(approx_eq!(f64, widths.semi_minor, 0.1, epsilon = 1e-6));

        assert!(table.lookup(1, 0.0, 0.0, 0.0, 0.0).is_err());
    }

    #[test]
    fn it_rejects_short_data() {
        let record = PtrAuxRecord {
            time: 0.0,
            scan_angle: 0.0,
            range_pixels: 3,
            azimuth_pixels: 1,
            sc_position: Vector3::zeros(),
            target_position: Vector3::zeros(),
            range_unit: Vector3::x(),
            azimuth_unit: Vector3::y(),
        };
        assert!(PtrBeamTable::new(vec![record], vec![[0.0; 4]; 2]).is_err());
        assert!(PtrBeamTable::new(vec![record], vec![[0.0; 4]; 3]).is_ok());
    }
}
