use super::Table;
use crate::error::{self, Error};
use crate::util::Result;
use crate::util::binary::BinaryTableReader;
use serde::{Deserialize, Serialize};
use snafu::ensure;
use std::path::Path;

const TABLE_NAME: &str = "ambiguity";

/// Signal-to-ambiguity ratio used when no ambiguity table is configured (100 dB).
pub const NO_AMBIGUITY_RATIO: f64 = 1e10;

/// Fields stored per (azimuth, beam, along, cross) cell of the table file, in file order.
#[derive(Debug, Clone, Copy)]
enum Field {
    TotalRatio = 0,
    FirstPower,
    FirstAlong,
    FirstCross,
    SecondPower,
    SecondAlong,
    SecondCross,
    Nadir,
}

const FIELDS: usize = 8;

/// Dimensions of the ambiguity index and table files.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AmbigTableLayout {
    pub azimuths: usize,
    /// deg
    pub azimuth_step: f64,
    pub beams: usize,
    pub along: usize,
    pub cross: usize,
}

impl Default for AmbigTableLayout {
    fn default() -> Self {
        Self {
            azimuths: 360,
            azimuth_step: 1.0,
            beams: 4,
            along: 31,
            cross: 31,
        }
    }
}

/// Strength and position (relative to boresight, along/cross-track km) of one ambiguity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AmbiguityLookup {
    /// Ambiguous power relative to the main signal, as a signal-to-ambiguity ratio.
    pub ratio: f64,
    pub along: f64,
    pub cross: f64,
}

/// Range/Doppler ambiguities of the synthetic-aperture processing window, per azimuth
/// and beam, on an along/cross-track grid around the boresight.
#[derive(Debug, Clone, PartialEq)]
pub struct AmbigTable {
    layout: AmbigTableLayout,
    /// `[azimuth][beam][along]`
    along_axis: Table<3>,
    /// `[azimuth][beam][cross]`
    cross_axis: Table<3>,
    /// `[azimuth][beam][field][along][cross]`
    cells: Table<5>,
}

impl AmbigTable {
    /// Reads the index file (window axes) and the table file (ambiguity fields).
    ///
    /// Each index record is `time, x, y, z, vx, vy, vz, azimuth_deg, beam, n_along, n_cross`
    /// followed by the along and cross axes; azimuth, beam and sizes are checked against the
    /// layout.
    pub fn read(index_path: &Path, table_path: &Path, layout: AmbigTableLayout) -> Result<Self> {
        let mut index = BinaryTableReader::open(index_path)?;
        let mut table = BinaryTableReader::open(table_path)?;

        let mut along_axis = Table::new_filled([layout.azimuths, layout.beams, layout.along], 0.0);
        let mut cross_axis = Table::new_filled([layout.azimuths, layout.beams, layout.cross], 0.0);
        let mut cells = Table::new_filled(
            [layout.azimuths, layout.beams, FIELDS, layout.along, layout.cross],
            0.0,
        );

        for azimuth in 0..layout.azimuths {
            for beam in 0..layout.beams {
                // time, position and velocity of the reference orbit state
                index.read_f32_vec(7)?;
                let record = index.read_f32_vec(4)?;
                let sizes_match = (record[2] + 0.1) as usize == layout.along
                    && (record[3] + 0.1) as usize == layout.cross;
                ensure!(
                    (record[0] - azimuth as f64 * layout.azimuth_step).abs() <= layout.azimuth_step
                        && (record[1] + 0.1) as usize == beam
                        && sizes_match,
                    error::TableSanityCheck {
                        table: TABLE_NAME,
                        orbit_bin: beam,
                        azimuth_bin: azimuth
                    }
                );

                for (i, value) in index.read_f32_vec(layout.along)?.into_iter().enumerate() {
                    along_axis.set([azimuth, beam, i], value)?;
                }
                for (j, value) in index.read_f32_vec(layout.cross)?.into_iter().enumerate() {
                    cross_axis.set([azimuth, beam, j], value)?;
                }

                for field in 0..FIELDS {
                    let values = table.read_f32_vec(layout.along * layout.cross)?;
                    for (k, value) in values.into_iter().enumerate() {
                        let value = if field == Field::Nadir as usize {
                            (value + 0.1).trunc()
                        } else {
                            value
                        };
                        cells.set(
                            [azimuth, beam, field, k / layout.cross, k % layout.cross],
                            value,
                        )?;
                    }
                }
            }
        }

        log::info!(
            "read {TABLE_NAME} table {} ({} azimuths, {} beams)",
            table_path.display(),
            layout.azimuths,
            layout.beams
        );

        Self::new(layout, along_axis, cross_axis, cells)
    }

    /// Table from its axes (`[azimuth][beam][along]`, `[azimuth][beam][cross]`) and cells
    /// (`[azimuth][beam][field][along][cross]`). The fields of a cell are the total ratio,
    /// ratio, along and cross offset of the first and then of the second ambiguity, and the
    /// nadir flag.
    pub fn new(
        layout: AmbigTableLayout,
        along_axis: Table<3>,
        cross_axis: Table<3>,
        cells: Table<5>,
    ) -> Result<Self> {
        ensure!(
            layout.along >= 2 && layout.cross >= 2,
            error::MalformedTable {
                table: TABLE_NAME,
                reason: format!(
                    "a window of {} x {} cells has no spacing",
                    layout.along, layout.cross
                )
            }
        );
        check_shape(&along_axis, [layout.azimuths, layout.beams, layout.along])?;
        check_shape(&cross_axis, [layout.azimuths, layout.beams, layout.cross])?;
        check_shape(
            &cells,
            [layout.azimuths, layout.beams, FIELDS, layout.along, layout.cross],
        )?;

        Ok(Self {
            layout,
            along_axis,
            cross_axis,
            cells,
        })
    }

    pub fn layout(&self) -> &AmbigTableLayout {
        &self.layout
    }

    /// Grid cell of an along/cross offset, `None` outside the processing window.
    fn cell(
        &self,
        beam: usize,
        azimuth_deg: f64,
        along: f64,
        cross: f64,
    ) -> Result<Option<[usize; 4]>> {
        ensure!(
            beam < self.layout.beams,
            error::InvalidBeam {
                beam,
                beams: self.layout.beams
            }
        );

        let azimuth_index = (azimuth_deg / self.layout.azimuth_step + 0.1).floor();
        if !(0.0..self.layout.azimuths as f64).contains(&azimuth_index) {
            return Err(Error::TableIndexOutOfRange {
                table: TABLE_NAME,
                axis: "azimuth",
                value: azimuth_deg,
            });
        }
        let azimuth = azimuth_index as usize;

        let along0 = self.along_axis.get([azimuth, beam, 0])?;
        let along1 = self.along_axis.get([azimuth, beam, 1])?;
        let along_last = self.along_axis.get([azimuth, beam, self.layout.along - 1])?;
        let cross0 = self.cross_axis.get([azimuth, beam, 0])?;
        let cross1 = self.cross_axis.get([azimuth, beam, 1])?;
        let cross_last = self.cross_axis.get([azimuth, beam, self.layout.cross - 1])?;

        if !(along0..along_last).contains(&along) || !(cross0..cross_last).contains(&cross) {
            return Ok(None);
        }

        let i = ((along - along0) / (along1 - along0)) as usize;
        let j = ((cross - cross0) / (cross1 - cross0)) as usize;
        Ok(Some([azimuth, beam, i, j]))
    }

    fn lookup(
        &self,
        beam: usize,
        azimuth_deg: f64,
        along: f64,
        cross: f64,
        fields: [Field; 3],
    ) -> Result<Option<AmbiguityLookup>> {
        let Some([azimuth, beam, i, j]) = self.cell(beam, azimuth_deg, along, cross)? else {
            return Ok(None);
        };
        let [ratio, along, cross] =
            fields.map(|field| self.cells.get([azimuth, beam, field as usize, i, j]));

        Ok(Some(AmbiguityLookup {
            ratio: ratio?,
            along: along?,
            cross: cross?,
        }))
    }

    /// Strongest ambiguity of a point at `along`/`cross` km from the boresight.
    pub fn amb_ratio_1(
        &self,
        beam: usize,
        azimuth_deg: f64,
        along: f64,
        cross: f64,
    ) -> Result<Option<AmbiguityLookup>> {
        self.lookup(
            beam,
            azimuth_deg,
            along,
            cross,
            [Field::FirstPower, Field::FirstAlong, Field::FirstCross],
        )
    }

    /// Second strongest ambiguity.
    pub fn amb_ratio_2(
        &self,
        beam: usize,
        azimuth_deg: f64,
        along: f64,
        cross: f64,
    ) -> Result<Option<AmbiguityLookup>> {
        self.lookup(
            beam,
            azimuth_deg,
            along,
            cross,
            [Field::SecondPower, Field::SecondAlong, Field::SecondCross],
        )
    }

    pub fn total_ratio(
        &self,
        beam: usize,
        azimuth_deg: f64,
        along: f64,
        cross: f64,
    ) -> Result<Option<f64>> {
        self.cell(beam, azimuth_deg, along, cross)?
            .map(|[azimuth, beam, i, j]| {
                self.cells
                    .get([azimuth, beam, Field::TotalRatio as usize, i, j])
            })
            .transpose()
    }

    /// Whether the nadir return falls into the processing window of the point.
    pub fn is_nadir_ambiguous(
        &self,
        beam: usize,
        azimuth_deg: f64,
        along: f64,
        cross: f64,
    ) -> Result<bool> {
        match self.cell(beam, azimuth_deg, along, cross)? {
            Some([azimuth, beam, i, j]) => Ok(self
                .cells
                .get([azimuth, beam, Field::Nadir as usize, i, j])?
                > 0.5),
            None => Ok(false),
        }
    }
}

fn check_shape<const N: usize>(table: &Table<N>, expected: [usize; N]) -> Result<()> {
    ensure!(
        table.shape() == expected,
        error::TableShapeMismatch {
            expected: expected.to_vec(),
            found: table.shape().to_vec()
        }
    );
    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::util::binary::f32_le_bytes;
    use float_cmp::approx_eq;

    pub(crate) fn small_layout() -> AmbigTableLayout {
        AmbigTableLayout {
            azimuths: 3,
            azimuth_step: 120.0,
            beams: 2,
            along: 4,
            cross: 3,
        }
    }

    /// Axes `along = -20, -10, 0, 10` and `cross = -5, 0, 5`; every field holds
    /// `field * 100 + along_index * 10 + cross_index`.
    pub(crate) fn write_tables(dir: &Path, layout: &AmbigTableLayout, bad_beam: bool) {
        let mut index = Vec::new();
        let mut table = Vec::new();
        for azimuth in 0..layout.azimuths {
            for beam in 0..layout.beams {
                let beam_id = if bad_beam { beam + 1 } else { beam };
                index.extend(f32_le_bytes(&[0.0; 7]));
                index.extend(f32_le_bytes(&[
                    (azimuth as f64 * layout.azimuth_step) as f32,
                    beam_id as f32,
                    layout.along as f32,
                    layout.cross as f32,
                ]));
                let along: Vec<f32> = (0..layout.along).map(|i| i as f32 * 10.0 - 20.0).collect();
                let cross: Vec<f32> = (0..layout.cross).map(|j| j as f32 * 5.0 - 5.0).collect();
                index.extend(f32_le_bytes(&along));
                index.extend(f32_le_bytes(&cross));

                for field in 0..FIELDS {
                    for i in 0..layout.along {
                        for j in 0..layout.cross {
                            let value = if field == Field::Nadir as usize {
                                (i == 0) as u8 as f32
                            } else {
                                (field * 100 + i * 10 + j) as f32
                            };
                            table.extend(f32_le_bytes(&[value]));
                        }
                    }
                }
            }
        }
        std::fs::write(dir.join("ambig.idx"), index).unwrap();
        std::fs::write(dir.join("ambig.dat"), table).unwrap();
    }

    #[test]
    fn it_reads_and_looks_up() {
        let dir = tempfile::tempdir().unwrap();
        let layout = small_layout();
        write_tables(dir.path(), &layout, false);
        let table =
            AmbigTable::read(&dir.path().join("ambig.idx"), &dir.path().join("ambig.dat"), layout)
                .unwrap();

        let first = table.amb_ratio_1(1, 120.0, -5.0, 2.0).unwrap().unwrap();
        assert!(approx_eq!(f64, first.ratio, 121.0));
        assert!(approx_eq!(f64, first.along, 221.0));
        assert!(approx_eq!(f64, first.cross, 321.0));

        let second = table.amb_ratio_2(1, 120.0, -5.0, 2.0).unwrap().unwrap();
        assert!(approx_eq!(f64, second.ratio, 421.0));

        assert!(approx_eq!(
            f64,
            table.total_ratio(0, 0.0, -20.0, -5.0).unwrap().unwrap(),
            0.0
        ));
        assert!(table.is_nadir_ambiguous(0, 0.0, -15.0, 0.0).unwrap());
        assert!(!table.is_nadir_ambiguous(0, 0.0, 5.0, 0.0).unwrap());
    }

    #[test]
    fn outside_the_window_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let layout = small_layout();
        write_tables(dir.path(), &layout, false);
        let table =
            AmbigTable::read(&dir.path().join("ambig.idx"), &dir.path().join("ambig.dat"), layout)
                .unwrap();

        assert!(table.amb_ratio_1(0, 0.0, 10.0, 0.0).unwrap().is_none());
        assert!(table.amb_ratio_1(0, 0.0, 0.0, -6.0).unwrap().is_none());
        assert!(table.amb_ratio_1(0, 400.0, 0.0, 0.0).is_err());
        assert!(table.amb_ratio_1(2, 0.0, 0.0, 0.0).is_err());
    }

    #[test]
    fn it_checks_the_index() {
        let dir = tempfile::tempdir().unwrap();
        let layout = small_layout();
        write_tables(dir.path(), &layout, true);
        assert!(matches!(
            AmbigTable::read(&dir.path().join("ambig.idx"), &dir.path().join("ambig.dat"), layout),
            Err(Error::TableSanityCheck { .. })
        ));
    }

    #[test]
    fn in_memory_tables_need_matching_shapes() {
        let layout = small_layout();
        let axis = |n| Table::new_filled([layout.azimuths, layout.beams, n], 0.0);
        let cells = Table::new_filled(
            [layout.azimuths, layout.beams, FIELDS, layout.along, layout.cross],
            0.0,
        );

        assert!(AmbigTable::new(layout, axis(layout.along), axis(layout.cross), cells.clone()).is_ok());
        assert!(matches!(
            AmbigTable::new(layout, axis(layout.cross), axis(layout.cross), cells),
            Err(Error::TableShapeMismatch { .. })
        ));
    }
}
