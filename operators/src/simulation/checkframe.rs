use super::scatsim::SimulatedSpot;
use crate::error;
use crate::util::Result;
use scatsim_datatypes::geometry::geocentric_to_geodetic;
use scatsim_datatypes::primitives::{Meas, MeasSpot};
use serde::{Deserialize, Serialize};
use snafu::ResultExt;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

/// One row of the diagnostic output: a measurement together with the pulse it belongs to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckFrameRecord {
    pub time: f64,
    pub spot: u64,
    pub beam: usize,
    pub antenna_azimuth: f64,
    pub orbit_fraction: f64,
    pub slice: i32,
    /// Degrees, empty for measurements off the surface.
    pub lon: Option<f64>,
    pub lat: Option<f64>,
    pub incidence_angle: f64,
    pub east_azimuth: f64,
    pub land: u8,
    pub value: f64,
    pub xk: f64,
    pub en_slice: f64,
    pub range_width: f64,
    pub azimuth_width: f64,
    pub kpc_a: Option<f64>,
    pub kpc_b: Option<f64>,
    pub kpc_c: Option<f64>,
}

impl CheckFrameRecord {
    pub fn new(simulated: &SimulatedSpot, meas: &Meas) -> Self {
        let position = geocentric_to_geodetic(&meas.centroid)
            .filter(|_| meas.has_surface_centroid())
            .map(|(_, lon, lat)| (lon.to_degrees(), lat.to_degrees()));
        let state = &simulated.state;

        Self {
            time: state.time,
            spot: simulated.index,
            beam: state.beam_idx,
            antenna_azimuth: state.antenna_azimuth.to_degrees(),
            orbit_fraction: state.orbit_fraction,
            slice: meas.start_slice_idx,
            lon: position.map(|p| p.0),
            lat: position.map(|p| p.1),
            incidence_angle: meas.incidence_angle.to_degrees(),
            east_azimuth: meas.east_azimuth.to_degrees(),
            land: meas.land_flag.code(),
            value: meas.value,
            xk: meas.xk,
            en_slice: meas.en_slice,
            range_width: meas.range_width,
            azimuth_width: meas.azimuth_width,
            kpc_a: meas.kpc.map(|k| k.a),
            kpc_b: meas.kpc.map(|k| k.b),
            kpc_c: meas.kpc.map(|k| k.c),
        }
    }
}

/// Appends check frame records to a CSV file. The header is only written to new files.
#[derive(Debug)]
pub struct CheckFrameWriter {
    path: PathBuf,
    writer: csv::Writer<File>,
}

impl CheckFrameWriter {
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .context(error::CheckFrameFile { path: path.clone() })?;
        let is_new = file
            .metadata()
            .context(error::CheckFrameFile { path: path.clone() })?
            .len()
            == 0;

        let writer = csv::WriterBuilder::new()
            .has_headers(is_new)
            .from_writer(file);
        Ok(Self { path, writer })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Writes the measurements of `spot`, which is the simulated spot or its conversion.
    pub fn write_spot(&mut self, simulated: &SimulatedSpot, spot: &MeasSpot) -> Result<()> {
        for meas in &spot.measurements {
            self.writer
                .serialize(CheckFrameRecord::new(simulated, meas))
                .context(error::CheckFrameWrite)?;
        }
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.writer
            .flush()
            .context(error::CheckFrameFile { path: self.path.clone() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::footprint::RejectionPolicy;
    use crate::simulation::scatsim::SimulatedEvent;
    use crate::simulation::scatsim::tests::simulator;

    fn first_spot() -> SimulatedSpot {
        let mut sim = simulator(RejectionPolicy::RejectNow, false);
        match sim.step().unwrap() {
            SimulatedEvent::Spot(spot) => spot,
            other => panic!("expected a spot, got {other:?}"),
        }
    }

    #[test]
    fn records_are_appended() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("checkframes.csv");
        let simulated = first_spot();

        let mut writer = CheckFrameWriter::create(&path).unwrap();
        writer.write_spot(&simulated, &simulated.spot).unwrap();
        writer.flush().unwrap();
        drop(writer);

        let mut writer = CheckFrameWriter::create(&path).unwrap();
        writer.write_spot(&simulated, &simulated.spot).unwrap();
        writer.flush().unwrap();
        drop(writer);

        let mut reader = csv::Reader::from_path(&path).unwrap();
        let records = reader
            .deserialize::<CheckFrameRecord>()
            .collect::<std::result::Result<Vec<_>, _>>()
            .unwrap();

        assert_eq!(records.len(), 2 * simulated.spot.len());
        assert_eq!(records[0], records[simulated.spot.len()]);
        assert_eq!(records[0].spot, 0);
        assert!(records[0].lat.is_some());
        assert!(records[0].kpc_a.is_some());
    }
}
