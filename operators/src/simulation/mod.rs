//! Pulse sequencing, the simulation driver and the conversion of simulated L1A energies
//! into calibrated sigma0.

mod checkframe;
mod l1a_to_l1b;
mod scatsim;
mod sequencer;

pub use checkframe::{CheckFrameRecord, CheckFrameWriter};
pub use l1a_to_l1b::{CalibrationPulses, L1aToL1b};
pub use scatsim::{ScatSim, SimulatedEvent, SimulatedSpot};
pub use sequencer::{
    ENCODER_COUNTS, Event, EventKind, EventSequencer, NINETY_DEGREE_ENCODER,
    encoder_from_azimuth,
};

use crate::util::random::RandomProcess;
use scatsim_datatypes::geometry::VelocityFrame;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SimulationSwitches {
    pub velocity_frame: VelocityFrame,
    /// Events per telemetry frame.
    pub spots_per_frame: usize,
    pub seed: u64,
    pub mode: usize,
    /// Antenna azimuth (rad) at the start time.
    pub initial_azimuth: f64,
    /// Relative error of the transmit power receiver gain product seen by loopback pulses.
    pub kpri: Option<RandomProcess>,
}

impl Default for SimulationSwitches {
    fn default() -> Self {
        Self {
            velocity_frame: VelocityFrame::Inertial,
            spots_per_frame: 100,
            seed: 0,
            mode: 0,
            initial_azimuth: 0.0,
            kpri: None,
        }
    }
}
