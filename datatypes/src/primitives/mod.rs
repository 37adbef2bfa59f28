mod instrument;
mod meas;
mod orbit;

pub use instrument::{BeamInfo, InstrumentParameters, InstrumentState};
pub use meas::{KpcCoefficients, LandFlag, Meas, MeasSpot, MeasType};
pub use orbit::{Attitude, OrbitState, RotationAxis};
pub(crate) use orbit::frame_rotation;
