use super::{CoordinateSwitch, Vector3, surface_normal};
use crate::primitives::{Attitude, OrbitState, RotationAxis, frame_rotation};
use crate::util::Result;
use serde::{Deserialize, Serialize};

/// Which velocity defines the along-track axis of the spacecraft frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum VelocityFrame {
    /// Inertial velocity as delivered by the ephemeris.
    #[default]
    Inertial,
    /// Velocity relative to the rotating earth.
    EarthFixed,
}

const EARTH_ROTATION_RATE: f64 = 7.292_115_855_3e-5;

/// Spacecraft frame: z towards nadir, y along `z × v`, x completing the right-handed set
/// (roughly along the velocity).
pub fn gc_to_spacecraft(state: &OrbitState, velocity_frame: VelocityFrame) -> Result<CoordinateSwitch> {
    let velocity = match velocity_frame {
        VelocityFrame::Inertial => state.vsat,
        VelocityFrame::EarthFixed => {
            state.vsat - Vector3::z().cross(&state.rsat) * EARTH_ROTATION_RATE
        }
    };

    let z = -state.rsat;
    let y = z.cross(&velocity);
    let x = y.cross(&z);
    CoordinateSwitch::new(&x, &y, &z)
}

/// Antenna frame: the attitude-corrected spacecraft frame rotated about its nadir axis by
/// the antenna azimuth. Beam boresights are given in this frame as spherical angles.
pub fn gc_to_antenna(
    state: &OrbitState,
    velocity_frame: VelocityFrame,
    attitude: &Attitude,
    antenna_azimuth: f64,
) -> Result<CoordinateSwitch> {
    let gc_to_sc = gc_to_spacecraft(state, velocity_frame)?;
    let spin = CoordinateSwitch::from_matrix(frame_rotation(RotationAxis::Z, antenna_azimuth));
    Ok(gc_to_sc.then(&attitude.switch()).then(&spin))
}

/// Range/azimuth frame at a surface point: z along the surface normal, y perpendicular to
/// the look direction in the local horizontal plane, x the horizontal range direction.
pub fn gc_to_range_azimuth(surface_point: &Vector3, look: &Vector3) -> Result<CoordinateSwitch> {
    let z = surface_normal(surface_point);
    let y = z.cross(look);
    let x = y.cross(&z);
    CoordinateSwitch::new(&x, &y, &z)
}
