use crate::geometry::{CoordinateSwitch, Vector3};
use nalgebra::Matrix3;
use serde::{Deserialize, Serialize};

/// Spacecraft position (km) and velocity (km/s) in the geocentric frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OrbitState {
    pub time: f64,
    pub rsat: Vector3,
    pub vsat: Vector3,
}

impl OrbitState {
    pub fn new(time: f64, rsat: Vector3, vsat: Vector3) -> Self {
        Self { time, rsat, vsat }
    }

    /// Position extrapolated linearly by `dt` seconds.
    pub fn extrapolated_position(&self, dt: f64) -> Vector3 {
        self.rsat + self.vsat * dt
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RotationAxis {
    X,
    Y,
    Z,
}

/// Spacecraft attitude as three rotations applied in `order`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Attitude {
    pub roll: f64,
    pub pitch: f64,
    pub yaw: f64,
    pub order: [RotationAxis; 3],
}

impl Default for Attitude {
    fn default() -> Self {
        Self {
            roll: 0.0,
            pitch: 0.0,
            yaw: 0.0,
            order: [RotationAxis::Y, RotationAxis::X, RotationAxis::Z],
        }
    }
}

impl Attitude {
    pub fn new(roll: f64, pitch: f64, yaw: f64, order: [RotationAxis; 3]) -> Self {
        Self {
            roll,
            pitch,
            yaw,
            order,
        }
    }

    fn angle(&self, axis: RotationAxis) -> f64 {
        match axis {
            RotationAxis::X => self.roll,
            RotationAxis::Y => self.pitch,
            RotationAxis::Z => self.yaw,
        }
    }

    /// Switch from the nominal spacecraft frame into the attitude-perturbed body frame.
    pub fn switch(&self) -> CoordinateSwitch {
        self.order
            .iter()
            .fold(CoordinateSwitch::identity(), |switch, &axis| {
                switch.then(&CoordinateSwitch::from_matrix(frame_rotation(
                    axis,
                    self.angle(axis),
                )))
            })
    }
}

/// Passive rotation of a frame about one of its axes.
pub(crate) fn frame_rotation(axis: RotationAxis, angle: f64) -> Matrix3<f64> {
    let (s, c) = angle.sin_cos();
    match axis {
        RotationAxis::X => Matrix3::new(1.0, 0.0, 0.0, 0.0, c, s, 0.0, -s, c),
        RotationAxis::Y => Matrix3::new(c, 0.0, -s, 0.0, 1.0, 0.0, s, 0.0, c),
        RotationAxis::Z => Matrix3::new(c, s, 0.0, -s, c, 0.0, 0.0, 0.0, 1.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn zero_attitude_is_identity() {
        let v = Vector3::new(1.0, 2.0, 3.0);
        assert_relative_eq!(Attitude::default().switch().forward(&v), v);
    }

    #[test]
    fn yaw_rotates_frame_about_z() {
        let attitude = Attitude::new(0.0, 0.0, FRAC_PI_2, Attitude::default().order);
        let v = attitude.switch().forward(&Vector3::new(1.0, 0.0, 0.0));
        // the old x-axis lies along the -y axis of the rotated frame
        assert_relative_eq!(v, Vector3::new(0.0, -1.0, 0.0), epsilon = 1e-12);
    }

    #[test]
    fn extrapolation() {
        let state = OrbitState::new(
            0.0,
            Vector3::new(7000.0, 0.0, 0.0),
            Vector3::new(0.0, 7.5, 0.0),
        );
        assert_relative_eq!(
            state.extrapolated_position(-6.0),
            Vector3::new(7000.0, -45.0, 0.0)
        );
    }
}
