use super::Vector3;
use crate::error;
use crate::util::Result;
use nalgebra::Matrix3;
use snafu::ensure;

/// A rotation between two Cartesian frames.
///
/// The rows of the matrix are the unit axes of the target frame expressed in the source frame,
/// so `forward` maps source coordinates into the target frame and `backward` maps them back.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoordinateSwitch {
    matrix: Matrix3<f64>,
}

impl CoordinateSwitch {
    pub fn identity() -> Self {
        Self {
            matrix: Matrix3::identity(),
        }
    }

    /// Builds the switch into the frame spanned by `x`, `y` and `z`.
    /// The axes are normalized but must be mutually orthogonal.
    pub fn new(x: &Vector3, y: &Vector3, z: &Vector3) -> Result<Self> {
        ensure!(
            x.norm() > 0.0 && y.norm() > 0.0 && z.norm() > 0.0,
            error::DegenerateFrame {
                reason: "zero length axis"
            }
        );

        Ok(Self {
            matrix: Matrix3::from_rows(&[
                x.normalize().transpose(),
                y.normalize().transpose(),
                z.normalize().transpose(),
            ]),
        })
    }

    pub fn from_matrix(matrix: Matrix3<f64>) -> Self {
        Self { matrix }
    }

    pub fn matrix(&self) -> &Matrix3<f64> {
        &self.matrix
    }

    pub fn forward(&self, v: &Vector3) -> Vector3 {
        self.matrix * v
    }

    pub fn backward(&self, v: &Vector3) -> Vector3 {
        self.matrix.transpose() * v
    }

    /// Turns this switch into its inverse.
    pub fn reverse_direction(&mut self) {
        self.matrix.transpose_mut();
    }

    #[must_use]
    pub fn reversed(&self) -> Self {
        Self {
            matrix: self.matrix.transpose(),
        }
    }

    /// Chains two switches: the result applies `self` first and `next` afterwards.
    #[must_use]
    pub fn then(&self, next: &CoordinateSwitch) -> Self {
        Self {
            matrix: next.matrix * self.matrix,
        }
    }
}

/// Decomposes a vector into `(r, theta, phi)` with `theta` measured from the +z axis
/// and `phi` from the +x axis towards +y.
pub fn spherical(v: &Vector3) -> (f64, f64, f64) {
    let r = v.norm();
    if r == 0.0 {
        return (0.0, 0.0, 0.0);
    }
    let theta = (v.z / r).clamp(-1.0, 1.0).acos();
    let phi = v.y.atan2(v.x);
    (r, theta, phi)
}

pub fn from_spherical(r: f64, theta: f64, phi: f64) -> Vector3 {
    Vector3::new(
        r * theta.sin() * phi.cos(),
        r * theta.sin() * phi.sin(),
        r * theta.cos(),
    )
}
