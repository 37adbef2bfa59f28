use crate::engine::{GeophysicalModel, WindField, WindVector};
use crate::error;
use crate::util::Result;
use scatsim_datatypes::primitives::MeasType;
use serde::{Deserialize, Serialize};
use snafu::ensure;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UniformWind {
    pub wind: WindVector,
}

impl UniformWind {
    pub fn new(speed: f64, direction: f64) -> Self {
        Self {
            wind: WindVector { speed, direction },
        }
    }
}

impl WindField for UniformWind {
    fn wind_vector(&self, _lon: f64, _lat: f64) -> Option<WindVector> {
        Some(self.wind)
    }
}

/// Smooth Ku-band like model function
/// `sigma0 = a(θ) v^γ (1 + b1 cos χ + b2 cos 2χ)` with a decreasing with incidence.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnalyticGmf {
    /// Linear sigma0 at 45° incidence and 1 m/s.
    pub reference: f64,
    /// dB per degree of incidence
    pub incidence_slope: f64,
    pub speed_exponent: f64,
    pub upwind_downwind: f64,
    pub upwind_crosswind: f64,
}

impl Default for AnalyticGmf {
    fn default() -> Self {
        Self {
            reference: 10_f64.powf(-2.6),
            incidence_slope: -0.3,
            speed_exponent: 1.6,
            upwind_downwind: 0.1,
            upwind_crosswind: 0.4,
        }
    }
}

impl AnalyticGmf {
    fn polarization_scale(meas_type: MeasType) -> Option<f64> {
        match meas_type {
            MeasType::Vv => Some(1.0),
            MeasType::Hh => Some(0.7),
            MeasType::Vh | MeasType::Hv | MeasType::VvHvCorr | MeasType::HhVhCorr => Some(0.03),
            MeasType::CBandVv => Some(0.5),
            MeasType::CBandHh => Some(0.35),
            MeasType::None => None,
        }
    }
}

impl GeophysicalModel for AnalyticGmf {
    fn sigma0(
        &self,
        meas_type: MeasType,
        incidence_angle: f64,
        speed: f64,
        chi: f64,
    ) -> Result<f64> {
        let scale = Self::polarization_scale(meas_type).ok_or(error::Error::InvalidParameter {
            name: "measurement type",
            reason: format!("no model function for {meas_type}"),
        })?;
        ensure!(
            speed.is_finite(),
            error::InvalidParameter {
                name: "wind speed",
                reason: format!("{speed}")
            }
        );

        let incidence_db = self.incidence_slope * (incidence_angle.to_degrees() - 45.0);
        let amplitude = scale * self.reference * 10_f64.powf(0.1 * incidence_db);
        let harmonics =
            1.0 + self.upwind_downwind * chi.cos() + self.upwind_crosswind * (2.0 * chi).cos();
        Ok(amplitude * speed.max(0.0).powf(self.speed_exponent) * harmonics)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::approx_eq;
    use std::f64::consts::{FRAC_PI_2, PI};

    #[test]
    fn it_has_upwind_maximum() {
        let gmf = AnalyticGmf::default();
        let incidence = 46_f64.to_radians();
        let up = gmf.sigma0(MeasType::Vv, incidence, 10.0, 0.0).unwrap();
        let down = gmf.sigma0(MeasType::Vv, incidence, 10.0, PI).unwrap();
        let cross = gmf.sigma0(MeasType::Vv, incidence, 10.0, FRAC_PI_2).unwrap();
        assert!(up > down && down > cross);
        assert!(gmf.sigma0(MeasType::Hh, incidence, 10.0, 0.0).unwrap() < up);
    }

    #[test]
    fn calm_and_unknown() {
        let gmf = AnalyticGmf::default();
        assert!(approx_eq!(f64, gmf.sigma0(MeasType::Vv, 0.8, 0.0, 0.0).unwrap(), 0.0));
        assert!(gmf.sigma0(MeasType::None, 0.8, 5.0, 0.0).is_err());
        assert_eq!(
            UniformWind::new(7.0, 1.0).wind_vector(0.0, 0.0),
            Some(WindVector {
                speed: 7.0,
                direction: 1.0
            })
        );
    }
}
