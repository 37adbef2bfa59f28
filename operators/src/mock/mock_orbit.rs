use crate::engine::Ephemeris;
use crate::error;
use crate::util::Result;
use scatsim_datatypes::constants::EARTH_EQUATORIAL_RADIUS;
use scatsim_datatypes::geometry::Vector3;
use scatsim_datatypes::primitives::OrbitState;
use serde::{Deserialize, Serialize};
use snafu::ensure;
use std::f64::consts::TAU;

/// km³/s²
const EARTH_GRAVITATIONAL_PARAMETER: f64 = 398_600.4418;

/// Keplerian circular orbit, time 0 at the ascending node.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CircularOrbit {
    /// km
    pub radius: f64,
    pub inclination: f64,
    pub ascending_node_longitude: f64,
    /// s
    pub period: f64,
}

impl CircularOrbit {
    pub fn new(altitude: f64, inclination: f64, ascending_node_longitude: f64) -> Result<Self> {
        ensure!(
            altitude > 0.0,
            error::InvalidParameter {
                name: "altitude",
                reason: format!("{altitude} km is below the surface")
            }
        );
        let radius = EARTH_EQUATORIAL_RADIUS + altitude;
        Ok(Self {
            radius,
            inclination,
            ascending_node_longitude,
            period: TAU * (radius.powi(3) / EARTH_GRAVITATIONAL_PARAMETER).sqrt(),
        })
    }

    /// 800 km, 98.6°, ascending node at 0° longitude.
    pub fn quikscat_like() -> Self {
        Self {
            radius: EARTH_EQUATORIAL_RADIUS + 800.0,
            inclination: 98.6_f64.to_radians(),
            ascending_node_longitude: 0.0,
            period: 6_060.0,
        }
    }
}

impl Ephemeris for CircularOrbit {
    fn orbit_state(&self, time: f64) -> Result<OrbitState> {
        let rate = TAU / self.period;
        let (sin_u, cos_u) = (rate * time).sin_cos();
        let (sin_i, cos_i) = self.inclination.sin_cos();
        let (sin_o, cos_o) = self.ascending_node_longitude.sin_cos();

        let position = |s: f64, c: f64| {
            Vector3::new(
                cos_o * c - sin_o * s * cos_i,
                sin_o * c + cos_o * s * cos_i,
                s * sin_i,
            )
        };
        let rsat = position(sin_u, cos_u) * self.radius;
        let vsat = position(cos_u, -sin_u) * (self.radius * rate);
        Ok(OrbitState::new(time, rsat, vsat))
    }

    fn orbit_period(&self) -> f64 {
        self.period
    }

    fn time_since_ascending_node(&self, time: f64) -> f64 {
        time.rem_euclid(self.period)
    }
}
