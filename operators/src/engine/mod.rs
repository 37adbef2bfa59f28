//! Narrow interfaces to the collaborators of the simulation core.
//!
//! Wind fields, model functions, land masks, ephemerides and antenna patterns are
//! supplied from outside. The [`crate::mock`] module holds reference implementations.

use crate::util::Result;
use scatsim_datatypes::primitives::{MeasType, OrbitState};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct WindVector {
    /// m/s
    pub speed: f64,
    /// Direction the wind blows towards, counter-clockwise from east in rad.
    pub direction: f64,
}

pub trait WindField: Send + Sync {
    /// `None` where the field has no data, which is treated as calm.
    fn wind_vector(&self, lon: f64, lat: f64) -> Option<WindVector>;
}

/// Geophysical model function relating wind to backscatter.
pub trait GeophysicalModel: Send + Sync {
    /// Linear sigma0. `chi` is the wind direction relative to the look direction, 0 when
    /// the wind blows towards the spacecraft.
    fn sigma0(&self, meas_type: MeasType, incidence_angle: f64, speed: f64, chi: f64)
    -> Result<f64>;
}

pub trait LandMap: Send + Sync {
    fn is_land(&self, lon: f64, lat: f64) -> bool;
}

pub trait Ephemeris: Send + Sync {
    fn orbit_state(&self, time: f64) -> Result<OrbitState>;

    /// s
    fn orbit_period(&self) -> f64;

    /// Seconds since the most recent ascending node crossing.
    fn time_since_ascending_node(&self, time: f64) -> f64;

    fn orbit_fraction(&self, time: f64) -> f64 {
        (self.time_since_ascending_node(time) / self.orbit_period()).rem_euclid(1.0)
    }
}

/// Antenna power patterns. Angles are spherical angles in the antenna frame.
pub trait Antenna: Send + Sync {
    fn num_beams(&self) -> usize;

    /// `(theta, phi)` of the gain maximum.
    fn electrical_boresight(&self, beam: usize) -> Option<(f64, f64)>;

    /// One-way power gain, `None` outside of the pattern.
    fn power_gain(&self, beam: usize, theta: f64, phi: f64) -> Option<f64>;

    /// Two-way gain of a pulse that left along `(theta, phi)`. The antenna keeps spinning
    /// during the round trip, so the echo is received at an azimuth lagging by
    /// `spin_rate * round_trip_time`.
    fn power_gain_product(
        &self,
        beam: usize,
        theta: f64,
        phi: f64,
        round_trip_time: f64,
        spin_rate: f64,
    ) -> Option<f64> {
        let transmit = self.power_gain(beam, theta, phi)?;
        let receive = self.power_gain(beam, theta, phi - spin_rate * round_trip_time)?;
        Some(transmit * receive)
    }
}

/// Surface rain effect `sigma0 / attenuation + backscatter`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RainContamination {
    pub attenuation: f64,
    pub backscatter: f64,
}

impl RainContamination {
    pub fn apply(&self, sigma0: f64) -> f64 {
        sigma0 / self.attenuation + self.backscatter
    }
}

pub trait RainField: Send + Sync {
    /// Volumetric fields need the three dimensional rain integration.
    fn is_three_dimensional(&self) -> bool {
        false
    }

    /// `None` where it does not rain.
    fn contamination(&self, lon: f64, lat: f64, incidence_angle: f64) -> Option<RainContamination>;
}
