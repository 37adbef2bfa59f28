//! Simulation of the measurements of one spot by integrating the backscatter of the surface
//! over the point target response of every measurement.

mod geometry;
mod grid;
mod integrator;
mod surface;

pub use geometry::{PixelLayout, SpotGeometry, locate_pixels};
pub use grid::{CellValue, GridSums, IntegrationGrid, PointTargetResponse};
pub use integrator::{FootprintIntegrator, SpotContext};
pub(crate) use integrator::{Screen, Screening};
pub use surface::{KpmField, KpmMode, Look, SurfaceModel, SurfaceOptions, SurfaceSample};

use scatsim_datatypes::primitives::{Meas, MeasSpot};
use serde::{Deserialize, Serialize};
use strum::Display;

/// Below this signal to noise ratio the noise energy falls back to the thermal floor and
/// no Kpc noise is added.
pub const SNR_CUTOFF: f64 = 1.0e-3;

/// Tuning of the footprint integration. Lengths are in km, gains and ratios linear.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntegrationParameters {
    pub step_size: f64,
    pub range_width_factor: f64,
    pub azimuth_width_factor: f64,
    pub max_range_bins: usize,
    pub max_azimuth_bins: usize,
    /// Constant point target response over the range looks instead of Gaussians.
    pub boxcar: bool,
    pub integrate_ambiguities: bool,
    /// One-way gain relative to the peak below which measurements are dropped.
    pub min_one_way_gain: f64,
    pub min_signal_to_ambiguity_ratio: f64,
    /// Largest share of X that may come from land.
    pub land_fraction_threshold: f64,
    pub sim_all_land: bool,
    pub range_ground_width_max: f64,
    pub azimuth_ground_width_max: f64,
    pub range_resolution: f64,
    pub azimuth_resolution: f64,
    /// Debugging aid: store the total ambiguity ratio instead of the measurement value.
    pub replace_value_with_ambiguity_ratio: bool,
}

impl Default for IntegrationParameters {
    fn default() -> Self {
        Self {
            step_size: 0.5,
            range_width_factor: 2.0,
            azimuth_width_factor: 2.0,
            max_range_bins: 200,
            max_azimuth_bins: 100,
            boxcar: false,
            integrate_ambiguities: false,
            min_one_way_gain: 10_f64.powf(-0.3),
            min_signal_to_ambiguity_ratio: 10.0,
            land_fraction_threshold: 0.10,
            sim_all_land: false,
            range_ground_width_max: 50.0,
            azimuth_ground_width_max: 40.0,
            range_resolution: 2.0,
            azimuth_resolution: 2.0,
            replace_value_with_ambiguity_ratio: false,
        }
    }
}

/// When measurements that fail a quality check are dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RejectionPolicy {
    /// Produce calibrated sigma0 right away and drop bad measurements now.
    #[default]
    RejectNow,
    /// Produce L1A energies for every measurement. The L1B conversion applies the checks.
    DeferToL1b,
}

impl RejectionPolicy {
    pub fn rejects_now(self) -> bool {
        self == Self::RejectNow
    }
}

/// Why a measurement was dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[strum(serialize_all = "snake_case")]
pub enum Rejection {
    OffSurface,
    OverLand,
    LowGain,
    NoAntennaGain,
    OutsideProcessingWindow,
    PartialAmbiguity,
    PoorAmbiguityIsolation,
    OutsideSwath,
    LandContamination,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MeasOutcome {
    Keep(Meas),
    Reject(Rejection),
}

/// Replaces the measurements of `spot` by their outcomes, in order, dropping the rejected.
pub fn apply_outcomes(spot: &mut MeasSpot, outcomes: Vec<MeasOutcome>) -> Vec<Rejection> {
    let mut rejections = Vec::new();
    let mut outcomes = outcomes.into_iter();
    spot.measurements.retain_mut(|meas| match outcomes.next() {
        Some(MeasOutcome::Keep(updated)) => {
            *meas = updated;
            true
        }
        Some(MeasOutcome::Reject(rejection)) => {
            rejections.push(rejection);
            false
        }
        None => false,
    });
    rejections
}
