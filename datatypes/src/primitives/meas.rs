use crate::error;
use crate::geometry::Vector3;
use crate::util::Result;
use serde::{Deserialize, Serialize};
use snafu::ensure;
use strum::{Display, EnumString};

/// Polarization or band of a measurement.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display, EnumString,
)]
pub enum MeasType {
    #[default]
    #[strum(serialize = "none")]
    None,
    #[strum(serialize = "VV")]
    Vv,
    #[strum(serialize = "HH")]
    Hh,
    #[strum(serialize = "VH")]
    Vh,
    #[strum(serialize = "HV")]
    Hv,
    #[strum(serialize = "VV_HV_CORR")]
    VvHvCorr,
    #[strum(serialize = "HH_VH_CORR")]
    HhVhCorr,
    #[strum(serialize = "C_BAND_VV")]
    CBandVv,
    #[strum(serialize = "C_BAND_HH")]
    CBandHh,
}

impl MeasType {
    pub fn is_cross_polarized(self) -> bool {
        matches!(
            self,
            Self::Vh | Self::Hv | Self::VvHvCorr | Self::HhVhCorr
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LandFlag {
    #[default]
    Ocean,
    Land,
    Ice,
    /// At least one integration cell of the footprint fell on land.
    LandInclusive,
}

impl LandFlag {
    pub fn code(self) -> u8 {
        match self {
            Self::Ocean => 0,
            Self::Land => 1,
            Self::Ice => 2,
            Self::LandInclusive => 3,
        }
    }
}

/// Quadratic parameterization of the Kpc variance of a sigma0 estimate.
///
/// `a` carries `1 + alpha` as in ground system products, so
/// `var(σ0) = (a - 1)·σ0² + b·σ0 + c`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KpcCoefficients {
    pub a: f64,
    pub b: f64,
    pub c: f64,
}

impl KpcCoefficients {
    pub fn new(a: f64, b: f64, c: f64) -> Self {
        Self { a, b, c }
    }

    pub fn variance(&self, sigma0: f64) -> f64 {
        ((self.a - 1.0) * sigma0 + self.b) * sigma0 + self.c
    }
}

/// One radar return sample.
///
/// Depending on the pipeline stage `value` holds a raw signal plus noise energy (L1A) or
/// a calibrated sigma0 (L1B).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Meas {
    pub value: f64,
    /// Calibration factor relating signal energy to sigma0.
    pub xk: f64,
    /// Noise energy attributed to this measurement.
    pub en_slice: f64,
    /// Receiver bandwidth of the measurement in Hz.
    pub bandwidth: f64,
    pub tx_pulse_width: f64,
    pub land_flag: LandFlag,
    /// Geocentric centroid in km.
    pub centroid: Vector3,
    pub meas_type: MeasType,
    pub incidence_angle: f64,
    /// Azimuth of the look direction, counter-clockwise from east.
    pub east_azimuth: f64,
    pub scan_angle: f64,
    pub beam_idx: usize,
    pub start_slice_idx: i32,
    pub num_slices: usize,
    /// Half power widths in km, filled in by the footprint integration.
    pub azimuth_width: f64,
    pub range_width: f64,
    pub kpc: Option<KpcCoefficients>,
}

impl Default for Meas {
    fn default() -> Self {
        Self {
            value: 0.0,
            xk: 0.0,
            en_slice: 0.0,
            bandwidth: 0.0,
            tx_pulse_width: 0.0,
            land_flag: LandFlag::Ocean,
            centroid: Vector3::zeros(),
            meas_type: MeasType::None,
            incidence_angle: 0.0,
            east_azimuth: 0.0,
            scan_angle: 0.0,
            beam_idx: 0,
            start_slice_idx: 0,
            num_slices: 1,
            azimuth_width: 0.0,
            range_width: 0.0,
            kpc: None,
        }
    }
}

impl Meas {
    /// Returns the calibration factor if it may be used as a divisor.
    pub fn checked_xk(&self) -> Result<f64> {
        ensure!(
            self.xk > 0.0 && self.xk.is_finite(),
            error::NonPositiveXFactor { xk: self.xk }
        );
        Ok(self.xk)
    }

    /// Centroids that were never placed on the earth are left at the origin.
    pub fn has_surface_centroid(&self) -> bool {
        self.centroid.norm() >= 1_000.0
    }
}

/// The measurements of one transmit/receive cycle.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MeasSpot {
    pub time: f64,
    pub sc_position: Vector3,
    pub sc_velocity: Vector3,
    pub measurements: Vec<Meas>,
}

impl MeasSpot {
    pub fn new(time: f64, sc_position: Vector3, sc_velocity: Vector3) -> Self {
        Self {
            time,
            sc_position,
            sc_velocity,
            measurements: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.measurements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.measurements.is_empty()
    }

    /// Sum of the measurement values, e.g. the total signal plus noise energy of a spot.
    pub fn total_value(&self) -> f64 {
        self.measurements.iter().map(|m| m.value).sum()
    }

    /// Combines all measurements into a single spot measurement. Energies and calibration
    /// factors add up, the geometry is taken as the `xk` weighted mean.
    pub fn composite(&self) -> Option<Meas> {
        let first = self.measurements.first()?;
        let xk: f64 = self.measurements.iter().map(|m| m.xk).sum();
        let weight = |m: &Meas| if xk > 0.0 { m.xk / xk } else { 1.0 / self.len() as f64 };

        let mut composite = first.clone();
        composite.value = self.total_value();
        composite.xk = xk;
        composite.en_slice = self.measurements.iter().map(|m| m.en_slice).sum();
        composite.bandwidth = self.measurements.iter().map(|m| m.bandwidth).sum();
        composite.num_slices = self.measurements.iter().map(|m| m.num_slices).sum();
        composite.centroid = self
            .measurements
            .iter()
            .map(|m| m.centroid * weight(m))
            .sum();
        composite.incidence_angle = self
            .measurements
            .iter()
            .map(|m| m.incidence_angle * weight(m))
            .sum();
        composite.land_flag = self
            .measurements
            .iter()
            .map(|m| m.land_flag)
            .find(|f| *f != LandFlag::Ocean)
            .unwrap_or(LandFlag::Ocean);
        composite.kpc = None;
        Some(composite)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::approx_eq;
    use std::str::FromStr;

    #[test]
    fn kpc_variance() {
        let kpc = KpcCoefficients::new(1.1, 0.02, 0.003);
        assert!(approx_eq!(f64, kpc.variance(2.0), 0.4 + 0.04 + 0.003, epsilon = 1e-12));
    }

    #[test]
    fn it_rejects_non_positive_xk() {
        let meas = Meas::default();
        assert!(meas.checked_xk().is_err());

        let meas = Meas {
            xk: 2.5,
            ..Meas::default()
        };
        assert!(approx_eq!(f64, meas.checked_xk().unwrap(), 2.5));
    }

    #[test]
    fn meas_type_strings() {
        assert_eq!(MeasType::from_str("HH").unwrap(), MeasType::Hh);
        assert_eq!(MeasType::VvHvCorr.to_string(), "VV_HV_CORR");
        assert!(MeasType::Hv.is_cross_polarized());
        assert!(!MeasType::Vv.is_cross_polarized());
    }

    #[test]
    fn composite_sums_energies() {
        let mut spot = MeasSpot::default();
        for i in 0..4 {
            spot.measurements.push(Meas {
                value: 1.0 + f64::from(i),
                xk: 2.0,
                en_slice: 0.5,
                centroid: Vector3::new(7000.0, f64::from(i), 0.0),
                land_flag: if i == 2 {
                    LandFlag::LandInclusive
                } else {
                    LandFlag::Ocean
                },
                ..Meas::default()
            });
        }

        let composite = spot.composite().unwrap();
        assert!(approx_eq!(f64, composite.value, 10.0));
        assert!(approx_eq!(f64, composite.xk, 8.0));
        assert!(approx_eq!(f64, composite.en_slice, 2.0));
        assert!(approx_eq!(f64, composite.centroid.y, 1.5));
        assert_eq!(composite.num_slices, 4);
        assert_eq!(composite.land_flag, LandFlag::LandInclusive);
        assert!(MeasSpot::default().composite().is_none());
    }
}
