use crate::engine::Antenna;
use scatsim_datatypes::primitives::BeamInfo;
use serde::{Deserialize, Serialize};
use std::f64::consts::{LN_2, PI, TAU};

/// Elliptical Gaussian beams whose one-way 3 dB widths come from [`BeamInfo`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GaussianAntenna {
    pub beams: Vec<BeamInfo>,
}

impl GaussianAntenna {
    pub fn new(beams: Vec<BeamInfo>) -> Self {
        Self { beams }
    }
}

impl Antenna for GaussianAntenna {
    fn num_beams(&self) -> usize {
        self.beams.len()
    }

    fn electrical_boresight(&self, beam: usize) -> Option<(f64, f64)> {
        self.beams
            .get(beam)
            .map(|b| (b.look_angle, b.azimuth_offset))
    }

    fn power_gain(&self, beam: usize, theta: f64, phi: f64) -> Option<f64> {
        let info = self.beams.get(beam)?;
        let elevation = (theta - info.look_angle) / info.elevation_beamwidth;
        let delta_phi = (phi - info.azimuth_offset + PI).rem_euclid(TAU) - PI;
        let azimuth = delta_phi * theta.sin() / info.azimuth_beamwidth;
        Some(info.peak_gain * (-4.0 * LN_2 * (elevation * elevation + azimuth * azimuth)).exp())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use scatsim_datatypes::primitives::InstrumentParameters;
    use scatsim_datatypes::util::test::TestDefault;

    #[test]
    fn half_power_at_the_beamwidth_edge() {
        let params = InstrumentParameters::test_default();
        let antenna = GaussianAntenna::new(params.beams.to_vec());
        let beam = params.beams[0];

        let (theta, phi) = antenna.electrical_boresight(0).unwrap();
        let peak = antenna.power_gain(0, theta, phi).unwrap();
        assert_relative_eq!(peak, beam.peak_gain);

        let edge = antenna
            .power_gain(0, theta + beam.elevation_beamwidth / 2.0, phi)
            .unwrap();
        assert_relative_eq!(edge / peak, 0.5, epsilon = 1e-12);
        assert!(antenna.power_gain(2, theta, phi).is_none());
    }

    #[test]
    fn spinning_reduces_the_gain_product() {
        let params = InstrumentParameters::test_default();
        let antenna = GaussianAntenna::new(params.beams.to_vec());
        let (theta, phi) = antenna.electrical_boresight(1).unwrap();

        let still = antenna.power_gain_product(1, theta, phi, 0.0, 0.0).unwrap();
        let spinning = antenna
            .power_gain_product(1, theta, phi, 6.0e-3, params.spin_rate)
            .unwrap();
        assert_relative_eq!(still, params.beams[1].peak_gain.powi(2));
        assert!(spinning < still);
    }
}
