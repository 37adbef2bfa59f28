use crate::engine::Antenna;
use crate::error::Error;
use crate::util::Result;
use scatsim_datatypes::constants::SPEED_LIGHT_KPS;
use scatsim_datatypes::error::Error as DataTypeError;
use scatsim_datatypes::geometry::{CoordinateSwitch, Vector3, geocentric_to_geodetic, spherical};
use scatsim_datatypes::primitives::{InstrumentParameters, InstrumentState, Meas};
use scatsim_datatypes::tables::{BYU_SLICES, ByuXTable, Stable, Topo, XTable, rel_to_abs_slice, topo_delta_f};
use std::f64::consts::PI;

/// Range and antenna frame angles from the spacecraft to a target.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LookAngles {
    /// km
    pub range: f64,
    pub theta: f64,
    pub phi: f64,
    /// s
    pub round_trip_time: f64,
}

impl LookAngles {
    pub fn new(gc_to_antenna: &CoordinateSwitch, rsat: &Vector3, target: &Vector3) -> Self {
        let rlook = target - rsat;
        let range = rlook.norm();
        let (_, theta, phi) = spherical(&gc_to_antenna.forward(&rlook));
        Self {
            range,
            theta,
            phi,
            round_trip_time: 2.0 * range / SPEED_LIGHT_KPS,
        }
    }
}

fn radar_equation(ptgr: f64, gat_gar: f64, params: &InstrumentParameters, range: f64) -> f64 {
    let lambda = params.wavelength();
    ptgr * gat_gar * lambda * lambda / (64.0 * PI.powi(3) * range.powi(4) * params.system_loss)
}

/// Radar equation constant `PtGr λ² Tp Np / (64 π³ L_sys)` of a burst. Times the integral
/// of `G² · response / R⁴` over a pixel it gives the pixel's X.
pub fn burst_radar_constant(params: &InstrumentParameters, ptgr: f64) -> f64 {
    let lambda = params.wavelength();
    ptgr * lambda * lambda * params.tx_pulse_width * params.num_pulses.max(1) as f64
        / (64.0 * PI.powi(3) * params.system_loss)
}

/// Radar equation factor `Pt Gr GatGar λ² / (64 π³ R⁴ L_sys)` at the measurement centroid.
///
/// `None` if the centroid lies outside of the antenna pattern.
pub fn radar_x(
    gc_to_antenna: &CoordinateSwitch,
    rsat: &Vector3,
    antenna: &dyn Antenna,
    state: &InstrumentState,
    meas: &Meas,
) -> Option<f64> {
    let params = &state.params;
    radar_x_ptgr(
        gc_to_antenna,
        rsat,
        antenna,
        state,
        meas,
        params.transmit_power * params.rx_gain_echo,
    )
}

/// [`radar_x`] with a given transmit power receiver gain product.
pub fn radar_x_ptgr(
    gc_to_antenna: &CoordinateSwitch,
    rsat: &Vector3,
    antenna: &dyn Antenna,
    state: &InstrumentState,
    meas: &Meas,
    ptgr: f64,
) -> Option<f64> {
    let look = LookAngles::new(gc_to_antenna, rsat, &meas.centroid);
    let gat_gar = antenna.power_gain_product(
        state.beam_idx,
        look.theta,
        look.phi,
        look.round_trip_time,
        state.params.spin_rate,
    )?;
    Some(radar_equation(ptgr, gat_gar, &state.params, look.range))
}

/// Calibration factor from the loopback signal energy,
/// `G² λ² / (64 π³) · (L23 Lcalop / L13 / L21) / bias · Es_cal`.
pub fn radar_xcal(params: &InstrumentParameters, beam_idx: usize, es_cal: f64) -> Result<f64> {
    let beam = params.beam(beam_idx).ok_or(DataTypeError::InvalidBeam {
        beam: beam_idx,
        beams: params.beams.len(),
    })?;
    let lambda = params.wavelength();
    Ok(beam.peak_gain * beam.peak_gain * lambda * lambda / (64.0 * PI.powi(3))
        * (params.loss_l23 * params.loss_calop / params.loss_l13 / params.loss_l21)
        / params.calibration_bias
        * es_cal)
}

/// Loopback signal energy of a pulse with the given transmit power receiver gain product.
pub fn loopback_es_cal(params: &InstrumentParameters, ptgr: f64) -> f64 {
    ptgr * params.loss_l21 / params.calibration_bias / params.loss_l23 / params.loss_calop
        * params.tx_pulse_width
}

/// Loopback signal energy for the true transmit power receiver gain product.
pub fn true_es_cal(params: &InstrumentParameters) -> f64 {
    loopback_es_cal(params, params.transmit_power * params.rx_gain_echo)
}

/// How the calibration factor of a measurement is obtained.
#[derive(Debug, Clone)]
pub enum XFactorStrategy {
    /// Radar equation at the centroid.
    Direct,
    /// Radar equation corrected by a K factor table.
    KFactor(XTable),
    /// Polynomial X tables in normalized Doppler offset, scaled by `Xcal`.
    ByuTable(ByuXTable),
    /// Ground system X table of one instrument mode, evaluated like the BYU tables.
    GsTable(ByuXTable),
}

/// Terrain correction of the Doppler offset.
#[derive(Debug, Clone)]
pub struct TopoCorrection {
    pub topo: Topo,
    pub stable: Stable,
}

/// Everything the X factor of a single measurement depends on.
#[derive(Clone, Copy)]
pub struct XFactorInput<'a> {
    pub state: &'a InstrumentState,
    pub gc_to_antenna: &'a CoordinateSwitch,
    pub rsat: &'a Vector3,
    pub antenna: &'a dyn Antenna,
    pub meas: &'a Meas,
    /// Measured loopback energy, used by the table strategies.
    pub es_cal: f64,
    /// Doppler offset of the measurement from the slice center, Hz.
    pub delta_freq: f64,
}

#[derive(Debug, Clone)]
pub struct XFactorEngine {
    strategy: XFactorStrategy,
    topo: Option<TopoCorrection>,
}

impl XFactorEngine {
    pub fn new(strategy: XFactorStrategy) -> Self {
        Self {
            strategy,
            topo: None,
        }
    }

    #[must_use]
    pub fn with_topo_correction(mut self, topo: TopoCorrection) -> Self {
        self.topo = Some(topo);
        self
    }

    pub fn strategy(&self) -> &XFactorStrategy {
        &self.strategy
    }

    /// K factor of a measurement, 1 unless a K factor table is configured.
    pub fn k_factor(&self, state: &InstrumentState, meas: &Meas) -> Result<f64> {
        match &self.strategy {
            XFactorStrategy::KFactor(table) => Ok(table.retrieve_by_relative_slice(
                state.beam_idx,
                state.antenna_azimuth,
                meas.start_slice_idx,
            )?),
            _ => Ok(1.0),
        }
    }

    /// Total calibration factor of a measurement in units of energy.
    ///
    /// `None` if the radar equation strategies find no antenna gain at the centroid.
    pub fn compute_x(&self, input: &XFactorInput<'_>) -> Result<Option<f64>> {
        let state = input.state;
        let tx_pulse_width = state.params.tx_pulse_width;
        match &self.strategy {
            XFactorStrategy::Direct | XFactorStrategy::KFactor(_) => {
                let k = self.k_factor(state, input.meas)?;
                Ok(radar_x(
                    input.gc_to_antenna,
                    input.rsat,
                    input.antenna,
                    state,
                    input.meas,
                )
                .map(|x| x * k * tx_pulse_width))
            }
            XFactorStrategy::ByuTable(table) | XFactorStrategy::GsTable(table) => {
                let slice = rel_to_abs_slice(input.meas.start_slice_idx, BYU_SLICES).ok_or(
                    Error::from(DataTypeError::InvalidSlice {
                        slice: input.meas.start_slice_idx,
                        slices: BYU_SLICES,
                    }),
                )?;
                let delta_freq = input.delta_freq + self.topo_offset(state, input.meas)?;
                let x = table.get_x(
                    state.beam_idx,
                    state.antenna_azimuth,
                    state.orbit_fraction,
                    slice,
                    delta_freq,
                )?;
                Ok(Some(x * radar_xcal(&state.params, state.beam_idx, input.es_cal)?))
            }
        }
    }

    fn topo_offset(&self, state: &InstrumentState, meas: &Meas) -> Result<f64> {
        let Some(correction) = &self.topo else {
            return Ok(0.0);
        };
        let Some((_, lon, lat)) = geocentric_to_geodetic(&meas.centroid) else {
            return Ok(0.0);
        };
        Ok(topo_delta_f(
            &correction.topo,
            &correction.stable,
            state.beam_idx,
            state.orbit_fraction,
            state.antenna_azimuth,
            state.mode,
            lon,
            lat,
        )?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::GaussianAntenna;
    use approx::assert_relative_eq;
    use scatsim_datatypes::geometry::{
        VelocityFrame, earth_intersection, from_spherical, gc_to_antenna, geodetic_to_geocentric,
    };
    use scatsim_datatypes::primitives::{Attitude, OrbitState};
    use scatsim_datatypes::tables::{OrbitAzimuthGrid, PolynomialOrder, Table};
    use scatsim_datatypes::util::test::TestDefault;

    struct Fixture {
        state: InstrumentState,
        orbit: OrbitState,
        switch: CoordinateSwitch,
        antenna: GaussianAntenna,
        meas: Meas,
    }

    fn fixture() -> Fixture {
        let state = InstrumentState::test_default();
        let orbit = OrbitState::new(
            0.0,
            geodetic_to_geocentric(800.0, 0.0, 0.0),
            Vector3::new(0.0, 0.0, 7.4),
        );
        let switch = gc_to_antenna(
            &orbit,
            VelocityFrame::Inertial,
            &Attitude::default(),
            state.antenna_azimuth,
        )
        .unwrap();
        let antenna = GaussianAntenna::new(state.params.beams.to_vec());
        let beam = state.params.beams[0];
        let look = switch.backward(&from_spherical(1.0, beam.look_angle, beam.azimuth_offset));
        let meas = Meas {
            centroid: earth_intersection(&orbit.rsat, &look).unwrap(),
            start_slice_idx: -1,
            ..Meas::default()
        };
        Fixture {
            state,
            orbit,
            switch,
            antenna,
            meas,
        }
    }

    #[test]
    fn radar_equation_at_boresight() {
        let f = fixture();
        let x = radar_x(&f.switch, &f.orbit.rsat, &f.antenna, &f.state, &f.meas).unwrap();

        let params = &f.state.params;
        let range = (f.meas.centroid - f.orbit.rsat).norm();
        let look = LookAngles::new(&f.switch, &f.orbit.rsat, &f.meas.centroid);
        assert_relative_eq!(look.theta, params.beams[0].look_angle, epsilon = 1e-9);

        let gat_gar = f
            .antenna
            .power_gain_product(0, look.theta, look.phi, look.round_trip_time, params.spin_rate)
            .unwrap();
        let lambda = params.wavelength();
        let expected = params.transmit_power * params.rx_gain_echo * gat_gar * lambda * lambda
            / (64.0 * PI.powi(3) * range.powi(4) * params.system_loss);
        assert_relative_eq!(x, expected, max_relative = 1e-12);

        let half = radar_x_ptgr(
            &f.switch,
            &f.orbit.rsat,
            &f.antenna,
            &f.state,
            &f.meas,
            0.5 * params.transmit_power * params.rx_gain_echo,
        )
        .unwrap();
        assert_relative_eq!(half, 0.5 * x, max_relative = 1e-12);
    }

    #[test]
    fn xcal_of_the_true_loopback_energy() {
        let params = InstrumentParameters::test_default();
        let es_cal = true_es_cal(&params);
        assert_relative_eq!(
            es_cal,
            params.transmit_power * params.rx_gain_echo * params.loss_l21 / params.loss_l23
                * params.tx_pulse_width,
            max_relative = 1e-12
        );

        // with the true loopback energy Xcal reduces to Pt Gr Tp G² λ² / (64 π³ L13)
        let xcal = radar_xcal(&params, 1, es_cal).unwrap();
        let lambda = params.wavelength();
        let expected = params.transmit_power
            * params.rx_gain_echo
            * params.tx_pulse_width
            * params.beams[1].peak_gain.powi(2)
            * lambda
            * lambda
            / (64.0 * PI.powi(3) * params.loss_l13);
        assert_relative_eq!(xcal, expected, max_relative = 1e-12);
        assert!(radar_xcal(&params, 2, es_cal).is_err());
    }

    #[test]
    fn strategies() {
        let f = fixture();
        let input = XFactorInput {
            state: &f.state,
            gc_to_antenna: &f.switch,
            rsat: &f.orbit.rsat,
            antenna: &f.antenna,
            meas: &f.meas,
            es_cal: true_es_cal(&f.state.params),
            delta_freq: 0.0,
        };

        let direct = XFactorEngine::new(XFactorStrategy::Direct)
            .compute_x(&input)
            .unwrap()
            .unwrap();
        let x = radar_x(&f.switch, &f.orbit.rsat, &f.antenna, &f.state, &f.meas).unwrap();
        assert_relative_eq!(direct, x * f.state.params.tx_pulse_width, max_relative = 1e-12);

        let grid = OrbitAzimuthGrid::default();
        let zeros = Table::new_filled([BYU_SLICES, 5, grid.orbit_bins, grid.azimuth_bins], 0.0);
        let table =
            ByuXTable::from_tables(grid, PolynomialOrder::Third, vec![zeros.clone(), zeros]).unwrap();
        let byu = XFactorEngine::new(XFactorStrategy::ByuTable(table))
            .compute_x(&input)
            .unwrap()
            .unwrap();
        let xcal = radar_xcal(&f.state.params, 0, input.es_cal).unwrap();
        assert_relative_eq!(byu, xcal, max_relative = 1e-12);

        // relative slice 0 does not exist
        let unsliced = Meas {
            start_slice_idx: 0,
            ..f.meas.clone()
        };
        let engine = XFactorEngine::new(XFactorStrategy::ByuTable(
            ByuXTable::from_tables(OrbitAzimuthGrid::default(), PolynomialOrder::Third, vec![])
                .unwrap(),
        ));
        assert!(
            engine
                .compute_x(&XFactorInput {
                    meas: &unsliced,
                    ..input
                })
                .is_err()
        );
        assert_relative_eq!(
            XFactorEngine::new(XFactorStrategy::Direct)
                .k_factor(&f.state, &f.meas)
                .unwrap(),
            1.0
        );
    }
}
