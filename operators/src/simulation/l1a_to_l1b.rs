use super::scatsim::{SimulatedEvent, SimulatedSpot};
use crate::error;
use crate::footprint::{
    FootprintIntegrator, MeasOutcome, Rejection, RejectionPolicy, Screen, SpotContext,
    SpotGeometry, apply_outcomes,
};
use crate::radar::{
    KpcModel, LoadEnergies, LoopbackEnergies, SpotEnergies, XFactorInput, burst_radar_constant,
    compute_sigma0, er_to_es, loopback_es_cal,
};
use crate::util::Result;
use scatsim_datatypes::geometry::{VelocityFrame, geocentric_to_geodetic};
use scatsim_datatypes::primitives::{LandFlag, Meas, MeasSpot, OrbitState};
use snafu::OptionExt;
use tracing::debug;

/// Most recent calibration pulses seen in the L1A stream.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CalibrationPulses {
    pub loopback: Option<LoopbackEnergies>,
    pub load: Option<LoadEnergies>,
}

impl CalibrationPulses {
    /// Remembers the energies of calibration events. Spots are ignored.
    pub fn update(&mut self, event: &SimulatedEvent) {
        match event {
            SimulatedEvent::Loopback { energies, .. } => self.loopback = Some(*energies),
            SimulatedEvent::Load { energies, .. } => self.load = Some(*energies),
            SimulatedEvent::Spot(_) => {}
        }
    }
}

/// Loopback signal energy and the transmit power receiver gain product derived from it.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Calibration {
    es_cal: f64,
    ptgr: f64,
    load: LoadEnergies,
}

/// Turns the energies of an L1A spot into sigma0 measurements, applying the quality checks
/// the simulation deferred.
#[derive(Debug, Clone)]
pub struct L1aToL1b {
    integrator: FootprintIntegrator,
    velocity_frame: VelocityFrame,
}

impl L1aToL1b {
    pub fn new(integrator: FootprintIntegrator, velocity_frame: VelocityFrame) -> Self {
        Self {
            integrator,
            velocity_frame,
        }
    }

    fn calibrate(&self, simulated: &SimulatedSpot, pulses: &CalibrationPulses) -> Result<Calibration> {
        let time = simulated.state.time;
        let loopback = pulses.loopback.context(error::MissingCalibration { time })?;
        let load = pulses.load.context(error::MissingCalibration { time })?;
        let params = &simulated.state.params;

        let es_cal = er_to_es(
            params.channel_gain_ratio(),
            loopback.esn_echo,
            loopback.esn_echo,
            loopback.esn_noise,
            &load,
            1,
        )?
        .es;
        Ok(Calibration {
            es_cal,
            ptgr: es_cal / loopback_es_cal(params, 1.0),
            load,
        })
    }

    /// Converts one spot. Returns the surviving measurements and the reasons the others
    /// were dropped.
    pub fn convert_spot(
        &self,
        simulated: &SimulatedSpot,
        pulses: &CalibrationPulses,
    ) -> Result<(MeasSpot, Vec<Rejection>)> {
        let calibration = self.calibrate(simulated, pulses)?;
        let esn_noise = simulated.esn_noise.context(error::InvalidParameter {
            name: "noise channel energy",
            reason: format!("spot {} has no noise channel energy", simulated.index),
        })?;

        let mut spot = simulated.spot.clone();
        let energies = SpotEnergies {
            esn_echo: spot.total_value(),
            esn_noise,
            load: calibration.load,
            num_slices: spot.len(),
        };

        let orbit = OrbitState::new(spot.time, spot.sc_position, spot.sc_velocity);
        let state = &simulated.state;
        let geometry = SpotGeometry::new(
            &orbit,
            &simulated.attitude,
            state,
            self.integrator.antenna(),
            self.velocity_frame,
        )?;
        let context = SpotContext {
            index: simulated.index,
            orbit: &orbit,
            state,
            geometry: &geometry,
            es_cal: calibration.es_cal,
        };

        let outcomes = spot
            .measurements
            .iter()
            .map(|meas| {
                if self.integrator.high_resolution() {
                    self.convert_pixel(&context, &calibration, &energies, meas.clone())
                } else {
                    self.convert_slice(&context, &energies, meas.clone())
                }
            })
            .collect::<Result<Vec<_>>>()?;
        let rejections = apply_outcomes(&mut spot, outcomes);

        debug!(
            spot = simulated.index,
            kept = spot.len(),
            rejected = rejections.len(),
            ptgr = calibration.ptgr,
            "converted spot to L1B"
        );
        Ok((spot, rejections))
    }

    /// Synthetic aperture pixel: X from the processed response integrated over the antenna
    /// pattern with the calibrated transmit power receiver gain product.
    fn convert_pixel(
        &self,
        context: &SpotContext<'_>,
        calibration: &Calibration,
        energies: &SpotEnergies,
        mut meas: Meas,
    ) -> Result<MeasOutcome> {
        let params = &context.state.params;
        let integration = self.integrator.params();
        let screening = match self
            .integrator
            .screen(context, &mut meas, RejectionPolicy::RejectNow)?
        {
            Screen::Pass(screening) => screening,
            Screen::Reject(rejection) => return Ok(MeasOutcome::Reject(rejection)),
            Screen::Placeholder => return Ok(MeasOutcome::Reject(Rejection::OffSurface)),
        };

        let (grid, response) = self.integrator.pixel_grid(params, &screening)?;
        let surface = self.integrator.surface();
        let sim_coast = surface.options().sim_coast;
        let sums = self.integrator.integrate_grid(
            context,
            &grid,
            response,
            &screening,
            |lon, lat| Ok((0.0, sim_coast && surface.is_land(lon, lat))),
        )?;

        if sums.x_land > 0.0 {
            meas.land_flag = LandFlag::LandInclusive;
        }
        if !integration.sim_all_land
            && sums.xk > 0.0
            && sums.x_land / sums.xk >= integration.land_fraction_threshold
        {
            return Ok(MeasOutcome::Reject(Rejection::LandContamination));
        }

        let xk = sums.xk * burst_radar_constant(params, calibration.ptgr);
        if !(xk > 0.0 && xk.is_finite()) {
            return Ok(MeasOutcome::Reject(Rejection::NoAntennaGain));
        }
        meas.xk = xk;

        compute_sigma0(
            params,
            &mut meas,
            energies,
            KpcModel::RangeLooks(params.num_range_looks_averaged),
        )?;
        Ok(MeasOutcome::Keep(meas))
    }

    /// Doppler slice: X from the configured X factor strategy.
    fn convert_slice(
        &self,
        context: &SpotContext<'_>,
        energies: &SpotEnergies,
        mut meas: Meas,
    ) -> Result<MeasOutcome> {
        let Some((_, lon, lat)) =
            geocentric_to_geodetic(&meas.centroid).filter(|_| meas.has_surface_centroid())
        else {
            return Ok(MeasOutcome::Reject(Rejection::OffSurface));
        };

        let surface = self.integrator.surface();
        meas.land_flag = surface.land_flag(lon, lat);
        if meas.land_flag == LandFlag::Land && !surface.options().sim_land {
            return Ok(MeasOutcome::Reject(Rejection::OverLand));
        }

        let input = XFactorInput {
            state: context.state,
            gc_to_antenna: &context.geometry.gc_to_antenna,
            rsat: &context.orbit.rsat,
            antenna: self.integrator.antenna(),
            meas: &meas,
            es_cal: context.es_cal,
            delta_freq: 0.0,
        };
        let Some(x) = self.integrator.xfactor().compute_x(&input)? else {
            return Ok(MeasOutcome::Reject(Rejection::NoAntennaGain));
        };
        if x <= 0.0 {
            return Ok(MeasOutcome::Reject(Rejection::NoAntennaGain));
        }
        meas.xk = x;

        compute_sigma0(&context.state.params, &mut meas, energies, KpcModel::Slice)?;
        Ok(MeasOutcome::Keep(meas))
    }
}
