use super::geometry::SpotGeometry;
use super::grid::{CellValue, GridSums, IntegrationGrid, PointTargetResponse};
use super::surface::{Look, SurfaceModel, SurfaceSample};
use super::{
    IntegrationParameters, MeasOutcome, Rejection, RejectionPolicy, SNR_CUTOFF, apply_outcomes,
};
use crate::engine::Antenna;
use crate::radar::{
    LookAngles, XFactorEngine, XFactorInput, XFactorStrategy, burst_radar_constant,
    meas_to_esn_k, meas_to_esn_x, pixel_noise_energy, slice_kpc_coefficients,
};
use crate::util::Result;
use crate::util::random::{gaussian, measurement_seed};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rayon::ThreadPool;
use rayon::prelude::*;
use scatsim_datatypes::constants::NOMINAL_ORBIT_PERIOD;
use scatsim_datatypes::error::Error as DataTypeError;
use scatsim_datatypes::geometry::{Vector3, geocentric_to_geodetic};
use scatsim_datatypes::primitives::{
    InstrumentParameters, InstrumentState, KpcCoefficients, LandFlag, Meas, MeasSpot,
    OrbitState,
};
use scatsim_datatypes::tables::{AmbigTable, AmbiguityLookup, NO_AMBIGUITY_RATIO, PtrTable};
use std::sync::Arc;
use tracing::warn;

/// Half widths (km) used for measurements outside of the swath that are kept for L1A.
const PLACEHOLDER_RANGE_WIDTH: f64 = 0.06;
const PLACEHOLDER_AZIMUTH_WIDTH: f64 = 1.0;

/// Stand-in ratio for cells outside of the ambiguity processing window.
const MIN_CELL_AMBIGUITY_RATIO: f64 = 0.1;

/// Everything the integration of one spot needs to know besides its measurements.
#[derive(Debug, Clone, Copy)]
pub struct SpotContext<'a> {
    /// Running number of the spot, part of the seed of its measurements.
    pub index: u64,
    pub orbit: &'a OrbitState,
    pub state: &'a InstrumentState,
    pub geometry: &'a SpotGeometry,
    /// Loopback signal energy used by table based X factors.
    pub es_cal: f64,
}

/// Result of the quality checks of one measurement.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Screen {
    Pass(Screening),
    /// Kept without integration for the deferred L1A path.
    Placeholder,
    Reject(Rejection),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Screening {
    pub lon: f64,
    pub lat: f64,
    /// Offsets (km) of the centroid from the boresight intercept.
    pub range: f64,
    pub azimuth: f64,
    /// Half widths (km) of the point target response.
    pub range_width: f64,
    pub azimuth_width: f64,
    /// Ambiguous power relative to the signal.
    pub ambiguity: [f64; 2],
    pub ambiguity_positions: [Vector3; 2],
}

/// Integrates the backscatter of the surface over the measurements of a spot.
#[derive(Clone)]
pub struct FootprintIntegrator {
    params: IntegrationParameters,
    policy: RejectionPolicy,
    surface: SurfaceModel,
    antenna: Arc<dyn Antenna>,
    ambiguities: Option<Arc<AmbigTable>>,
    ptr: Option<Arc<PtrTable>>,
    xfactor: Arc<XFactorEngine>,
    high_resolution: bool,
    sim_kpc: bool,
    seed: u64,
    thread_pool: Arc<ThreadPool>,
}

impl std::fmt::Debug for FootprintIntegrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FootprintIntegrator")
            .field("params", &self.params)
            .field("policy", &self.policy)
            .field("surface", &self.surface)
            .field("high_resolution", &self.high_resolution)
            .field("sim_kpc", &self.sim_kpc)
            .field("seed", &self.seed)
            .finish_non_exhaustive()
    }
}

impl FootprintIntegrator {
    pub fn new(
        params: IntegrationParameters,
        policy: RejectionPolicy,
        surface: SurfaceModel,
        antenna: Arc<dyn Antenna>,
        xfactor: Arc<XFactorEngine>,
        thread_pool: Arc<ThreadPool>,
    ) -> Self {
        Self {
            params,
            policy,
            surface,
            antenna,
            ambiguities: None,
            ptr: None,
            xfactor,
            high_resolution: true,
            sim_kpc: true,
            seed: 0,
            thread_pool,
        }
    }

    pub fn with_ambiguity_table(mut self, table: Arc<AmbigTable>) -> Self {
        self.ambiguities = Some(table);
        self
    }

    pub fn with_ptr_table(mut self, table: Arc<PtrTable>) -> Self {
        self.ptr = Some(table);
        self
    }

    /// Switches between grid integration and the single sample at the centroid.
    pub fn with_high_resolution(mut self, high_resolution: bool) -> Self {
        self.high_resolution = high_resolution;
        self
    }

    pub fn with_kpc(mut self, sim_kpc: bool) -> Self {
        self.sim_kpc = sim_kpc;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn params(&self) -> &IntegrationParameters {
        &self.params
    }

    pub fn policy(&self) -> RejectionPolicy {
        self.policy
    }

    pub fn surface(&self) -> &SurfaceModel {
        &self.surface
    }

    pub fn antenna(&self) -> &dyn Antenna {
        self.antenna.as_ref()
    }

    pub fn xfactor(&self) -> &XFactorEngine {
        &self.xfactor
    }

    pub fn high_resolution(&self) -> bool {
        self.high_resolution
    }

    pub fn sim_kpc(&self) -> bool {
        self.sim_kpc
    }

    /// Simulates every measurement of `spot` and removes the rejected ones.
    ///
    /// Each measurement draws from its own generator, so the result does not depend on
    /// the number of worker threads.
    pub fn integrate_spot(
        &self,
        context: &SpotContext<'_>,
        spot: &mut MeasSpot,
    ) -> Result<Vec<Rejection>> {
        let measurements = &spot.measurements;
        let outcomes = self.thread_pool.install(|| {
            measurements
                .par_iter()
                .enumerate()
                .map(|(index, meas)| {
                    let mut rng = StdRng::seed_from_u64(measurement_seed(
                        self.seed,
                        context.index,
                        index as u64,
                    ));
                    if self.high_resolution {
                        self.integrate_meas(context, meas.clone(), &mut rng)
                    } else {
                        self.centroid_meas(context, meas.clone(), &mut rng)
                    }
                })
                .collect::<Result<Vec<_>>>()
        })?;

        let rejections = apply_outcomes(spot, outcomes);
        if !rejections.is_empty() {
            tracing::debug!(
                spot = context.index,
                rejected = rejections.len(),
                kept = spot.len(),
                "measurements rejected"
            );
        }
        Ok(rejections)
    }

    fn look(meas: &Meas) -> Look {
        Look {
            meas_type: meas.meas_type,
            beam_idx: meas.beam_idx,
            incidence_angle: meas.incidence_angle,
            east_azimuth: meas.east_azimuth,
        }
    }

    /// Land, gain, ambiguity and swath checks. Under [`RejectionPolicy::DeferToL1b`]
    /// failing measurements get nominal values instead.
    #[allow(clippy::float_cmp)]
    pub(crate) fn screen(
        &self,
        context: &SpotContext<'_>,
        meas: &mut Meas,
        policy: RejectionPolicy,
    ) -> Result<Screen> {
        let direct = policy.rejects_now();
        let geometry = context.geometry;
        let beam = geometry.beam_idx;

        let Some((_, lon, lat)) = geocentric_to_geodetic(&meas.centroid)
            .filter(|_| meas.has_surface_centroid())
        else {
            return Ok(if direct {
                Screen::Reject(Rejection::OffSurface)
            } else {
                Screen::Placeholder
            });
        };

        meas.land_flag = self.surface.land_flag(lon, lat);
        if meas.land_flag == LandFlag::Land && !self.surface.options().sim_land && direct {
            return Ok(Screen::Reject(Rejection::OverLand));
        }

        let angles = LookAngles::new(&geometry.gc_to_antenna, &context.orbit.rsat, &meas.centroid);
        let gain = self
            .antenna
            .power_gain(beam, angles.theta, angles.phi)
            .unwrap_or(0.0)
            / geometry.max_gain;
        if gain < self.params.min_one_way_gain && direct {
            return Ok(Screen::Reject(Rejection::LowGain));
        }

        let (mut ratios, positions) = self.ambiguity_ratios(geometry, &meas.centroid)?;
        match (ratios[0] == 0.0, ratios[1] == 0.0) {
            (true, true) if direct => {
                return Ok(Screen::Reject(Rejection::OutsideProcessingWindow));
            }
            (true, false) | (false, true) if direct => {
                warn!(
                    beam,
                    first = ratios[0],
                    second = ratios[1],
                    "only one ambiguity inside the processing window"
                );
                return Ok(Screen::Reject(Rejection::PartialAmbiguity));
            }
            (false, false) => {}
            _ => ratios = [1.0, 1.0],
        }
        let ambiguity = [1.0 / ratios[0], 1.0 / ratios[1]];
        if ambiguity[0] + ambiguity[1] > 1.0 / self.params.min_signal_to_ambiguity_ratio && direct
        {
            return Ok(Screen::Reject(Rejection::PoorAmbiguityIsolation));
        }

        let (range, azimuth) = geometry.range_azimuth_offset(&meas.centroid);
        let (mut range_width, mut azimuth_width) = match &self.ptr {
            Some(ptr) => {
                let widths = ptr.lookup(
                    beam,
                    range,
                    azimuth,
                    meas.scan_angle,
                    context.state.orbit_fraction * NOMINAL_ORBIT_PERIOD,
                )?;
                (widths.semi_minor, widths.semi_major)
            }
            None => (
                self.params.range_resolution / 2.0,
                (self.params.azimuth_resolution / 2.0).min(self.params.azimuth_ground_width_max),
            ),
        };
        if context.state.params.num_pulses == 1 {
            azimuth_width = self.params.azimuth_ground_width_max / 2.0;
        }
        if range.abs() >= self.params.range_ground_width_max / 2.0 {
            range_width = 0.0;
        }
        if azimuth.abs() >= self.params.azimuth_ground_width_max / 2.0 {
            azimuth_width = 0.0;
        }

        if range_width <= 0.0 || azimuth_width <= 0.0 {
            if direct {
                return Ok(Screen::Reject(Rejection::OutsideSwath));
            }
            range_width = PLACEHOLDER_RANGE_WIDTH;
            azimuth_width = PLACEHOLDER_AZIMUTH_WIDTH;
        }
        meas.range_width = 2.0 * range_width;
        meas.azimuth_width = 2.0 * azimuth_width;

        Ok(Screen::Pass(Screening {
            lon,
            lat,
            range,
            azimuth,
            range_width,
            azimuth_width,
            ambiguity,
            ambiguity_positions: positions,
        }))
    }

    /// Integration grid and point target response of a synthetic aperture pixel.
    pub(crate) fn pixel_grid(
        &self,
        params: &InstrumentParameters,
        screening: &Screening,
    ) -> Result<(IntegrationGrid, PointTargetResponse)> {
        let single_pulse = params.num_pulses == 1;
        let grid = IntegrationGrid::new(
            &self.params,
            screening.range_width,
            screening.azimuth_width,
            params.num_range_looks_averaged,
            single_pulse,
            self.ptr.is_some(),
        )?;
        Ok((
            grid,
            PointTargetResponse {
                boxcar: self.params.boxcar,
                single_pulse,
            },
        ))
    }

    /// Signal-to-ambiguity ratios of the two strongest ambiguities of `point` and their
    /// surface positions. A ratio of 0 marks a point outside of the processing window.
    fn ambiguity_ratios(
        &self,
        geometry: &SpotGeometry,
        point: &Vector3,
    ) -> Result<([f64; 2], [Vector3; 2])> {
        let Some(table) = &self.ambiguities else {
            return Ok(([NO_AMBIGUITY_RATIO; 2], [*point; 2]));
        };

        let (along, cross) = geometry.along_cross_offset(point);
        let scan = geometry.ambiguity_scan_angle;
        let first = table.amb_ratio_1(geometry.beam_idx, scan, along, cross)?;
        let second = table.amb_ratio_2(geometry.beam_idx, scan, along, cross)?;

        let ratio = |lookup: Option<AmbiguityLookup>| lookup.map_or(0.0, |l| l.ratio);
        let position = |lookup: Option<AmbiguityLookup>| {
            lookup.map_or(*point, |l| geometry.ambiguity_position(l.along, l.cross))
        };
        Ok((
            [ratio(first), ratio(second)],
            [position(first), position(second)],
        ))
    }

    /// Integrates the response weighted two-way gain over the grid of one measurement.
    ///
    /// `sigma0` supplies the backscatter of a cell and whether it lies on land.
    pub(crate) fn integrate_grid<F>(
        &self,
        context: &SpotContext<'_>,
        grid: &IntegrationGrid,
        response: PointTargetResponse,
        screening: &Screening,
        mut sigma0: F,
    ) -> Result<GridSums>
    where
        F: FnMut(f64, f64) -> Result<(f64, bool)>,
    {
        let geometry = context.geometry;
        let beam = geometry.beam_idx;
        let area = self.params.step_size * self.params.step_size;
        let integrate_ambiguities = self.params.integrate_ambiguities && self.ambiguities.is_some();

        grid.integrate(
            response,
            geometry,
            screening.range,
            screening.azimuth,
            |position, weight| {
                let (_, lon, lat) =
                    geocentric_to_geodetic(position).ok_or(DataTypeError::NoEarthIntersection)?;
                let (s0, is_land) = sigma0(lon, lat)?;

                let angles = LookAngles::new(&geometry.gc_to_antenna, &context.orbit.rsat, position);
                let gain = self
                    .antenna
                    .power_gain(beam, angles.theta, angles.phi)
                    .unwrap_or(0.0);
                let dx = gain * gain * weight * area / angles.range.powi(4);

                let mut ambiguity = [0.0; 2];
                if integrate_ambiguities {
                    let (ratios, _) = self.ambiguity_ratios(geometry, position)?;
                    for (sum, ratio) in ambiguity.iter_mut().zip(ratios) {
                        let ratio = if ratio > 0.0 { ratio } else { MIN_CELL_AMBIGUITY_RATIO };
                        *sum = dx / ratio;
                    }
                }

                let es = dx * s0;
                if es.is_nan() {
                    warn!(lon, lat, dx, sigma0 = s0, "NaN signal energy in integration cell");
                }
                Ok(CellValue {
                    dx,
                    es,
                    is_land,
                    ambiguity,
                })
            },
        )
    }

    fn integrate_meas(
        &self,
        context: &SpotContext<'_>,
        mut meas: Meas,
        rng: &mut StdRng,
    ) -> Result<MeasOutcome> {
        let direct = self.policy.rejects_now();
        let screening = match self.screen(context, &mut meas, self.policy)? {
            Screen::Pass(screening) => screening,
            Screen::Placeholder => return Ok(MeasOutcome::Keep(placeholder(meas))),
            Screen::Reject(rejection) => return Ok(MeasOutcome::Reject(rejection)),
        };

        let params = &context.state.params;
        let looks = params.num_range_looks_averaged;
        let (grid, response) = self.pixel_grid(params, &screening)?;

        let look = Self::look(&meas);
        let sums = self.integrate_grid(context, &grid, response, &screening, |lon, lat| {
            let sample = self.surface.cell_sigma0(&look, lon, lat, rng)?;
            Ok((sample.sigma0, sample.is_land))
        })?;

        if sums.x_land > 0.0 {
            meas.land_flag = LandFlag::LandInclusive;
        }
        if direct
            && !self.params.sim_all_land
            && sums.x_land / sums.xk >= self.params.land_fraction_threshold
        {
            return Ok(MeasOutcome::Reject(Rejection::LandContamination));
        }
        if !(sums.xk > 0.0 && sums.xk.is_finite()) {
            return Ok(if direct {
                MeasOutcome::Reject(Rejection::NoAntennaGain)
            } else {
                MeasOutcome::Keep(placeholder(meas))
            });
        }
        meas.range_width = sums.range_width;
        meas.azimuth_width = sums.azimuth_width;

        let ambiguity = if self.params.integrate_ambiguities && self.ambiguities.is_some() {
            [sums.ambiguity[0] / sums.xk, sums.ambiguity[1] / sums.xk]
        } else {
            screening.ambiguity
        };

        let k_sigma = burst_radar_constant(params, params.transmit_power * params.rx_gain_echo);
        let xk = sums.xk * k_sigma;
        let mut es = sums.es * k_sigma;
        let en = pixel_noise_energy(params, self.params.range_resolution);
        let snr = es / en;
        meas.en_slice = en;

        for (amb, position) in ambiguity.iter().zip(screening.ambiguity_positions) {
            let sample = self.ambiguity_sigma0(&look, &position)?;
            if sample.is_land {
                meas.land_flag = LandFlag::LandInclusive;
            }
            es += xk * amb * sample.sigma0;
        }

        let variance = if self.sim_kpc && snr >= SNR_CUTOFF {
            (1.0 + 2.0 / snr + 1.0 / (snr * snr)) / looks as f64 * es * es
        } else {
            0.0
        };

        let mut value = es + en + gaussian(0.0, variance, rng)?;
        if direct {
            let looks = looks as f64;
            let s0ne = en / xk;
            meas.kpc = Some(KpcCoefficients::new(
                1.0 + 1.0 / looks,
                2.0 * s0ne / looks,
                s0ne * s0ne / looks,
            ));
            value = (value - en) / xk;
        }
        if self.params.replace_value_with_ambiguity_ratio {
            value = ambiguity[0] + ambiguity[1];
        }

        meas.value = value;
        meas.xk = xk;
        Ok(MeasOutcome::Keep(meas))
    }

    fn ambiguity_sigma0(&self, look: &Look, position: &Vector3) -> Result<SurfaceSample> {
        match geocentric_to_geodetic(position) {
            Some((_, lon, lat)) => self.surface.ambiguity_sigma0(look, lon, lat),
            None => {
                warn!(?position, "ambiguity is not on the surface");
                Ok(SurfaceSample {
                    sigma0: 0.0,
                    is_land: false,
                })
            }
        }
    }

    /// Single sample at the centroid with X from the X factor engine.
    fn centroid_meas(
        &self,
        context: &SpotContext<'_>,
        mut meas: Meas,
        rng: &mut StdRng,
    ) -> Result<MeasOutcome> {
        let direct = self.policy.rejects_now();
        let Some((_, lon, lat)) =
            geocentric_to_geodetic(&meas.centroid).filter(|_| meas.has_surface_centroid())
        else {
            return Ok(if direct {
                MeasOutcome::Reject(Rejection::OffSurface)
            } else {
                MeasOutcome::Keep(placeholder(meas))
            });
        };

        meas.land_flag = self.surface.land_flag(lon, lat);
        if meas.land_flag == LandFlag::Land && !self.surface.options().sim_land && direct {
            return Ok(MeasOutcome::Reject(Rejection::OverLand));
        }

        let sigma0 =
            self.surface
                .centroid_sigma0(&Self::look(&meas), meas.land_flag, lon, lat, rng)?;

        let input = XFactorInput {
            state: context.state,
            gc_to_antenna: &context.geometry.gc_to_antenna,
            rsat: &context.orbit.rsat,
            antenna: self.antenna.as_ref(),
            meas: &meas,
            es_cal: context.es_cal,
            delta_freq: 0.0,
        };
        let params = &context.state.params;
        let sample = match self.xfactor.strategy() {
            XFactorStrategy::Direct | XFactorStrategy::KFactor(_) => {
                let k = self.xfactor.k_factor(context.state, &meas)?;
                meas_to_esn_k(&input, k, sigma0, self.sim_kpc, rng)?
            }
            XFactorStrategy::ByuTable(_) | XFactorStrategy::GsTable(_) => self
                .xfactor
                .compute_x(&input)?
                .map(|x| meas_to_esn_x(params, &meas, x, sigma0, self.sim_kpc, rng))
                .transpose()?,
        };
        let Some(sample) = sample else {
            return Ok(MeasOutcome::Reject(Rejection::NoAntennaGain));
        };

        let x = sample.x;
        meas.xk = x;
        meas.en_slice = sample.en;
        meas.value = sample.esn;
        if direct {
            meas.value = (sample.esn - sample.en) / x;
            meas.kpc = Some(slice_kpc_coefficients(params, &meas, sample.en, x));
        }
        Ok(MeasOutcome::Keep(meas))
    }
}

/// Measurement kept for L1A without usable energies. The L1B conversion drops it.
fn placeholder(mut meas: Meas) -> Meas {
    meas.value = 0.0;
    meas.xk = 0.0;
    meas.en_slice = 0.0;
    meas.range_width = 2.0 * PLACEHOLDER_RANGE_WIDTH;
    meas.azimuth_width = 2.0 * PLACEHOLDER_AZIMUTH_WIDTH;
    meas
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::footprint::geometry::tests::{equator_orbit, looking_right, spot_geometry};
    use crate::footprint::{PixelLayout, SurfaceOptions, locate_pixels};
    use crate::mock::{AnalyticGmf, GaussianAntenna, LandBox, NoLand, UniformWind};
    use crate::radar::true_es_cal;
    use crate::util::rayon::create_rayon_thread_pool;
    use approx::assert_relative_eq;
    use scatsim_datatypes::tables::{AmbigTableLayout, PtrAuxRecord, PtrBeamTable, Table};
    use scatsim_datatypes::util::test::TestDefault;

    fn integration_params() -> IntegrationParameters {
        IntegrationParameters {
            step_size: 0.5,
            range_width_factor: 2.0,
            max_range_bins: 40,
            max_azimuth_bins: 41,
            range_resolution: 2.0,
            ..IntegrationParameters::default()
        }
    }

    fn integrator(options: SurfaceOptions, policy: RejectionPolicy, threads: usize) -> FootprintIntegrator {
        let params = InstrumentState::test_default().params;
        let surface = SurfaceModel::new(
            Arc::new(UniformWind::new(8.0, 0.5)),
            Arc::new(AnalyticGmf::default()),
            Arc::new(NoLand),
            options,
        );
        FootprintIntegrator::new(
            integration_params(),
            policy,
            surface,
            Arc::new(GaussianAntenna::new(params.beams.to_vec())),
            Arc::new(XFactorEngine::new(XFactorStrategy::Direct)),
            create_rayon_thread_pool(threads).unwrap(),
        )
    }

    fn simulate(integrator: &FootprintIntegrator, state: &InstrumentState) -> (MeasSpot, Vec<Rejection>) {
        let orbit = equator_orbit();
        let geometry = spot_geometry(state);
        let layout = PixelLayout {
            range_pixels: 4,
            range_spacing: 2.0,
            azimuth_spacing: 2.0,
        };
        let mut spot = locate_pixels(&orbit, state, &geometry, &layout).unwrap();
        let context = SpotContext {
            index: 3,
            orbit: &orbit,
            state,
            geometry: &geometry,
            es_cal: true_es_cal(&state.params),
        };
        let rejections = integrator.integrate_spot(&context, &mut spot).unwrap();
        (spot, rejections)
    }

    #[test]
    fn uniform_field_is_recovered() {
        let options = SurfaceOptions {
            uniform_sigma0: Some(0.01),
            ..SurfaceOptions::default()
        };
        let integrator = integrator(options, RejectionPolicy::RejectNow, 2).with_kpc(false);
        let (spot, rejections) = simulate(&integrator, &looking_right(1));

        assert!(rejections.is_empty());
        assert_eq!(spot.len(), 4);
        for meas in &spot.measurements {
            assert_relative_eq!(meas.value, 0.01, max_relative = 1e-6);
            assert!(meas.xk > 0.0);
            assert!(meas.range_width > 0.0 && meas.azimuth_width > 0.0);
            let kpc = meas.kpc.unwrap();
            assert_relative_eq!(kpc.a, 1.5);
        }
    }

    #[test]
    fn results_do_not_depend_on_the_thread_count() {
        let one = integrator(SurfaceOptions::default(), RejectionPolicy::RejectNow, 1);
        let four = integrator(SurfaceOptions::default(), RejectionPolicy::RejectNow, 4);
        let state = looking_right(0);

        let (a, _) = simulate(&one, &state);
        let (b, _) = simulate(&four, &state);
        assert_eq!(a, b);
        assert!(!a.is_empty());
    }

    #[test]
    fn land_is_rejected_now_and_kept_for_l1a() {
        let state = looking_right(1);
        let geometry = spot_geometry(&state);
        let (_, lon, _) = geocentric_to_geodetic(&geometry.spot_centroid).unwrap();
        let land = LandBox {
            lon_min: lon - 1.0,
            lon_max: lon + 1.0,
            lat_min: -1.0,
            lat_max: 1.0,
        };

        let with_land = |policy| {
            let mut integrator = integrator(SurfaceOptions::default(), policy, 1);
            integrator.surface = SurfaceModel::new(
                Arc::new(UniformWind::new(8.0, 0.5)),
                Arc::new(AnalyticGmf::default()),
                Arc::new(land),
                SurfaceOptions::default(),
            );
            integrator
        };

        let (spot, rejections) = simulate(&with_land(RejectionPolicy::RejectNow), &state);
        assert!(spot.is_empty());
        assert!(rejections.iter().all(|r| *r == Rejection::OverLand));

        let (spot, rejections) = simulate(&with_land(RejectionPolicy::DeferToL1b), &state);
        assert!(rejections.is_empty());
        assert_eq!(spot.len(), 4);
        assert!(spot.measurements.iter().all(|m| m.land_flag == LandFlag::Land));
    }

    #[test]
    fn deferred_values_hold_signal_plus_noise() {
        let options = SurfaceOptions {
            uniform_sigma0: Some(0.01),
            ..SurfaceOptions::default()
        };
        let integrator = integrator(options, RejectionPolicy::DeferToL1b, 1).with_kpc(false);
        let (spot, _) = simulate(&integrator, &looking_right(1));

        for meas in &spot.measurements {
            assert!(meas.kpc.is_none());
            assert_relative_eq!(
                (meas.value - meas.en_slice) / meas.xk,
                0.01,
                max_relative = 1e-6
            );
        }
    }

    #[test]
    fn centroid_path_uses_the_x_factor() {
        let options = SurfaceOptions {
            uniform_sigma0: Some(0.02),
            ..SurfaceOptions::default()
        };
        let integrator = integrator(options, RejectionPolicy::RejectNow, 1)
            .with_high_resolution(false)
            .with_kpc(false);
        let (spot, rejections) = simulate(&integrator, &looking_right(0));

        assert!(rejections.is_empty());
        for meas in &spot.measurements {
            assert_relative_eq!(meas.value, 0.02, max_relative = 1e-9);
            assert!(meas.kpc.is_some());
        }
    }

    #[test]
    fn point_target_response_sets_the_range_width() {
        let state = looking_right(1);
        let orbit = equator_orbit();
        let geometry = spot_geometry(&state);
        let layout = PixelLayout {
            range_pixels: 4,
            range_spacing: 2.0,
            azimuth_spacing: 2.0,
        };
        let mut spot = locate_pixels(&orbit, &state, &geometry, &layout).unwrap();
        let context = SpotContext {
            index: 0,
            orbit: &orbit,
            state: &state,
            geometry: &geometry,
            es_cal: 1.0,
        };

        let zero = Vector3::new(0.0, 0.0, 0.0);
        let beam = || {
            PtrBeamTable::new(
                vec![PtrAuxRecord {
                    time: 0.0,
                    scan_angle: 0.0,
                    range_pixels: 1,
                    azimuth_pixels: 1,
                    sc_position: zero,
                    target_position: zero,
                    range_unit: zero,
                    azimuth_unit: zero,
                }],
                vec![[0.0, 0.0, 1500.0, 3000.0]],
            )
            .unwrap()
        };
        let integrator = integrator(SurfaceOptions::default(), RejectionPolicy::RejectNow, 1)
            .with_ptr_table(Arc::new(PtrTable::new(vec![beam(), beam()])));

        let meas = &mut spot.measurements[1];
        let Screen::Pass(screening) = integrator
            .screen(&context, meas, RejectionPolicy::RejectNow)
            .unwrap()
        else {
            panic!("measurement should pass the screen");
        };

        assert_relative_eq!(screening.range_width, 1.5);
        // single pulse measurements span the whole azimuth processing window
        assert_relative_eq!(
            screening.azimuth_width,
            integration_params().azimuth_ground_width_max / 2.0
        );
        assert_relative_eq!(meas.range_width, 3.0);
    }

    #[test]
    fn land_under_an_ambiguity_marks_the_measurement() {
        let state = looking_right(1);
        let orbit = equator_orbit();
        let geometry = spot_geometry(&state);
        let layout = PixelLayout {
            range_pixels: 4,
            range_spacing: 2.0,
            azimuth_spacing: 2.0,
        };
        let mut spot = locate_pixels(&orbit, &state, &geometry, &layout).unwrap();
        let context = SpotContext {
            index: 0,
            orbit: &orbit,
            state: &state,
            geometry: &geometry,
            es_cal: 1.0,
        };

        // both ambiguities of every point lie 60 km along track of the boresight
        let windows = AmbigTableLayout {
            azimuths: 361,
            azimuth_step: 1.0,
            beams: 2,
            along: 2,
            cross: 2,
        };
        let axis = |n| {
            let data = (0..windows.azimuths * windows.beams)
                .flat_map(|_| [-300.0, 300.0])
                .collect();
            Table::new([windows.azimuths, windows.beams, n], data).unwrap()
        };
        let fields = [100.0, 100.0, 60.0, 0.0, 100.0, 60.0, 0.0, 0.0];
        let cells = (0..windows.azimuths * windows.beams)
            .flat_map(|_| fields.iter().flat_map(|&v| [v; 4]))
            .collect();
        let table = AmbigTable::new(
            windows,
            axis(2),
            axis(2),
            Table::new([windows.azimuths, windows.beams, 8, 2, 2], cells).unwrap(),
        )
        .unwrap();

        let (_, lon, lat) = geocentric_to_geodetic(&geometry.ambiguity_position(60.0, 0.0)).unwrap();
        let land = LandBox {
            lon_min: lon - 0.002,
            lon_max: lon + 0.002,
            lat_min: lat - 0.002,
            lat_max: lat + 0.002,
        };
        let mut integrator = integrator(SurfaceOptions::default(), RejectionPolicy::RejectNow, 1)
            .with_ambiguity_table(Arc::new(table));
        integrator.surface = SurfaceModel::new(
            Arc::new(UniformWind::new(8.0, 0.5)),
            Arc::new(AnalyticGmf::default()),
            Arc::new(land),
            SurfaceOptions::default(),
        );

        let rejections = integrator.integrate_spot(&context, &mut spot).unwrap();
        assert!(rejections.is_empty());
        assert_eq!(spot.len(), 4);
        assert!(
            spot.measurements
                .iter()
                .all(|m| m.land_flag == LandFlag::LandInclusive)
        );
    }

    #[test]
    fn low_gain_pixels_are_dropped() {
        let state = looking_right(1);
        let orbit = equator_orbit();
        let geometry = spot_geometry(&state);
        let layout = PixelLayout {
            range_pixels: 2,
            range_spacing: 80.0,
            azimuth_spacing: 1.0,
        };
        let mut spot = locate_pixels(&orbit, &state, &geometry, &layout).unwrap();
        let context = SpotContext {
            index: 0,
            orbit: &orbit,
            state: &state,
            geometry: &geometry,
            es_cal: 1.0,
        };

        let integrator = integrator(SurfaceOptions::default(), RejectionPolicy::RejectNow, 1);
        let rejections = integrator.integrate_spot(&context, &mut spot).unwrap();
        assert!(spot.is_empty());
        assert_eq!(rejections, vec![Rejection::LowGain, Rejection::LowGain]);
    }
}
