use super::SimulationSwitches;
use super::sequencer::{Event, EventKind, EventSequencer, encoder_from_azimuth};
use crate::engine::Ephemeris;
use crate::footprint::{
    FootprintIntegrator, PixelLayout, Rejection, SpotContext, SpotGeometry, locate_pixels,
};
use crate::radar::{
    LoadEnergies, LoopbackEnergies, burst_gate_width, make_load_measurements, ptgr_to_esn,
    sigma0_to_esn_noise, true_es_cal,
};
use crate::util::Result;
use crate::util::random::RandomProcess;
use rand::SeedableRng;
use rand::rngs::StdRng;
use scatsim_datatypes::primitives::{
    Attitude, InstrumentParameters, InstrumentState, MeasSpot, OrbitState,
};
use std::f64::consts::TAU;
use std::sync::Arc;
use tracing::{debug, info};

/// A simulated scatterometer pulse.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulatedSpot {
    pub index: u64,
    pub event: Event,
    pub orbit: OrbitState,
    pub state: InstrumentState,
    pub attitude: Attitude,
    pub spot: MeasSpot,
    /// Noise channel energy, only recorded for L1A output.
    pub esn_noise: Option<f64>,
    pub rejections: Vec<Rejection>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SimulatedEvent {
    Spot(SimulatedSpot),
    Loopback { event: Event, energies: LoopbackEnergies },
    Load { event: Event, energies: LoadEnergies },
}

impl SimulatedEvent {
    pub fn event(&self) -> &Event {
        match self {
            Self::Spot(spot) => &spot.event,
            Self::Loopback { event, .. } | Self::Load { event, .. } => event,
        }
    }
}

/// Drives the instrument pulse by pulse: spins the antenna, follows the orbit and turns
/// every event into measurements or calibration energies.
pub struct ScatSim {
    ephemeris: Arc<dyn Ephemeris>,
    attitude: Attitude,
    params: InstrumentParameters,
    layout: PixelLayout,
    integrator: FootprintIntegrator,
    switches: SimulationSwitches,
    sequencer: EventSequencer,
    kpri: Option<RandomProcess>,
    rng: StdRng,
    start_time: f64,
    spot_index: u64,
}

impl std::fmt::Debug for ScatSim {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScatSim")
            .field("params", &self.params)
            .field("layout", &self.layout)
            .field("integrator", &self.integrator)
            .field("switches", &self.switches)
            .field("sequencer", &self.sequencer)
            .field("spot_index", &self.spot_index)
            .finish_non_exhaustive()
    }
}

impl ScatSim {
    pub fn new(
        ephemeris: Arc<dyn Ephemeris>,
        params: InstrumentParameters,
        layout: PixelLayout,
        integrator: FootprintIntegrator,
        switches: SimulationSwitches,
        start_time: f64,
    ) -> Result<Self> {
        let sequencer = EventSequencer::new(
            start_time,
            params.pri,
            params.beams.len(),
            switches.spots_per_frame,
        )?;
        info!(
            start_time,
            policy = ?integrator.policy(),
            high_resolution = integrator.high_resolution(),
            "starting scatterometer simulation"
        );

        Ok(Self {
            ephemeris,
            attitude: Attitude::default(),
            params,
            layout,
            integrator,
            kpri: switches.kpri.clone(),
            rng: StdRng::seed_from_u64(switches.seed),
            switches,
            sequencer,
            start_time,
            spot_index: 0,
        })
    }

    #[must_use]
    pub fn with_attitude(mut self, attitude: Attitude) -> Self {
        self.attitude = attitude;
        self
    }

    pub fn integrator(&self) -> &FootprintIntegrator {
        &self.integrator
    }

    pub fn params(&self) -> &InstrumentParameters {
        &self.params
    }

    /// Antenna azimuth (rad) at `time`.
    pub fn antenna_azimuth(&self, time: f64) -> f64 {
        antenna_azimuth(
            self.switches.initial_azimuth,
            self.params.spin_rate,
            time - self.start_time,
        )
    }

    /// Simulates the next event.
    pub fn step(&mut self) -> Result<SimulatedEvent> {
        let initial = self.switches.initial_azimuth;
        let spin_rate = self.params.spin_rate;
        let start = self.start_time;
        let event = self.sequencer.next_event(|time| {
            encoder_from_azimuth(antenna_azimuth(initial, spin_rate, time - start))
        });

        match event.kind {
            EventKind::Loopback => {
                let ptgr = self.params.transmit_power * self.params.rx_gain_echo;
                let energies =
                    ptgr_to_esn(&self.params, ptgr, self.kpri.as_mut(), event.time, &mut self.rng)?;
                debug!(time = event.time, es_cal = energies.es_cal, "loopback pulse");
                Ok(SimulatedEvent::Loopback { event, energies })
            }
            EventKind::Load => Ok(SimulatedEvent::Load {
                event,
                energies: make_load_measurements(&self.params),
            }),
            EventKind::Scatterometer => self.simulate_spot(event).map(SimulatedEvent::Spot),
        }
    }

    fn simulate_spot(&mut self, event: Event) -> Result<SimulatedSpot> {
        let orbit = self.ephemeris.orbit_state(event.time)?;
        let state = InstrumentState {
            time: event.time,
            beam_idx: event.beam_idx,
            antenna_azimuth: self.antenna_azimuth(event.time),
            encoder: event.encoder,
            orbit_fraction: self.ephemeris.orbit_fraction(event.time),
            mode: self.switches.mode,
            params: self.params,
        };

        let geometry = SpotGeometry::new(
            &orbit,
            &self.attitude,
            &state,
            self.integrator.antenna(),
            self.switches.velocity_frame,
        )?;
        let mut spot = locate_pixels(&orbit, &state, &geometry, &self.layout)?;

        let context = SpotContext {
            index: self.spot_index,
            orbit: &orbit,
            state: &state,
            geometry: &geometry,
            es_cal: true_es_cal(&self.params),
        };
        let rejections = self.integrator.integrate_spot(&context, &mut spot)?;

        let esn_noise = if self.integrator.policy().rejects_now() {
            None
        } else {
            let gate = if self.integrator.high_resolution() {
                burst_gate_width(
                    &self.params,
                    self.integrator.params().range_resolution,
                    self.layout.range_pixels,
                )
            } else {
                self.params.receiver_gate_width
            };
            Some(sigma0_to_esn_noise(
                &self.params,
                &spot.measurements,
                gate,
                self.integrator.sim_kpc(),
                &mut self.rng,
            )?)
        };

        let simulated = SimulatedSpot {
            index: self.spot_index,
            event,
            orbit,
            state,
            attitude: self.attitude,
            spot,
            esn_noise,
            rejections,
        };
        self.spot_index += 1;
        Ok(simulated)
    }
}

fn antenna_azimuth(initial: f64, spin_rate: f64, elapsed: f64) -> f64 {
    (initial + spin_rate * elapsed).rem_euclid(TAU)
}
