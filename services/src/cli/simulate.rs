use crate::config::Settings;
use crate::error::{self, Result};
use clap::Parser;
use scatsim_datatypes::primitives::MeasSpot;
use scatsim_datatypes::tables::{AmbigTable, ByuXTable, KpmTable, OrbitAzimuthGrid, PtrTable};
use scatsim_operators::engine::LandMap;
use scatsim_operators::footprint::{
    FootprintIntegrator, KpmMode, Rejection, RejectionPolicy, SurfaceModel, SurfaceOptions,
};
use scatsim_operators::mock::{AnalyticGmf, CircularOrbit, GaussianAntenna, LandBox, NoLand, UniformWind};
use scatsim_operators::radar::{XFactorEngine, XFactorStrategy};
use scatsim_operators::simulation::{
    CalibrationPulses, CheckFrameWriter, L1aToL1b, ScatSim, SimulatedEvent, SimulatedSpot,
};
use scatsim_operators::util::rayon::create_rayon_thread_pool;
use serde::Serialize;
use snafu::ResultExt;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

/// Runs the event loop against the reference collaborators
#[derive(Debug, Parser)]
pub struct Simulate {
    /// Number of pulses (spots and calibration pulses) to simulate
    #[arg(long, default_value_t = 1000)]
    pub pulses: usize,

    /// CSV file the measurement records are appended to
    #[arg(long, default_value = "checkframes.csv")]
    pub output: PathBuf,

    /// Writes the run summary as JSON to this file instead of standard output
    #[arg(long)]
    pub summary: Option<PathBuf>,
}

/// What a run produced.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub spots: usize,
    pub loopback_pulses: usize,
    pub load_pulses: usize,
    /// Spots simulated before the first complete calibration, only for deferred runs.
    pub uncalibrated_spots: usize,
    pub measurements: usize,
    pub rejections: BTreeMap<String, usize>,
    pub mean_sigma0: Option<f64>,
}

impl RunSummary {
    fn add_spot(&mut self, spot: &MeasSpot, rejections: &[Rejection]) {
        let sum = self.mean_sigma0.unwrap_or(0.0) * self.measurements as f64;
        self.measurements += spot.len();
        for rejection in rejections {
            *self.rejections.entry(rejection.to_string()).or_default() += 1;
        }
        if self.measurements > 0 {
            let values: f64 = spot.measurements.iter().map(|m| m.value).sum();
            self.mean_sigma0 = Some((sum + values) / self.measurements as f64);
        }
    }
}

/// Assembles the simulator from the configuration.
pub fn build_simulator(settings: &Settings) -> Result<ScatSim> {
    let params = settings.instrument.parameters()?;
    let simulation = &settings.simulation;
    let orbit = CircularOrbit::new(
        settings.orbit.altitude,
        settings.orbit.inclination.to_radians(),
        settings.orbit.ascending_node_longitude.to_radians(),
    )?;

    let surface_config = &settings.surface;
    let land: Arc<dyn LandMap> = match surface_config.land_box {
        Some([lon_min, lon_max, lat_min, lat_max]) => Arc::new(LandBox {
            lon_min: lon_min.to_radians(),
            lon_max: lon_max.to_radians(),
            lat_min: lat_min.to_radians(),
            lat_max: lat_max.to_radians(),
        }),
        None => Arc::new(NoLand),
    };
    let kpm = settings
        .tables
        .kpm
        .as_deref()
        .map(KpmTable::read)
        .transpose()?;
    let options = SurfaceOptions {
        uniform_sigma0: (surface_config.uniform_sigma0 > 0.0).then_some(surface_config.uniform_sigma0),
        land_sigma0: surface_config.land_sigma0,
        sim_land: surface_config.sim_land,
        sim_coast: surface_config.sim_coast,
        kpm: if kpm.is_some() {
            KpmMode::Uncorrelated
        } else {
            KpmMode::Off
        },
    };
    let mut surface = SurfaceModel::new(
        Arc::new(UniformWind::new(
            surface_config.wind_speed,
            surface_config.wind_direction.to_radians(),
        )),
        Arc::new(AnalyticGmf::default()),
        land,
        options,
    );
    if let Some(kpm) = kpm {
        surface = surface.with_kpm(Arc::new(kpm), None);
    }

    let strategy = if settings.tables.byu_x_beams.is_empty() {
        XFactorStrategy::Direct
    } else {
        XFactorStrategy::ByuTable(ByuXTable::read_ascii(
            OrbitAzimuthGrid::default(),
            &settings.tables.byu_x_beams,
        )?)
    };

    let tables = &settings.tables;
    let ambiguities = match (&tables.ambiguity_index, &tables.ambiguity_data) {
        (Some(index), Some(data)) => Some(AmbigTable::read(index, data, tables.ambiguity_layout)?),
        (None, None) => None,
        _ => return error::IncompleteAmbiguityTable.fail(),
    };

    let mut integrator = FootprintIntegrator::new(
        settings.integration.parameters(),
        simulation.policy.into(),
        surface,
        Arc::new(GaussianAntenna::new(params.beams.to_vec())),
        Arc::new(XFactorEngine::new(strategy)),
        create_rayon_thread_pool(simulation.num_threads)?,
    )
    .with_high_resolution(simulation.high_resolution)
    .with_kpc(simulation.sim_kpc)
    .with_seed(simulation.seed);
    if let Some(ambiguities) = ambiguities {
        integrator = integrator.with_ambiguity_table(Arc::new(ambiguities));
    }
    if !tables.ptr_beams.is_empty() {
        let files: Vec<_> = tables.ptr_beams.iter().map(|[aux, data]| (aux, data)).collect();
        integrator = integrator.with_ptr_table(Arc::new(PtrTable::read(&files)?));
    }

    Ok(ScatSim::new(
        Arc::new(orbit),
        params,
        (&settings.pixels).into(),
        integrator,
        simulation.switches(),
        simulation.start_time,
    )?)
}

/// Simulates `params.pulses` events and writes every calibrated measurement.
pub fn simulate(params: &Simulate, settings: &Settings) -> Result<RunSummary> {
    let mut sim = build_simulator(settings)?;
    let deferred = sim.integrator().policy() == RejectionPolicy::DeferToL1b;
    let converter = L1aToL1b::new(
        sim.integrator().clone(),
        settings.simulation.switches().velocity_frame,
    );
    let mut writer = CheckFrameWriter::create(&params.output)?;
    let mut pulses = CalibrationPulses::default();
    let mut summary = RunSummary::default();

    for _ in 0..params.pulses {
        let event = sim.step()?;
        match &event {
            SimulatedEvent::Spot(simulated) => {
                summary.spots += 1;
                if deferred {
                    convert(&converter, &pulses, simulated, &mut writer, &mut summary)?;
                } else {
                    writer.write_spot(simulated, &simulated.spot)?;
                    summary.add_spot(&simulated.spot, &simulated.rejections);
                }
            }
            SimulatedEvent::Loopback { .. } => summary.loopback_pulses += 1,
            SimulatedEvent::Load { .. } => summary.load_pulses += 1,
        }
        pulses.update(&event);
    }
    writer.flush()?;

    info!(
        spots = summary.spots,
        measurements = summary.measurements,
        output = %params.output.display(),
        "simulation finished"
    );
    Ok(summary)
}

fn convert(
    converter: &L1aToL1b,
    pulses: &CalibrationPulses,
    simulated: &SimulatedSpot,
    writer: &mut CheckFrameWriter,
    summary: &mut RunSummary,
) -> Result<()> {
    if pulses.loopback.is_none() || pulses.load.is_none() {
        if summary.uncalibrated_spots == 0 {
            warn!(
                time = simulated.state.time,
                "no calibration pulses yet, skipping spots until the first loopback and load"
            );
        }
        summary.uncalibrated_spots += 1;
        return Ok(());
    }

    let (spot, rejections) = converter.convert_spot(simulated, pulses)?;
    writer.write_spot(simulated, &spot)?;
    summary.add_spot(&spot, &rejections);
    Ok(())
}

/// Prints or stores the summary of a run.
#[allow(clippy::print_stdout)]
pub fn report(params: &Simulate, summary: &RunSummary) -> Result<()> {
    let json = serde_json::to_string_pretty(summary)?;
    match &params.summary {
        Some(path) => std::fs::write(path, json).context(error::Summary { path: path.clone() }),
        None => {
            println!("{json}");
            Ok(())
        }
    }
}
