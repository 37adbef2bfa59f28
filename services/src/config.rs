use crate::error::{self, Result};
use config::{Config, Environment, File, FileFormat};
use scatsim_datatypes::geometry::VelocityFrame;
use scatsim_datatypes::primitives::{BeamInfo, InstrumentParameters, MeasType};
use scatsim_datatypes::tables::AmbigTableLayout;
use scatsim_operators::footprint::{IntegrationParameters, PixelLayout, RejectionPolicy};
use scatsim_operators::simulation::SimulationSwitches;
use scatsim_operators::util::random::RandomProcess;
use serde::{Deserialize, Serialize};
use snafu::ResultExt;
use std::path::PathBuf;
use std::sync::{LazyLock, RwLock};

const DEFAULT_SETTINGS: &str = include_str!("../Settings-default.toml");

static SETTINGS: LazyLock<RwLock<Config>> = LazyLock::new(init_settings);

fn init_settings() -> RwLock<Config> {
    let mut settings =
        Config::builder().add_source(File::from_str(DEFAULT_SETTINGS, FileFormat::Toml));

    #[cfg(test)]
    let files = ["Settings-test.toml"];

    #[cfg(not(test))]
    let files = ["Settings.toml"];

    if let Ok(dir) = std::env::current_dir() {
        let files: Vec<File<_, _>> = files
            .iter()
            .map(|f| dir.join(f))
            .filter(|p| p.exists())
            .map(File::from)
            .collect();
        settings = settings.add_source(files);
    }

    // Override config with environment variables that start with `SCATSIM__`,
    // e.g. `SCATSIM__LOGGING__LOG_SPEC=debug`
    // Note: Since variables contain underscores, we need to use something different
    // for separating groups, for instance double underscores `__`
    settings = settings.add_source(
        Environment::with_prefix("SCATSIM")
            .prefix_separator("__")
            .separator("__"),
    );

    RwLock::new(
        settings
            .build()
            .expect("the embedded default settings should always parse"),
    )
}

/// Merges an additional settings file on top of the current configuration.
pub fn add_settings_file(path: &std::path::Path) -> Result<()> {
    let mut settings = SETTINGS
        .write()
        .map_err(|_error| error::Error::ConfigLockFailed)?;

    let builder = Config::builder()
        .add_source(settings.clone())
        .add_source(File::from(path.to_path_buf()))
        .add_source(
            Environment::with_prefix("SCATSIM")
                .prefix_separator("__")
                .separator("__"),
        );

    *settings = builder.build().context(error::Config)?;
    Ok(())
}

#[cfg(test)]
pub fn set_config<T>(key: &str, value: T) -> Result<()>
where
    T: Into<config::Value>,
{
    let mut settings = SETTINGS
        .write()
        .map_err(|_error| error::Error::ConfigLockFailed)?;

    let builder = Config::builder()
        .add_source(settings.clone())
        .set_override(key, value)
        .context(error::Config)?;

    *settings = builder.build().context(error::Config)?;
    Ok(())
}

pub fn get_config<'a, T>(key: &str) -> Result<T>
where
    T: Deserialize<'a>,
{
    SETTINGS
        .read()
        .map_err(|_error| error::Error::ConfigLockFailed)?
        .get::<T>(key)
        .context(error::Config)
}

pub fn get_config_element<'a, T>() -> Result<T>
where
    T: ConfigElement + Deserialize<'a>,
{
    get_config(T::KEY)
}

pub trait ConfigElement {
    const KEY: &'static str;
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Logging {
    pub log_spec: String,
}

impl ConfigElement for Logging {
    const KEY: &'static str = "logging";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Policy {
    RejectNow,
    DeferToL1b,
}

impl From<Policy> for RejectionPolicy {
    fn from(policy: Policy) -> Self {
        match policy {
            Policy::RejectNow => RejectionPolicy::RejectNow,
            Policy::DeferToL1b => RejectionPolicy::DeferToL1b,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Simulation {
    pub seed: u64,
    pub num_threads: usize,
    /// s since the ascending node
    pub start_time: f64,
    /// deg
    pub initial_azimuth: f64,
    pub spots_per_frame: usize,
    pub mode: usize,
    pub high_resolution: bool,
    pub sim_kpc: bool,
    pub policy: Policy,
    pub earth_fixed_velocity: bool,
    /// Uniform relative error of the loopback signal, 0 disables it.
    pub kpri: f64,
}

impl Simulation {
    pub fn switches(&self) -> SimulationSwitches {
        SimulationSwitches {
            velocity_frame: if self.earth_fixed_velocity {
                VelocityFrame::EarthFixed
            } else {
                VelocityFrame::Inertial
            },
            spots_per_frame: self.spots_per_frame,
            seed: self.seed,
            mode: self.mode,
            initial_azimuth: self.initial_azimuth.to_radians(),
            kpri: (self.kpri > 0.0).then_some(RandomProcess::Uniform {
                low: -self.kpri,
                high: self.kpri,
            }),
        }
    }
}

impl ConfigElement for Simulation {
    const KEY: &'static str = "simulation";
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Orbit {
    /// km
    pub altitude: f64,
    /// deg
    pub inclination: f64,
    /// deg
    pub ascending_node_longitude: f64,
}

impl ConfigElement for Orbit {
    const KEY: &'static str = "orbit";
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Beam {
    pub polarization: String,
    pub peak_gain_db: f64,
    /// deg
    pub look_angle: f64,
    /// deg
    pub azimuth_offset: f64,
    /// deg
    pub elevation_beamwidth: f64,
    /// deg
    pub azimuth_beamwidth: f64,
}

impl Beam {
    fn beam_info(&self) -> Result<BeamInfo> {
        let polarization: MeasType = self.polarization.parse().map_err(|_error| {
            error::Error::InvalidPolarization {
                polarization: self.polarization.clone(),
            }
        })?;
        Ok(BeamInfo {
            polarization,
            peak_gain: db_to_linear(self.peak_gain_db),
            look_angle: self.look_angle.to_radians(),
            azimuth_offset: self.azimuth_offset.to_radians(),
            elevation_beamwidth: self.elevation_beamwidth.to_radians(),
            azimuth_beamwidth: self.azimuth_beamwidth.to_radians(),
        })
    }
}

/// Instrument parameters as written by humans: gains and losses in dB, angles in degrees.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Instrument {
    /// W
    pub transmit_power: f64,
    pub rx_gain_echo_db: f64,
    pub rx_gain_noise_db: f64,
    pub loss_l13_db: f64,
    pub loss_l21_db: f64,
    pub loss_l23_db: f64,
    pub loss_calop_db: f64,
    pub system_loss_db: f64,
    pub calibration_bias_db: f64,
    /// K
    pub system_temperature: f64,
    /// Hz
    pub tx_frequency: f64,
    /// s
    pub tx_pulse_width: f64,
    /// s
    pub receiver_gate_width: f64,
    /// Hz
    pub echo_bandwidth: f64,
    /// Hz
    pub noise_bandwidth: f64,
    /// Hz
    pub slice_bandwidth: f64,
    /// rpm
    pub spin_rate: f64,
    /// s
    pub pri: f64,
    pub num_pulses: usize,
    pub num_range_looks_averaged: usize,
    pub beams: [Beam; 2],
}

impl Instrument {
    pub fn parameters(&self) -> Result<InstrumentParameters> {
        Ok(InstrumentParameters {
            transmit_power: self.transmit_power,
            rx_gain_echo: db_to_linear(self.rx_gain_echo_db),
            rx_gain_noise: db_to_linear(self.rx_gain_noise_db),
            loss_l13: db_to_linear(self.loss_l13_db),
            loss_l21: db_to_linear(self.loss_l21_db),
            loss_l23: db_to_linear(self.loss_l23_db),
            loss_calop: db_to_linear(self.loss_calop_db),
            system_loss: db_to_linear(self.system_loss_db),
            system_temperature: self.system_temperature,
            tx_frequency: self.tx_frequency,
            tx_pulse_width: self.tx_pulse_width,
            receiver_gate_width: self.receiver_gate_width,
            echo_bandwidth: self.echo_bandwidth,
            noise_bandwidth: self.noise_bandwidth,
            slice_bandwidth: self.slice_bandwidth,
            calibration_bias: db_to_linear(self.calibration_bias_db),
            spin_rate: self.spin_rate * std::f64::consts::TAU / 60.0,
            pri: self.pri,
            num_pulses: self.num_pulses,
            num_range_looks_averaged: self.num_range_looks_averaged,
            beams: [self.beams[0].beam_info()?, self.beams[1].beam_info()?],
        })
    }
}

impl ConfigElement for Instrument {
    const KEY: &'static str = "instrument";
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Surface {
    /// m/s
    pub wind_speed: f64,
    /// deg, counter-clockwise from east
    pub wind_direction: f64,
    /// Constant sigma0 instead of the wind field, 0 disables it.
    pub uniform_sigma0: f64,
    /// `[lon_min, lon_max, lat_min, lat_max]` in deg
    pub land_box: Option<[f64; 4]>,
    pub land_sigma0: [f64; 2],
    pub sim_land: bool,
    pub sim_coast: bool,
}

impl ConfigElement for Surface {
    const KEY: &'static str = "surface";
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Integration {
    /// km
    pub step_size: f64,
    pub range_width_factor: f64,
    pub azimuth_width_factor: f64,
    pub max_range_bins: usize,
    pub max_azimuth_bins: usize,
    pub boxcar: bool,
    pub integrate_ambiguities: bool,
    pub min_one_way_gain_db: f64,
    pub min_signal_to_ambiguity_ratio_db: f64,
    pub land_fraction_threshold: f64,
    pub sim_all_land: bool,
    /// km
    pub range_ground_width_max: f64,
    /// km
    pub azimuth_ground_width_max: f64,
    /// km
    pub range_resolution: f64,
    /// km
    pub azimuth_resolution: f64,
}

impl Integration {
    pub fn parameters(&self) -> IntegrationParameters {
        IntegrationParameters {
            step_size: self.step_size,
            range_width_factor: self.range_width_factor,
            azimuth_width_factor: self.azimuth_width_factor,
            max_range_bins: self.max_range_bins,
            max_azimuth_bins: self.max_azimuth_bins,
            boxcar: self.boxcar,
            integrate_ambiguities: self.integrate_ambiguities,
            min_one_way_gain: db_to_linear(self.min_one_way_gain_db),
            min_signal_to_ambiguity_ratio: db_to_linear(self.min_signal_to_ambiguity_ratio_db),
            land_fraction_threshold: self.land_fraction_threshold,
            sim_all_land: self.sim_all_land,
            range_ground_width_max: self.range_ground_width_max,
            azimuth_ground_width_max: self.azimuth_ground_width_max,
            range_resolution: self.range_resolution,
            azimuth_resolution: self.azimuth_resolution,
            replace_value_with_ambiguity_ratio: false,
        }
    }
}

impl ConfigElement for Integration {
    const KEY: &'static str = "integration";
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Pixels {
    pub range_pixels: usize,
    /// km
    pub range_spacing: f64,
    /// km
    pub azimuth_spacing: f64,
}

impl From<&Pixels> for PixelLayout {
    fn from(pixels: &Pixels) -> Self {
        PixelLayout {
            range_pixels: pixels.range_pixels,
            range_spacing: pixels.range_spacing,
            azimuth_spacing: pixels.azimuth_spacing,
        }
    }
}

impl ConfigElement for Pixels {
    const KEY: &'static str = "pixels";
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Tables {
    /// One ASCII BYU X table per beam, the radar equation is used if empty.
    #[serde(default)]
    pub byu_x_beams: Vec<PathBuf>,
    /// Binary Kpm table, model function errors are off if missing.
    pub kpm: Option<PathBuf>,
    /// Ambiguity index and table files, both or neither.
    pub ambiguity_index: Option<PathBuf>,
    pub ambiguity_data: Option<PathBuf>,
    #[serde(default)]
    pub ambiguity_layout: AmbigTableLayout,
    /// `[aux, data]` point target response files per beam, nominal resolutions if empty.
    #[serde(default)]
    pub ptr_beams: Vec<[PathBuf; 2]>,
}

impl ConfigElement for Tables {
    const KEY: &'static str = "tables";
}

/// All sections, as printed by `scatsim config`.
#[derive(Debug, Clone, Serialize)]
pub struct Settings {
    pub logging: Logging,
    pub simulation: Simulation,
    pub orbit: Orbit,
    pub instrument: Instrument,
    pub surface: Surface,
    pub integration: Integration,
    pub pixels: Pixels,
    pub tables: Tables,
}

impl Settings {
    pub fn load() -> Result<Self> {
        Ok(Self {
            logging: get_config_element()?,
            simulation: get_config_element()?,
            orbit: get_config_element()?,
            instrument: get_config_element()?,
            surface: get_config_element()?,
            integration: get_config_element()?,
            pixels: get_config_element()?,
            tables: get_config_element()?,
        })
    }
}

fn db_to_linear(db: f64) -> f64 {
    10_f64.powf(0.1 * db)
}
