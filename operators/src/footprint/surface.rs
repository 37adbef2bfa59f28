use crate::engine::{GeophysicalModel, LandMap, RainField, WindField, WindVector};
use crate::error;
use crate::util::Result;
use crate::util::random::gamma;
use rand::Rng;
use rand_distr::{Distribution, StandardNormal};
use scatsim_datatypes::primitives::{LandFlag, MeasType};
use scatsim_datatypes::tables::{KpmTable, Table};
use serde::{Deserialize, Serialize};
use snafu::ensure;
use std::f64::consts::{FRAC_PI_2, PI, TAU};
use std::sync::Arc;

/// How model function errors are added to the simulated sigma0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum KpmMode {
    #[default]
    Off,
    /// Independent Gamma draw per sample.
    Uncorrelated,
    /// Multiplier from a spatially correlated field.
    Correlated,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SurfaceOptions {
    /// Replaces the wind field by a constant sigma0 everywhere.
    pub uniform_sigma0: Option<f64>,
    /// Per beam sigma0 used over land.
    pub land_sigma0: [f64; 2],
    /// Land is simulated with the ocean model instead of the constant land sigma0.
    pub sim_land: bool,
    /// Check every integration cell against the land map.
    pub sim_coast: bool,
    pub kpm: KpmMode,
}

impl Default for SurfaceOptions {
    fn default() -> Self {
        Self {
            uniform_sigma0: None,
            land_sigma0: [0.1, 0.1],
            sim_land: false,
            sim_coast: false,
            kpm: KpmMode::Off,
        }
    }
}

/// Sigma0 of a surface point and whether it lies on land.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceSample {
    pub sigma0: f64,
    pub is_land: bool,
}

/// Observation geometry of a surface point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Look {
    pub meas_type: MeasType,
    pub beam_idx: usize,
    pub incidence_angle: f64,
    pub east_azimuth: f64,
}

/// Unit Gaussian field with spatial correlation, sampled on a lon/lat lattice and
/// interpolated bilinearly in between.
#[derive(Debug, Clone, PartialEq)]
pub struct KpmField {
    lon_step: f64,
    lat_step: f64,
    /// `[lat][lon]`
    nodes: Table<2>,
}

impl KpmField {
    /// Draws a field whose lattice spacing is `correlation_length` (rad).
    pub fn new<R: Rng + ?Sized>(correlation_length: f64, rng: &mut R) -> Result<Self> {
        ensure!(
            correlation_length > 0.0 && correlation_length <= FRAC_PI_2,
            error::InvalidParameter {
                name: "Kpm correlation length",
                reason: format!("{correlation_length} rad is not in (0, pi/2]")
            }
        );

        let lon_nodes = (TAU / correlation_length).ceil() as usize;
        let lat_nodes = (PI / correlation_length).ceil() as usize + 1;
        let values = (0..lon_nodes * lat_nodes)
            .map(|_| StandardNormal.sample(rng))
            .collect();

        Ok(Self {
            lon_step: TAU / lon_nodes as f64,
            lat_step: PI / (lat_nodes - 1) as f64,
            nodes: Table::new([lat_nodes, lon_nodes], values)?,
        })
    }

    pub fn value(&self, lon: f64, lat: f64) -> Result<f64> {
        let [lat_nodes, lon_nodes] = self.nodes.shape();

        let x = lon.rem_euclid(TAU) / self.lon_step;
        let i0 = (x.floor() as usize).min(lon_nodes - 1);
        let i1 = (i0 + 1) % lon_nodes;

        let y = ((lat + FRAC_PI_2) / self.lat_step).clamp(0.0, (lat_nodes - 1) as f64);
        let j0 = (y.floor() as usize).min(lat_nodes - 2);
        let j1 = j0 + 1;

        let (fx, fy) = (x - i0 as f64, y - j0 as f64);
        let south = (1.0 - fx) * self.nodes.get([j0, i0])? + fx * self.nodes.get([j0, i1])?;
        let north = (1.0 - fx) * self.nodes.get([j1, i0])? + fx * self.nodes.get([j1, i1])?;
        Ok((1.0 - fy) * south + fy * north)
    }

    /// Multiplicative model function error `max(0, 1 + kpm · g(lon, lat))`.
    pub fn multiplier(&self, kpm: f64, lon: f64, lat: f64) -> Result<f64> {
        Ok((1.0 + kpm * self.value(lon, lat)?).max(0.0))
    }
}

/// Backscatter of the simulated surface: wind through the model function, land, rain
/// and model function errors.
#[derive(Clone)]
pub struct SurfaceModel {
    wind: Arc<dyn WindField>,
    gmf: Arc<dyn GeophysicalModel>,
    land: Arc<dyn LandMap>,
    rain: Option<Arc<dyn RainField>>,
    kpm_table: Option<Arc<KpmTable>>,
    kpm_field: Option<Arc<KpmField>>,
    options: SurfaceOptions,
}

impl std::fmt::Debug for SurfaceModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SurfaceModel")
            .field("options", &self.options)
            .field("rain", &self.rain.is_some())
            .finish_non_exhaustive()
    }
}

impl SurfaceModel {
    pub fn new(
        wind: Arc<dyn WindField>,
        gmf: Arc<dyn GeophysicalModel>,
        land: Arc<dyn LandMap>,
        options: SurfaceOptions,
    ) -> Self {
        Self {
            wind,
            gmf,
            land,
            rain: None,
            kpm_table: None,
            kpm_field: None,
            options,
        }
    }

    /// Adds surface rain. Volumetric rain fields are rejected.
    pub fn with_rain(mut self, rain: Arc<dyn RainField>) -> Result<Self> {
        ensure!(!rain.is_three_dimensional(), error::LegacyRainModel);
        self.rain = Some(rain);
        Ok(self)
    }

    pub fn with_kpm(mut self, table: Arc<KpmTable>, field: Option<Arc<KpmField>>) -> Self {
        self.kpm_table = Some(table);
        self.kpm_field = field;
        self
    }

    pub fn options(&self) -> &SurfaceOptions {
        &self.options
    }

    pub fn is_land(&self, lon: f64, lat: f64) -> bool {
        self.land.is_land(lon, lat)
    }

    pub fn land_flag(&self, lon: f64, lat: f64) -> LandFlag {
        if self.land.is_land(lon, lat) {
            LandFlag::Land
        } else {
            LandFlag::Ocean
        }
    }

    fn land_sigma0(&self, beam_idx: usize) -> Result<f64> {
        self.options
            .land_sigma0
            .get(beam_idx)
            .copied()
            .ok_or(error::Error::DataType {
                source: scatsim_datatypes::error::Error::InvalidBeam {
                    beam: beam_idx,
                    beams: self.options.land_sigma0.len(),
                },
            })
    }

    /// Rain contaminated model function sigma0 and the wind speed it was computed for.
    fn wind_sigma0(&self, look: &Look, lon: f64, lat: f64) -> Result<(f64, f64)> {
        let wind = self.wind.wind_vector(lon, lat).unwrap_or(WindVector::default());
        let chi = wind.direction - look.east_azimuth + PI;
        let mut sigma0 = self
            .gmf
            .sigma0(look.meas_type, look.incidence_angle, wind.speed, chi)?;

        if let Some(contamination) = self
            .rain
            .as_ref()
            .and_then(|rain| rain.contamination(lon, lat, look.incidence_angle))
        {
            sigma0 = contamination.apply(sigma0);
        }
        Ok((sigma0, wind.speed))
    }

    fn fuzz_kpm<R: Rng + ?Sized>(
        &self,
        sigma0: f64,
        look: &Look,
        speed: f64,
        lon: f64,
        lat: f64,
        rng: &mut R,
    ) -> Result<f64> {
        let kpm = match (self.options.kpm, &self.kpm_table) {
            (KpmMode::Off, _) => return Ok(sigma0),
            (_, Some(table)) => table.kpm(look.meas_type, speed)?,
            (_, None) => {
                return error::InvalidParameter {
                    name: "Kpm",
                    reason: "Kpm simulation requires a Kpm table".to_string(),
                }
                .fail();
            }
        };

        match (self.options.kpm, &self.kpm_field) {
            (KpmMode::Correlated, Some(field)) => Ok(sigma0 * field.multiplier(kpm, lon, lat)?),
            (KpmMode::Correlated, None) => error::InvalidParameter {
                name: "Kpm",
                reason: "correlated Kpm requires a Kpm field".to_string(),
            }
            .fail(),
            _ => gamma(sigma0, sigma0 * sigma0 * kpm * kpm, rng),
        }
    }

    /// Sigma0 at the centroid of a measurement whose land flag is already known.
    pub fn centroid_sigma0<R: Rng + ?Sized>(
        &self,
        look: &Look,
        land_flag: LandFlag,
        lon: f64,
        lat: f64,
        rng: &mut R,
    ) -> Result<f64> {
        if let Some(uniform) = self.options.uniform_sigma0 {
            return Ok(uniform);
        }
        if land_flag == LandFlag::Land && !self.options.sim_land {
            return self.land_sigma0(look.beam_idx);
        }
        let (sigma0, speed) = self.wind_sigma0(look, lon, lat)?;
        self.fuzz_kpm(sigma0, look, speed, lon, lat, rng)
    }

    /// Sigma0 of one integration cell. Land is only looked up when coasts are simulated.
    pub fn cell_sigma0<R: Rng + ?Sized>(
        &self,
        look: &Look,
        lon: f64,
        lat: f64,
        rng: &mut R,
    ) -> Result<SurfaceSample> {
        let is_land = self.options.sim_coast && self.land.is_land(lon, lat);

        let sigma0 = if let Some(uniform) = self.options.uniform_sigma0 {
            uniform
        } else if is_land {
            self.land_sigma0(look.beam_idx)?
        } else {
            let (sigma0, speed) = self.wind_sigma0(look, lon, lat)?;
            self.fuzz_kpm(sigma0, look, speed, lon, lat, rng)?
        };
        Ok(SurfaceSample { sigma0, is_land })
    }

    /// Noise free sigma0 at the position of an ambiguity. Land is always looked up unless
    /// the field is uniform.
    pub fn ambiguity_sigma0(&self, look: &Look, lon: f64, lat: f64) -> Result<SurfaceSample> {
        if let Some(uniform) = self.options.uniform_sigma0 {
            return Ok(SurfaceSample {
                sigma0: uniform,
                is_land: false,
            });
        }
        if self.land.is_land(lon, lat) {
            return Ok(SurfaceSample {
                sigma0: self.land_sigma0(look.beam_idx)?,
                is_land: true,
            });
        }
        let (sigma0, _) = self.wind_sigma0(look, lon, lat)?;
        Ok(SurfaceSample {
            sigma0,
            is_land: false,
        })
    }
}
