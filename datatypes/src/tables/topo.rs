use super::Table;
use crate::constants::FFT_BIN_SIZE;
use crate::util::Result;
use crate::util::binary::BinaryTableReader;
use std::f64::consts::{FRAC_PI_2, PI, TAU};
use std::path::Path;

pub const TOPO_LATITUDES: usize = 721;
pub const TOPO_LONGITUDES: usize = 1440;

pub const STABLE_BEAMS: usize = 2;
pub const STABLE_AZIMUTHS: usize = 36;
pub const STABLE_ORBIT_STEPS: usize = 32;
pub const STABLE_MODES: usize = 8;

/// Digital elevation model on a regular quarter degree grid, heights in m.
#[derive(Debug, Clone, PartialEq)]
pub struct Topo {
    /// `[latitude][longitude]`, latitude from the south pole
    map: Table<2>,
}

impl Topo {
    pub fn read(path: &Path) -> Result<Self> {
        let mut reader = BinaryTableReader::open(path)?;
        reader.skip_fortran_header()?;

        let data = (0..TOPO_LATITUDES * TOPO_LONGITUDES)
            .map(|_| reader.read_i16().map(f64::from))
            .collect::<Result<Vec<_>>>()?;
        log::info!("read topography {}", path.display());

        Self::from_table(Table::new([TOPO_LATITUDES, TOPO_LONGITUDES], data)?)
    }

    pub fn from_table(map: Table<2>) -> Result<Self> {
        Ok(Self { map })
    }

    /// Height of the grid cell nearest to the geodetic position (rad).
    pub fn height(&self, lon: f64, lat: f64) -> Result<f64> {
        let [lats, lons] = self.map.shape();
        let lon_idx = (lons as f64 * lon.rem_euclid(TAU) / TAU + 0.5) as usize % lons;
        let lat_idx = ((lats - 1) as f64 * (lat.clamp(-FRAC_PI_2, FRAC_PI_2) + FRAC_PI_2) / PI
            + 0.5) as usize;
        self.map.get([lat_idx.min(lats - 1), lon_idx])
    }
}

/// S factors converting terrain height into Doppler bin offsets, per beam, antenna
/// azimuth, orbit step and instrument mode.
#[derive(Debug, Clone, PartialEq)]
pub struct Stable {
    /// `[beam][azimuth][orbit_step][mode]`
    table: Table<4>,
}

impl Stable {
    pub fn read(path: &Path) -> Result<Self> {
        let mut reader = BinaryTableReader::open(path)?;
        reader.skip_fortran_header()?;
        let shape = [STABLE_BEAMS, STABLE_AZIMUTHS, STABLE_ORBIT_STEPS, STABLE_MODES];
        let data = reader.read_f32_vec(shape.iter().product())?;
        log::info!("read S factor table {}", path.display());

        Ok(Self {
            table: Table::new(shape, data)?,
        })
    }

    pub fn from_table(table: Table<4>) -> Self {
        Self { table }
    }

    /// Bilinear in orbit fraction and antenna azimuth, both periodic. Unknown beams and modes
    /// have no topographic sensitivity.
    pub fn s_factor(
        &self,
        beam: usize,
        antenna_azimuth: f64,
        orbit_fraction: f64,
        mode: usize,
    ) -> Result<f64> {
        let [beams, azimuths, orbit_steps, modes] = self.table.shape();
        if beam >= beams || mode >= modes {
            return Ok(0.0);
        }

        let orbit_step = orbit_fraction.rem_euclid(1.0) * orbit_steps as f64;
        let o1 = orbit_step.floor();
        let a = orbit_step - o1;
        let o1 = o1 as usize % orbit_steps;
        let o2 = (o1 + 1) % orbit_steps;

        let angle = antenna_azimuth.rem_euclid(TAU) * azimuths as f64 / TAU;
        let z1 = angle.floor();
        let c = angle - z1;
        let z1 = z1 as usize % azimuths;
        let z2 = (z1 + 1) % azimuths;

        Ok((1.0 - a) * (1.0 - c) * self.table.get([beam, z1, o1, mode])?
            + (1.0 - a) * c * self.table.get([beam, z2, o1, mode])?
            + a * (1.0 - c) * self.table.get([beam, z1, o2, mode])?
            + a * c * self.table.get([beam, z2, o2, mode])?)
    }
}

/// Doppler offset (Hz) caused by the terrain height at a position.
#[allow(clippy::too_many_arguments)]
pub fn topo_delta_f(
    topo: &Topo,
    stable: &Stable,
    beam: usize,
    orbit_fraction: f64,
    antenna_azimuth: f64,
    mode: usize,
    lon: f64,
    lat: f64,
) -> Result<f64> {
    let height = topo.height(lon, lat)?;
    let s = stable.s_factor(beam, antenna_azimuth, orbit_fraction, mode)?;
    Ok(s * height * FFT_BIN_SIZE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::binary::f32_le_bytes;
    use float_cmp::approx_eq;

    fn stable_filled(value: impl Fn([usize; 4]) -> f64) -> Stable {
        let shape = [STABLE_BEAMS, STABLE_AZIMUTHS, STABLE_ORBIT_STEPS, STABLE_MODES];
        let mut table = Table::new_filled(shape, 0.0);
        for b in 0..shape[0] {
            for z in 0..shape[1] {
                for o in 0..shape[2] {
                    for m in 0..shape[3] {
                        table.set([b, z, o, m], value([b, z, o, m])).unwrap();
                    }
                }
            }
        }
        Stable::from_table(table)
    }

    #[test]
    fn it_reads_the_topography() {
        let mut bytes = vec![0_u8; 4];
        for lat in 0..TOPO_LATITUDES {
            for _ in 0..TOPO_LONGITUDES {
                bytes.extend_from_slice(&((lat % 100) as i16).to_le_bytes());
            }
        }
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), bytes).unwrap();

        let topo = Topo::read(file.path()).unwrap();
        assert!(approx_eq!(f64, topo.height(0.3, -FRAC_PI_2).unwrap(), 0.0));
        // the equator is row 360
        assert!(approx_eq!(f64, topo.height(-0.3, 0.0).unwrap(), 60.0));
        assert!(approx_eq!(f64, topo.height(TAU, FRAC_PI_2).unwrap(), 20.0));
    }

    #[test]
    fn s_factor_interpolates_and_wraps() {
        let stable = stable_filled(|[_, z, o, _]| (z + 100 * o) as f64);
        let half_azimuth = 0.5 * TAU / STABLE_AZIMUTHS as f64;
        let value = stable.s_factor(0, half_azimuth, 0.0, 3).unwrap();
        assert!(approx_eq!(f64, value, 0.5, epsilon = 1e-9));

        // between the last orbit step and step 0
        let value = stable
            .s_factor(1, 0.0, (STABLE_ORBIT_STEPS as f64 - 0.5) / STABLE_ORBIT_STEPS as f64, 0)
            .unwrap();
        assert!(approx_eq!(f64, value, 0.5 * 3100.0, epsilon = 1e-6));

        assert!(approx_eq!(f64, stable.s_factor(2, 0.0, 0.0, 0).unwrap(), 0.0));
        assert!(approx_eq!(f64, stable.s_factor(0, 0.0, 0.0, STABLE_MODES).unwrap(), 0.0));
    }

    #[test]
    fn it_reads_the_s_factor_table() {
        let count = STABLE_BEAMS * STABLE_AZIMUTHS * STABLE_ORBIT_STEPS * STABLE_MODES;
        let mut bytes = vec![0_u8; 4];
        bytes.extend(f32_le_bytes(&vec![0.5; count]));
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), bytes).unwrap();

        let stable = Stable::read(file.path()).unwrap();
        let topo = Topo::from_table(Table::new_filled([TOPO_LATITUDES, TOPO_LONGITUDES], 100.0))
            .unwrap();
        let delta_f = topo_delta_f(&topo, &stable, 0, 0.2, 1.0, 2, 1.0, 0.4).unwrap();
        assert!(approx_eq!(f64, delta_f, 50.0 * FFT_BIN_SIZE, epsilon = 1e-6));
    }
}
