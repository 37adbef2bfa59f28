//! Physical and instrument constants shared by the tables and the radar core.

/// Speed of light in km/s.
pub const SPEED_LIGHT_KPS: f64 = 299_792.458;

/// Boltzmann constant in J/K.
pub const BOLTZMANN: f64 = 1.380_650_3e-23;

/// Width of one processor FFT bin in Hz. Doppler offsets are normalized by this value
/// before the X and Fbb polynomials are evaluated.
pub const FFT_BIN_SIZE: f64 = 1_953.125;

/// Geodetic semi-major axis (WGS-84) in km.
pub const EARTH_EQUATORIAL_RADIUS: f64 = 6_378.137;

/// First eccentricity squared (WGS-84).
pub const EARTH_ECCENTRICITY_SQUARED: f64 = 0.006_694_379_990_14;

/// Geodetic semi-minor axis (WGS-84) in km.
pub const EARTH_POLAR_RADIUS: f64 = 6_356.752_314_245;

/// Nominal orbit period used by the orbit/azimuth tables, in seconds.
pub const NOMINAL_ORBIT_PERIOD: f64 = 6_060.0;

/// Spacing of the orbit-time bins of the orbit/azimuth tables, in seconds.
/// The last bin does not reach a full step before the orbit closes.
pub const ORBIT_TIME_STEP: f64 = 190.0;

/// Number of orbit-time bins of the orbit/azimuth tables.
pub const ORBIT_POSITION_BINS: usize = 32;

/// Number of azimuth bins of the orbit/azimuth tables (10° spacing).
pub const AZIMUTH_BINS: usize = 36;
