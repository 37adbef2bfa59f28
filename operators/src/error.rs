use snafu::Snafu;
use std::path::PathBuf;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
#[snafu(context(suffix(false)))] // disables default `Snafu` suffix
pub enum Error {
    #[snafu(display("DataTypeError: {}", source))]
    DataType {
        source: scatsim_datatypes::error::Error,
    },

    #[snafu(display("Echo channel load energy is 0, cannot estimate the bandwidth ratio"))]
    ZeroLoadEnergy,

    #[snafu(display(
        "Degenerate calibration state: alpha = {}, beta = {}",
        alpha,
        beta
    ))]
    DegenerateCalibration {
        alpha: f64,
        beta: f64,
    },

    #[snafu(display("No load and loopback calibration is available for spot at {} s", time))]
    MissingCalibration {
        time: f64,
    },

    #[snafu(display("Invalid sigma0 {} for energy conversion", sigma0))]
    InvalidSigma0 {
        sigma0: f64,
    },

    #[snafu(display("The number of averaged range looks must be even, got {}", looks))]
    OddRangeLooks {
        looks: usize,
    },

    #[snafu(display(
        "Too many integration bins: {} x {} exceeds {} x {}",
        range_bins,
        azimuth_bins,
        max_range_bins,
        max_azimuth_bins
    ))]
    TooManyIntegrationBins {
        range_bins: usize,
        azimuth_bins: usize,
        max_range_bins: usize,
        max_azimuth_bins: usize,
    },

    #[snafu(display(
        "The three dimensional rain model is a known-incorrect legacy path and is not supported"
    ))]
    LegacyRainModel,

    #[snafu(display("Scan angle {} deg is out of range", scan_angle))]
    InvalidScanAngle {
        scan_angle: f64,
    },

    #[snafu(display("Antenna beam {} has no electrical boresight", beam))]
    MissingBoresight {
        beam: usize,
    },

    #[snafu(display("The boresight of beam {} does not intersect the earth", beam))]
    BoresightMissesEarth {
        beam: usize,
    },

    #[snafu(display("Invalid parameter {}: {}", name, reason))]
    InvalidParameter {
        name: &'static str,
        reason: String,
    },

    #[snafu(display("Invalid {} distribution: {}", distribution, reason))]
    InvalidDistribution {
        distribution: &'static str,
        reason: String,
    },

    #[snafu(display("Could not create check frame file {}: {}", path.display(), source))]
    CheckFrameFile {
        source: std::io::Error,
        path: PathBuf,
    },

    #[snafu(display("Could not write check frame record: {}", source))]
    CheckFrameWrite {
        source: csv::Error,
    },

    #[snafu(display("Could not build the worker thread pool: {}", source))]
    ThreadPool {
        source: rayon::ThreadPoolBuildError,
    },
}

impl From<scatsim_datatypes::error::Error> for Error {
    fn from(datatype_error: scatsim_datatypes::error::Error) -> Self {
        Self::DataType {
            source: datatype_error,
        }
    }
}

impl From<csv::Error> for Error {
    fn from(source: csv::Error) -> Self {
        Self::CheckFrameWrite { source }
    }
}
