use snafu::Snafu;
use std::path::PathBuf;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
#[snafu(context(suffix(false)))] // disables default `Snafu` suffix
pub enum Error {
    #[snafu(display("{source}"))]
    DataType {
        source: scatsim_datatypes::error::Error,
    },
    #[snafu(display("{source}"))]
    Operator {
        source: scatsim_operators::error::Error,
    },

    #[snafu(display("Configuration error: {source}"))]
    Config {
        source: config::ConfigError,
    },

    #[snafu(display("The configuration lock is poisoned"))]
    ConfigLockFailed,

    #[snafu(display("Invalid log spec `{spec}`: {source}"))]
    InvalidLogSpec {
        spec: String,
        source: tracing_subscriber::filter::ParseError,
    },

    #[snafu(display("A global logger is already installed: {source}"))]
    LoggerAlreadyInstalled {
        source: tracing_subscriber::util::TryInitError,
    },

    #[snafu(display("Unknown polarization `{polarization}`"))]
    InvalidPolarization {
        polarization: String,
    },

    #[snafu(display("The ambiguity index and table files must be configured together"))]
    IncompleteAmbiguityTable,

    #[snafu(display("Cannot render the configuration: {source}"))]
    RenderConfig {
        source: toml::ser::Error,
    },

    #[snafu(display("Cannot write the summary to {}: {source}", path.display()))]
    Summary {
        path: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("Cannot serialize the summary: {source}"))]
    SerdeJson {
        source: serde_json::Error,
    },
}

impl From<scatsim_datatypes::error::Error> for Error {
    fn from(e: scatsim_datatypes::error::Error) -> Self {
        Self::DataType { source: e }
    }
}

impl From<scatsim_operators::error::Error> for Error {
    fn from(e: scatsim_operators::error::Error) -> Self {
        Self::Operator { source: e }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Self::SerdeJson { source: e }
    }
}
