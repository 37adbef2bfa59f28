use crate::config::Logging;
use crate::error::{self, Result};
use snafu::ResultExt;
use tracing::Subscriber;
use tracing_subscriber::layer::Filter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{EnvFilter, Layer};

/// Installs the global tracing subscriber. Records of the `log` crate are forwarded to it.
pub fn init_logging(logging_config: &Logging) -> Result<()> {
    // create a filter for the log message level in console output
    let console_filter =
        EnvFilter::try_new(&logging_config.log_spec).context(error::InvalidLogSpec {
            spec: logging_config.log_spec.clone(),
        })?;

    // get a new tracing subscriber registry and add the console layer to it
    tracing_subscriber::Registry::default()
        .with(console_layer_with_filter(console_filter))
        .try_init()
        .context(error::LoggerAlreadyInstalled)
}

fn console_layer_with_filter<S, F: Filter<S> + 'static>(filter: F) -> impl Layer<S>
where
    S: Subscriber,
    for<'a> S: LookupSpan<'a>,
{
    tracing_subscriber::fmt::layer()
        .with_file(false)
        .with_target(true)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(filter)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_specs_are_reported() {
        let logging = Logging {
            log_spec: "scatsim=verbose[".to_string(),
        };
        assert!(matches!(
            init_logging(&logging),
            Err(error::Error::InvalidLogSpec { .. })
        ));
    }
}
