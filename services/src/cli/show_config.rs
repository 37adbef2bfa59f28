use crate::config::Settings;
use crate::error::{self, Result};
use clap::Parser;
use snafu::ResultExt;

/// Prints the effective configuration
#[derive(Debug, Parser)]
pub struct ShowConfig {}

/// Renders the merged settings as TOML.
pub fn show_config(_params: &ShowConfig, settings: &Settings) -> Result<String> {
    toml::to_string_pretty(settings).context(error::RenderConfig)
}
