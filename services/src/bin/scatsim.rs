use clap::{Parser, Subcommand};
use scatsim_services::cli::{ShowConfig, Simulate, report, show_config, simulate};
use scatsim_services::config::{Logging, Settings, add_settings_file, get_config_element};
use scatsim_services::error::Result;
use scatsim_services::logging::init_logging;
use std::path::PathBuf;

/// Spaceborne scatterometer simulator
#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Additional settings file merged over `Settings.toml`
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Simulates pulses and writes the measurement records
    Simulate(Simulate),

    /// Prints the effective configuration
    #[command(name = "config")]
    ShowConfig(ShowConfig),
}

impl Commands {
    #[allow(clippy::print_stdout)]
    fn execute(self, settings: &Settings) -> Result<()> {
        match self {
            Commands::Simulate(params) => {
                let summary = simulate(&params, settings)?;
                report(&params, &summary)
            }
            Commands::ShowConfig(params) => {
                println!("{}", show_config(&params, settings)?);
                Ok(())
            }
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    if let Some(path) = &cli.settings {
        add_settings_file(path)?;
    }
    init_logging(&get_config_element::<Logging>()?)?;

    let settings = Settings::load()?;
    cli.command.execute(&settings)
}

#[allow(clippy::print_stderr)]
fn main() {
    let cli = Cli::parse();

    if let Err(err) = run(cli) {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}
