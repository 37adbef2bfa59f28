mod show_config;
mod simulate;

pub use show_config::{ShowConfig, show_config};
pub use simulate::{RunSummary, Simulate, build_simulator, report, simulate};
