use assert_cmd::prelude::*;
use std::process::Command;

#[test]
fn prints_the_effective_configuration() {
    let output = Command::cargo_bin("scatsim")
        .unwrap()
        .env("SCATSIM__PIXELS__RANGE_PIXELS", "3")
        .arg("config")
        .output()
        .unwrap();

    assert!(output.status.success());
    let rendered: toml::Value = toml::from_str(&String::from_utf8(output.stdout).unwrap()).unwrap();
    assert_eq!(rendered["pixels"]["range_pixels"].as_integer(), Some(3));
}

#[test]
fn simulates_and_reports_a_summary() {
    let dir = tempfile::tempdir().unwrap();
    let output_path = dir.path().join("checkframes.csv");

    let output = Command::cargo_bin("scatsim")
        .unwrap()
        .env("SCATSIM__SURFACE__UNIFORM_SIGMA0", "0.02")
        .env("SCATSIM__SIMULATION__SIM_KPC", "false")
        .env("SCATSIM__PIXELS__RANGE_PIXELS", "2")
        .args(["simulate", "--pulses", "4", "--output"])
        .arg(&output_path)
        .output()
        .unwrap();

    assert!(output.status.success());
    let summary: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(
        summary["spots"].as_u64().unwrap()
            + summary["loopbackPulses"].as_u64().unwrap()
            + summary["loadPulses"].as_u64().unwrap(),
        4
    );
    assert!(output_path.exists());
}

#[test]
fn rejects_a_broken_log_spec() {
    let output = Command::cargo_bin("scatsim")
        .unwrap()
        .env("SCATSIM__LOGGING__LOG_SPEC", "scatsim=verbose[")
        .arg("config")
        .output()
        .unwrap();

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).starts_with("Error:"));
}
