//! Radar equation, calibration factors and the energy model of the echo and noise channels.

pub mod energy;
mod xfactor;

pub use energy::{
    EsnSample, KpcModel, LoadEnergies, LoopbackEnergies, SignalNoise, SpotEnergies,
    burst_gate_width, compute_sigma0, er_to_es, make_load_measurements, meas_to_esn_k,
    meas_to_esn_x, noise_density, pixel_noise_energy, ptgr_to_esn, sigma0_to_esn_noise,
    slice_kpc_coefficients,
};
pub use xfactor::{
    LookAngles, TopoCorrection, XFactorEngine, XFactorInput, XFactorStrategy,
    burst_radar_constant, loopback_es_cal, radar_x, radar_x_ptgr, radar_xcal, true_es_cal,
};
