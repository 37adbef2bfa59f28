//! Conversions between sigma0 and the signal plus noise energies seen by the echo and
//! noise channels, in both directions.

use super::xfactor::{XFactorInput, loopback_es_cal, radar_x};
use crate::error;
use crate::util::Result;
use crate::util::random::{RandomProcess, gamma, gaussian};
use rand::Rng;
use scatsim_datatypes::constants::{BOLTZMANN, SPEED_LIGHT_KPS};
use scatsim_datatypes::primitives::{InstrumentParameters, KpcCoefficients, Meas};
use serde::{Deserialize, Serialize};
use snafu::ensure;

/// Sigma0 magnitudes above this are treated as corrupt input.
const MAX_SIGMA0: f64 = 1.0e5;

/// Noise power spectral density behind a receiver with the given gain, W/Hz.
pub fn noise_density(params: &InstrumentParameters, rx_gain: f64) -> f64 {
    BOLTZMANN * params.system_temperature * rx_gain / params.loss_l13
}

/// Energies of a loopback (calibration) pulse in both channels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LoopbackEnergies {
    pub es_cal: f64,
    pub esn_echo: f64,
    pub esn_noise: f64,
}

/// Noise-only energies of a load pulse.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LoadEnergies {
    pub en_echo: f64,
    pub en_noise: f64,
}

/// Expected loopback energies for the transmit power receiver gain product `ptgr`.
///
/// With `kpri` the loopback signal is scaled by `1 + kpri(time)`.
pub fn ptgr_to_esn<R: Rng + ?Sized>(
    params: &InstrumentParameters,
    ptgr: f64,
    kpri: Option<&mut RandomProcess>,
    time: f64,
    rng: &mut R,
) -> Result<LoopbackEnergies> {
    let mut es_cal = loopback_es_cal(params, ptgr);
    if let Some(kpri) = kpri {
        es_cal *= 1.0 + kpri.sample(time, rng)?;
    }

    let en_cal = noise_density(params, params.rx_gain_echo)
        * params.echo_bandwidth
        * params.receiver_gate_width;
    let alpha = params.noise_bandwidth / params.echo_bandwidth;
    let beta = params.channel_gain_ratio();

    Ok(LoopbackEnergies {
        es_cal,
        esn_echo: es_cal + en_cal,
        esn_noise: beta * es_cal + alpha * beta * en_cal,
    })
}

pub fn make_load_measurements(params: &InstrumentParameters) -> LoadEnergies {
    let gate = params.receiver_gate_width;
    LoadEnergies {
        en_echo: noise_density(params, params.rx_gain_echo) * params.echo_bandwidth * gate,
        en_noise: noise_density(params, params.rx_gain_noise) * params.noise_bandwidth * gate,
    }
}

/// Part of the receive window a synthetic aperture burst is processed over: `range_pixels`
/// range cells of `range_resolution` km for each pulse.
pub fn burst_gate_width(
    params: &InstrumentParameters,
    range_resolution: f64,
    range_pixels: usize,
) -> f64 {
    range_pixels as f64 * 2.0 * range_resolution / SPEED_LIGHT_KPS * params.num_pulses.max(1) as f64
}

/// Echo channel noise energy of one synthetic aperture pixel, the whole echo band over one
/// range cell of every pulse. `n` pixels hold the noise of a [`burst_gate_width`] of `n`.
pub fn pixel_noise_energy(params: &InstrumentParameters, range_resolution: f64) -> f64 {
    noise_density(params, params.rx_gain_echo)
        * params.echo_bandwidth
        * burst_gate_width(params, range_resolution, 1)
}

/// Noise channel energy of a spot whose measurements hold echo channel signal plus noise
/// energies collected over `gate` seconds.
///
/// The noise channel sees the measurements scaled by `beta` plus the thermal noise of the
/// band outside of the echo channel. Slices use the receiver gate width, synthetic aperture
/// pixels the [`burst_gate_width`].
pub fn sigma0_to_esn_noise<R: Rng + ?Sized>(
    params: &InstrumentParameters,
    measurements: &[Meas],
    gate: f64,
    sim_kpc: bool,
    rng: &mut R,
) -> Result<f64> {
    let n0_noise = noise_density(params, params.rx_gain_noise);
    let extra_bandwidth = params.noise_bandwidth - params.echo_bandwidth;
    let beta = params.channel_gain_ratio();

    let mut esn_noise = n0_noise * extra_bandwidth * gate
        + measurements.iter().map(|m| m.value * beta).sum::<f64>();
    if sim_kpc {
        esn_noise += gaussian(0.0, extra_bandwidth * n0_noise * n0_noise * gate, rng)?;
    }
    Ok(esn_noise)
}

/// Recovered signal and noise energy of one measurement.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SignalNoise {
    pub es: f64,
    pub en: f64,
}

/// Separates signal and noise energy of one of `num_slices` measurements of a spot.
///
/// The channel bandwidth ratio is taken from the load pulse energies. A missing load or a
/// ratio that makes the system singular is an error, never a default.
pub fn er_to_es(
    beta: f64,
    esn_slice: f64,
    esn_echo: f64,
    esn_noise: f64,
    load: &LoadEnergies,
    num_slices: usize,
) -> Result<SignalNoise> {
    ensure!(load.en_echo != 0.0, error::ZeroLoadEnergy);
    ensure!(
        beta != 0.0,
        error::DegenerateCalibration { alpha: f64::NAN, beta }
    );
    let alpha = (1.0 / beta) * load.en_noise / load.en_echo;
    #[allow(clippy::float_cmp)]
    let singular = alpha == 1.0;
    ensure!(!singular, error::DegenerateCalibration { alpha, beta });
    ensure!(
        num_slices > 0,
        error::InvalidParameter {
            name: "number of slices",
            reason: "a spot needs at least one measurement".to_string()
        }
    );

    let en_spot = (esn_echo - esn_noise / beta) / (1.0 - alpha);
    let en = en_spot / num_slices as f64;
    Ok(SignalNoise {
        es: esn_slice - en,
        en,
    })
}

/// Simulated energies of one measurement.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EsnSample {
    /// Energy calibration factor used for the sample.
    pub x: f64,
    pub esn: f64,
    pub es: f64,
    /// Noise energy inside the transmit pulse.
    pub en_pulse: f64,
    pub en: f64,
    pub variance: f64,
}

/// Signal plus noise energy of a measurement with calibration factor `x` (energy units)
/// looking at `sigma0`.
///
/// With `sim_kpc` the energy is drawn from a Gamma distribution with the radiometer
/// variance `(Es + En1)² / (B Tp) + N0² B (Tg - Tp)`.
pub fn meas_to_esn_x<R: Rng + ?Sized>(
    params: &InstrumentParameters,
    meas: &Meas,
    x: f64,
    sigma0: f64,
    sim_kpc: bool,
    rng: &mut R,
) -> Result<EsnSample> {
    ensure!(
        sigma0.abs() <= MAX_SIGMA0,
        error::InvalidSigma0 { sigma0 }
    );

    let n0 = noise_density(params, params.rx_gain_echo);
    let bandwidth = meas.bandwidth;
    let tp = meas.tx_pulse_width;
    let tg = params.receiver_gate_width;

    let es = x * sigma0;
    let en_pulse = n0 * bandwidth * tp;
    let en = en_pulse + n0 * bandwidth * (tg - tp);
    let mean = es + en;

    let variance = if sim_kpc {
        (es + en_pulse).powi(2) / (bandwidth * tp) + n0 * n0 * bandwidth * (tg - tp)
    } else {
        0.0
    };
    let esn = if sim_kpc {
        gamma(mean, variance, rng)?
    } else {
        mean
    };

    Ok(EsnSample {
        x,
        esn,
        es,
        en_pulse,
        en,
        variance,
    })
}

/// [`meas_to_esn_x`] with `X = radar_x · K · Tp`.
///
/// `None` if the centroid is outside of the antenna pattern.
pub fn meas_to_esn_k<R: Rng + ?Sized>(
    geometry: &XFactorInput<'_>,
    k_factor: f64,
    sigma0: f64,
    sim_kpc: bool,
    rng: &mut R,
) -> Result<Option<EsnSample>> {
    let Some(x) = radar_x(
        geometry.gc_to_antenna,
        geometry.rsat,
        geometry.antenna,
        geometry.state,
        geometry.meas,
    ) else {
        return Ok(None);
    };
    let params = &geometry.state.params;
    let x = x * k_factor * geometry.meas.tx_pulse_width;
    meas_to_esn_x(params, geometry.meas, x, sigma0, sim_kpc, rng).map(Some)
}

/// How the Kpc coefficients of an inverted measurement are approximated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KpcModel {
    /// Radiometer statistics of a Doppler slice.
    Slice,
    /// Synthetic aperture pixel averaged over this many range looks.
    RangeLooks(usize),
}

/// Spot level energies an inversion needs besides the measurement itself.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpotEnergies {
    pub esn_echo: f64,
    pub esn_noise: f64,
    pub load: LoadEnergies,
    pub num_slices: usize,
}

/// Inverts the energy in `meas.value` into sigma0 and attaches Kpc coefficients.
pub fn compute_sigma0(
    params: &InstrumentParameters,
    meas: &mut Meas,
    spot: &SpotEnergies,
    kpc_model: KpcModel,
) -> Result<()> {
    let SignalNoise { es, en } = er_to_es(
        params.channel_gain_ratio(),
        meas.value,
        spot.esn_echo,
        spot.esn_noise,
        &spot.load,
        spot.num_slices,
    )?;
    let xk = meas.checked_xk()?;

    meas.value = es / xk;
    meas.en_slice = en;
    meas.kpc = Some(match kpc_model {
        KpcModel::Slice => slice_kpc_coefficients(params, meas, en, xk),
        KpcModel::RangeLooks(looks) => {
            ensure!(
                looks > 0,
                error::InvalidParameter {
                    name: "range looks",
                    reason: "at least one look is required".to_string()
                }
            );
            let looks = looks as f64;
            let s0ne = en / xk;
            KpcCoefficients::new(1.0 + 1.0 / looks, 2.0 * s0ne / looks, s0ne * s0ne / looks)
        }
    });
    Ok(())
}

/// Radiometer Kpc of a Doppler slice with noise energy `en` and calibration `xk`.
pub fn slice_kpc_coefficients(
    params: &InstrumentParameters,
    meas: &Meas,
    en: f64,
    xk: f64,
) -> KpcCoefficients {
    let n0 = noise_density(params, params.rx_gain_echo);
    let bandwidth = meas.bandwidth;
    let tp = meas.tx_pulse_width;
    let tg = params.receiver_gate_width;
    let bt = bandwidth * tp;

    let en_pulse = n0 * bt;
    let c = en_pulse * en_pulse / bt
        + n0 * n0 * bandwidth * (tg - tp)
        + en * en / (params.noise_bandwidth * tg);
    KpcCoefficients::new(1.0 + 1.0 / bt, 2.0 * en_pulse / (bt * xk), c / (xk * xk))
}
