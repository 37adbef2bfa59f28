use crate::constants::SPEED_LIGHT_KPS;
use crate::primitives::MeasType;
use crate::util::test::TestDefault;
use serde::{Deserialize, Serialize};

/// Static radar parameters. All gains and losses are linear power ratios.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InstrumentParameters {
    /// Transmit power in W.
    pub transmit_power: f64,
    /// Receiver gain of the echo channel.
    pub rx_gain_echo: f64,
    /// Receiver gain of the noise channel.
    pub rx_gain_noise: f64,
    /// Loss between antenna port and receiver.
    pub loss_l13: f64,
    /// Loss between transmitter and antenna port.
    pub loss_l21: f64,
    /// Loss between transmitter and receiver through the calibration coupler.
    pub loss_l23: f64,
    /// Additional loss of the calibration loop.
    pub loss_calop: f64,
    pub system_loss: f64,
    /// System noise temperature in K.
    pub system_temperature: f64,
    /// Carrier frequency in Hz.
    pub tx_frequency: f64,
    /// Transmit pulse width in s.
    pub tx_pulse_width: f64,
    /// Receive gate width in s.
    pub receiver_gate_width: f64,
    /// Echo channel bandwidth in Hz.
    pub echo_bandwidth: f64,
    /// Noise channel bandwidth in Hz.
    pub noise_bandwidth: f64,
    /// Bandwidth of one science slice in Hz.
    pub slice_bandwidth: f64,
    pub calibration_bias: f64,
    /// Antenna spin rate in rad/s.
    pub spin_rate: f64,
    /// Pulse repetition interval in s.
    pub pri: f64,
    /// Pulses combined per measurement, 1 for real aperture operation.
    pub num_pulses: usize,
    pub num_range_looks_averaged: usize,
    pub beams: [BeamInfo; 2],
}

impl InstrumentParameters {
    /// Carrier wavelength in km.
    pub fn wavelength(&self) -> f64 {
        SPEED_LIGHT_KPS / self.tx_frequency
    }

    /// Noise-to-echo channel gain ratio (`beta`).
    pub fn channel_gain_ratio(&self) -> f64 {
        self.rx_gain_noise / self.rx_gain_echo
    }

    pub fn beam(&self, beam_idx: usize) -> Option<&BeamInfo> {
        self.beams.get(beam_idx)
    }
}

impl TestDefault for InstrumentParameters {
    fn test_default() -> Self {
        Self {
            transmit_power: 110.0,
            rx_gain_echo: 1.0,
            rx_gain_noise: 0.8,
            loss_l13: 1.259,
            loss_l21: 1.122,
            loss_l23: 1.0e3,
            loss_calop: 1.0,
            system_loss: 1.585,
            system_temperature: 730.0,
            tx_frequency: 13.402e9,
            tx_pulse_width: 1.5e-3,
            receiver_gate_width: 2.1e-3,
            echo_bandwidth: 80.0e3,
            noise_bandwidth: 1.0e6,
            slice_bandwidth: 8.0e3,
            calibration_bias: 1.0,
            spin_rate: 18.0 * std::f64::consts::TAU / 60.0,
            pri: 5.4e-3,
            num_pulses: 1,
            num_range_looks_averaged: 2,
            beams: [
                BeamInfo {
                    polarization: MeasType::Hh,
                    peak_gain: 10_f64.powf(4.17),
                    look_angle: 40.0_f64.to_radians(),
                    azimuth_offset: 0.0,
                    elevation_beamwidth: 1.4_f64.to_radians(),
                    azimuth_beamwidth: 1.6_f64.to_radians(),
                },
                BeamInfo {
                    polarization: MeasType::Vv,
                    peak_gain: 10_f64.powf(4.23),
                    look_angle: 46.0_f64.to_radians(),
                    azimuth_offset: 0.0,
                    elevation_beamwidth: 1.4_f64.to_radians(),
                    azimuth_beamwidth: 1.7_f64.to_radians(),
                },
            ],
        }
    }
}

/// Electrical description of one antenna beam.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BeamInfo {
    pub polarization: MeasType,
    /// Peak one-way power gain.
    pub peak_gain: f64,
    /// Boresight angle from the antenna spin axis in rad.
    pub look_angle: f64,
    /// Boresight azimuth relative to the antenna azimuth in rad.
    pub azimuth_offset: f64,
    /// One-way 3 dB widths in rad.
    pub elevation_beamwidth: f64,
    pub azimuth_beamwidth: f64,
}

/// Read-only snapshot of the instrument for one pulse.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InstrumentState {
    pub time: f64,
    pub beam_idx: usize,
    /// Antenna azimuth in rad, measured from the spacecraft velocity axis.
    pub antenna_azimuth: f64,
    pub encoder: u16,
    /// Fraction of the orbit elapsed since the ascending node, in `[0, 1)`.
    pub orbit_fraction: f64,
    /// Instrument mode, used by mode dependent tables.
    pub mode: usize,
    pub params: InstrumentParameters,
}

impl InstrumentState {
    pub fn beam(&self) -> Option<&BeamInfo> {
        self.params.beam(self.beam_idx)
    }
}

impl TestDefault for InstrumentState {
    fn test_default() -> Self {
        Self {
            time: 0.0,
            beam_idx: 0,
            antenna_azimuth: 0.0,
            encoder: 0,
            orbit_fraction: 0.0,
            mode: 0,
            params: InstrumentParameters::test_default(),
        }
    }
}
