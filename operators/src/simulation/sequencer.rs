use crate::error;
use crate::util::Result;
use serde::{Deserialize, Serialize};
use snafu::ensure;
use std::f64::consts::TAU;

/// Last encoder count before the antenna passes 90° azimuth.
pub const NINETY_DEGREE_ENCODER: u16 = 8191;

/// Encoder counts per antenna revolution.
pub const ENCODER_COUNTS: f64 = 32_768.0;

/// Encoder reading of an antenna azimuth (rad).
pub fn encoder_from_azimuth(azimuth: f64) -> u16 {
    ((azimuth.rem_euclid(TAU) / TAU * ENCODER_COUNTS) as u32 % ENCODER_COUNTS as u32) as u16
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    Scatterometer,
    Loopback,
    Load,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub time: f64,
    pub beam_idx: usize,
    pub kind: EventKind,
    pub encoder: u16,
    /// Position of the event inside its telemetry frame.
    pub spot_number: usize,
}

/// Interleaves the beams at the pulse repetition interval and inserts a loopback and a
/// load pulse every time the antenna passes 90° azimuth.
///
/// Both calibration pulses have to fall into the same telemetry frame. If fewer than two
/// slots remain, the loopback is postponed to the start of the next frame.
#[derive(Debug, Clone, PartialEq)]
pub struct EventSequencer {
    start_time: f64,
    pri: f64,
    tx_times: Vec<f64>,
    last_kind: Option<EventKind>,
    last_encoder: u16,
    cal_pending: bool,
    spot_number: usize,
    spots_per_frame: usize,
}

impl EventSequencer {
    pub fn new(start_time: f64, pri: f64, num_beams: usize, spots_per_frame: usize) -> Result<Self> {
        ensure!(
            pri > 0.0 && num_beams > 0,
            error::InvalidParameter {
                name: "pulse sequence",
                reason: format!("{num_beams} beams at a PRI of {pri} s")
            }
        );
        ensure!(
            spots_per_frame >= 2,
            error::InvalidParameter {
                name: "spots per frame",
                reason: format!("{spots_per_frame} cannot hold a loopback and a load pulse")
            }
        );

        Ok(Self {
            start_time,
            pri,
            tx_times: (0..num_beams)
                .map(|beam| start_time + beam as f64 * pri)
                .collect(),
            last_kind: None,
            last_encoder: 0,
            cal_pending: false,
            spot_number: 0,
            spots_per_frame,
        })
    }

    pub fn cal_pending(&self) -> bool {
        self.cal_pending
    }

    /// Decides the next event. `encoder_at` reads the antenna encoder at a given time.
    pub fn next_event<F>(&mut self, encoder_at: F) -> Event
    where
        F: Fn(f64) -> u16,
    {
        let (beam_idx, time) = self
            .tx_times
            .iter()
            .copied()
            .enumerate()
            .fold((0, f64::INFINITY), |min, (beam, time)| {
                if time < min.1 { (beam, time) } else { min }
            });
        let encoder = encoder_at(time);

        let kind = match self.last_kind {
            Some(EventKind::Scatterometer) => {
                let crossed =
                    encoder > NINETY_DEGREE_ENCODER && self.last_encoder <= NINETY_DEGREE_ENCODER;
                if crossed || self.cal_pending {
                    if self.spot_number + 2 >= self.spots_per_frame {
                        self.cal_pending = true;
                        EventKind::Scatterometer
                    } else {
                        self.cal_pending = false;
                        EventKind::Loopback
                    }
                } else {
                    EventKind::Scatterometer
                }
            }
            Some(EventKind::Loopback) => EventKind::Load,
            Some(EventKind::Load) | None => EventKind::Scatterometer,
        };

        let cycle = ((time - self.start_time) / self.pri + 0.5).floor();
        self.tx_times[beam_idx] = self.start_time + (cycle + self.tx_times.len() as f64) * self.pri;

        let event = Event {
            time,
            beam_idx,
            kind,
            encoder,
            spot_number: self.spot_number,
        };
        self.last_kind = Some(kind);
        self.last_encoder = encoder;
        self.spot_number = (self.spot_number + 1) % self.spots_per_frame;
        event
    }
}
