//! Built-in generators that stand in for the shoe when no hardware is around.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::{Duration, Instant};

use super::polling::SnapshotSource;
use crate::{
    payload::{Channel, SensorPayload},
    reading::RawReading,
    Result,
};

pub const KICK_TICK: Duration = Duration::from_millis(150);
pub const SIMULATE_TICK: Duration = Duration::from_millis(500);

/// FSR noise floor reported on every channel between kicks.
pub const BASE_NOISE: f64 = 10.0;
pub const KICK_DURATION: Duration = Duration::from_millis(600);
pub const KICK_CHANCE: f64 = 0.01;
const MIN_SPIKE_RATIO: f64 = 0.7;
const MAX_SPIKE_RATIO: f64 = 0.95;
/// Share of the kick spent after the peak.
const PEAK_SHARE: f64 = 0.2;

#[derive(Debug, Clone, Copy)]
struct Kick {
    channel: Channel,
    ends_at: Instant,
}

/// Realistic kick generator: a noise floor with the occasional 600 ms kick
/// on one of the three primary channels.
pub struct KickGenerator {
    rng: StdRng,
    max_raw: f64,
    kick: Option<Kick>,
}

impl KickGenerator {
    pub fn new(max_raw: f64) -> Self {
        Self::with_rng(max_raw, StdRng::from_entropy())
    }

    pub fn with_rng(max_raw: f64, rng: StdRng) -> Self {
        Self {
            rng,
            max_raw,
            kick: None,
        }
    }

    /// Channel currently being kicked, if any.
    pub fn kicking(&self, now: Instant) -> Option<Channel> {
        self.kick.filter(|k| now < k.ends_at).map(|k| k.channel)
    }

    pub fn sample_at(&mut self, now: Instant) -> RawReading {
        let mut reading = RawReading::zero();
        for channel in Channel::PRIMARY {
            reading.set(channel, BASE_NOISE);
        }
        match self.kick.filter(|k| now < k.ends_at) {
            Some(kick) => {
                let remaining = kick.ends_at.saturating_duration_since(now);
                reading.set(kick.channel, spike_value(self.max_raw, remaining));
            }
            None => {
                self.kick = None;
                if self.rng.gen_bool(KICK_CHANCE) {
                    let channel = Channel::PRIMARY[self.rng.gen_range(0..Channel::PRIMARY.len())];
                    self.kick = Some(Kick {
                        channel,
                        ends_at: now + KICK_DURATION,
                    });
                }
            }
        }
        reading
    }
}

/// Spike height for a kick with `remaining` time left. Ramps up over the
/// first 80 % and falls off over the last 20 %, between 0.7 and 0.95 of max.
pub fn spike_value(max_raw: f64, remaining: Duration) -> f64 {
    let total = KICK_DURATION.as_secs_f64();
    let remaining = remaining.as_secs_f64().min(total);
    let peak = total * PEAK_SHARE;
    let ratio = if remaining > peak {
        1.0 - (remaining - peak) / (total - peak)
    } else {
        remaining / peak
    };
    let min = max_raw * MIN_SPIKE_RATIO;
    let max = max_raw * MAX_SPIKE_RATIO;
    min + (max - min) * ratio.clamp(0.0, 1.0)
}

impl SnapshotSource for KickGenerator {
    fn fetch(&mut self) -> Result<Option<SensorPayload>> {
        Ok(Some(SensorPayload::new(self.sample_at(Instant::now()))))
    }

    fn describe(&self) -> String {
        "kick generator".into()
    }
}

/// Uniform random hits on the primary channels.
pub struct RandomHits {
    rng: StdRng,
    max_raw: f64,
}

impl RandomHits {
    pub fn new(max_raw: f64) -> Self {
        Self::with_rng(max_raw, StdRng::from_entropy())
    }

    pub fn with_rng(max_raw: f64, rng: StdRng) -> Self {
        Self { rng, max_raw }
    }

    pub fn sample(&mut self) -> RawReading {
        let mut reading = RawReading::zero();
        for channel in Channel::PRIMARY {
            reading.set(channel, self.rng.gen::<f64>() * self.max_raw);
        }
        reading
    }
}

impl SnapshotSource for RandomHits {
    fn fetch(&mut self) -> Result<Option<SensorPayload>> {
        Ok(Some(SensorPayload::new(self.sample())))
    }

    fn describe(&self) -> String {
        "random hits".into()
    }
}
