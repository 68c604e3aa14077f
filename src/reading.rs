//! Raw and normalized sensor readings.

use crate::payload::Channel;
use serde::ser::{Serialize, SerializeMap, Serializer};

/// Full scale of the force-sensing resistors on the shoe.
pub const DEFAULT_MAX_RAW: f64 = 800.0;

/// Normalized values at or below this never count as the strongest sensor.
pub const DOMINANT_MIN: f64 = 0.1;

/// Scale a raw sensor value into `[0, 1]`.
///
/// Non-finite input counts as 0. A non-positive or non-finite `max_raw`
/// yields 0 for every input.
pub fn normalize(raw: f64, max_raw: f64) -> f64 {
    if !max_raw.is_finite() || max_raw <= 0.0 {
        return 0.0;
    }
    let raw = if raw.is_finite() { raw } else { 0.0 };
    raw.clamp(0.0, max_raw) / max_raw
}

/// Coerce an arbitrary number into a usable raw value.
pub fn sanitize(raw: f64) -> f64 {
    if raw.is_finite() {
        raw
    } else {
        0.0
    }
}

/// Unscaled per-channel values for one update. Missing channels are 0.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RawReading {
    values: [f64; Channel::COUNT],
}

impl RawReading {
    pub fn zero() -> Self {
        Self::default()
    }

    /// Build from positional values in canonical channel order
    /// (toe, inside, laces, vrist2, inside2, bridge). Extra values are ignored.
    pub fn from_values(values: &[f64]) -> Self {
        let mut reading = Self::zero();
        for (channel, value) in Channel::ALL.iter().zip(values) {
            reading.set(*channel, *value);
        }
        reading
    }

    pub fn get(&self, channel: Channel) -> f64 {
        self.values[channel.index()]
    }

    pub fn set(&mut self, channel: Channel, value: f64) {
        self.values[channel.index()] = sanitize(value);
    }

    pub fn with(mut self, channel: Channel, value: f64) -> Self {
        self.set(channel, value);
        self
    }

    /// Largest raw magnitude across all channels.
    pub fn peak(&self) -> f64 {
        self.values.iter().copied().fold(0.0, f64::max)
    }

    pub fn normalized(&self, max_raw: f64) -> NormalizedReading {
        let mut values = [0.0; Channel::COUNT];
        for (slot, raw) in values.iter_mut().zip(self.values) {
            *slot = normalize(raw, max_raw);
        }
        NormalizedReading { values }
    }
}

/// Per-channel values in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct NormalizedReading {
    values: [f64; Channel::COUNT],
}

impl NormalizedReading {
    pub fn zero() -> Self {
        Self::default()
    }

    pub fn get(&self, channel: Channel) -> f64 {
        self.values[channel.index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = (Channel, f64)> + '_ {
        Channel::ALL.iter().map(|c| (*c, self.get(*c)))
    }

    /// Strongest channel, if it rises above [`DOMINANT_MIN`]. Ties go to the
    /// earlier channel.
    pub fn dominant(&self) -> Option<Channel> {
        self.dominant_among(&Channel::ALL)
    }

    pub fn dominant_among(&self, channels: &[Channel]) -> Option<Channel> {
        let mut best: Option<(Channel, f64)> = None;
        for channel in channels {
            let value = self.get(*channel);
            if best.map_or(true, |(_, v)| value > v) {
                best = Some((*channel, value));
            }
        }
        best.filter(|(_, v)| *v > DOMINANT_MIN).map(|(c, _)| c)
    }
}

impl Serialize for NormalizedReading {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(Channel::COUNT))?;
        for (channel, value) in self.iter() {
            map.serialize_entry(channel.as_str(), &value)?;
        }
        map.end()
    }
}
