use serde::Serialize;
use std::{
    fmt,
    time::{Duration, Instant},
};

use crate::reading::{NormalizedReading, RawReading};

pub const DEFAULT_ACTIVE_SHOT_THRESHOLD: f64 = 50.0;
pub const DEFAULT_HOLD_WINDOW: Duration = Duration::from_secs(10);
pub const DEFAULT_NO_DATA_TIMEOUT: Duration = Duration::from_secs(10);

/// Connection/activity status shown to the operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectivityState {
    #[default]
    Off,
    Idle,
    On,
}

impl ConnectivityState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectivityState::Off => "off",
            ConnectivityState::Idle => "idle",
            ConnectivityState::On => "on",
        }
    }

    /// Whether the status indicator lights up. `idle` shares the unlit
    /// indicator with `off` until the product defines a separate look.
    pub fn is_lit(&self) -> bool {
        matches!(self, ConnectivityState::On)
    }
}

impl fmt::Display for ConnectivityState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActivityThresholds {
    /// Raw magnitude a channel must exceed to count as a shot.
    pub active_shot: f64,
    /// How long `on` is held after the last shot.
    pub hold_window: Duration,
    /// How long an armed feed may stay silent before forcing `off`.
    pub no_data_timeout: Duration,
}

impl Default for ActivityThresholds {
    fn default() -> Self {
        Self {
            active_shot: DEFAULT_ACTIVE_SHOT_THRESHOLD,
            hold_window: DEFAULT_HOLD_WINDOW,
            no_data_timeout: DEFAULT_NO_DATA_TIMEOUT,
        }
    }
}

/// Derives `off`/`idle`/`on` from payload magnitudes, recency and the
/// no-data watchdog. All time comes in through `now` arguments.
#[derive(Debug, Clone)]
pub struct ConnectivityMachine {
    thresholds: ActivityThresholds,
    state: ConnectivityState,
    last_active_shot: Option<Instant>,
    last_payload_at: Option<Instant>,
    armed_at: Option<Instant>,
}

impl ConnectivityMachine {
    pub fn new(thresholds: ActivityThresholds) -> Self {
        Self {
            thresholds,
            state: ConnectivityState::Off,
            last_active_shot: None,
            last_payload_at: None,
            armed_at: None,
        }
    }

    pub fn state(&self) -> ConnectivityState {
        self.state
    }

    pub fn thresholds(&self) -> &ActivityThresholds {
        &self.thresholds
    }

    pub fn is_armed(&self) -> bool {
        self.armed_at.is_some()
    }

    /// Apply the transition rule for an accepted payload.
    pub fn on_payload(&mut self, raw: &RawReading, now: Instant) -> ConnectivityState {
        self.state = if raw.peak() > self.thresholds.active_shot {
            self.last_active_shot = Some(now);
            ConnectivityState::On
        } else if self.within_hold(now) {
            ConnectivityState::On
        } else {
            ConnectivityState::Idle
        };
        self.state
    }

    /// Record a valid live payload for the no-data watchdog.
    pub fn mark_recent(&mut self, now: Instant) {
        self.last_payload_at = Some(now);
    }

    /// Start (or restart) the no-data watchdog window at `now`.
    pub fn arm(&mut self, now: Instant) {
        self.armed_at = Some(now);
    }

    pub fn disarm(&mut self) {
        self.armed_at = None;
    }

    /// Force `off` when an armed feed has been silent past the timeout.
    /// Returns true when this call changed the state.
    pub fn check_no_data(&mut self, now: Instant) -> bool {
        let Some(armed_at) = self.armed_at else {
            return false;
        };
        let reference = match self.last_payload_at {
            Some(at) if at > armed_at => at,
            _ => armed_at,
        };
        if now.saturating_duration_since(reference) > self.thresholds.no_data_timeout {
            return self.force_off();
        }
        false
    }

    /// Returns true when the state actually changed.
    pub fn force_off(&mut self) -> bool {
        let changed = self.state != ConnectivityState::Off;
        self.state = ConnectivityState::Off;
        changed
    }

    /// Back to the startup state; the hold window and recency are forgotten.
    pub fn reset(&mut self) {
        self.state = ConnectivityState::Off;
        self.last_active_shot = None;
        self.last_payload_at = None;
        self.armed_at = None;
    }

    fn within_hold(&self, now: Instant) -> bool {
        self.last_active_shot
            .map(|at| now.saturating_duration_since(at) <= self.thresholds.hold_window)
            .unwrap_or(false)
    }
}

impl Default for ConnectivityMachine {
    fn default() -> Self {
        Self::new(ActivityThresholds::default())
    }
}

/// Last-known-good output read by presentation collaborators.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct SensorSnapshot {
    pub reading: NormalizedReading,
    pub connectivity: ConnectivityState,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kick() -> RawReading {
        RawReading::from_values(&[400.0, 0.0, 0.0])
    }

    #[test]
    fn shot_turns_on_and_holds_through_window() {
        let mut machine = ConnectivityMachine::default();
        let t0 = Instant::now();
        assert_eq!(machine.on_payload(&kick(), t0), ConnectivityState::On);
        let quiet = RawReading::zero();
        assert_eq!(
            machine.on_payload(&quiet, t0 + Duration::from_secs(5)),
            ConnectivityState::On
        );
        assert_eq!(
            machine.on_payload(&quiet, t0 + Duration::from_secs(11)),
            ConnectivityState::Idle
        );
    }

    #[test]
    fn threshold_is_exclusive() {
        let mut machine = ConnectivityMachine::default();
        let at_threshold = RawReading::from_values(&[50.0, 50.0, 50.0]);
        assert_eq!(
            machine.on_payload(&at_threshold, Instant::now()),
            ConnectivityState::Idle
        );
        let above = RawReading::from_values(&[0.0, 0.0, 0.0, 0.0, 0.0, 50.5]);
        assert_eq!(machine.on_payload(&above, Instant::now()), ConnectivityState::On);
    }

    #[test]
    fn unarmed_machine_ignores_silence() {
        let mut machine = ConnectivityMachine::default();
        let t0 = Instant::now();
        machine.on_payload(&kick(), t0);
        assert!(!machine.is_armed());
        assert!(!machine.check_no_data(t0 + Duration::from_secs(60)));
        assert_eq!(machine.state(), ConnectivityState::On);
    }

    #[test]
    fn armed_silence_forces_off() {
        let mut machine = ConnectivityMachine::default();
        let t0 = Instant::now();
        machine.arm(t0);
        assert!(machine.is_armed());
        machine.on_payload(&kick(), t0);
        assert!(!machine.check_no_data(t0 + Duration::from_secs(9)));
        assert!(machine.check_no_data(t0 + Duration::from_secs(11)));
        assert_eq!(machine.state(), ConnectivityState::Off);
        assert!(!machine.check_no_data(t0 + Duration::from_secs(12)));
    }

    #[test]
    fn recent_payload_extends_no_data_window() {
        let mut machine = ConnectivityMachine::default();
        let t0 = Instant::now();
        machine.arm(t0);
        machine.mark_recent(t0 + Duration::from_secs(8));
        machine.on_payload(&kick(), t0 + Duration::from_secs(8));
        assert!(!machine.check_no_data(t0 + Duration::from_secs(15)));
        assert!(machine.check_no_data(t0 + Duration::from_secs(19)));
    }

    #[test]
    fn rearming_ignores_payloads_from_before() {
        let mut machine = ConnectivityMachine::default();
        let t0 = Instant::now();
        machine.mark_recent(t0);
        machine.arm(t0 + Duration::from_secs(30));
        assert!(!machine.check_no_data(t0 + Duration::from_secs(35)));
    }

    #[test]
    fn reset_forgets_hold_window() {
        let mut machine = ConnectivityMachine::default();
        let t0 = Instant::now();
        machine.on_payload(&kick(), t0);
        machine.reset();
        assert_eq!(machine.state(), ConnectivityState::Off);
        assert_eq!(
            machine.on_payload(&RawReading::zero(), t0 + Duration::from_secs(1)),
            ConnectivityState::Idle
        );
    }

    #[test]
    fn only_on_is_lit() {
        assert!(ConnectivityState::On.is_lit());
        assert!(!ConnectivityState::Idle.is_lit());
        assert!(!ConnectivityState::Off.is_lit());
    }
}
