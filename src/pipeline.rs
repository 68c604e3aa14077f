//! The single funnel every input source feeds.

use std::time::Instant;

use crate::{
    reading::{RawReading, DEFAULT_MAX_RAW},
    state::{ActivityThresholds, ConnectivityMachine, ConnectivityState, SensorSnapshot},
};

/// Presentation collaborator notified after every accepted update.
pub trait Presenter {
    fn present(&mut self, snapshot: &SensorSnapshot);
}

/// Normalizes readings, keeps the last-known-good snapshot and the
/// connectivity state, and notifies presenters.
///
/// Total by construction: any reading produces a valid snapshot, nothing here
/// returns an error.
pub struct Pipeline {
    max_raw: f64,
    snapshot: SensorSnapshot,
    connectivity: ConnectivityMachine,
    presenters: Vec<Box<dyn Presenter + Send>>,
}

impl Pipeline {
    pub fn new(max_raw: f64, thresholds: ActivityThresholds) -> Self {
        Self {
            max_raw,
            snapshot: SensorSnapshot::default(),
            connectivity: ConnectivityMachine::new(thresholds),
            presenters: Vec::new(),
        }
    }

    pub fn add_presenter(&mut self, presenter: Box<dyn Presenter + Send>) {
        self.presenters.push(presenter);
    }

    pub fn snapshot(&self) -> &SensorSnapshot {
        &self.snapshot
    }

    pub fn connectivity(&self) -> ConnectivityState {
        self.snapshot.connectivity
    }

    pub fn max_raw(&self) -> f64 {
        self.max_raw
    }

    pub fn thresholds(&self) -> &ActivityThresholds {
        self.connectivity.thresholds()
    }

    pub(crate) fn machine_mut(&mut self) -> &mut ConnectivityMachine {
        &mut self.connectivity
    }

    /// Normalize, update the snapshot, recompute connectivity, notify.
    pub fn push_sensor_data(&mut self, raw: &RawReading, now: Instant) {
        self.snapshot.reading = raw.normalized(self.max_raw);
        self.snapshot.connectivity = self.connectivity.on_payload(raw, now);
        self.notify();
    }

    /// Force `off` without touching the reading. Presenters only hear about
    /// it when the state changed.
    pub fn force_off(&mut self) -> bool {
        let changed = self.connectivity.force_off();
        self.snapshot.connectivity = self.connectivity.state();
        if changed {
            self.notify();
        }
        changed
    }

    /// Run the no-data watchdog. Returns true when it forced `off`.
    pub fn check_no_data(&mut self, now: Instant) -> bool {
        let changed = self.connectivity.check_no_data(now);
        if changed {
            self.snapshot.connectivity = self.connectivity.state();
            self.notify();
        }
        changed
    }

    /// Zero the reading and go `off`, as on an explicit stop.
    pub fn reset(&mut self) {
        self.connectivity.reset();
        self.snapshot = SensorSnapshot::default();
        self.notify();
    }

    fn notify(&mut self) {
        let snapshot = self.snapshot;
        for presenter in self.presenters.iter_mut() {
            presenter.present(&snapshot);
        }
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_RAW, ActivityThresholds::default())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::payload::Channel;
    use std::sync::{Arc, Mutex};

    /// Presenter double that records every snapshot it is shown.
    #[derive(Clone, Default)]
    pub(crate) struct Recorder(pub Arc<Mutex<Vec<SensorSnapshot>>>);

    impl Presenter for Recorder {
        fn present(&mut self, snapshot: &SensorSnapshot) {
            self.0.lock().unwrap().push(*snapshot);
        }
    }

    impl Recorder {
        pub(crate) fn seen(&self) -> Vec<SensorSnapshot> {
            self.0.lock().unwrap().clone()
        }
    }

    #[test]
    fn manual_entry_scales_to_half() {
        let mut pipeline = Pipeline::default();
        pipeline.push_sensor_data(&RawReading::from_values(&[400.0, 0.0, 0.0]), Instant::now());
        let reading = pipeline.snapshot().reading;
        assert_eq!(reading.get(Channel::Toe), 0.5);
        assert_eq!(reading.get(Channel::Inside), 0.0);
        assert_eq!(reading.get(Channel::Laces), 0.0);
        assert_eq!(pipeline.connectivity(), ConnectivityState::On);
    }

    #[test]
    fn same_reading_twice_gives_same_snapshot() {
        let mut pipeline = Pipeline::default();
        let raw = RawReading::from_values(&[120.0, 900.0, -3.0, 7.0]);
        let now = Instant::now();
        pipeline.push_sensor_data(&raw, now);
        let first = *pipeline.snapshot();
        pipeline.push_sensor_data(&raw, now);
        assert_eq!(first, *pipeline.snapshot());
    }

    #[test]
    fn presenters_see_each_update() {
        let recorder = Recorder::default();
        let mut pipeline = Pipeline::default();
        pipeline.add_presenter(Box::new(recorder.clone()));
        let now = Instant::now();
        pipeline.push_sensor_data(&RawReading::from_values(&[800.0]), now);
        pipeline.reset();
        let seen = recorder.seen();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].reading.get(Channel::Toe), 1.0);
        assert_eq!(seen[1], SensorSnapshot::default());
    }

    #[test]
    fn force_off_keeps_last_reading() {
        let recorder = Recorder::default();
        let mut pipeline = Pipeline::default();
        pipeline.add_presenter(Box::new(recorder.clone()));
        pipeline.push_sensor_data(&RawReading::from_values(&[400.0]), Instant::now());
        assert!(pipeline.force_off());
        assert!(!pipeline.force_off());
        assert_eq!(pipeline.connectivity(), ConnectivityState::Off);
        assert_eq!(pipeline.snapshot().reading.get(Channel::Toe), 0.5);
        assert_eq!(recorder.seen().len(), 2);
    }
}
