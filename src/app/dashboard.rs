//! Routes every input into the pipeline under the arbiter's rules.
//!
//! Time is passed in explicitly and nothing here logs; callers get a
//! [`Disposition`] back and decide what to report.

use serde::Serialize;
use std::time::{Duration, Instant};

use super::arbiter::{FeedControl, OperatingMode, SourceArbiter, Suppression};
use super::polling::{PollEvent, PollOutcome};
use super::watchdog::{Freshness, StalenessTracker};
use crate::{
    payload::{Channel, SensorPayload},
    pipeline::Pipeline,
    reading::{NormalizedReading, RawReading},
    serial::{SerialEvent, SerialFailureKind, SerialOutcome},
    state::ConnectivityState,
    Result,
};

/// What happened to one input event.
#[derive(Debug, Clone, PartialEq)]
pub enum Disposition {
    Accepted(ConnectivityState),
    Suppressed(Suppression),
    /// Frozen remote token; nothing forwarded. `forced_off` is true when this
    /// event turned the indicator off.
    Stale { forced_off: bool },
    Empty,
    Failed(String),
    Dropped(String),
    Disconnected(SerialFailureKind, String),
}

/// Which watchdog forced the state `off` on a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchdogTrip {
    NoData,
    Stale,
}

/// Answer to the console `status` command.
#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    pub running: bool,
    pub mode: OperatingMode,
    pub connectivity: ConnectivityState,
    pub lit: bool,
    pub reading: NormalizedReading,
    pub dominant: Option<Channel>,
}

pub struct Dashboard<F: FeedControl> {
    pipeline: Pipeline,
    arbiter: SourceArbiter<F>,
    staleness: StalenessTracker,
    /// Generation of the serial reader whose events are still honoured.
    serial_link: Option<u64>,
}

impl<F: FeedControl> Dashboard<F> {
    pub fn new(pipeline: Pipeline, arbiter: SourceArbiter<F>, staleness: StalenessTracker) -> Self {
        Self {
            pipeline,
            arbiter,
            staleness,
            serial_link: None,
        }
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    pub fn arbiter(&self) -> &SourceArbiter<F> {
        &self.arbiter
    }

    pub fn connectivity(&self) -> ConnectivityState {
        self.pipeline.connectivity()
    }

    pub fn is_running(&self) -> bool {
        self.arbiter.is_running()
    }

    pub fn mode(&self) -> OperatingMode {
        self.arbiter.mode()
    }

    pub fn stale_timeout(&self) -> Duration {
        self.staleness.timeout()
    }

    /// Start the system. In automatic mode this starts the feed and arms the
    /// no-data watchdog. Returns false when already running.
    pub fn start(&mut self, now: Instant) -> Result<bool> {
        if !self.arbiter.start_system()? {
            return Ok(false);
        }
        self.staleness.reset();
        if self.arbiter.mode() == OperatingMode::Automatic {
            self.pipeline.machine_mut().arm(now);
        }
        Ok(true)
    }

    /// Stop the feed and the watchdogs, zero the reading and go `off`.
    /// Returns false when already stopped.
    pub fn stop(&mut self) -> bool {
        let was_running = self.arbiter.stop_system();
        self.staleness.reset();
        if was_running {
            self.pipeline.reset();
        }
        was_running
    }

    /// Returns true when the mode changed.
    pub fn set_manual_mode(&mut self, manual: bool, now: Instant) -> Result<bool> {
        if !self.arbiter.set_manual_mode(manual)? {
            return Ok(false);
        }
        if self.arbiter.is_running() {
            if manual {
                self.pipeline.machine_mut().disarm();
            } else {
                self.staleness.reset();
                self.pipeline.machine_mut().arm(now);
            }
        }
        Ok(true)
    }

    /// Operator-entered values. Always admitted; a stopped system is started
    /// first, so the first manual push also brings the feeds up.
    pub fn push_manual(&mut self, raw: &RawReading, now: Instant) -> Result<Disposition> {
        if !self.arbiter.is_running() {
            self.start(now)?;
        }
        self.pipeline.push_sensor_data(raw, now);
        Ok(Disposition::Accepted(self.pipeline.connectivity()))
    }

    pub fn handle_poll(&mut self, event: PollEvent, now: Instant) -> Disposition {
        if let Some(reason) = self.arbiter.suppression(Some(event.generation)) {
            return Disposition::Suppressed(reason);
        }
        match event.outcome {
            PollOutcome::Empty => Disposition::Empty,
            PollOutcome::Error(err) => Disposition::Failed(err),
            PollOutcome::Snapshot(payload) => {
                match self.staleness.observe(payload.token.as_ref(), now) {
                    Freshness::Stale => Disposition::Stale {
                        forced_off: self.pipeline.force_off(),
                    },
                    Freshness::Fresh | Freshness::Unchanged => self.accept_live(&payload, now),
                }
            }
        }
    }

    /// Events left in the channel by a reader that was since torn down are
    /// `Superseded` and never touch the state.
    pub fn handle_serial(&mut self, event: SerialEvent, now: Instant) -> Disposition {
        if self.serial_link != Some(event.link) {
            return Disposition::Suppressed(Suppression::Superseded);
        }
        match event.outcome {
            SerialOutcome::Record(payload) => match self.arbiter.suppression(None) {
                Some(reason) => Disposition::Suppressed(reason),
                None => self.accept_live(&payload, now),
            },
            SerialOutcome::Dropped(line) => Disposition::Dropped(line),
            SerialOutcome::Disconnected(kind, detail) => {
                self.serial_disconnected();
                Disposition::Disconnected(kind, detail)
            }
        }
    }

    pub fn serial_link(&self) -> Option<u64> {
        self.serial_link
    }

    /// Serial reader `link` came up; give it a full no-data window.
    pub fn serial_connected(&mut self, link: u64, now: Instant) {
        self.serial_link = Some(link);
        if self.arbiter.suppression(None).is_none() {
            self.pipeline.machine_mut().arm(now);
        }
    }

    /// The serial stream is gone. Returns true when this turned the state `off`.
    pub fn serial_disconnected(&mut self) -> bool {
        self.serial_link = None;
        self.pipeline.machine_mut().disarm();
        self.pipeline.force_off()
    }

    /// Run both watchdogs.
    pub fn tick(&mut self, now: Instant) -> Option<WatchdogTrip> {
        if self.arbiter.suppression(None).is_some() {
            return None;
        }
        if self.staleness.is_stale(now) && self.pipeline.force_off() {
            return Some(WatchdogTrip::Stale);
        }
        if self.pipeline.check_no_data(now) {
            return Some(WatchdogTrip::NoData);
        }
        None
    }

    pub fn status(&self) -> StatusReport {
        let snapshot = self.pipeline.snapshot();
        StatusReport {
            running: self.arbiter.is_running(),
            mode: self.arbiter.mode(),
            connectivity: snapshot.connectivity,
            lit: snapshot.connectivity.is_lit(),
            reading: snapshot.reading,
            dominant: snapshot.reading.dominant(),
        }
    }

    fn accept_live(&mut self, payload: &SensorPayload, now: Instant) -> Disposition {
        self.pipeline.machine_mut().mark_recent(now);
        self.pipeline.push_sensor_data(&payload.reading, now);
        Disposition::Accepted(self.pipeline.connectivity())
    }
}
