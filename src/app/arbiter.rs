//! Decides which input may feed the pipeline at any moment.

use serde::Serialize;
use std::fmt;

use crate::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OperatingMode {
    Manual,
    #[default]
    Automatic,
}

impl OperatingMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperatingMode::Manual => "manual",
            OperatingMode::Automatic => "automatic",
        }
    }
}

impl fmt::Display for OperatingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Start/stop surface of an automatic feed (remote poller, generator, serial acceptance).
///
/// `start_feed` on a running feed must stop the previous run first and bump
/// the generation. `stop_feed` on a stopped feed is a no-op.
pub trait FeedControl {
    fn start_feed(&mut self) -> Result<()>;
    fn stop_feed(&mut self);
    fn is_feeding(&self) -> bool;
    /// Identifies the current run; events stamped with an older one are dropped.
    fn generation(&self) -> u64;
}

/// Feed with no worker of its own. Used for the serial link, whose reader
/// lifecycle follows connect/disconnect rather than start/stop.
#[derive(Debug, Default)]
pub struct PassiveFeed {
    feeding: bool,
    generation: u64,
}

impl FeedControl for PassiveFeed {
    fn start_feed(&mut self) -> Result<()> {
        self.generation += 1;
        self.feeding = true;
        Ok(())
    }

    fn stop_feed(&mut self) {
        self.feeding = false;
    }

    fn is_feeding(&self) -> bool {
        self.feeding
    }

    fn generation(&self) -> u64 {
        self.generation
    }
}

/// Why an automatic payload was kept away from the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Suppression {
    Stopped,
    Manual,
    /// Sent by a feed run that has since been stopped or restarted.
    Superseded,
}

impl Suppression {
    pub fn as_str(&self) -> &'static str {
        match self {
            Suppression::Stopped => "system stopped",
            Suppression::Manual => "manual mode engaged",
            Suppression::Superseded => "superseded feed",
        }
    }
}

/// Owns the operating mode and the running flag, and keeps the automatic
/// feed running exactly when both allow it.
///
/// Manual payloads are always admitted. Automatic payloads are admitted only
/// while running, in automatic mode, and from the current feed generation.
pub struct SourceArbiter<F: FeedControl> {
    feed: F,
    mode: OperatingMode,
    running: bool,
}

impl<F: FeedControl> SourceArbiter<F> {
    pub fn new(feed: F, mode: OperatingMode) -> Self {
        Self {
            feed,
            mode,
            running: false,
        }
    }

    pub fn mode(&self) -> OperatingMode {
        self.mode
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn feed(&self) -> &F {
        &self.feed
    }

    /// Returns false when the system was already running.
    pub fn start_system(&mut self) -> Result<bool> {
        if self.running {
            return Ok(false);
        }
        if self.mode == OperatingMode::Automatic {
            self.feed.start_feed()?;
        }
        self.running = true;
        Ok(true)
    }

    /// Returns false when the system was already stopped.
    pub fn stop_system(&mut self) -> bool {
        self.feed.stop_feed();
        let was_running = self.running;
        self.running = false;
        was_running
    }

    /// Switch modes. Setting the current mode again leaves the feed alone.
    /// Returns true when the mode changed.
    pub fn set_manual_mode(&mut self, manual: bool) -> Result<bool> {
        let target = if manual {
            OperatingMode::Manual
        } else {
            OperatingMode::Automatic
        };
        if target == self.mode {
            return Ok(false);
        }
        self.mode = target;
        if self.running {
            match target {
                OperatingMode::Manual => self.feed.stop_feed(),
                OperatingMode::Automatic => self.feed.start_feed()?,
            }
        }
        Ok(true)
    }

    /// True when automatic payloads from feed run `generation` may reach the pipeline.
    pub fn admits_automatic(&self, generation: u64) -> bool {
        self.suppression(Some(generation)).is_none()
    }

    /// Reason an automatic payload would be refused, if any. `None` for
    /// `generation` skips the generation check (serial records carry none).
    pub fn suppression(&self, generation: Option<u64>) -> Option<Suppression> {
        if !self.running {
            return Some(Suppression::Stopped);
        }
        if self.mode == OperatingMode::Manual {
            return Some(Suppression::Manual);
        }
        if !self.feed.is_feeding() {
            return Some(Suppression::Stopped);
        }
        match generation {
            Some(g) if g != self.feed.generation() => Some(Suppression::Superseded),
            _ => None,
        }
    }
}
