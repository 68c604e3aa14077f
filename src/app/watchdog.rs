use std::time::{Duration, Instant};

use crate::payload::StaleToken;

/// Result of observing one remote snapshot's token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    /// New token, or no token at all.
    Fresh,
    /// Same token as before, still inside the timeout.
    Unchanged,
    /// Same token for longer than the timeout; the feed is frozen.
    Stale,
}

/// Tracks the last server token and when it last changed.
#[derive(Debug, Clone)]
pub struct StalenessTracker {
    timeout: Duration,
    last_token: Option<StaleToken>,
    changed_at: Option<Instant>,
}

impl StalenessTracker {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            last_token: None,
            changed_at: None,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn observe(&mut self, token: Option<&StaleToken>, now: Instant) -> Freshness {
        let Some(token) = token else {
            return Freshness::Fresh;
        };
        if self.last_token.as_ref() == Some(token) {
            if self.is_stale(now) {
                Freshness::Stale
            } else {
                Freshness::Unchanged
            }
        } else {
            self.last_token = Some(token.clone());
            self.changed_at = Some(now);
            Freshness::Fresh
        }
    }

    /// True once a seen token has gone unchanged past the timeout.
    pub fn is_stale(&self, now: Instant) -> bool {
        self.changed_at
            .map(|at| now.saturating_duration_since(at) > self.timeout)
            .unwrap_or(false)
    }

    pub fn reset(&mut self) {
        self.last_token = None;
        self.changed_at = None;
    }
}
