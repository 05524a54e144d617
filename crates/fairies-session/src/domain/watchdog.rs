//! Pause watchdog: measures how long the session has been held paused.

use std::time::Duration;

use chrono::{DateTime, Utc};

/// Fires once per pause episode when the pause outlasts a threshold.
///
/// Simulated time stands still while paused, so the length of a pause is
/// measured on the wall clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PauseWatchdog {
    threshold: Duration,
    paused_since: Option<DateTime<Utc>>,
    fired: bool,
}

impl PauseWatchdog {
    /// A watchdog that fires after `threshold` of continuous pause.
    #[must_use]
    pub fn new(threshold: Duration) -> Self {
        Self {
            threshold,
            paused_since: None,
            fired: false,
        }
    }

    /// Starts a pause episode at `now`. A no-op while already paused.
    pub fn pause(&mut self, now: DateTime<Utc>) {
        if self.paused_since.is_none() {
            self.paused_since = Some(now);
            self.fired = false;
        }
    }

    /// Ends the current pause episode.
    pub fn resume(&mut self) {
        self.paused_since = None;
        self.fired = false;
    }

    /// Returns `true` while a pause episode is open.
    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.paused_since.is_some()
    }

    /// Returns the pause length the first time it exceeds the threshold in
    /// the current episode, and `None` otherwise.
    pub fn poll(&mut self, now: DateTime<Utc>) -> Option<Duration> {
        let since = self.paused_since?;
        if self.fired {
            return None;
        }
        let held = (now - since).to_std().unwrap_or_default();
        if held > self.threshold {
            self.fired = true;
            return Some(held);
        }
        None
    }
}
