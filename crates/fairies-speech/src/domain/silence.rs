//! Silence window tracking.

use std::time::Duration;

/// Contiguous time during which no actor's channel has been playing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SilenceTracker {
    silence: Duration,
}

impl SilenceTracker {
    /// A tracker that has heard nothing yet.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Resets the window if anything is playing, otherwise extends it by `dt`.
    pub fn update(&mut self, any_playing: bool, dt: Duration) {
        if any_playing {
            self.silence = Duration::ZERO;
        } else {
            self.silence += dt;
        }
    }

    /// The current silence window.
    #[must_use]
    pub fn silence(&self) -> Duration {
        self.silence
    }

    /// Returns `true` once the window has lasted at least `min`.
    #[must_use]
    pub fn has_lasted(&self, min: Duration) -> bool {
        self.silence >= min
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_silence_accumulates_while_quiet() {
        let mut tracker = SilenceTracker::new();

        tracker.update(false, Duration::from_millis(300));
        tracker.update(false, Duration::from_millis(200));

        assert_eq!(tracker.silence(), Duration::from_millis(500));
        assert!(tracker.has_lasted(Duration::from_millis(500)));
    }

    #[test]
    fn test_any_playing_channel_resets_window() {
        let mut tracker = SilenceTracker::new();
        tracker.update(false, Duration::from_secs(3));

        tracker.update(true, Duration::from_millis(100));

        assert_eq!(tracker.silence(), Duration::ZERO);
        assert!(!tracker.has_lasted(Duration::from_millis(1)));
    }
}
