//! Clock abstraction for determinism.
//!
//! Simulated time advances only through the `dt` handed to each tick; the
//! wall clock is consulted solely for bookkeeping that must keep running
//! while simulated time is frozen (pause length).

use chrono::{DateTime, Utc};

/// Abstraction over system time for deterministic behavior.
pub trait Clock: Send + Sync {
    /// Returns the current time.
    fn now(&self) -> DateTime<Utc>;
}

/// Production clock that delegates to the system clock.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
