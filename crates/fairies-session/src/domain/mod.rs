//! Domain layer for the session.

pub mod events;
pub mod snapshot;
pub mod watchdog;
