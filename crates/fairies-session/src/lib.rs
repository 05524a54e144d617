//! Fairies — Session bounded context.
//!
//! Responsible for composing the request registry, speech arbitrator and
//! phase sequencer into one deterministic tick loop, loading configuration,
//! pause control with its reset watchdog, and the session journal.

pub mod application;
pub mod config;
pub mod domain;
pub mod error;

pub use application::session::{Session, SessionBuilder};
pub use config::SessionConfig;
pub use error::SessionError;
