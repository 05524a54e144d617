//! Fairies — headless driver.
//!
//! Responsible for running one session outside any engine: a filesystem cue
//! loader, simulated speakers, a seeded random player and a tick loop that
//! writes the session journal as JSON lines.

pub mod driver;
pub mod error;
pub mod loader;
pub mod player;
pub mod settings;
pub mod stage;

pub use driver::{Driver, RunSummary};
pub use error::AppError;
pub use settings::Settings;
