//! Fairies — CLI error types.

use fairies_session::SessionError;
use thiserror::Error;

/// Startup and runtime errors for the headless driver.
#[derive(Debug, Error)]
pub enum AppError {
    /// An environment variable is invalid.
    #[error("configuration error: {0}")]
    Config(String),

    /// Reading the configuration file or writing the journal failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The session could not be brought up.
    #[error("session error: {0}")]
    Session(#[from] SessionError),

    /// A journal event could not be serialized.
    #[error("journal error: {0}")]
    Journal(#[from] serde_json::Error),
}
