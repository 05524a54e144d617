//! Error types for session bring-up.

use fairies_narrative::error::NarrativeError;
use thiserror::Error;

/// Errors that prevent a session from starting.
#[derive(Debug, Error)]
pub enum SessionError {
    /// A collaborator the session cannot run without was not supplied.
    #[error("missing collaborator: {0}")]
    MissingCollaborator(String),

    /// The configuration is unreadable or out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The configured start phase is not in the phase table.
    #[error(transparent)]
    Narrative(#[from] NarrativeError),
}
