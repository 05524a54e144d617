//! Core error types.

use thiserror::Error;

/// Errors raised while interpreting core vocabulary.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoreError {
    /// A name did not match any actor.
    #[error("unknown actor: {0}")]
    UnknownActor(String),

    /// A name did not match any item.
    #[error("unknown item: {0}")]
    UnknownItem(String),
}
