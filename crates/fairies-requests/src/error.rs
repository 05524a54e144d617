//! Error types for the Requests context.

use fairies_core::Actor;
use thiserror::Error;

use crate::domain::request::RequestState;

/// Errors raised by a single request.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RequestError {
    /// The request was ticked before its cues were loaded.
    #[error("request cues have not been loaded")]
    CuesNotLoaded,

    /// The obligation/policy combination cannot be satisfied.
    #[error("invalid obligation: {0}")]
    InvalidObligation(String),

    /// The request no longer accepts deliveries.
    #[error("request is not running (state: {0:?})")]
    NotRunning(RequestState),
}

/// Errors raised by the active request registry.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    /// No request is registered for the actor.
    #[error("no active request for {0}")]
    NotRegistered(Actor),
}

/// Reasons a delivery event is ignored.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DeliveryError {
    /// The receiver is not a known actor.
    #[error("delivery to unknown actor: {0}")]
    UnknownActor(String),

    /// The delivered thing is not a known item.
    #[error("unknown item delivered to {actor}: {item}")]
    UnknownItem {
        /// The receiver.
        actor: Actor,
        /// The raw item identity.
        item: String,
    },

    /// The receiver has no active request.
    #[error("{0} has no active request")]
    NoActiveRequest(Actor),

    /// The receiver's request refused the delivery outright.
    #[error(transparent)]
    Request(#[from] RequestError),
}
