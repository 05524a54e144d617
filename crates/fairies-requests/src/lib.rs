//! Fairies — Requests bounded context.
//!
//! Responsible for the per-actor request state machine (deadline timer,
//! reminder cues, delivery classification), the registry of live requests,
//! and resolution of delivery events including cross-request cancellation.

pub mod application;
pub mod domain;
pub mod error;
