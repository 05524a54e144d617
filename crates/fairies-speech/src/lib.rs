//! Fairies — Speech bounded context.
//!
//! Responsible for keeping utterances from overlapping: request cues are
//! queued and played one at a time, each only after a minimum window of
//! silence across every actor's channel.

pub mod application;
pub mod domain;
