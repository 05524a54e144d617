//! Fairies — Narrative bounded context.
//!
//! Responsible for the authored phase table, story-cue file naming and
//! branch selection, and the sequencer that walks the phases: story lines,
//! request announcement, waiting for the requests to settle, and moving on.

pub mod application;
pub mod domain;
pub mod error;
