//! Application layer for the narrative.

pub mod sequencer;
