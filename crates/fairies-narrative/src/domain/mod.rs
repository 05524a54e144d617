//! Domain layer for the narrative.

pub mod phase;
pub mod story;
