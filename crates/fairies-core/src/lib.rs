//! Fairies Core — shared domain vocabulary.
//!
//! This crate defines the closed actor and item sets, the cue value type,
//! the ports through which the orchestration core talks to its external
//! collaborators, and the determinism abstractions (clock, RNG). It contains
//! no orchestration logic.

pub mod actor;
pub mod clock;
pub mod cue;
pub mod error;
pub mod item;
pub mod ports;
pub mod rng;
pub mod speech_queue;

pub use actor::{Actor, ActorMap, ActorSet};
pub use cue::{AssetHandle, Cue};
pub use item::Item;
