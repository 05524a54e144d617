//! Application layer for the Requests context.

pub mod delivery;
pub mod registry;
