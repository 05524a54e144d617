//! Application layer for speech arbitration.

pub mod arbitrator;
