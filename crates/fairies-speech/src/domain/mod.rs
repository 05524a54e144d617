//! Domain layer for speech arbitration.

pub mod silence;
