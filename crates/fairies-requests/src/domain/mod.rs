//! Domain layer for the Requests context.

pub mod obligation;
pub mod request;
