//! Application layer for the session.

pub mod session;
