//! Command implementations.

pub mod dump;
