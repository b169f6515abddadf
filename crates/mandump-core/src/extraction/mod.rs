//! Selective extraction of package archives.

pub mod common;
pub mod selective;

pub use selective::SelectiveExtractor;
