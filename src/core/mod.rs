//! Core types and constants for the bistatic telemetry solver

pub mod types;
pub mod constants;

pub use types::*;
pub use constants::*;
