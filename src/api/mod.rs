//! Solver API and output documents
//!
//! This module provides the blocking solver entry points and the JSON output
//! shapes they produce.

pub mod blocking;
pub mod formatting;
pub mod types;

pub use blocking::BlockingSolverApi;
pub use formatting::JsonFormatter;
pub use types::{ErrorOutput, SolutionOutput, SolverOutput};
