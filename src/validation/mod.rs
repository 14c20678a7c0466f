//! Input validation and error taxonomy

pub mod data;
pub mod error;

pub use data::{DetectionPair, DetectionSet, DetectionTriple, ValidationError};
pub use error::{PipelineError, SolverError, NO_SOLUTION};
