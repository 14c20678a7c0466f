//! Error taxonomy for the solve pipeline
//!
//! Every solver-side failure is a [`SolverError`], carried to the pipeline
//! boundary as [`PipelineError::NoSolution`]. Whatever the variant, the output
//! document only ever says `"No Solution"`; the cause is left to the log.

use thiserror::Error;

use crate::api::types::ErrorOutput;
use crate::processing::parser::ParseError;
use crate::utils::config::ConfigError;
use crate::validation::data::ValidationError;

/// Text of the uniform failure output
pub const NO_SOLUTION: &str = "No Solution";

/// Failures of the numerical solve
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SolverError {
    /// Seed state lies outside the feasible set before any iteration
    #[error("initial guess infeasible: {details}")]
    InfeasibleInitialGuess { details: String },

    #[error("no convergence after {iterations} iterations (cost {cost:.6e})")]
    MaxIterationsReached { iterations: usize, cost: f64 },

    /// Every step was rejected until damping exceeded its ceiling
    #[error("damping diverged to {damping:.3e} (cost {cost:.6e})")]
    DampingOverflow { damping: f64, cost: f64 },

    /// Rank-deficient or ill-conditioned Jacobian
    #[error("singular jacobian (singular value ratio {singular_value_ratio:.3e})")]
    SingularJacobian { singular_value_ratio: f64 },

    #[error("non-finite residuals or jacobian")]
    NonFiniteResiduals,

    /// The optimum lies outside the feasible set
    #[error("bound violation at optimum: {details}")]
    BoundViolation { details: String },

    #[error("range residual {max_residual_m:.3} m exceeds acceptance threshold {threshold_m:.3} m")]
    ResidualAboveThreshold { max_residual_m: f64, threshold_m: f64 },

    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("no detections to solve")]
    NoDetections,
}

/// Top-level error of one pipeline invocation
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("{0}")]
    Parse(#[from] ParseError),

    #[error("{0}")]
    Validation(#[from] ValidationError),

    #[error("{0}")]
    Config(#[from] ConfigError),

    #[error("No Solution")]
    NoSolution(#[from] SolverError),
}

impl PipelineError {
    /// True when the input was well formed but the solver found no answer
    pub fn is_no_solution(&self) -> bool {
        matches!(self, PipelineError::NoSolution(_))
    }

    /// Message for the `error` field of the output document.
    ///
    /// Identical for every variant; use `Display` for the detail.
    pub fn output_message(&self) -> String {
        NO_SOLUTION.to_string()
    }

    /// Output document for this failure
    pub fn to_output(&self) -> ErrorOutput {
        ErrorOutput::from(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_solver_failure_is_uniform() {
        let failures = vec![
            SolverError::InfeasibleInitialGuess { details: "altitude".to_string() },
            SolverError::MaxIterationsReached { iterations: 200, cost: 1.0 },
            SolverError::DampingOverflow { damping: 1e17, cost: 2.0 },
            SolverError::SingularJacobian { singular_value_ratio: 0.0 },
            SolverError::NonFiniteResiduals,
            SolverError::BoundViolation { details: "speed".to_string() },
            SolverError::ResidualAboveThreshold { max_residual_m: 250.0, threshold_m: 200.0 },
            SolverError::NoDetections,
        ];

        for failure in failures {
            let error = PipelineError::from(failure);
            assert!(error.is_no_solution());
            assert_eq!(error.output_message(), "No Solution");
            assert_eq!(error.to_string(), "No Solution");
        }
    }

    #[test]
    fn test_input_errors_are_uniform_in_output() {
        let mismatch = PipelineError::from(ValidationError::TimestampMismatch {
            expected: 1_700_000_000,
            actual: 1_700_000_001,
            detection: 2,
        });
        let negative = PipelineError::from(ValidationError::OutOfRange {
            detection: 1,
            field: "freq_mhz",
            value: -5.0,
            reason: "must be positive",
        });
        let parse = PipelineError::from(ParseError::Empty);

        for error in [mismatch, negative, parse] {
            assert!(!error.is_no_solution());
            assert_eq!(error.output_message(), "No Solution");
            assert_eq!(error.to_output().error, "No Solution");
        }
    }

    #[test]
    fn test_detail_stays_in_display() {
        let error = PipelineError::from(ValidationError::TimestampMismatch {
            expected: 1_700_000_000,
            actual: 1_700_000_001,
            detection: 2,
        });
        assert!(error.to_string().contains("timestamp"));
        assert!(!error.to_output().error.contains("timestamp"));
    }

    #[test]
    fn test_solver_error_details() {
        let error = SolverError::ResidualAboveThreshold { max_residual_m: 250.0, threshold_m: 200.0 };
        assert!(error.to_string().contains("250.000"));
    }
}
