//! Output document types

use serde::{Deserialize, Serialize};

use crate::core::Solution;
use crate::validation::error::PipelineError;

/// Successful solve as written to the output document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolutionOutput {
    /// Unix milliseconds shared by the input detections
    pub timestamp: u64,
    /// Degrees
    pub latitude: f64,
    /// Degrees
    pub longitude: f64,
    /// Meters above the WGS-84 ellipsoid
    pub altitude: f64,
    pub velocity_east: f64,
    pub velocity_north: f64,
    pub velocity_up: f64,
    pub convergence_metric: f64,
    /// Range (m) and Doppler (Hz) residuals, interleaved per detection
    pub residuals: Vec<f64>,
}

impl From<&Solution> for SolutionOutput {
    fn from(solution: &Solution) -> Self {
        Self {
            timestamp: solution.timestamp,
            latitude: solution.position.lat,
            longitude: solution.position.lon,
            altitude: solution.position.alt,
            velocity_east: solution.velocity_enu.x,
            velocity_north: solution.velocity_enu.y,
            velocity_up: solution.velocity_enu.z,
            convergence_metric: solution.convergence_metric,
            residuals: solution.residuals.clone(),
        }
    }
}

/// Failure as written to the output document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorOutput {
    pub error: String,
}

impl From<&PipelineError> for ErrorOutput {
    fn from(error: &PipelineError) -> Self {
        Self {
            error: error.output_message(),
        }
    }
}

/// Either output document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SolverOutput {
    Solution(SolutionOutput),
    Error(ErrorOutput),
}

impl SolverOutput {
    pub fn is_solution(&self) -> bool {
        matches!(self, SolverOutput::Solution(_))
    }
}

impl From<&Result<Solution, PipelineError>> for SolverOutput {
    fn from(result: &Result<Solution, PipelineError>) -> Self {
        match result {
            Ok(solution) => SolverOutput::Solution(solution.into()),
            Err(error) => SolverOutput::Error(error.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{GeodeticPosition, Termination};
    use crate::validation::error::SolverError;
    use nalgebra::Vector3;

    fn solution() -> Solution {
        Solution {
            timestamp: 1_700_000_000,
            position: GeodeticPosition::new(40.8, -73.97, 10_144.0),
            velocity_enu: Vector3::new(-5.8, 11.1, -31.8),
            convergence_metric: 1.5e-10,
            residuals: vec![1e-10, -2e-11, 0.0, 0.0, 3e-10, 0.0],
            iterations: 9,
            termination: Termination::GradientTolerance,
        }
    }

    #[test]
    fn test_solution_field_names() {
        let output = SolverOutput::from(&Ok(solution()));
        let value = serde_json::to_value(&output).unwrap();
        let object = value.as_object().unwrap();

        let expected = [
            "timestamp",
            "latitude",
            "longitude",
            "altitude",
            "velocity_east",
            "velocity_north",
            "velocity_up",
            "convergence_metric",
            "residuals",
        ];
        assert_eq!(object.len(), expected.len());
        for key in expected {
            assert!(object.contains_key(key), "missing {}", key);
        }
        assert_eq!(value["timestamp"], 1_700_000_000u64);
        assert_eq!(value["velocity_north"], 11.1);
        assert_eq!(value["residuals"].as_array().unwrap().len(), 6);
    }

    #[test]
    fn test_no_solution_document() {
        let result: Result<Solution, PipelineError> =
            Err(SolverError::MaxIterationsReached { iterations: 200, cost: 4.0e10 }.into());
        let output = SolverOutput::from(&result);
        assert!(!output.is_solution());
        assert_eq!(serde_json::to_string(&output).unwrap(), r#"{"error":"No Solution"}"#);
    }

    #[test]
    fn test_untagged_decoding() {
        let decoded: SolverOutput = serde_json::from_str(r#"{"error":"No Solution"}"#).unwrap();
        assert_eq!(decoded, SolverOutput::Error(ErrorOutput { error: "No Solution".to_string() }));
    }
}
