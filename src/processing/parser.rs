//! Parsing of the JSON detection document

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::Detection;
use crate::validation::data::{DetectionSet, ValidationError};

/// Errors that can occur while reading or decoding the input document
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("failed to read input: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid input JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("input is empty")]
    Empty,
}

/// Input document: two or three simultaneous detections
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryInput {
    pub detection1: Detection,
    pub detection2: Detection,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detection3: Option<Detection>,
}

impl TelemetryInput {
    pub fn triple(first: Detection, second: Detection, third: Detection) -> Self {
        Self {
            detection1: first,
            detection2: second,
            detection3: Some(third),
        }
    }

    pub fn pair(first: Detection, second: Detection) -> Self {
        Self {
            detection1: first,
            detection2: second,
            detection3: None,
        }
    }

    /// Detections in document order
    pub fn detections(&self) -> Vec<Detection> {
        let mut detections = vec![self.detection1, self.detection2];
        detections.extend(self.detection3);
        detections
    }

    /// Validate field ranges and timestamps
    pub fn validate(&self) -> Result<DetectionSet, ValidationError> {
        DetectionSet::from_detections(&self.detections())
    }
}

/// Decode an input document from a JSON string
pub fn parse_input(json: &str) -> Result<TelemetryInput, ParseError> {
    if json.trim().is_empty() {
        return Err(ParseError::Empty);
    }
    Ok(serde_json::from_str(json)?)
}

/// Read and decode an input document from a file
pub fn load_input<P: AsRef<Path>>(path: P) -> Result<TelemetryInput, ParseError> {
    let contents = fs::read_to_string(path)?;
    parse_input(&contents)
}
