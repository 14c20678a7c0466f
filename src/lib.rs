//! Bistatic Telemetry Solver
//!
//! Estimates the position and velocity of an airborne target from bistatic
//! radar detections: each detection pairs a transmitter of opportunity with a
//! receiving sensor and reports bistatic range and Doppler shift. Three
//! simultaneous detections determine the full state through a bounded
//! Levenberg-Marquardt fit in a local East-North-Up frame.

pub mod core;
pub mod algorithms;
pub mod processing;
pub mod validation;
pub mod utils;
pub mod api;

// Re-export commonly used types
pub use crate::core::{Detection, GeodeticPosition, Solution, SolverState, Termination};
pub use algorithms::{BistaticModel, Bounds, EnuFrame, JacobianMode, LevenbergMarquardt, LmReport};
pub use processing::{parse_input, ParseError, TelemetryInput};
pub use validation::{DetectionSet, PipelineError, SolverError, ValidationError};
pub use utils::{ConfigError, SolverConfig, StateBounds};
pub use api::{BlockingSolverApi, JsonFormatter, SolverOutput};
