//! Solver configuration loaded from JSON

use nalgebra::DVector;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::algorithms::levenberg_marquardt::Bounds;
use crate::algorithms::residuals::JacobianMode;

/// Solver configuration: tolerances, damping policy, seed altitudes and bounds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// Iteration cap; reaching it is a failure
    pub max_iterations: usize,
    /// Gradient infinity-norm tolerance
    pub gradient_tolerance: f64,
    /// Relative step-size tolerance
    pub step_tolerance: f64,
    /// Relative cost-reduction tolerance
    pub cost_tolerance: f64,
    /// Initial damping as a fraction of the largest diagonal entry of JᵀJ
    pub initial_damping_scale: f64,
    /// Damping ceiling before giving up
    pub max_damping: f64,
    /// Minimum ratio of smallest to largest Jacobian singular value
    pub singular_value_ratio: f64,
    /// Seed altitude for three-detection solves (meters)
    pub nominal_altitude_m: f64,
    /// Fixed altitude for two-detection solves (meters)
    pub pair_altitude_m: f64,
    /// Largest accepted absolute range residual at the optimum (meters)
    pub max_range_residual_m: f64,
    /// Jacobian evaluation strategy
    pub jacobian: JacobianMode,
    /// Feasible region of the target state
    pub bounds: StateBounds,
}

/// Physical limits on the target state, in the local ENU frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StateBounds {
    /// Minimum altitude (meters)
    pub min_altitude_m: f64,
    /// Maximum altitude (meters)
    pub max_altitude_m: f64,
    /// Half-width of the horizontal search box around the origin (meters)
    pub horizontal_extent_m: f64,
    /// Limit on each horizontal velocity component (m/s)
    pub max_horizontal_velocity: f64,
    /// Limit on vertical velocity (m/s)
    pub max_vertical_velocity: f64,
    /// Limit on total speed (m/s)
    pub max_speed: f64,
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid config parameter {parameter} = {value}: {reason}")]
    InvalidParameter { parameter: String, value: String, reason: String },

    #[error("failed to access config file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to (de)serialize config: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Configuration validation result
#[derive(Debug)]
pub struct ValidationResult {
    /// Whether configuration is valid
    pub is_valid: bool,
    /// Validation errors
    pub errors: Vec<ConfigError>,
    /// Validation warnings
    pub warnings: Vec<String>,
    /// Suggested corrections
    pub suggestions: Vec<String>,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            max_iterations: 200,
            gradient_tolerance: 1e-12,
            step_tolerance: 1e-12,
            cost_tolerance: 1e-15,
            initial_damping_scale: 1e-3,
            max_damping: 1e16,
            singular_value_ratio: 1e-12,
            nominal_altitude_m: 15_000.0,
            pair_altitude_m: 5_000.0,
            max_range_residual_m: 200.0,
            jacobian: JacobianMode::Analytic,
            bounds: StateBounds::default(),
        }
    }
}

impl Default for StateBounds {
    fn default() -> Self {
        Self {
            min_altitude_m: 0.0,
            max_altitude_m: 30_000.0,
            horizontal_extent_m: 1.0e6,
            max_horizontal_velocity: 1000.0,
            max_vertical_velocity: 200.0,
            max_speed: 400.0,
        }
    }
}

impl StateBounds {
    pub fn contains_altitude(&self, altitude: f64) -> bool {
        altitude >= self.min_altitude_m && altitude <= self.max_altitude_m
    }

    /// Bounds over (x, y, z, vx, vy, vz) with the speed cap on the velocity
    pub fn to_full_state_bounds(&self) -> Bounds {
        let h = self.horizontal_extent_m;
        let vh = self.max_horizontal_velocity;
        let vz = self.max_vertical_velocity;
        Bounds::new(
            DVector::from_vec(vec![-h, -h, self.min_altitude_m, -vh, -vh, -vz]),
            DVector::from_vec(vec![h, h, self.max_altitude_m, vh, vh, vz]),
        )
        .with_norm_limit(vec![3, 4, 5], self.max_speed)
    }

    /// Bounds over (x, y, vx, vy) for fixed-altitude solves
    pub fn to_fixed_altitude_bounds(&self) -> Bounds {
        let h = self.horizontal_extent_m;
        let vh = self.max_horizontal_velocity;
        Bounds::new(
            DVector::from_vec(vec![-h, -h, -vh, -vh]),
            DVector::from_vec(vec![h, h, vh, vh]),
        )
        .with_norm_limit(vec![2, 3], self.max_speed)
    }
}

fn invalid(parameter: &str, value: impl ToString, reason: &str) -> ConfigError {
    ConfigError::InvalidParameter {
        parameter: parameter.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

impl SolverConfig {
    /// Load configuration from a JSON file and reject it if invalid
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path_str = path.as_ref().to_string_lossy().to_string();

        let content = fs::read_to_string(&path).map_err(|source| ConfigError::Io {
            path: path_str,
            source,
        })?;
        let config: SolverConfig = serde_json::from_str(&content)?;

        let validation = config.validate();
        if let Some(error) = validation.errors.into_iter().next() {
            return Err(error);
        }
        Ok(config)
    }

    /// Save configuration to a JSON file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let path_str = path.as_ref().to_string_lossy().to_string();
        let content = serde_json::to_string_pretty(self)?;

        fs::write(&path, content).map_err(|source| ConfigError::Io {
            path: path_str,
            source,
        })
    }

    pub fn validate(&self) -> ValidationResult {
        let mut errors = Vec::new();
        let mut warnings = Vec::new();
        let mut suggestions = Vec::new();

        if self.max_iterations == 0 {
            errors.push(invalid("max_iterations", self.max_iterations, "at least one iteration is required"));
        } else if self.max_iterations > 100_000 {
            warnings.push("Very high iteration cap may make failing solves slow".to_string());
        }

        for (name, value) in [
            ("gradient_tolerance", self.gradient_tolerance),
            ("step_tolerance", self.step_tolerance),
            ("cost_tolerance", self.cost_tolerance),
        ] {
            if !value.is_finite() || value < 0.0 {
                errors.push(invalid(name, value, "tolerance must be finite and non-negative"));
            } else if value > 1e-3 {
                warnings.push(format!("Loose {} may stop the solver far from the optimum", name));
            }
        }

        if !(self.initial_damping_scale > 0.0 && self.initial_damping_scale.is_finite()) {
            errors.push(invalid("initial_damping_scale", self.initial_damping_scale, "must be positive"));
        }
        if !(self.max_damping > 0.0) {
            errors.push(invalid("max_damping", self.max_damping, "must be positive"));
        }
        if !(0.0..1.0).contains(&self.singular_value_ratio) {
            errors.push(invalid("singular_value_ratio", self.singular_value_ratio, "must be in [0, 1)"));
        } else if self.singular_value_ratio == 0.0 {
            warnings.push("Singular Jacobians will only be caught by the Cholesky factorization".to_string());
        }

        if !(self.max_range_residual_m > 0.0) {
            errors.push(invalid("max_range_residual_m", self.max_range_residual_m, "must be positive"));
        }

        let b = &self.bounds;
        if !(b.min_altitude_m < b.max_altitude_m) {
            errors.push(invalid(
                "bounds.max_altitude_m",
                b.max_altitude_m,
                "must exceed bounds.min_altitude_m",
            ));
        }
        for (name, value) in [
            ("bounds.horizontal_extent_m", b.horizontal_extent_m),
            ("bounds.max_horizontal_velocity", b.max_horizontal_velocity),
            ("bounds.max_vertical_velocity", b.max_vertical_velocity),
            ("bounds.max_speed", b.max_speed),
        ] {
            if !(value > 0.0) {
                errors.push(invalid(name, value, "must be positive"));
            }
        }

        if !b.contains_altitude(self.nominal_altitude_m) {
            errors.push(invalid(
                "nominal_altitude_m",
                self.nominal_altitude_m,
                "seed altitude lies outside the altitude bounds",
            ));
        }
        if !b.contains_altitude(self.pair_altitude_m) {
            errors.push(invalid(
                "pair_altitude_m",
                self.pair_altitude_m,
                "fixed altitude lies outside the altitude bounds",
            ));
        }

        let box_speed = (2.0 * b.max_horizontal_velocity.powi(2) + b.max_vertical_velocity.powi(2)).sqrt();
        if b.max_speed >= box_speed {
            warnings.push("Speed cap is looser than the velocity box and has no effect".to_string());
        }

        if self.jacobian == JacobianMode::CentralDifference {
            suggestions.push("Analytic Jacobian is faster and exact for this model".to_string());
        }

        ValidationResult {
            is_valid: errors.is_empty(),
            errors,
            warnings,
            suggestions,
        }
    }
}
