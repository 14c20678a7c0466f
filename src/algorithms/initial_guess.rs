//! Starting state for the bistatic solver
//!
//! Each detection constrains the target to an ellipsoid whose foci are the
//! transmitter and the sensor. The planar seed is the mean of the focus
//! midpoints; altitude comes from policy and velocity starts at zero.

use nalgebra::Vector3;

use crate::algorithms::coordinates::average_points;
use crate::core::{EnuDetection, SolverState};

/// Midpoint between the two foci of a detection's ellipsoid
pub fn ellipse_center(detection: &EnuDetection) -> Vector3<f64> {
    (detection.transmitter + detection.sensor) / 2.0
}

/// Seed state from ellipse centres at `nominal_altitude`.
///
/// Returns `None` only when there are no detections. No feasibility check is
/// made here even when the centres disagree strongly.
pub fn initial_guess(detections: &[EnuDetection], nominal_altitude: f64) -> Option<SolverState> {
    let centers: Vec<Vector3<f64>> = detections.iter().map(ellipse_center).collect();
    let mean = average_points(&centers)?;

    Some(SolverState::new(
        Vector3::new(mean.x, mean.y, nominal_altitude),
        Vector3::zeros(),
    ))
}
