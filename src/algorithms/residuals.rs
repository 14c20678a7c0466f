//! Bistatic range and Doppler measurement model
//!
//! Residuals are interleaved per detection:
//! `[range_1, doppler_1, range_2, doppler_2, ...]`, in meters and Hz. The
//! same ordering is used by the Jacobian rows and by the reported solution.

use nalgebra::{DMatrix, DVector, Vector3, Vector6};
use serde::{Deserialize, Serialize};

use crate::algorithms::levenberg_marquardt::{central_difference_jacobian, LeastSquaresProblem};
use crate::core::constants::SPEED_OF_LIGHT;
use crate::core::{EnuDetection, SolverState};

/// How the solver obtains the residual Jacobian
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JacobianMode {
    Analytic,
    CentralDifference,
}

impl Default for JacobianMode {
    fn default() -> Self {
        JacobianMode::Analytic
    }
}

/// Unit vector and length of `v`; the zero vector when `v` is degenerate
fn unit_and_length(v: Vector3<f64>) -> (Vector3<f64>, f64) {
    let length = v.norm();
    if length > 1e-10 {
        (v / length, length)
    } else {
        (Vector3::zeros(), length)
    }
}

/// Modeled minus measured bistatic range (meters)
pub fn range_residual(position: &Vector3<f64>, detection: &EnuDetection) -> f64 {
    (position - detection.transmitter).norm() + (position - detection.sensor).norm() - detection.range_m
}

/// Rate of change of the transmitter→target→sensor path length (m/s)
pub fn bistatic_range_rate(state: &SolverState, detection: &EnuDetection) -> f64 {
    let (u_t, _) = unit_and_length(state.position - detection.transmitter);
    let (u_s, _) = unit_and_length(state.position - detection.sensor);
    state.velocity.dot(&u_t) + state.velocity.dot(&u_s)
}

/// Doppler shift predicted for `state`; a growing path lowers the frequency
pub fn predicted_doppler(state: &SolverState, detection: &EnuDetection) -> f64 {
    -(detection.freq_hz / SPEED_OF_LIGHT) * bistatic_range_rate(state, detection)
}

/// Modeled minus measured Doppler shift (Hz)
pub fn doppler_residual(state: &SolverState, detection: &EnuDetection) -> f64 {
    predicted_doppler(state, detection) - detection.doppler_hz
}

/// Range and Doppler model over a fixed set of detections
#[derive(Debug, Clone, PartialEq)]
pub struct BistaticModel {
    detections: Vec<EnuDetection>,
}

impl BistaticModel {
    pub fn new(detections: Vec<EnuDetection>) -> Self {
        Self { detections }
    }

    /// Number of residuals, two per detection
    pub fn residual_count(&self) -> usize {
        2 * self.detections.len()
    }

    pub fn residuals(&self, state: &SolverState) -> DVector<f64> {
        let mut residuals = DVector::zeros(self.residual_count());
        for (i, detection) in self.detections.iter().enumerate() {
            residuals[2 * i] = range_residual(&state.position, detection);
            residuals[2 * i + 1] = doppler_residual(state, detection);
        }
        residuals
    }

    /// Analytic Jacobian with columns (x, y, z, vx, vy, vz)
    pub fn jacobian(&self, state: &SolverState) -> DMatrix<f64> {
        let mut jacobian = DMatrix::zeros(self.residual_count(), 6);
        let v = state.velocity;

        for (i, detection) in self.detections.iter().enumerate() {
            let (u_t, d_t) = unit_and_length(state.position - detection.transmitter);
            let (u_s, d_s) = unit_and_length(state.position - detection.sensor);
            let k = detection.freq_hz / SPEED_OF_LIGHT;

            // d|P - F|/dP = u
            let range_gradient = u_t + u_s;

            // d(V·u)/dP = (V - (V·u) u) / |P - F|
            let mut rate_gradient = Vector3::zeros();
            if d_t > 1e-10 {
                rate_gradient += (v - u_t * v.dot(&u_t)) / d_t;
            }
            if d_s > 1e-10 {
                rate_gradient += (v - u_s * v.dot(&u_s)) / d_s;
            }

            for c in 0..3 {
                jacobian[(2 * i, c)] = range_gradient[c];
                jacobian[(2 * i + 1, c)] = -k * rate_gradient[c];
                jacobian[(2 * i + 1, 3 + c)] = -k * range_gradient[c];
            }
        }

        jacobian
    }

    /// Largest absolute range residual (meters)
    pub fn max_range_residual(residuals: &DVector<f64>) -> f64 {
        residuals.iter().step_by(2).fold(0.0_f64, |acc, r| acc.max(r.abs()))
    }
}

/// Full six-parameter problem: (x, y, z, vx, vy, vz)
pub struct FullStateProblem<'a> {
    model: &'a BistaticModel,
    jacobian_mode: JacobianMode,
}

impl<'a> FullStateProblem<'a> {
    pub fn new(model: &'a BistaticModel, jacobian_mode: JacobianMode) -> Self {
        Self { model, jacobian_mode }
    }

    pub fn to_params(state: &SolverState) -> DVector<f64> {
        DVector::from_column_slice(state.to_vector().as_slice())
    }

    pub fn to_state(params: &DVector<f64>) -> SolverState {
        SolverState::from_vector(&Vector6::from_column_slice(params.as_slice()))
    }
}

impl LeastSquaresProblem for FullStateProblem<'_> {
    fn dimension(&self) -> usize {
        6
    }

    fn residuals(&self, params: &DVector<f64>) -> DVector<f64> {
        self.model.residuals(&Self::to_state(params))
    }

    fn jacobian(&self, params: &DVector<f64>) -> DMatrix<f64> {
        match self.jacobian_mode {
            JacobianMode::Analytic => self.model.jacobian(&Self::to_state(params)),
            JacobianMode::CentralDifference => central_difference_jacobian(|p| self.residuals(p), params),
        }
    }
}

/// Four-parameter problem (x, y, vx, vy) at a fixed altitude with no vertical
/// motion, used when only two detections are available.
pub struct FixedAltitudeProblem<'a> {
    model: &'a BistaticModel,
    altitude: f64,
    jacobian_mode: JacobianMode,
}

/// Full-state columns kept by the fixed-altitude problem
const FIXED_ALTITUDE_COLUMNS: [usize; 4] = [0, 1, 3, 4];

impl<'a> FixedAltitudeProblem<'a> {
    pub fn new(model: &'a BistaticModel, altitude: f64, jacobian_mode: JacobianMode) -> Self {
        Self { model, altitude, jacobian_mode }
    }

    pub fn to_params(state: &SolverState) -> DVector<f64> {
        DVector::from_vec(vec![state.position.x, state.position.y, state.velocity.x, state.velocity.y])
    }

    pub fn to_state(&self, params: &DVector<f64>) -> SolverState {
        SolverState::new(
            Vector3::new(params[0], params[1], self.altitude),
            Vector3::new(params[2], params[3], 0.0),
        )
    }
}

impl LeastSquaresProblem for FixedAltitudeProblem<'_> {
    fn dimension(&self) -> usize {
        4
    }

    fn residuals(&self, params: &DVector<f64>) -> DVector<f64> {
        self.model.residuals(&self.to_state(params))
    }

    fn jacobian(&self, params: &DVector<f64>) -> DMatrix<f64> {
        match self.jacobian_mode {
            JacobianMode::Analytic => self
                .model
                .jacobian(&self.to_state(params))
                .select_columns(FIXED_ALTITUDE_COLUMNS.iter()),
            JacobianMode::CentralDifference => central_difference_jacobian(|p| self.residuals(p), params),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detection(transmitter: Vector3<f64>, sensor: Vector3<f64>) -> EnuDetection {
        EnuDetection {
            transmitter,
            sensor,
            freq_hz: 1.09e9,
            range_m: 0.0,
            doppler_hz: 0.0,
        }
    }

    fn sample_model() -> BistaticModel {
        BistaticModel::new(vec![
            detection(Vector3::new(-1000.0, 5000.0, 0.0), Vector3::new(-1800.0, 0.0, 0.0)),
            detection(Vector3::new(-1000.0, 5000.0, 0.0), Vector3::new(3400.0, -3800.0, 0.0)),
            detection(Vector3::new(-1000.0, 5000.0, 0.0), Vector3::new(-1100.0, 4000.0, 0.0)),
        ])
    }

    fn sample_state() -> SolverState {
        SolverState::new(Vector3::new(2000.0, 6000.0, 8000.0), Vector3::new(120.0, -80.0, 5.0))
    }

    #[test]
    fn test_range_residual() {
        let det = EnuDetection {
            range_m: 9000.0,
            ..detection(Vector3::new(0.0, 0.0, 0.0), Vector3::new(8000.0, 0.0, 0.0))
        };
        // 3-4-5 triangles on both legs: 5000 + 5000
        let position = Vector3::new(4000.0, 3000.0, 0.0);
        assert!((range_residual(&position, &det) - 1000.0).abs() < 1e-9);
    }

    #[test]
    fn test_receding_target_lowers_frequency() {
        let det = detection(Vector3::new(0.0, 0.0, 0.0), Vector3::new(100.0, 0.0, 0.0));
        let receding = SolverState::new(Vector3::new(0.0, 10_000.0, 0.0), Vector3::new(0.0, 100.0, 0.0));
        assert!(bistatic_range_rate(&receding, &det) > 0.0);
        assert!(predicted_doppler(&receding, &det) < 0.0);

        let approaching = SolverState::new(receding.position, -receding.velocity);
        assert!(predicted_doppler(&approaching, &det) > 0.0);
    }

    #[test]
    fn test_doppler_scale() {
        // Target far along +y moving straight away: both legs grow at 100 m/s
        let det = detection(Vector3::zeros(), Vector3::zeros());
        let state = SolverState::new(Vector3::new(0.0, 1.0e6, 0.0), Vector3::new(0.0, 100.0, 0.0));
        let expected = -1.09e9 * 200.0 / SPEED_OF_LIGHT;
        assert!((predicted_doppler(&state, &det) - expected).abs() < 1e-9);
    }

    #[test]
    fn test_residual_ordering() {
        let mut model = sample_model();
        let state = sample_state();
        let clean = model.residuals(&state);

        model.detections[1].range_m += 7.0;
        model.detections[2].doppler_hz += 3.0;
        let shifted = model.residuals(&state);

        let delta = shifted - clean;
        let expected = [0.0, 0.0, -7.0, 0.0, 0.0, -3.0];
        for (d, e) in delta.iter().zip(expected.iter()) {
            assert!((d - e).abs() < 1e-9);
        }
    }

    #[test]
    fn test_analytic_jacobian_matches_central_difference() {
        let model = sample_model();
        let state = sample_state();
        let params = FullStateProblem::to_params(&state);

        let analytic = FullStateProblem::new(&model, JacobianMode::Analytic).jacobian(&params);
        let numeric = FullStateProblem::new(&model, JacobianMode::CentralDifference).jacobian(&params);

        assert_eq!(analytic.shape(), (6, 6));
        for (a, n) in analytic.iter().zip(numeric.iter()) {
            assert!((a - n).abs() < 1e-6 * (1.0 + a.abs()), "analytic {} numeric {}", a, n);
        }
    }

    #[test]
    fn test_fixed_altitude_problem() {
        let model = sample_model();
        let problem = FixedAltitudeProblem::new(&model, 5000.0, JacobianMode::Analytic);
        let params = DVector::from_vec(vec![1500.0, 7000.0, 90.0, 40.0]);

        let state = problem.to_state(&params);
        assert_eq!(state.position.z, 5000.0);
        assert_eq!(state.velocity.z, 0.0);
        assert_eq!(FixedAltitudeProblem::to_params(&state), params);

        let analytic = problem.jacobian(&params);
        let numeric = FixedAltitudeProblem::new(&model, 5000.0, JacobianMode::CentralDifference).jacobian(&params);
        assert_eq!(analytic.shape(), (6, 4));
        for (a, n) in analytic.iter().zip(numeric.iter()) {
            assert!((a - n).abs() < 1e-6 * (1.0 + a.abs()));
        }
    }

    #[test]
    fn test_max_range_residual_ignores_doppler() {
        let residuals = DVector::from_vec(vec![-12.0, 400.0, 3.0, -900.0, 7.5, 0.0]);
        assert_eq!(BistaticModel::max_range_residual(&residuals), 12.0);
    }
}
