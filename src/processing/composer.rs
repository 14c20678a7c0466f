//! Conversion between detection records and the local frame the solver works in

use log::warn;

use crate::algorithms::coordinates::EnuFrame;
use crate::algorithms::levenberg_marquardt::LmReport;
use crate::algorithms::residuals::BistaticModel;
use crate::core::{Detection, EnuDetection, Solution, SolverState};
use crate::validation::error::SolverError;

/// Express each detection's transmitter, sensor and measurements in `frame`
pub fn to_enu_detections(frame: &EnuFrame, detections: &[Detection]) -> Vec<EnuDetection> {
    detections
        .iter()
        .map(|d| EnuDetection {
            transmitter: frame.geodetic_to_enu(&d.transmitter_position()),
            sensor: frame.geodetic_to_enu(&d.sensor_position()),
            freq_hz: d.freq_hz(),
            range_m: d.bistatic_range_m(),
            doppler_hz: d.doppler_hz,
        })
        .collect()
}

/// Builds the reported [`Solution`] from a converged solve
pub struct ResultComposer<'a> {
    frame: &'a EnuFrame,
    max_range_residual_m: f64,
}

impl<'a> ResultComposer<'a> {
    pub fn new(frame: &'a EnuFrame, max_range_residual_m: f64) -> Self {
        Self { frame, max_range_residual_m }
    }

    /// Map the solved ENU state back to geodetic coordinates.
    ///
    /// Fails when any range residual exceeds the acceptance threshold.
    pub fn compose(&self, timestamp: u64, state: &SolverState, report: &LmReport) -> Result<Solution, SolverError> {
        if !report.residuals.iter().all(|r| r.is_finite()) {
            return Err(SolverError::NonFiniteResiduals);
        }

        let max_residual_m = BistaticModel::max_range_residual(&report.residuals);
        if max_residual_m > self.max_range_residual_m {
            warn!(
                "range residual {:.3} m above threshold {:.3} m",
                max_residual_m, self.max_range_residual_m
            );
            return Err(SolverError::ResidualAboveThreshold {
                max_residual_m,
                threshold_m: self.max_range_residual_m,
            });
        }

        Ok(Solution {
            timestamp,
            position: self.frame.enu_to_geodetic(&state.position),
            velocity_enu: state.velocity,
            convergence_metric: report.cost.sqrt(),
            residuals: report.residuals.iter().copied().collect(),
            iterations: report.iterations,
            termination: report.termination,
        })
    }
}
