//! Blocking API for solving detection sets
//!
//! Each call runs the whole pipeline synchronously: validation, frame setup,
//! initial guess, bounded Levenberg-Marquardt and result composition. The
//! API holds no mutable state, so one instance can serve many threads.

use std::path::Path;
use std::thread;

use log::{debug, info, warn};

use crate::algorithms::coordinates::EnuFrame;
use crate::algorithms::initial_guess::initial_guess;
use crate::algorithms::levenberg_marquardt::LevenbergMarquardt;
use crate::algorithms::residuals::{BistaticModel, FixedAltitudeProblem, FullStateProblem};
use crate::api::types::SolverOutput;
use crate::core::Solution;
use crate::processing::composer::{to_enu_detections, ResultComposer};
use crate::processing::parser::{load_input, parse_input, TelemetryInput};
use crate::utils::config::SolverConfig;
use crate::validation::data::{DetectionPair, DetectionSet, DetectionTriple};
use crate::validation::error::{PipelineError, SolverError};

/// Synchronous bistatic solver
pub struct BlockingSolverApi {
    config: SolverConfig,
    solver: LevenbergMarquardt,
}

impl Default for BlockingSolverApi {
    fn default() -> Self {
        Self::new(SolverConfig::default())
    }
}

impl BlockingSolverApi {
    pub fn new(config: SolverConfig) -> Self {
        let solver = LevenbergMarquardt::from_config(&config);
        Self { config, solver }
    }

    /// Solve a validated detection set
    pub fn solve_detections(&self, detections: &DetectionSet) -> Result<Solution, SolverError> {
        let result = match detections {
            DetectionSet::Triple(triple) => self.solve_triple(triple),
            DetectionSet::Pair(pair) => self.solve_pair(pair),
        };

        match &result {
            Ok(solution) => info!(
                "timestamp {}: solved in {} iterations ({:?}), lat {:.6} lon {:.6} alt {:.1} m, metric {:.3e}",
                solution.timestamp,
                solution.iterations,
                solution.termination,
                solution.position.lat,
                solution.position.lon,
                solution.position.alt,
                solution.convergence_metric
            ),
            Err(error) => warn!("timestamp {}: no solution ({})", detections.timestamp(), error),
        }
        result
    }

    /// Full position and velocity from three detections
    pub fn solve_triple(&self, triple: &DetectionTriple) -> Result<Solution, SolverError> {
        let frame = EnuFrame::new(triple.enu_origin());
        debug!("enu origin {:?}", frame.origin());
        let detections = to_enu_detections(&frame, triple.detections());
        let seed = initial_guess(&detections, self.config.nominal_altitude_m).ok_or(SolverError::NoDetections)?;
        debug!("initial guess {:?}", seed);

        let model = BistaticModel::new(detections);
        let problem = FullStateProblem::new(&model, self.config.jacobian);
        let bounds = self.config.bounds.to_full_state_bounds();

        let report = self.solver.minimize(&problem, FullStateProblem::to_params(&seed), &bounds)?;
        let state = FullStateProblem::to_state(&report.params);

        ResultComposer::new(&frame, self.config.max_range_residual_m).compose(triple.timestamp(), &state, &report)
    }

    /// Horizontal position and velocity from two detections at the configured altitude
    pub fn solve_pair(&self, pair: &DetectionPair) -> Result<Solution, SolverError> {
        let altitude = self.config.pair_altitude_m;
        if !self.config.bounds.contains_altitude(altitude) {
            return Err(SolverError::InfeasibleInitialGuess {
                details: format!("fixed altitude {} m outside altitude bounds", altitude),
            });
        }

        let frame = EnuFrame::new(pair.enu_origin());
        debug!("enu origin {:?}", frame.origin());
        let detections = to_enu_detections(&frame, pair.detections());
        let seed = initial_guess(&detections, altitude).ok_or(SolverError::NoDetections)?;
        debug!("initial guess {:?}", seed);

        let model = BistaticModel::new(detections);
        let problem = FixedAltitudeProblem::new(&model, altitude, self.config.jacobian);
        let bounds = self.config.bounds.to_fixed_altitude_bounds();

        let report = self.solver.minimize(&problem, FixedAltitudeProblem::to_params(&seed), &bounds)?;
        let state = problem.to_state(&report.params);

        ResultComposer::new(&frame, self.config.max_range_residual_m).compose(pair.timestamp(), &state, &report)
    }

    /// Validate and solve a decoded input document
    pub fn solve_input(&self, input: &TelemetryInput) -> Result<Solution, PipelineError> {
        let detections = input.validate()?;
        Ok(self.solve_detections(&detections)?)
    }

    pub fn solve_json(&self, json: &str) -> Result<Solution, PipelineError> {
        let input = parse_input(json)?;
        self.solve_input(&input)
    }

    pub fn solve_file<P: AsRef<Path>>(&self, path: P) -> Result<Solution, PipelineError> {
        let input = load_input(path)?;
        self.solve_input(&input)
    }

    /// Solve a file and render the outcome as an output document
    pub fn to_output<P: AsRef<Path>>(&self, path: P) -> SolverOutput {
        SolverOutput::from(&self.solve_file(path))
    }

    /// Solve independent inputs, one scoped thread each; results keep input order
    pub fn solve_batch(&self, inputs: &[TelemetryInput]) -> Vec<Result<Solution, PipelineError>> {
        thread::scope(|scope| {
            let handles: Vec<_> = inputs
                .iter()
                .map(|input| scope.spawn(move || self.solve_input(input)))
                .collect();

            handles
                .into_iter()
                .map(|handle| handle.join().unwrap_or_else(|panic| std::panic::resume_unwind(panic)))
                .collect()
        })
    }
}
