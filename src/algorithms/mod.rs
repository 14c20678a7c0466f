//! Core estimation algorithms

pub mod coordinates;
pub mod initial_guess;
pub mod residuals;
pub mod levenberg_marquardt;

pub use coordinates::EnuFrame;
pub use initial_guess::initial_guess;
pub use residuals::{BistaticModel, FixedAltitudeProblem, FullStateProblem, JacobianMode};
pub use levenberg_marquardt::{Bounds, LeastSquaresProblem, LevenbergMarquardt, LmReport};
