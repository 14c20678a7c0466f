//! Bounded Levenberg-Marquardt least-squares solver
//!
//! Minimizes the sum of squared residuals of a [`LeastSquaresProblem`] with
//! box bounds (plus an optional norm cap on a group of parameters, used for
//! the target speed). Each step solves the damped normal equations
//! `(JᵀJ + λI) Δ = -Jᵀr` restricted to the directions no active constraint
//! blocks, projects the candidate onto the feasible set and is accepted only
//! when the cost decreases.

use log::debug;
use nalgebra::{DMatrix, DVector};

use crate::core::Termination;
use crate::utils::config::SolverConfig;
use crate::validation::error::SolverError;

/// A nonlinear least-squares problem over a fixed number of parameters
pub trait LeastSquaresProblem {
    /// Number of free parameters
    fn dimension(&self) -> usize;

    /// Residual vector at `params`
    fn residuals(&self, params: &DVector<f64>) -> DVector<f64>;

    /// Jacobian of the residuals with respect to `params`
    fn jacobian(&self, params: &DVector<f64>) -> DMatrix<f64> {
        central_difference_jacobian(|p| self.residuals(p), params)
    }
}

/// Central finite-difference Jacobian of `f` at `x`
pub fn central_difference_jacobian<F>(f: F, x: &DVector<f64>) -> DMatrix<f64>
where
    F: Fn(&DVector<f64>) -> DVector<f64>,
{
    let rows = f(x).len();
    let mut jacobian = DMatrix::zeros(rows, x.len());

    for j in 0..x.len() {
        let h = f64::EPSILON.cbrt() * x[j].abs().max(1.0);
        let mut forward = x.clone();
        let mut backward = x.clone();
        forward[j] += h;
        backward[j] -= h;

        let column = (f(&forward) - f(&backward)) / (2.0 * h);
        jacobian.set_column(j, &column);
    }

    jacobian
}

/// Euclidean norm cap over a subset of parameters
#[derive(Debug, Clone, PartialEq)]
pub struct NormLimit {
    pub indices: Vec<usize>,
    pub max_norm: f64,
}

impl NormLimit {
    fn norm(&self, x: &DVector<f64>) -> f64 {
        self.indices.iter().map(|&i| x[i] * x[i]).sum::<f64>().sqrt()
    }

    fn is_active(&self, x: &DVector<f64>) -> bool {
        let norm = self.norm(x);
        norm > 0.0 && norm >= self.max_norm * (1.0 - 1e-9)
    }

    /// Rate at which moving along `-gradient` grows the capped norm
    fn outward_rate(&self, x: &DVector<f64>, gradient: &DVector<f64>) -> f64 {
        self.indices.iter().map(|&i| -gradient[i] * x[i]).sum::<f64>() / self.norm(x)
    }
}

/// Feasible set for the solver: a box, optionally intersected with a norm cap
#[derive(Debug, Clone, PartialEq)]
pub struct Bounds {
    pub lower: DVector<f64>,
    pub upper: DVector<f64>,
    pub norm_limit: Option<NormLimit>,
}

impl Bounds {
    pub fn new(lower: DVector<f64>, upper: DVector<f64>) -> Self {
        Self { lower, upper, norm_limit: None }
    }

    pub fn unbounded(dimension: usize) -> Self {
        Self::new(
            DVector::from_element(dimension, f64::NEG_INFINITY),
            DVector::from_element(dimension, f64::INFINITY),
        )
    }

    pub fn with_norm_limit(mut self, indices: Vec<usize>, max_norm: f64) -> Self {
        self.norm_limit = Some(NormLimit { indices, max_norm });
        self
    }

    pub fn dimension(&self) -> usize {
        self.lower.len()
    }

    /// Describe the first constraint `x` violates, if any
    pub fn violation(&self, x: &DVector<f64>) -> Option<String> {
        for i in 0..x.len() {
            if !x[i].is_finite() || x[i] < self.lower[i] || x[i] > self.upper[i] {
                return Some(format!(
                    "parameter {} = {} outside [{}, {}]",
                    i, x[i], self.lower[i], self.upper[i]
                ));
            }
        }
        if let Some(limit) = &self.norm_limit {
            let norm = limit.norm(x);
            if norm > limit.max_norm {
                return Some(format!("norm {} of {:?} exceeds {}", norm, limit.indices, limit.max_norm));
            }
        }
        None
    }

    pub fn contains(&self, x: &DVector<f64>) -> bool {
        self.violation(x).is_none()
    }

    fn at_lower(&self, x: &DVector<f64>, i: usize) -> bool {
        x[i] <= self.lower[i] + 1e-9 * (1.0 + self.lower[i].abs())
    }

    fn at_upper(&self, x: &DVector<f64>, i: usize) -> bool {
        x[i] >= self.upper[i] - 1e-9 * (1.0 + self.upper[i].abs())
    }

    /// Clamp into the box, then shrink the capped group onto the norm limit.
    ///
    /// Shrinking towards zero keeps the point inside the box whenever the box
    /// contains the origin for those components.
    pub fn project(&self, x: &DVector<f64>) -> DVector<f64> {
        let mut projected = x.clone();
        for i in 0..projected.len() {
            projected[i] = projected[i].max(self.lower[i]).min(self.upper[i]);
        }
        if let Some(limit) = &self.norm_limit {
            let norm = limit.norm(&projected);
            if norm > limit.max_norm {
                let scale = limit.max_norm / norm;
                for &i in &limit.indices {
                    projected[i] *= scale;
                }
            }
        }
        projected
    }

    /// Describe an active constraint the descent direction `-gradient` pushes
    /// against, i.e. the unconstrained optimum lies outside the feasible set.
    pub fn blocking_constraint(
        &self,
        x: &DVector<f64>,
        gradient: &DVector<f64>,
        threshold: f64,
    ) -> Option<String> {
        for i in 0..x.len() {
            if self.at_lower(x, i) && gradient[i] > threshold {
                return Some(format!("parameter {} held at lower bound {}", i, self.lower[i]));
            }
            if self.at_upper(x, i) && gradient[i] < -threshold {
                return Some(format!("parameter {} held at upper bound {}", i, self.upper[i]));
            }
        }
        if let Some(limit) = &self.norm_limit {
            if limit.is_active(x) && limit.outward_rate(x, gradient) > threshold {
                return Some(format!("norm of {:?} held at limit {}", limit.indices, limit.max_norm));
            }
        }
        None
    }

    /// Orthogonal projector onto the directions still open at `x`.
    ///
    /// Box components the descent direction pushes against are frozen. An
    /// active norm cap the descent direction pushes against loses its radial
    /// direction, so the step slides along the cap instead of into it.
    pub fn free_directions(&self, x: &DVector<f64>, gradient: &DVector<f64>) -> DMatrix<f64> {
        let n = x.len();
        let mut free = DVector::from_element(n, 1.0);
        for i in 0..n {
            if (self.at_lower(x, i) && gradient[i] > 0.0) || (self.at_upper(x, i) && gradient[i] < 0.0) {
                free[i] = 0.0;
            }
        }
        let mut projector = DMatrix::from_diagonal(&free);

        if let Some(limit) = &self.norm_limit {
            if limit.is_active(x) && limit.outward_rate(x, gradient) > 0.0 {
                let mut radial = DVector::<f64>::zeros(n);
                for &i in &limit.indices {
                    radial[i] = x[i] * free[i];
                }
                let length = radial.norm();
                if length > 0.0 {
                    radial /= length;
                    projector -= &radial * radial.transpose();
                }
            }
        }
        projector
    }
}

/// Outcome of a successful minimization
#[derive(Debug, Clone, PartialEq)]
pub struct LmReport {
    pub params: DVector<f64>,
    pub residuals: DVector<f64>,
    /// Sum of squared residuals at `params`
    pub cost: f64,
    pub iterations: usize,
    pub termination: Termination,
    /// Cost after the initial evaluation and after every accepted step
    pub cost_history: Vec<f64>,
}

/// Levenberg-Marquardt solver settings
#[derive(Debug, Clone)]
pub struct LevenbergMarquardt {
    /// Maximum number of iterations before reporting non-convergence
    pub max_iterations: usize,
    /// Stop when the gradient infinity norm falls below this
    pub gradient_tolerance: f64,
    /// Stop when the step norm falls below this, relative to the parameter norm
    pub step_tolerance: f64,
    /// Stop when an accepted step reduces the cost by less than this fraction
    pub cost_tolerance: f64,
    /// Initial damping relative to the largest diagonal entry of JᵀJ
    pub initial_damping_scale: f64,
    /// Damping above which the iteration is considered stalled
    pub max_damping: f64,
    /// Smallest admissible ratio of extreme Jacobian singular values
    pub singular_value_ratio: f64,
}

impl Default for LevenbergMarquardt {
    fn default() -> Self {
        Self::from_config(&SolverConfig::default())
    }
}

impl LevenbergMarquardt {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &SolverConfig) -> Self {
        Self {
            max_iterations: config.max_iterations,
            gradient_tolerance: config.gradient_tolerance,
            step_tolerance: config.step_tolerance,
            cost_tolerance: config.cost_tolerance,
            initial_damping_scale: config.initial_damping_scale,
            max_damping: config.max_damping,
            singular_value_ratio: config.singular_value_ratio,
        }
    }

    /// Minimize the problem's cost starting from `initial`, staying within `bounds`
    pub fn minimize<P: LeastSquaresProblem>(
        &self,
        problem: &P,
        initial: DVector<f64>,
        bounds: &Bounds,
    ) -> Result<LmReport, SolverError> {
        let n = problem.dimension();
        if initial.len() != n || bounds.dimension() != n {
            return Err(SolverError::DimensionMismatch {
                expected: n,
                actual: initial.len().max(bounds.dimension()),
            });
        }
        if let Some(details) = bounds.violation(&initial) {
            return Err(SolverError::InfeasibleInitialGuess { details });
        }

        let mut x = initial;
        let mut residuals = problem.residuals(&x);
        if !all_finite(&residuals) {
            return Err(SolverError::NonFiniteResiduals);
        }
        let mut cost = residuals.norm_squared();
        let mut jacobian = problem.jacobian(&x);
        self.check_conditioning(&jacobian)?;

        let mut jtj = jacobian.transpose() * &jacobian;
        let mut damping = self.initial_damping_scale * jtj.diagonal().max();
        let mut nu = 2.0;
        let mut cost_history = vec![cost];

        for iteration in 0..self.max_iterations {
            let gradient = jacobian.transpose() * &residuals;
            let free = bounds.free_directions(&x, &gradient);
            let free_gradient = &free * &gradient;
            // Stationary within the feasible set; finish decides whether a bound holds it there
            if free_gradient.amax() < self.gradient_tolerance {
                return self.finish(x, residuals, cost, &gradient, bounds, iteration, Termination::GradientTolerance, cost_history);
            }

            let mut augmented = &free * &jtj * &free;
            for i in 0..n {
                augmented[(i, i)] += damping;
            }
            let step = match augmented.cholesky() {
                Some(cholesky) => cholesky.solve(&(-&free_gradient)),
                None => {
                    return Err(SolverError::SingularJacobian {
                        singular_value_ratio: 0.0,
                    })
                }
            };

            let candidate = bounds.project(&(&x + &step));
            let step = &candidate - &x;
            if step.norm() < self.step_tolerance * (x.norm() + self.step_tolerance) {
                return self.finish(x, residuals, cost, &gradient, bounds, iteration, Termination::StepTolerance, cost_history);
            }

            let candidate_residuals = problem.residuals(&candidate);
            let candidate_cost = candidate_residuals.norm_squared();

            if all_finite(&candidate_residuals) && candidate_cost < cost {
                let actual_reduction = cost - candidate_cost;
                // Reduction predicted by the linearized model
                let predicted_reduction = -(2.0 * gradient.dot(&step) + step.dot(&(&jtj * &step)));
                let gain_ratio = if predicted_reduction > 0.0 {
                    actual_reduction / predicted_reduction
                } else {
                    1.0
                };

                debug!(
                    "lm iteration {}: cost {:.6e} -> {:.6e}, damping {:.3e}, gain {:.3}",
                    iteration, cost, candidate_cost, damping, gain_ratio
                );

                x = candidate;
                residuals = candidate_residuals;
                cost = candidate_cost;
                cost_history.push(cost);
                damping *= (1.0 / 3.0_f64).max(1.0 - (2.0 * gain_ratio - 1.0).powi(3));
                nu = 2.0;

                jacobian = problem.jacobian(&x);
                self.check_conditioning(&jacobian)?;
                jtj = jacobian.transpose() * &jacobian;

                if actual_reduction <= self.cost_tolerance * cost {
                    let gradient = jacobian.transpose() * &residuals;
                    return self.finish(x, residuals, cost, &gradient, bounds, iteration + 1, Termination::CostTolerance, cost_history);
                }
            } else {
                debug!(
                    "lm iteration {}: rejected step, cost {:.6e} -> {:.6e}, damping {:.3e}",
                    iteration, cost, candidate_cost, damping
                );
                damping *= nu;
                nu *= 2.0;
                if damping > self.max_damping {
                    return Err(SolverError::DampingOverflow { damping, cost });
                }
            }
        }

        Err(SolverError::MaxIterationsReached {
            iterations: self.max_iterations,
            cost,
        })
    }

    #[allow(clippy::too_many_arguments)]
    fn finish(
        &self,
        params: DVector<f64>,
        residuals: DVector<f64>,
        cost: f64,
        gradient: &DVector<f64>,
        bounds: &Bounds,
        iterations: usize,
        termination: Termination,
        cost_history: Vec<f64>,
    ) -> Result<LmReport, SolverError> {
        if let Some(details) = bounds.blocking_constraint(&params, gradient, self.gradient_tolerance) {
            return Err(SolverError::BoundViolation { details });
        }

        debug!("lm converged after {} iterations ({:?}), cost {:.6e}", iterations, termination, cost);

        Ok(LmReport {
            params,
            residuals,
            cost,
            iterations,
            termination,
            cost_history,
        })
    }

    /// Reject rank-deficient or non-finite Jacobians
    fn check_conditioning(&self, jacobian: &DMatrix<f64>) -> Result<(), SolverError> {
        if !jacobian.iter().all(|v| v.is_finite()) {
            return Err(SolverError::NonFiniteResiduals);
        }
        let singular_values = jacobian.clone().svd(false, false).singular_values;
        let largest = singular_values.max();
        let smallest = singular_values.min();
        let ratio = if largest > 0.0 { smallest / largest } else { 0.0 };

        if ratio < self.singular_value_ratio {
            return Err(SolverError::SingularJacobian {
                singular_value_ratio: ratio,
            });
        }
        Ok(())
    }
}

fn all_finite(v: &DVector<f64>) -> bool {
    v.iter().all(|x| x.is_finite())
}
