//! Levenberg-Marquardt nonlinear least-squares solver.
//!
//! This module provides the [`LevenbergMarquardtSolver`] for fitting the
//! parameters of a calibration expression to observed points.
//!
//! # Algorithm
//!
//! Each iteration solves the column-scaled damped normal equations
//!
//! ```text
//! (Ĵ^T Ĵ + λI) δ̂ = -Ĵ^T r,    Ĵ = J D^{-1},    δ = D^{-1} δ̂
//! ```
//!
//! where `D = diag(‖J_j‖)`. The scaling makes the damping equivalent to
//! Marquardt's `λ diag(J^T J)`, so the solver is insensitive to parameters
//! of very different magnitude (e.g. the coefficients of `x` and `x**2`
//! over a domain of `[0, 1e5]`).
//!
//! # Example
//!
//! ```
//! use calib_core::math::solvers::{LevenbergMarquardtSolver, LMConfig};
//! use calib_core::types::SolverError;
//!
//! // Fit y = a * exp(-b * x) to data
//! let x_data = vec![0.0, 1.0, 2.0, 3.0, 4.0];
//! let y_data: Vec<f64> = x_data.iter().map(|x: &f64| 2.0 * (-0.5 * x).exp()).collect();
//!
//! let residuals = |params: &[f64]| -> Result<Vec<f64>, SolverError> {
//!     Ok(x_data
//!         .iter()
//!         .zip(&y_data)
//!         .map(|(&x, &y)| params[0] * (-params[1] * x).exp() - y)
//!         .collect())
//! };
//!
//! let solver = LevenbergMarquardtSolver::new(LMConfig::default());
//! let result = solver.solve(residuals, vec![1.0, 1.0]).unwrap();
//!
//! assert!(result.converged);
//! assert!((result.params[0] - 2.0).abs() < 1e-6);
//! assert!((result.params[1] - 0.5).abs() < 1e-6);
//! ```

use crate::types::SolverError;
use std::fmt;

/// Configuration for Levenberg-Marquardt solver.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LMConfig {
    /// Convergence tolerance on the residual norm `‖r‖`.
    pub tolerance: f64,
    /// Convergence tolerance on the relative reduction of the cost
    /// `‖r‖²` over an accepted step.
    pub cost_tolerance: f64,
    /// Convergence tolerance on the relative parameter change.
    pub param_tolerance: f64,
    /// Maximum number of iterations.
    pub max_iterations: usize,
    /// Maximum number of residual evaluations (including those spent on the
    /// finite-difference Jacobian). `None` means `100 * (n_params + 1)`.
    pub max_evaluations: Option<usize>,
    /// Initial damping factor.
    pub initial_lambda: f64,
    /// Factor to increase lambda on rejected step.
    pub lambda_up: f64,
    /// Factor to decrease lambda on accepted step.
    pub lambda_down: f64,
    /// Minimum damping factor.
    pub min_lambda: f64,
    /// Maximum damping factor.
    pub max_lambda: f64,
}

impl Default for LMConfig {
    fn default() -> Self {
        Self {
            tolerance: 1e-10,
            cost_tolerance: 1e-12,
            param_tolerance: 1e-10,
            max_iterations: 100,
            max_evaluations: None,
            initial_lambda: 1e-3,
            lambda_up: 10.0,
            lambda_down: 0.1,
            min_lambda: 1e-12,
            max_lambda: 1e12,
        }
    }
}

impl LMConfig {
    /// Residual-evaluation budget for a problem with `n_params` parameters.
    pub fn evaluation_budget(&self, n_params: usize) -> usize {
        self.max_evaluations.unwrap_or(100 * (n_params + 1))
    }
}

/// Why the solver stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// Residual norm fell below `tolerance`.
    ResidualTolerance,
    /// Cost reduction of an accepted step fell below `cost_tolerance`.
    CostTolerance,
    /// Parameter step fell below `param_tolerance`.
    ParameterTolerance,
    /// Iteration limit reached.
    MaxIterations,
    /// Residual-evaluation limit reached.
    MaxEvaluations,
    /// Damping saturated at `max_lambda` without an acceptable step.
    DampingSaturated,
}

impl Termination {
    /// Whether this termination counts as convergence.
    pub fn is_converged(self) -> bool {
        matches!(
            self,
            Termination::ResidualTolerance
                | Termination::CostTolerance
                | Termination::ParameterTolerance
        )
    }
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            Termination::ResidualTolerance => "residual norm is below the tolerance",
            Termination::CostTolerance => "cost reduction is below the cost tolerance",
            Termination::ParameterTolerance => "parameter step is below the parameter tolerance",
            Termination::MaxIterations => "maximum number of iterations exceeded",
            Termination::MaxEvaluations => "maximum number of function evaluations exceeded",
            Termination::DampingSaturated => {
                "damping reached its maximum without reducing the cost"
            }
        };
        write!(f, "{}", msg)
    }
}

/// Result of Levenberg-Marquardt optimization.
#[derive(Debug, Clone, PartialEq)]
pub struct LMResult {
    /// Final optimized parameters.
    pub params: Vec<f64>,
    /// Final residual sum of squares.
    pub residual_ss: f64,
    /// Number of iterations performed.
    pub iterations: usize,
    /// Number of residual evaluations performed.
    pub evaluations: usize,
    /// Whether convergence was achieved.
    pub converged: bool,
    /// Why the solver stopped.
    pub termination: Termination,
    /// Final lambda value.
    pub final_lambda: f64,
}

impl LMResult {
    /// Get the root mean square error.
    pub fn rmse(&self, n_observations: usize) -> f64 {
        if n_observations == 0 {
            return 0.0;
        }
        (self.residual_ss / n_observations as f64).sqrt()
    }
}

/// Levenberg-Marquardt nonlinear least-squares solver.
///
/// Solves `min_p ‖r(p)‖²` where `r` is a vector-valued residual function.
///
/// The residual function may fail. A failure at the starting point or while
/// building the Jacobian aborts the solve; a failure (or a non-finite cost)
/// at a trial point only rejects that step.
#[derive(Debug, Clone)]
pub struct LevenbergMarquardtSolver {
    config: LMConfig,
}

struct Budget {
    used: usize,
    limit: usize,
}

impl Budget {
    fn spend(&mut self, n: usize) -> bool {
        self.used += n;
        self.used <= self.limit
    }
}

impl LevenbergMarquardtSolver {
    /// Create a new LM solver with the given configuration.
    pub fn new(config: LMConfig) -> Self {
        Self { config }
    }

    /// Create a solver with default configuration.
    pub fn with_defaults() -> Self {
        Self {
            config: LMConfig::default(),
        }
    }

    /// Get the solver configuration.
    pub fn config(&self) -> &LMConfig {
        &self.config
    }

    /// Solve the nonlinear least-squares problem.
    ///
    /// Returns `Ok` with `converged == false` when an iteration or
    /// evaluation limit is hit; the caller decides whether that is fatal.
    pub fn solve<F>(&self, residuals: F, initial_params: Vec<f64>) -> Result<LMResult, SolverError>
    where
        F: Fn(&[f64]) -> Result<Vec<f64>, SolverError>,
    {
        let n_params = initial_params.len();
        if n_params == 0 {
            return Err(SolverError::NumericalInstability(
                "Empty parameter vector".to_string(),
            ));
        }

        let mut budget = Budget {
            used: 0,
            limit: self.config.evaluation_budget(n_params),
        };
        let mut params = initial_params;
        let mut lambda = self.config.initial_lambda;

        budget.spend(1);
        let mut r = residuals(&params)?;
        if r.is_empty() {
            return Err(SolverError::NumericalInstability(
                "Empty residual vector".to_string(),
            ));
        }
        let mut ss = sum_of_squares(&r);
        if !ss.is_finite() {
            return Err(SolverError::NumericalInstability(format!(
                "Non-finite cost at initial parameters {:?}",
                params
            )));
        }

        let finish = |params: Vec<f64>, ss: f64, iterations: usize, evaluations: usize,
                      termination: Termination, lambda: f64| LMResult {
            params,
            residual_ss: ss,
            iterations,
            evaluations,
            converged: termination.is_converged(),
            termination,
            final_lambda: lambda,
        };

        let mut jacobian: Option<Vec<Vec<f64>>> = None;

        for iteration in 0..self.config.max_iterations {
            if ss.sqrt() < self.config.tolerance {
                return Ok(finish(
                    params,
                    ss,
                    iteration,
                    budget.used,
                    Termination::ResidualTolerance,
                    lambda,
                ));
            }

            // Jacobian is only recomputed after an accepted step
            let jac = match jacobian.take() {
                Some(j) => j,
                None => {
                    if !budget.spend(n_params) {
                        return Ok(finish(
                            params,
                            ss,
                            iteration,
                            budget.used,
                            Termination::MaxEvaluations,
                            lambda,
                        ));
                    }
                    compute_jacobian(&residuals, &params, &r)?
                }
            };

            let delta = match solve_damped_normal_equations(&jac, &r, lambda) {
                Some(d) => d,
                None => {
                    if lambda >= self.config.max_lambda {
                        return Ok(finish(
                            params,
                            ss,
                            iteration,
                            budget.used,
                            Termination::DampingSaturated,
                            lambda,
                        ));
                    }
                    lambda = (lambda * self.config.lambda_up).min(self.config.max_lambda);
                    jacobian = Some(jac);
                    continue;
                }
            };

            let param_change = delta.iter().map(|d| d * d).sum::<f64>().sqrt();
            let param_norm = params.iter().map(|p| p * p).sum::<f64>().sqrt().max(1.0);
            if param_change / param_norm < self.config.param_tolerance {
                return Ok(finish(
                    params,
                    ss,
                    iteration,
                    budget.used,
                    Termination::ParameterTolerance,
                    lambda,
                ));
            }

            if !budget.spend(1) {
                return Ok(finish(
                    params,
                    ss,
                    iteration,
                    budget.used,
                    Termination::MaxEvaluations,
                    lambda,
                ));
            }
            let new_params: Vec<f64> = params.iter().zip(&delta).map(|(p, d)| p + d).collect();
            let trial = residuals(&new_params)
                .ok()
                .map(|new_r| {
                    let new_ss = sum_of_squares(&new_r);
                    (new_r, new_ss)
                })
                .filter(|(_, new_ss)| new_ss.is_finite());

            match trial {
                Some((new_r, new_ss)) if new_ss < ss => {
                    let reduction = ss - new_ss;
                    params = new_params;
                    r = new_r;
                    let old_ss = ss;
                    ss = new_ss;
                    lambda = (lambda * self.config.lambda_down).max(self.config.min_lambda);
                    if reduction <= self.config.cost_tolerance * old_ss {
                        return Ok(finish(
                            params,
                            ss,
                            iteration + 1,
                            budget.used,
                            Termination::CostTolerance,
                            lambda,
                        ));
                    }
                }
                _ => {
                    if lambda >= self.config.max_lambda {
                        return Ok(finish(
                            params,
                            ss,
                            iteration + 1,
                            budget.used,
                            Termination::DampingSaturated,
                            lambda,
                        ));
                    }
                    lambda = (lambda * self.config.lambda_up).min(self.config.max_lambda);
                    jacobian = Some(jac);
                }
            }
        }

        Ok(finish(
            params,
            ss,
            self.config.max_iterations,
            budget.used,
            Termination::MaxIterations,
            lambda,
        ))
    }
}

/// Solve `(Ĵ^T Ĵ + λI) δ̂ = -Ĵ^T r` with column scaling and unscale the step.
fn solve_damped_normal_equations(
    jacobian: &[Vec<f64>],
    residuals: &[f64],
    lambda: f64,
) -> Option<Vec<f64>> {
    let n_params = jacobian.first().map_or(0, |row| row.len());
    let n_residuals = residuals.len();

    let mut jtj = vec![vec![0.0; n_params]; n_params];
    for i in 0..n_params {
        for j in 0..=i {
            let mut sum = 0.0;
            for k in 0..n_residuals {
                sum += jacobian[k][i] * jacobian[k][j];
            }
            jtj[i][j] = sum;
            jtj[j][i] = sum;
        }
    }

    let mut jtr = vec![0.0; n_params];
    for (i, g) in jtr.iter_mut().enumerate() {
        let mut sum = 0.0;
        for k in 0..n_residuals {
            sum += jacobian[k][i] * residuals[k];
        }
        *g = -sum;
    }

    // Columns with no influence get unit scale so they stay well-posed under damping
    let scale: Vec<f64> = (0..n_params)
        .map(|i| {
            let s = jtj[i][i].sqrt();
            if s.is_finite() && s > 0.0 {
                s
            } else {
                1.0
            }
        })
        .collect();

    for i in 0..n_params {
        for j in 0..n_params {
            jtj[i][j] /= scale[i] * scale[j];
        }
        jtj[i][i] += lambda;
        jtr[i] /= scale[i];
    }

    let scaled = solve_cholesky(&jtj, &jtr)?;
    Some(scaled.iter().zip(&scale).map(|(d, s)| d / s).collect())
}

/// Compute Jacobian matrix using forward finite differences.
fn compute_jacobian<F>(residuals: &F, params: &[f64], r0: &[f64]) -> Result<Vec<Vec<f64>>, SolverError>
where
    F: Fn(&[f64]) -> Result<Vec<f64>, SolverError>,
{
    let n_params = params.len();
    let n_residuals = r0.len();
    let eps = f64::EPSILON.sqrt();

    let mut jacobian = vec![vec![0.0; n_params]; n_residuals];

    for j in 0..n_params {
        let h = eps * params[j].abs().max(1.0);

        let mut params_plus = params.to_vec();
        params_plus[j] += h;
        // Use the exactly representable step
        let h = params_plus[j] - params[j];

        let r_plus = residuals(&params_plus)?;
        if r_plus.len() != n_residuals {
            return Err(SolverError::NumericalInstability(format!(
                "Residual length changed from {} to {}",
                n_residuals,
                r_plus.len()
            )));
        }

        for i in 0..n_residuals {
            let derivative = (r_plus[i] - r0[i]) / h;
            if !derivative.is_finite() {
                return Err(SolverError::NumericalInstability(format!(
                    "Non-finite Jacobian entry for parameter {} at {:?}",
                    j, params
                )));
            }
            jacobian[i][j] = derivative;
        }
    }

    Ok(jacobian)
}

/// Compute sum of squares of a vector.
#[inline]
fn sum_of_squares(v: &[f64]) -> f64 {
    v.iter().map(|x| x * x).sum()
}

/// Solve Ax = b using Cholesky decomposition.
fn solve_cholesky(a: &[Vec<f64>], b: &[f64]) -> Option<Vec<f64>> {
    let n = b.len();
    if n == 0 || a.len() != n {
        return None;
    }

    // A = L L^T
    let mut l = vec![vec![0.0; n]; n];

    for i in 0..n {
        for j in 0..=i {
            let mut sum = a[i][j];
            for k in 0..j {
                sum -= l[i][k] * l[j][k];
            }

            if i == j {
                if sum <= 0.0 || sum.is_nan() {
                    return None;
                }
                l[i][j] = sum.sqrt();
            } else {
                l[i][j] = sum / l[j][j];
            }
        }
    }

    // L y = b
    let mut y = vec![0.0; n];
    for i in 0..n {
        let mut sum = b[i];
        for j in 0..i {
            sum -= l[i][j] * y[j];
        }
        y[i] = sum / l[i][i];
    }

    // L^T x = y
    let mut x = vec![0.0; n];
    for i in (0..n).rev() {
        let mut sum = y[i];
        for j in (i + 1)..n {
            sum -= l[j][i] * x[j];
        }
        x[i] = sum / l[i][i];
    }

    if x.iter().all(|v| v.is_finite()) {
        Some(x)
    } else {
        None
    }
}
