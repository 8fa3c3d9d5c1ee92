//! Least-squares fitting of expression parameters to calibration points.

use super::points::check_points;
use calib_core::expr::{evaluate, validate_expression, Expression, Symbol};
use calib_core::math::solvers::{LMConfig, LevenbergMarquardtSolver, Termination};
use calib_core::types::{CalibrationError, Interval, SolverError};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Levenberg-Marquardt options for fitting.
///
/// Deserialises from a partial table; missing keys take the defaults of
/// [`LMConfig`].
///
/// # Example
///
/// ```
/// use calib_models::calibration::FitOptions;
///
/// let opts: FitOptions = toml::from_str("max_iterations = 50").unwrap();
/// assert_eq!(opts.max_iterations, 50);
/// assert_eq!(opts.tolerance, FitOptions::default().tolerance);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FitOptions {
    /// Convergence tolerance on the residual norm.
    pub tolerance: f64,
    /// Convergence tolerance on the relative cost reduction.
    pub cost_tolerance: f64,
    /// Convergence tolerance on the relative parameter change.
    pub param_tolerance: f64,
    /// Maximum number of iterations.
    pub max_iterations: usize,
    /// Maximum number of residual evaluations; `None` scales with the
    /// parameter count.
    pub max_evaluations: Option<usize>,
    /// Initial damping factor.
    pub initial_lambda: f64,
    /// Damping increase on a rejected step.
    pub lambda_up: f64,
    /// Damping decrease on an accepted step.
    pub lambda_down: f64,
}

impl Default for FitOptions {
    fn default() -> Self {
        let lm = LMConfig::default();
        Self {
            tolerance: lm.tolerance,
            cost_tolerance: lm.cost_tolerance,
            param_tolerance: lm.param_tolerance,
            max_iterations: lm.max_iterations,
            max_evaluations: lm.max_evaluations,
            initial_lambda: lm.initial_lambda,
            lambda_up: lm.lambda_up,
            lambda_down: lm.lambda_down,
        }
    }
}

impl FitOptions {
    /// Create options with the given tolerance and iteration limit.
    pub fn new(tolerance: f64, max_iterations: usize) -> Self {
        Self {
            tolerance,
            max_iterations,
            ..Default::default()
        }
    }

    /// Set the residual-evaluation limit.
    pub fn with_max_evaluations(mut self, max_evaluations: usize) -> Self {
        self.max_evaluations = Some(max_evaluations);
        self
    }

    /// Set the damping schedule.
    pub fn with_damping(mut self, initial: f64, up: f64, down: f64) -> Self {
        self.initial_lambda = initial;
        self.lambda_up = up;
        self.lambda_down = down;
        self
    }

    /// Solver configuration for these options.
    pub fn to_lm_config(&self) -> LMConfig {
        LMConfig {
            tolerance: self.tolerance,
            cost_tolerance: self.cost_tolerance,
            param_tolerance: self.param_tolerance,
            max_iterations: self.max_iterations,
            max_evaluations: self.max_evaluations,
            initial_lambda: self.initial_lambda,
            lambda_up: self.lambda_up,
            lambda_down: self.lambda_down,
            ..LMConfig::default()
        }
    }

    /// Collect every problem with these options.
    pub fn problems(&self) -> Vec<String> {
        let mut problems = Vec::new();
        for (name, value) in [
            ("tolerance", self.tolerance),
            ("cost_tolerance", self.cost_tolerance),
            ("param_tolerance", self.param_tolerance),
            ("initial_lambda", self.initial_lambda),
        ] {
            if !(value.is_finite() && value > 0.0) {
                problems.push(format!("fit.{} must be positive and finite: {}", name, value));
            }
        }
        if self.max_iterations == 0 {
            problems.push("fit.max_iterations must be > 0".to_string());
        }
        if self.max_evaluations == Some(0) {
            problems.push("fit.max_evaluations must be > 0".to_string());
        }
        if !(self.lambda_up.is_finite() && self.lambda_up > 1.0) {
            problems.push(format!("fit.lambda_up must be > 1: {}", self.lambda_up));
        }
        if !(self.lambda_down > 0.0 && self.lambda_down < 1.0) {
            problems.push(format!("fit.lambda_down must be in (0, 1): {}", self.lambda_down));
        }
        problems
    }
}

/// Outcome of a successful fit.
#[derive(Debug, Clone, PartialEq)]
pub struct FitReport {
    /// Fitted parameters
    pub params: Vec<f64>,
    /// Sum of squared residuals at `params`. NaN for a parameter-free
    /// expression that cannot be evaluated at every point.
    pub residual_ss: f64,
    /// Root mean squared residual
    pub rmse: f64,
    /// Solver iterations (0 when nothing was optimised)
    pub iterations: usize,
    /// Residual evaluations
    pub evaluations: usize,
    /// Why the solver stopped (`None` when nothing was optimised)
    pub termination: Option<Termination>,
    /// Wall time spent
    pub duration: Duration,
}

/// Fit the parameters of `expression` to the points by least squares.
///
/// The expression is validated without parameters, the points are checked
/// against `domain` and `range`, and the initial guess (ones unless
/// `params0` is given) is validated against the expression. An expression
/// without parameters returns an empty parameter vector without running the
/// solver. Residuals `y - f(p, x)` are computed through the sandboxed
/// evaluator, so the range clipping applies during the fit.
///
/// # Errors
///
/// - [`CalibrationError::InsufficientPoints`] when there are fewer points
///   than parameters
/// - [`CalibrationError::NotConverged`] when the solver stops on a limit
/// - any validation error of the expression, points or guess
pub fn fit_expression(
    expression: &str,
    points_x: &[f64],
    points_y: &[f64],
    params0: Option<&[f64]>,
    domain: Interval,
    range: Interval,
    options: &FitOptions,
) -> Result<FitReport, CalibrationError> {
    let start = Instant::now();

    let expr = validate_expression(expression, None, Symbol::X, domain, range)?;
    let (xs, ys) = check_points(points_x, points_y, domain, range)?;
    let n_params = expr.param_count();

    let guess = match params0 {
        Some(p) => p.to_vec(),
        None => vec![1.0; n_params],
    };
    if guess.len() != n_params {
        return Err(CalibrationError::ParameterCount {
            expected: n_params,
            got: guess.len(),
        });
    }
    let expr = validate_expression(expr.as_str(), Some(guess.as_slice()), Symbol::X, domain, range)?;

    if xs.len() < n_params {
        return Err(CalibrationError::insufficient_points(n_params, xs.len()));
    }

    debug!(
        expression = expr.as_str(),
        n_params,
        n_points = xs.len(),
        "fitting calibration expression"
    );

    if n_params == 0 {
        // nothing to fit; the residual sum is informational only
        let residual_ss = residuals(&expr, &[], &xs, &ys, domain, range)
            .map(|r| sum_of_squares(&r))
            .unwrap_or(f64::NAN);
        return Ok(FitReport {
            params: Vec::new(),
            residual_ss,
            rmse: rmse(residual_ss, xs.len()),
            iterations: 0,
            evaluations: 0,
            termination: None,
            duration: start.elapsed(),
        });
    }

    let solver = LevenbergMarquardtSolver::new(options.to_lm_config());
    let objective = |p: &[f64]| {
        residuals(&expr, p, &xs, &ys, domain, range)
            .map_err(|e| SolverError::NumericalInstability(format!("residual evaluation failed: {}", e)))
    };
    let result = solver.solve(objective, guess)?;

    if !result.converged {
        warn!(
            expression = expr.as_str(),
            iterations = result.iterations,
            evaluations = result.evaluations,
            termination = %result.termination,
            "calibration fit did not converge"
        );
        return Err(CalibrationError::NotConverged {
            message: result.termination.to_string(),
            iterations: result.iterations,
        });
    }

    debug!(
        iterations = result.iterations,
        residual_ss = result.residual_ss,
        termination = %result.termination,
        "calibration fit converged"
    );

    Ok(FitReport {
        rmse: result.rmse(xs.len()),
        params: result.params,
        residual_ss: result.residual_ss,
        iterations: result.iterations,
        evaluations: result.evaluations,
        termination: Some(result.termination),
        duration: start.elapsed(),
    })
}

fn residuals(
    expr: &Expression,
    params: &[f64],
    xs: &[f64],
    ys: &[f64],
    domain: Interval,
    range: Interval,
) -> Result<Vec<f64>, CalibrationError> {
    let fitted = evaluate(expr, params, xs, Symbol::X, domain, range)?;
    Ok(ys.iter().zip(&fitted).map(|(y, f)| y - f).collect())
}

fn sum_of_squares(values: &[f64]) -> f64 {
    values.iter().map(|v| v * v).sum()
}

fn rmse(residual_ss: f64, n: usize) -> f64 {
    if n == 0 {
        0.0
    } else {
        (residual_ss / n as f64).sqrt()
    }
}
