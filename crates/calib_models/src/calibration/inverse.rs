//! Inversion of calibration functions.
//!
//! With a closed-form inverse expression the inverse is a direct evaluation
//! in `y` (domain and range swapped). Otherwise `f(x) - y` is solved with
//! Brent's method bracketed by the domain. Either way the result is checked
//! by evaluating the forward function again.

use super::aggregate::{is_close, Calibration};
use calib_core::expr::{evaluate_scalar, Symbol};
use calib_core::math::solvers::{BrentSolver, SolverConfig};
use calib_core::types::CalibrationError;
use serde::{Deserialize, Serialize};
use tracing::{error, trace};

/// Options for [`Calibration::inverse_with`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InverseOptions {
    /// Absolute root tolerance in `x`.
    pub tolerance: f64,
    /// Maximum root-finding iterations.
    pub max_iterations: usize,
    /// Relative tolerance of the consistency check `f(x) ≈ y`.
    pub check_rtol: f64,
    /// Absolute tolerance of the consistency check `f(x) ≈ y`.
    pub check_atol: f64,
}

impl Default for InverseOptions {
    fn default() -> Self {
        let solver = SolverConfig::<f64>::default();
        Self {
            tolerance: solver.tolerance,
            max_iterations: solver.max_iterations,
            check_rtol: 1e-5,
            check_atol: 1e-8,
        }
    }
}

impl InverseOptions {
    /// Set the consistency-check tolerances.
    pub fn with_check_tolerances(mut self, rtol: f64, atol: f64) -> Self {
        self.check_rtol = rtol;
        self.check_atol = atol;
        self
    }

    /// Root finder configuration for these options.
    pub fn to_solver_config(&self) -> SolverConfig<f64> {
        SolverConfig {
            tolerance: self.tolerance,
            max_iterations: self.max_iterations,
        }
    }

    /// Collect every problem with these options.
    pub fn problems(&self) -> Vec<String> {
        let mut problems = Vec::new();
        if !(self.tolerance.is_finite() && self.tolerance > 0.0) {
            problems.push(format!("inverse.tolerance must be positive and finite: {}", self.tolerance));
        }
        if self.max_iterations == 0 {
            problems.push("inverse.max_iterations must be > 0".to_string());
        }
        if !(self.check_rtol >= 0.0 && self.check_atol >= 0.0) {
            problems.push(format!(
                "inverse check tolerances must be non-negative: rtol={}, atol={}",
                self.check_rtol, self.check_atol
            ));
        }
        problems
    }
}

impl Calibration {
    /// Find `x` with `f(x) = y`.
    ///
    /// `x0` is an optional hint for the numerical path: the bracket is grown
    /// outward from `x0` until `f(x) - y` changes sign, so the root nearest
    /// the hint is found. It is ignored when an inverse expression is set.
    ///
    /// # Errors
    ///
    /// - [`CalibrationError::OutOfRange`] when `y` is outside the range
    /// - [`CalibrationError::NoBracket`] when `f(x) - y` does not change
    ///   sign over the (narrowed) domain
    /// - [`CalibrationError::InverseInconsistency`] when `f(x)` does not
    ///   reproduce `y`; this is not recoverable
    pub fn inverse(&self, y: f64, x0: Option<f64>) -> Result<f64, CalibrationError> {
        self.inverse_with(y, x0, &InverseOptions::default())
    }

    /// [`inverse`](Self::inverse) with explicit options.
    pub fn inverse_with(&self, y: f64, x0: Option<f64>, options: &InverseOptions) -> Result<f64, CalibrationError> {
        let range = self.range();
        if !range.contains(y) {
            return Err(CalibrationError::OutOfRange {
                value: y,
                lo: range.lo(),
                hi: range.hi(),
            });
        }

        let x = match self.inv_expression() {
            Some(inv) => evaluate_scalar(inv, self.params(), y, Symbol::Y, range, self.domain())?,
            None => self.solve_inverse(y, x0, options)?,
        };

        let fx = self.evaluate(x)?;
        if !is_close(fx, y, options.check_rtol, options.check_atol) {
            error!(
                expression = self.expression().as_str(),
                x, fx, y, "inverse does not reproduce the requested value"
            );
            return Err(CalibrationError::InverseInconsistency { x, fx, y });
        }
        Ok(x)
    }

    /// Invert every element of `ys`, with an optional matching hint per
    /// element.
    pub fn inverse_many(&self, ys: &[f64], x0: Option<&[f64]>) -> Result<Vec<f64>, CalibrationError> {
        self.inverse_many_with(ys, x0, &InverseOptions::default())
    }

    /// [`inverse_many`](Self::inverse_many) with explicit options.
    ///
    /// With the `parallel` feature the elements are inverted concurrently.
    pub fn inverse_many_with(
        &self,
        ys: &[f64],
        x0: Option<&[f64]>,
        options: &InverseOptions,
    ) -> Result<Vec<f64>, CalibrationError> {
        if let Some(hints) = x0 {
            if hints.len() != ys.len() {
                return Err(CalibrationError::invalid_argument(format!(
                    "Number of hints must match number of values: {}, {}",
                    hints.len(),
                    ys.len()
                )));
            }
        }
        let hint = |i: usize| x0.map(|h| h[i]);

        #[cfg(feature = "parallel")]
        {
            use rayon::prelude::*;
            ys.par_iter()
                .enumerate()
                .map(|(i, &y)| self.inverse_with(y, hint(i), options))
                .collect()
        }

        #[cfg(not(feature = "parallel"))]
        {
            ys.iter()
                .enumerate()
                .map(|(i, &y)| self.inverse_with(y, hint(i), options))
                .collect()
        }
    }

    fn solve_inverse(&self, y: f64, x0: Option<f64>, options: &InverseOptions) -> Result<f64, CalibrationError> {
        let (lo, hi) = self.domain().bounds();
        let f = |x: f64| self.evaluate(x).map(|fx| fx - y);

        let (a, b) = match x0 {
            None => (lo, hi),
            Some(x0) => {
                let f0 = f(x0)?;
                if f0 == 0.0 {
                    return Ok(x0);
                }
                bracket_around(&f, x0, f0, lo, hi)?
            }
        };

        trace!(y, a, b, "bracketed inverse search");
        BrentSolver::new(options.to_solver_config()).find_root(f, a, b)
    }
}

/// Initial half-width of the hint bracket as a fraction of the domain width.
const HINT_STEP: f64 = 1e-3;

/// Widen a bracket around `x0` geometrically until `f` changes sign on one
/// side, falling back to the whole domain.
fn bracket_around<F>(f: &F, x0: f64, f0: f64, lo: f64, hi: f64) -> Result<(f64, f64), CalibrationError>
where
    F: Fn(f64) -> Result<f64, CalibrationError>,
{
    let changes_sign = |v: f64| v == 0.0 || (v < 0.0) != (f0 < 0.0);
    let mut step = (hi - lo) * HINT_STEP;
    loop {
        let a = (x0 - step).max(lo);
        if a < x0 && changes_sign(f(a)?) {
            return Ok((a, x0));
        }
        let b = (x0 + step).min(hi);
        if b > x0 && changes_sign(f(b)?) {
            return Ok((x0, b));
        }
        if a <= lo && b >= hi {
            return Ok((lo, hi));
        }
        step *= 2.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use calib_core::types::Interval;

    // ========================================
    // Closed-Form Tests
    // ========================================

    #[test]
    fn test_closed_form_inverse() {
        let cal = Calibration::builder("p[0] + p[1] * x", vec![5.0, 0.5])
            .inv_expression("(y - p[0]) / p[1]")
            .build()
            .unwrap();
        assert_relative_eq!(cal.inverse(55.0, None).unwrap(), 100.0);
    }

    #[test]
    fn test_wrong_closed_form_is_inconsistent() {
        let cal = Calibration::builder("p[0] + p[1] * x", vec![5.0, 0.5])
            .inv_expression("(y + p[0]) / p[1]")
            .build()
            .unwrap();
        let err = cal.inverse(55.0, None).unwrap_err();
        assert!(matches!(err, CalibrationError::InverseInconsistency { .. }));
        assert!(!err.is_recoverable());
    }

    // ========================================
    // Numerical Tests
    // ========================================

    #[test]
    fn test_numerical_inverse() {
        let cal = Calibration::new("sqrt(p[0] + p[1] * x)", vec![1.0, 2.0]).unwrap();
        let y = cal.evaluate(1234.5).unwrap();
        assert_relative_eq!(cal.inverse(y, None).unwrap(), 1234.5, epsilon = 1e-6);
    }

    #[test]
    fn test_hint_narrows_bracket() {
        // Non-monotonic: roots at x = 10 and x = 90
        let cal = Calibration::builder("p[0] * (x - 50)**2", vec![0.01])
            .domain(Interval::domain(0.0, 100.0).unwrap())
            .build()
            .unwrap();
        assert!(matches!(cal.inverse(16.0, None), Err(CalibrationError::NoBracket { .. })));
        assert_relative_eq!(cal.inverse(16.0, Some(50.0)).unwrap(), 10.0, epsilon = 1e-8);
        assert_relative_eq!(cal.inverse(16.0, Some(95.0)).unwrap(), 90.0, epsilon = 1e-8);
        assert_relative_eq!(cal.inverse(16.0, Some(90.0)).unwrap(), 90.0, epsilon = 1e-8);
    }

    #[test]
    fn test_out_of_range() {
        let cal = Calibration::new("p[0] * x", vec![1.0]).unwrap();
        assert!(matches!(cal.inverse(-1.0, None), Err(CalibrationError::OutOfRange { .. })));
        assert!(matches!(cal.inverse(f64::NAN, None), Err(CalibrationError::OutOfRange { .. })));
    }

    #[test]
    fn test_hint_outside_domain() {
        let cal = Calibration::new("p[0] * x", vec![1.0]).unwrap();
        assert!(matches!(
            cal.inverse(10.0, Some(-5.0)),
            Err(CalibrationError::OutOfDomain { .. })
        ));
    }

    // ========================================
    // Slice Tests
    // ========================================

    #[test]
    fn test_inverse_many() {
        let cal = Calibration::new("p[0] * x + p[1] * x**2", vec![1.0, 0.001]).unwrap();
        let xs = [0.0, 10.0, 500.0, 2000.0];
        let ys = cal.evaluate_many(&xs).unwrap();
        let back = cal.inverse_many(&ys, Some(&xs[..])).unwrap();
        for (a, b) in back.iter().zip(&xs) {
            assert_relative_eq!(*a, *b, epsilon = 1e-6);
        }
        assert!(cal.inverse_many(&ys, Some(&xs[..2])).is_err());
    }

    #[test]
    fn test_options() {
        let opts = InverseOptions::default();
        assert_eq!(opts.check_rtol, 1e-5);
        assert_eq!(opts.check_atol, 1e-8);
        assert!(opts.problems().is_empty());

        let opts = InverseOptions {
            tolerance: 0.0,
            max_iterations: 0,
            ..Default::default()
        };
        assert_eq!(opts.problems().len(), 2);
    }
}
