//! Error types for structured error handling.
//!
//! This module provides:
//! - `InterpolationError`: Errors from interpolation operations
//! - `SolverError`: Errors from root-finding and least-squares solvers
//! - `CalibrationError`: The single error type surfaced by calibration
//!   functions, covering validation, evaluation, fitting and inversion

use super::interval::IntervalKind;
use thiserror::Error;

/// Interpolation-related errors.
///
/// # Examples
/// ```
/// use calib_core::types::InterpolationError;
///
/// let err = InterpolationError::InsufficientData { got: 1, need: 2 };
/// assert!(format!("{}", err).contains("need at least 2"));
/// ```
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InterpolationError {
    /// Insufficient data points for interpolation.
    #[error("Insufficient data points: got {got}, need at least {need}")]
    InsufficientData {
        /// Number of points provided
        got: usize,
        /// Minimum number of points required
        need: usize,
    },

    /// Abscissae are not strictly increasing after sorting.
    #[error("Data is not strictly increasing at index {index}")]
    NonMonotonicData {
        /// Index where monotonicity is violated
        index: usize,
    },

    /// General invalid input error.
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Solver-related errors.
///
/// # Examples
/// ```
/// use calib_core::types::SolverError;
///
/// let err = SolverError::MaxIterationsExceeded { iterations: 100 };
/// assert!(format!("{}", err).contains("100 iterations"));
/// ```
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SolverError {
    /// Solver failed to converge within maximum iterations.
    #[error("Failed to converge after {iterations} iterations")]
    MaxIterationsExceeded {
        /// Number of iterations attempted
        iterations: usize,
    },

    /// No valid bracket (function values at endpoints have same sign).
    #[error("No bracket: f({a}) and f({b}) have same sign")]
    NoBracket {
        /// Left bracket endpoint
        a: f64,
        /// Right bracket endpoint
        b: f64,
    },

    /// Numerical instability during computation.
    #[error("Numerical instability: {0}")]
    NumericalInstability(String),
}

/// Calibration function error.
///
/// Every failure of the calibration engine is reported through this one type.
/// Variants categorise the failure; the rendered message carries the detail
/// (offending expression text, value or bound).
///
/// # Examples
/// ```
/// use calib_core::types::CalibrationError;
///
/// let err = CalibrationError::insufficient_points(3, 2);
/// assert!(err.to_string().contains("Not enough points"));
/// assert!(!err.is_recoverable());
/// ```
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CalibrationError {
    /// Interval is not a pair of values.
    #[error("{which} must be a length-2 interval: got {len} values")]
    IntervalShape {
        /// Which interval failed
        which: IntervalKind,
        /// Number of values supplied
        len: usize,
    },

    /// Interval bounds are NaN or infinite.
    #[error("{which} must contain finite values: [{lo}, {hi}]")]
    IntervalNotFinite {
        /// Which interval failed
        which: IntervalKind,
        /// Lower bound
        lo: f64,
        /// Upper bound
        hi: f64,
    },

    /// Interval upper bound is not strictly greater than the lower bound.
    #[error("{which} must contain ascending values: [{lo}, {hi}]")]
    IntervalNotAscending {
        /// Which interval failed
        which: IntervalKind,
        /// Lower bound
        lo: f64,
        /// Upper bound
        hi: f64,
    },

    /// Expression text could not be parsed.
    #[error("Syntax error at line {line}, column {column}: {message}\n{expression}")]
    Syntax {
        /// 1-based line of the offending token
        line: usize,
        /// 1-based column of the offending token
        column: usize,
        /// Description of the problem
        message: String,
        /// Expression text as supplied
        expression: String,
    },

    /// Expression parsed but failed a semantic check.
    #[error("Invalid expression: {message}\n{expression}")]
    InvalidExpression {
        /// Description of the failed check
        message: String,
        /// Canonical expression text
        expression: String,
    },

    /// Parameter indices are not a contiguous range starting at zero.
    #[error("{message}\n{expression}\nparameter indices: {indices:?}")]
    ParameterIndices {
        /// Description of the failed check
        message: String,
        /// Canonical expression text
        expression: String,
        /// Sorted unique indices found
        indices: Vec<i64>,
    },

    /// Parameter vector length disagrees with the expression.
    #[error("{}", parameter_count_message(*expected, *got))]
    ParameterCount {
        /// Number of distinct indices in the expression
        expected: usize,
        /// Number of parameters supplied
        got: usize,
    },

    /// Input value outside the domain.
    #[error("{symbol} must be within [{lo}, {hi}]: got {value}")]
    OutOfDomain {
        /// Independent-variable symbol
        symbol: String,
        /// Offending value
        value: f64,
        /// Domain lower bound
        lo: f64,
        /// Domain upper bound
        hi: f64,
    },

    /// Evaluation produced values that are not real numbers.
    #[error("Function evaluation resulted in non-real values at {count} point(s)")]
    NonReal {
        /// Number of non-real outputs
        count: usize,
    },

    /// One or more interpreter errors raised while evaluating.
    #[error("Expression evaluation failed with errors:\n{}", errors.join("\n"))]
    Evaluation {
        /// All sub-errors, in evaluation order
        errors: Vec<String>,
    },

    /// Calibration points are malformed or outside domain/range.
    #[error("Invalid calibration points: {0}")]
    InvalidPoints(String),

    /// Fewer points than free parameters.
    #[error(
        "Not enough points to fit: expression has {params} free parameters but there are only {points} points"
    )]
    InsufficientPoints {
        /// Free parameter count
        params: usize,
        /// Point count
        points: usize,
    },

    /// Least-squares solver did not converge.
    #[error("Fit did not converge after {iterations} iterations: {message}")]
    NotConverged {
        /// Solver diagnostic
        message: String,
        /// Iterations performed
        iterations: usize,
    },

    /// Root finder found no sign change across the bracket.
    #[error("Unable to bracket a root between {a} and {b}")]
    NoBracket {
        /// Left bracket endpoint
        a: f64,
        /// Right bracket endpoint
        b: f64,
    },

    /// Numerical issue inside a solver.
    #[error("Numerical instability: {0}")]
    NumericalInstability(String),

    /// Inverse query outside the range.
    #[error("Value {value} is outside the range [{lo}, {hi}]")]
    OutOfRange {
        /// Offending value
        value: f64,
        /// Range lower bound
        lo: f64,
        /// Range upper bound
        hi: f64,
    },

    /// Computed inverse does not map back to the requested value.
    #[error("Inverse consistency check failed: f({x}) = {fx}, expected {y}")]
    InverseInconsistency {
        /// Computed argument
        x: f64,
        /// Forward function at `x`
        fx: f64,
        /// Requested value
        y: f64,
    },

    /// Argument is malformed (length mismatch, non-finite value).
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Persisted calibration data is malformed.
    #[error("Invalid calibration data: {0}")]
    Format(String),

    /// Dataset store could not be read or written.
    #[error("Dataset store error: {0}")]
    Store(String),

    /// Configuration could not be loaded or is invalid.
    #[error("Configuration error: {0}")]
    Config(String),
}

fn parameter_count_message(expected: usize, got: usize) -> String {
    if expected < got {
        format!(
            "Not enough parameter indices in expression: found {} but {} parameters were supplied",
            expected, got
        )
    } else {
        format!(
            "Too many parameter indices in expression: found {} but {} parameters were supplied",
            expected, got
        )
    }
}

impl CalibrationError {
    /// Create an invalid-expression error.
    pub fn invalid_expression(message: impl Into<String>, expression: impl Into<String>) -> Self {
        CalibrationError::InvalidExpression {
            message: message.into(),
            expression: expression.into(),
        }
    }

    /// Create a parameter-index error.
    pub fn parameter_indices(
        message: impl Into<String>,
        expression: impl Into<String>,
        indices: &[i64],
    ) -> Self {
        CalibrationError::ParameterIndices {
            message: message.into(),
            expression: expression.into(),
            indices: indices.to_vec(),
        }
    }

    /// Create an invalid-points error.
    pub fn invalid_points(message: impl Into<String>) -> Self {
        CalibrationError::InvalidPoints(message.into())
    }

    /// Create an under-determined fit error.
    pub fn insufficient_points(params: usize, points: usize) -> Self {
        CalibrationError::InsufficientPoints { params, points }
    }

    /// Create an invalid-argument error.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        CalibrationError::InvalidArgument(message.into())
    }

    /// Create a persisted-data format error.
    pub fn format(message: impl Into<String>) -> Self {
        CalibrationError::Format(message.into())
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        CalibrationError::Config(message.into())
    }

    /// Check if this is a recoverable error.
    ///
    /// Recoverable errors might succeed with a different initial guess,
    /// bracket hint or solver options. Inverse inconsistencies are never
    /// recoverable.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            CalibrationError::NotConverged { .. }
                | CalibrationError::NoBracket { .. }
                | CalibrationError::NumericalInstability(_)
        )
    }
}

impl From<SolverError> for CalibrationError {
    fn from(err: SolverError) -> Self {
        match err {
            SolverError::MaxIterationsExceeded { iterations } => CalibrationError::NotConverged {
                message: "maximum number of iterations exceeded".to_string(),
                iterations,
            },
            SolverError::NoBracket { a, b } => CalibrationError::NoBracket { a, b },
            SolverError::NumericalInstability(msg) => CalibrationError::NumericalInstability(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interval_errors_name_the_interval() {
        let err = CalibrationError::IntervalNotAscending {
            which: IntervalKind::Domain,
            lo: 5.0,
            hi: 1.0,
        };
        let msg = err.to_string();
        assert!(msg.starts_with("Domain"));
        assert!(msg.contains("ascending"));

        let err = CalibrationError::IntervalShape {
            which: IntervalKind::Range,
            len: 3,
        };
        assert!(err.to_string().starts_with("Range"));
    }

    #[test]
    fn test_parameter_count_messages() {
        let err = CalibrationError::ParameterCount {
            expected: 1,
            got: 2,
        };
        assert!(err.to_string().contains("Not enough parameter indices"));

        let err = CalibrationError::ParameterCount {
            expected: 3,
            got: 2,
        };
        assert!(err.to_string().contains("Too many parameter indices"));
    }

    #[test]
    fn test_evaluation_error_aggregates() {
        let err = CalibrationError::Evaluation {
            errors: vec![
                "name 'a' is not defined".to_string(),
                "name 'b' is not defined".to_string(),
            ],
        };
        let msg = err.to_string();
        assert!(msg.contains("'a'"));
        assert!(msg.contains("'b'"));
    }

    #[test]
    fn test_insufficient_points_message() {
        let err = CalibrationError::insufficient_points(3, 2);
        let msg = err.to_string();
        assert!(msg.contains("not enough points") || msg.contains("Not enough points"));
        assert!(msg.contains('3'));
        assert!(msg.contains('2'));
    }

    #[test]
    fn test_solver_error_conversion() {
        let err: CalibrationError = SolverError::MaxIterationsExceeded { iterations: 50 }.into();
        assert!(matches!(
            err,
            CalibrationError::NotConverged { iterations: 50, .. }
        ));

        let err: CalibrationError = SolverError::NoBracket { a: 0.0, b: 1.0 }.into();
        assert!(matches!(err, CalibrationError::NoBracket { .. }));
    }

    #[test]
    fn test_is_recoverable() {
        assert!(CalibrationError::NumericalInstability("NaN".into()).is_recoverable());
        assert!(CalibrationError::NoBracket { a: 0.0, b: 1.0 }.is_recoverable());
        assert!(!CalibrationError::InverseInconsistency {
            x: 1.0,
            fx: 2.0,
            y: 3.0
        }
        .is_recoverable());
        assert!(!CalibrationError::insufficient_points(2, 1).is_recoverable());
    }

    #[test]
    fn test_error_clone_and_eq() {
        let err = CalibrationError::format("missing dataset");
        assert_eq!(err.clone(), err);
    }
}
