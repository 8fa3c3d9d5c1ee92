//! Root-finding and least-squares solvers.
//!
//! ## Available Solvers
//!
//! ### Root-Finding
//!
//! - [`BrentSolver`]: Robust bracketing method without derivative requirement,
//!   used to invert calibration functions numerically
//!
//! ### Optimization
//!
//! - [`LevenbergMarquardtSolver`]: Nonlinear least-squares for fitting
//!   expression parameters to calibration points
//!
//! ## Configuration
//!
//! Root-finding solvers use [`SolverConfig`] for configuring:
//! - `tolerance`: Absolute tolerance on the root (default: 1e-10)
//! - `max_iterations`: Maximum iteration count (default: 100)
//!
//! The LM solver uses [`LMConfig`] with additional parameters for damping
//! control and an evaluation budget. Both solvers accept fallible closures so
//! evaluation errors surface unchanged.
//!
//! ## Examples
//!
//! ### Root-Finding
//!
//! ```
//! use calib_core::math::solvers::{BrentSolver, SolverConfig};
//! use calib_core::types::SolverError;
//!
//! let solver = BrentSolver::new(SolverConfig::default());
//! let f = |x: f64| -> Result<f64, SolverError> { Ok(x * x - 2.0) };
//!
//! let root = solver.find_root(f, 0.0, 2.0).unwrap();
//! assert!((root - std::f64::consts::SQRT_2).abs() < 1e-10);
//! ```
//!
//! ### Nonlinear Least-Squares
//!
//! ```
//! use calib_core::math::solvers::{LevenbergMarquardtSolver, LMConfig};
//! use calib_core::types::SolverError;
//!
//! // Minimize (p[0] - 2)² + (p[1] - 3)²
//! let residuals = |params: &[f64]| -> Result<Vec<f64>, SolverError> {
//!     Ok(vec![params[0] - 2.0, params[1] - 3.0])
//! };
//!
//! let solver = LevenbergMarquardtSolver::with_defaults();
//! let result = solver.solve(residuals, vec![0.0, 0.0]).unwrap();
//!
//! assert!(result.converged);
//! assert!((result.params[0] - 2.0).abs() < 1e-6);
//! ```

mod brent;
mod config;
mod levenberg_marquardt;

// Re-export public types at module level
pub use brent::BrentSolver;
pub use config::SolverConfig;
pub use levenberg_marquardt::{LMConfig, LMResult, LevenbergMarquardtSolver, Termination};
