//! Root-finder settings.

use num_traits::Float;

/// Stopping rule for [`BrentSolver`](super::BrentSolver).
///
/// The search stops once the bracket half-width drops below `tolerance`
/// (widened by a few ulps of the current estimate), or fails with
/// `SolverError::MaxIterationsExceeded` after `max_iterations` steps.
///
/// ```
/// use calib_core::math::solvers::SolverConfig;
///
/// let inversion = SolverConfig { tolerance: 1e-12, max_iterations: 200 };
/// assert!(inversion.tolerance < SolverConfig::<f64>::default().tolerance);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolverConfig<T: Float> {
    /// Absolute tolerance on the root
    pub tolerance: T,
    /// Iteration limit
    pub max_iterations: usize,
}

impl<T: Float> Default for SolverConfig<T> {
    /// `tolerance` 1e-10 (or machine epsilon if that is not representable),
    /// `max_iterations` 100.
    fn default() -> Self {
        Self {
            tolerance: T::from(1e-10).unwrap_or_else(T::epsilon),
            max_iterations: 100,
        }
    }
}
