//! Interpolator trait.

use crate::types::InterpolationError;
use num_traits::Float;

/// One-dimensional interpolator over `T`.
pub trait Interpolator<T: Float> {
    /// Value of the interpolant at `x`.
    fn interpolate(&self, x: T) -> Result<T, InterpolationError>;

    /// Range `(x_min, x_max)` spanned by the knots.
    fn domain(&self) -> (T, T);
}
