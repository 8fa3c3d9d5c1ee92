//! Linear interpolation implementation.

use super::Interpolator;
use crate::types::InterpolationError;
use num_traits::Float;

/// Piecewise linear interpolator with linear extrapolation.
///
/// Stores sorted (x, y) knots. Inside the knot range the value follows the
/// segment containing `x`; outside it the first or last segment is extended.
///
/// # Construction
///
/// Knots are sorted by x-coordinate during construction. At least 2 knots
/// are required and the sorted x-coordinates must be strictly increasing.
///
/// # Example
///
/// ```
/// use calib_core::math::interpolators::{Interpolator, LinearInterpolator};
///
/// let interp = LinearInterpolator::<f64>::new(&[0.0, 10.0, 20.0], &[0.0, 30.0, 50.0]).unwrap();
/// assert!((interp.interpolate(5.0).unwrap() - 15.0).abs() < 1e-12);
/// assert!((interp.interpolate(-10.0).unwrap() + 30.0).abs() < 1e-12);
/// ```
#[derive(Debug, Clone)]
pub struct LinearInterpolator<T: Float> {
    /// Sorted x-coordinates
    xs: Vec<T>,
    /// Corresponding y-values (in same order as xs after sorting)
    ys: Vec<T>,
}

impl<T: Float> LinearInterpolator<T> {
    /// Construct a linear interpolator from x and y data points.
    ///
    /// # Returns
    ///
    /// * `Ok(LinearInterpolator)` - Successfully constructed interpolator
    /// * `Err(InterpolationError::InsufficientData)` - Fewer than 2 data points
    /// * `Err(InterpolationError::InvalidInput)` - Mismatched lengths or non-finite values
    /// * `Err(InterpolationError::NonMonotonicData)` - Repeated x-coordinate
    pub fn new(xs: &[T], ys: &[T]) -> Result<Self, InterpolationError> {
        if xs.len() != ys.len() {
            return Err(InterpolationError::InvalidInput(format!(
                "xs and ys must have same length: got {} and {}",
                xs.len(),
                ys.len()
            )));
        }

        if xs.len() < 2 {
            return Err(InterpolationError::InsufficientData {
                got: xs.len(),
                need: 2,
            });
        }

        if xs.iter().chain(ys).any(|v| !v.is_finite()) {
            return Err(InterpolationError::InvalidInput(
                "knots must be finite".to_string(),
            ));
        }

        // All values are finite, so partial_cmp never fails
        let mut pairs: Vec<(T, T)> = xs.iter().copied().zip(ys.iter().copied()).collect();
        pairs.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));

        let (sorted_xs, sorted_ys): (Vec<T>, Vec<T>) = pairs.into_iter().unzip();

        if let Some(index) = sorted_xs.windows(2).position(|w| w[1] <= w[0]) {
            return Err(InterpolationError::NonMonotonicData { index: index + 1 });
        }

        Ok(Self {
            xs: sorted_xs,
            ys: sorted_ys,
        })
    }

    /// Returns a reference to the sorted x-coordinates.
    #[inline]
    pub fn xs(&self) -> &[T] {
        &self.xs
    }

    /// Returns a reference to the y-values (in sorted x order).
    #[inline]
    pub fn ys(&self) -> &[T] {
        &self.ys
    }

    /// Returns the number of data points.
    #[inline]
    pub fn len(&self) -> usize {
        self.xs.len()
    }

    /// Returns true if the interpolator has no data points.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.xs.is_empty()
    }

    /// Index `i` of the segment `[xs[i], xs[i+1]]` used for `x`, clamped
    /// to `[0, n-2]` so outer segments are extended.
    #[inline]
    fn find_segment(&self, x: T) -> usize {
        let pos = self.xs.partition_point(|&xi| xi <= x);
        if pos == 0 {
            0
        } else if pos >= self.xs.len() {
            self.xs.len() - 2
        } else {
            pos - 1
        }
    }
}

impl<T: Float> Interpolator<T> for LinearInterpolator<T> {
    /// Interpolate (or extrapolate) the value at `x`.
    ///
    /// ```text
    /// y = y0 + (y1 - y0) * (x - x0) / (x1 - x0)
    /// ```
    ///
    /// Fails only for NaN input.
    fn interpolate(&self, x: T) -> Result<T, InterpolationError> {
        if x.is_nan() {
            return Err(InterpolationError::InvalidInput(
                "cannot interpolate at NaN".to_string(),
            ));
        }

        let i = self.find_segment(x);

        let x0 = self.xs[i];
        let x1 = self.xs[i + 1];
        let y0 = self.ys[i];
        let y1 = self.ys[i + 1];

        let t = (x - x0) / (x1 - x0);
        Ok(y0 + (y1 - y0) * t)
    }

    #[inline]
    fn domain(&self) -> (T, T) {
        (self.xs[0], self.xs[self.xs.len() - 1])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    // ========================================
    // Construction Tests
    // ========================================

    #[test]
    fn test_new_with_minimum_points() {
        let interp = LinearInterpolator::new(&[0.0, 1.0], &[0.0, 1.0]).unwrap();
        assert_eq!(interp.len(), 2);
        assert!(!interp.is_empty());
    }

    #[test]
    fn test_new_insufficient_data_one_point() {
        match LinearInterpolator::new(&[1.0], &[2.0]).unwrap_err() {
            InterpolationError::InsufficientData { got, need } => {
                assert_eq!(got, 1);
                assert_eq!(need, 2);
            }
            other => panic!("Expected InsufficientData error, got {:?}", other),
        }
    }

    #[test]
    fn test_new_mismatched_lengths() {
        match LinearInterpolator::new(&[0.0, 1.0, 2.0], &[0.0, 1.0]).unwrap_err() {
            InterpolationError::InvalidInput(msg) => assert!(msg.contains("same length")),
            other => panic!("Expected InvalidInput error, got {:?}", other),
        }
    }

    #[test]
    fn test_new_auto_sorts_unsorted_data() {
        let interp = LinearInterpolator::new(&[3.0, 1.0, 2.0, 0.0], &[9.0, 1.0, 4.0, 0.0]).unwrap();
        assert_eq!(interp.xs(), &[0.0, 1.0, 2.0, 3.0]);
        assert_eq!(interp.ys(), &[0.0, 1.0, 4.0, 9.0]);
    }

    #[test]
    fn test_new_rejects_duplicate_x() {
        let err = LinearInterpolator::new(&[0.0, 1.0, 1.0], &[0.0, 1.0, 2.0]).unwrap_err();
        assert_eq!(err, InterpolationError::NonMonotonicData { index: 2 });
    }

    #[test]
    fn test_new_rejects_non_finite() {
        assert!(LinearInterpolator::new(&[0.0, f64::NAN], &[0.0, 1.0]).is_err());
        assert!(LinearInterpolator::new(&[0.0, 1.0], &[0.0, f64::INFINITY]).is_err());
    }

    // ========================================
    // Interpolation Tests
    // ========================================

    #[test]
    fn test_interpolate_at_knots() {
        let interp = LinearInterpolator::new(&[0.0, 1.0, 2.0], &[0.0, 2.0, 3.0]).unwrap();
        assert_relative_eq!(interp.interpolate(0.0).unwrap(), 0.0);
        assert_relative_eq!(interp.interpolate(1.0).unwrap(), 2.0);
        assert_relative_eq!(interp.interpolate(2.0).unwrap(), 3.0);
    }

    #[test]
    fn test_interpolate_between_knots() {
        let interp = LinearInterpolator::new(&[0.0, 1.0, 2.0], &[0.0, 2.0, 3.0]).unwrap();
        assert_relative_eq!(interp.interpolate(0.25).unwrap(), 0.5);
        assert_relative_eq!(interp.interpolate(1.5).unwrap(), 2.5);
    }

    #[test]
    fn test_extrapolate_both_sides() {
        let interp = LinearInterpolator::new(&[0.0, 1.0, 2.0], &[0.0, 2.0, 3.0]).unwrap();
        assert_relative_eq!(interp.interpolate(-1.0).unwrap(), -2.0);
        assert_relative_eq!(interp.interpolate(4.0).unwrap(), 5.0);
    }

    #[test]
    fn test_interpolate_nan() {
        let interp = LinearInterpolator::new(&[0.0, 1.0], &[0.0, 1.0]).unwrap();
        assert!(interp.interpolate(f64::NAN).is_err());
    }

    #[test]
    fn test_with_f32() {
        let interp = LinearInterpolator::new(&[0.0_f32, 2.0], &[0.0_f32, 4.0]).unwrap();
        assert!((interp.interpolate(1.0).unwrap() - 2.0).abs() < 1e-6);
    }
}
