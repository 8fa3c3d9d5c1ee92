//! Calibration point checks.

use calib_core::types::{CalibrationError, Interval};
use std::cmp::Ordering;

/// Check a set of calibration points and return them sorted by `x`.
///
/// - `points_x` and `points_y` must have the same length (both may be empty);
/// - points are sorted jointly, ascending in `x`; the sort is stable, so
///   points sharing an `x` keep their insertion order;
/// - every `x` must lie in `domain` and every `y` in `range` (NaN and
///   infinities fail).
///
/// # Example
///
/// ```
/// use calib_models::calibration::check_points;
/// use calib_core::types::Interval;
///
/// let (x, y) = check_points(
///     &[3.0, 1.0, 2.0],
///     &[30.0, 10.0, 20.0],
///     Interval::default_domain(),
///     Interval::default_range(),
/// )
/// .unwrap();
/// assert_eq!(x, vec![1.0, 2.0, 3.0]);
/// assert_eq!(y, vec![10.0, 20.0, 30.0]);
/// ```
pub fn check_points(
    points_x: &[f64],
    points_y: &[f64],
    domain: Interval,
    range: Interval,
) -> Result<(Vec<f64>, Vec<f64>), CalibrationError> {
    if points_x.len() != points_y.len() {
        return Err(CalibrationError::invalid_points(format!(
            "Number of x and y calibration points must match: {}, {}",
            points_x.len(),
            points_y.len()
        )));
    }

    let outside_x: Vec<f64> = points_x.iter().copied().filter(|x| !domain.contains(*x)).collect();
    if !outside_x.is_empty() {
        return Err(CalibrationError::invalid_points(format!(
            "Some x points are outside of domain {}: {:?}",
            domain, outside_x
        )));
    }

    let outside_y: Vec<f64> = points_y.iter().copied().filter(|y| !range.contains(*y)).collect();
    if !outside_y.is_empty() {
        return Err(CalibrationError::invalid_points(format!(
            "Some y points are outside of range {}: {:?}",
            range, outside_y
        )));
    }

    // every x is finite here, so -0.0 and 0.0 compare equal and keep
    // their input order
    let mut order: Vec<usize> = (0..points_x.len()).collect();
    order.sort_by(|&i, &j| points_x[i].partial_cmp(&points_x[j]).unwrap_or(Ordering::Equal));

    let xs: Vec<f64> = order.iter().map(|&i| points_x[i]).collect();
    let ys: Vec<f64> = order.iter().map(|&i| points_y[i]).collect();
    Ok((xs, ys))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn intervals() -> (Interval, Interval) {
        (
            Interval::domain(0.0, 100.0).unwrap(),
            Interval::range(0.0, 1000.0).unwrap(),
        )
    }

    #[test]
    fn test_empty_points() {
        let (domain, range) = intervals();
        let (x, y) = check_points(&[], &[], domain, range).unwrap();
        assert!(x.is_empty());
        assert!(y.is_empty());
    }

    #[test]
    fn test_length_mismatch() {
        let (domain, range) = intervals();
        let err = check_points(&[1.0, 2.0], &[1.0], domain, range).unwrap_err();
        assert!(matches!(err, CalibrationError::InvalidPoints(_)));
        assert!(err.to_string().contains("must match"));
    }

    #[test]
    fn test_sorted_jointly() {
        let (domain, range) = intervals();
        let (x, y) = check_points(&[5.0, 1.0, 3.0], &[50.0, 10.0, 30.0], domain, range).unwrap();
        assert_eq!(x, vec![1.0, 3.0, 5.0]);
        assert_eq!(y, vec![10.0, 30.0, 50.0]);
    }

    #[test]
    fn test_ties_keep_insertion_order() {
        let (domain, range) = intervals();
        let (x, y) = check_points(&[2.0, 1.0, 2.0, 2.0], &[7.0, 1.0, 5.0, 6.0], domain, range).unwrap();
        assert_eq!(x, vec![1.0, 2.0, 2.0, 2.0]);
        assert_eq!(y, vec![1.0, 7.0, 5.0, 6.0]);
    }

    #[test]
    fn test_signed_zeros_are_ties() {
        let (domain, range) = intervals();
        let (x, y) = check_points(&[0.0, 1.0, -0.0], &[3.0, 10.0, 4.0], domain, range).unwrap();
        assert_eq!(y, vec![3.0, 4.0, 10.0]);
        assert!(x[0].is_sign_positive());
        assert!(x[1].is_sign_negative());
    }

    #[test]
    fn test_out_of_bounds() {
        let (domain, range) = intervals();
        let err = check_points(&[1.0, 101.0], &[1.0, 2.0], domain, range).unwrap_err();
        assert!(err.to_string().contains("outside of domain"));

        let err = check_points(&[1.0, 2.0], &[1.0, -2.0], domain, range).unwrap_err();
        assert!(err.to_string().contains("outside of range"));
    }

    #[test]
    fn test_non_finite_rejected() {
        let (domain, range) = intervals();
        assert!(check_points(&[f64::NAN], &[1.0], domain, range).is_err());
        assert!(check_points(&[1.0], &[f64::INFINITY], domain, range).is_err());
    }
}
