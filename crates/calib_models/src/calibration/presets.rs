//! Construction presets.
//!
//! Each preset has a builder form on [`CalibrationBuilder`] (to set domain,
//! range, points or metadata before building) and a shortcut on
//! [`Calibration`] using the defaults.

use super::aggregate::{Calibration, CalibrationBuilder};
use calib_core::types::CalibrationError;
use std::cmp::Ordering;

/// Linear expression, `p[0] + p[1] * x`.
pub const LINEAR_EXPRESSION: &str = "p[0] + p[1] * x";

/// Polynomial expression in `x` with `n_params` coefficients, lowest order
/// first.
///
/// # Example
///
/// ```
/// use calib_models::calibration::polynomial_expression;
///
/// assert_eq!(
///     polynomial_expression(3).unwrap(),
///     "p[0] + p[1] * x ** 1 + p[2] * x ** 2"
/// );
/// assert!(polynomial_expression(1).is_err());
/// ```
pub fn polynomial_expression(n_params: usize) -> Result<String, CalibrationError> {
    if n_params < 2 {
        return Err(CalibrationError::invalid_argument(format!(
            "Polynomial must be order 1 or greater: got {} coefficient(s)",
            n_params
        )));
    }
    let mut expr = String::from("p[0]");
    for j in 1..n_params {
        expr.push_str(&format!(" + p[{}] * x ** {}", j, j));
    }
    Ok(expr)
}

impl CalibrationBuilder {
    /// Linear calibration builder; `params` must have two coefficients.
    pub fn linear(params: Vec<f64>) -> Result<Self, CalibrationError> {
        if params.len() != 2 {
            return Err(CalibrationError::invalid_argument(format!(
                "Linear calibration expects 2 parameters: got {}",
                params.len()
            )));
        }
        Ok(Self::new(LINEAR_EXPRESSION, params))
    }

    /// Polynomial calibration builder; coefficients lowest order first.
    pub fn polynomial(params: Vec<f64>) -> Result<Self, CalibrationError> {
        let expr = polynomial_expression(params.len())?;
        Ok(Self::new(expr, params))
    }

    /// Square root of a polynomial; coefficients lowest order first.
    pub fn sqrt_polynomial(params: Vec<f64>) -> Result<Self, CalibrationError> {
        let expr = format!("sqrt({})", polynomial_expression(params.len())?);
        Ok(Self::new(expr, params))
    }

    /// Piecewise linear interpolation of the points, extrapolated linearly
    /// beyond the outermost points.
    ///
    /// The points are embedded in a parameter-free expression and also kept
    /// as the calibration points. At least two points with distinct `x`
    /// are required.
    pub fn interpolation(points_x: &[f64], points_y: &[f64]) -> Result<Self, CalibrationError> {
        if points_x.len() != points_y.len() {
            return Err(CalibrationError::invalid_points(format!(
                "Number of x and y calibration points must match: {}, {}",
                points_x.len(),
                points_y.len()
            )));
        }
        if points_x.len() < 2 {
            return Err(CalibrationError::invalid_points(
                "Interpolated calibration expects at least 2 points",
            ));
        }
        if points_x.iter().chain(points_y).any(|v| !v.is_finite()) {
            return Err(CalibrationError::invalid_points(
                "Interpolated calibration points must be finite",
            ));
        }

        let mut order: Vec<usize> = (0..points_x.len()).collect();
        order.sort_by(|&i, &j| points_x[i].partial_cmp(&points_x[j]).unwrap_or(Ordering::Equal));
        let xp: Vec<String> = order.iter().map(|&i| format!("{:?}", points_x[i])).collect();
        let yp: Vec<String> = order.iter().map(|&i| format!("{:?}", points_y[i])).collect();

        let expr = format!("linear_interp([{}], [{}], x)", xp.join(", "), yp.join(", "));
        Ok(Self::new(expr, Vec::new()).points(points_x, points_y))
    }
}

impl Calibration {
    /// Linear calibration `p[0] + p[1] * x`.
    pub fn from_linear(params: Vec<f64>) -> Result<Self, CalibrationError> {
        CalibrationBuilder::linear(params)?.build()
    }

    /// Polynomial calibration `p[0] + p[1] * x + p[2] * x**2 + ...`.
    ///
    /// # Example
    ///
    /// ```
    /// use calib_models::calibration::Calibration;
    ///
    /// let cal = Calibration::from_polynomial(vec![2.0, 0.0, 1.0]).unwrap();
    /// assert_eq!(cal.evaluate(3.0).unwrap(), 11.0);
    /// ```
    pub fn from_polynomial(params: Vec<f64>) -> Result<Self, CalibrationError> {
        CalibrationBuilder::polynomial(params)?.build()
    }

    /// Square-root-of-polynomial calibration
    /// `sqrt(p[0] + p[1] * x + p[2] * x**2 + ...)`.
    pub fn from_sqrt_polynomial(params: Vec<f64>) -> Result<Self, CalibrationError> {
        CalibrationBuilder::sqrt_polynomial(params)?.build()
    }

    /// Interpolating calibration through the points.
    pub fn from_interpolation(points_x: &[f64], points_y: &[f64]) -> Result<Self, CalibrationError> {
        CalibrationBuilder::interpolation(points_x, points_y)?.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use calib_core::types::Interval;

    #[test]
    fn test_polynomial_expression() {
        assert_eq!(polynomial_expression(2).unwrap(), "p[0] + p[1] * x ** 1");
        assert!(polynomial_expression(0).is_err());
    }

    #[test]
    fn test_from_linear() {
        let cal = Calibration::from_linear(vec![1.0, 2.0]).unwrap();
        assert_eq!(cal.expression().as_str(), "p[0] + p[1] * x");
        assert_relative_eq!(cal.evaluate(4.0).unwrap(), 9.0);
        assert!(Calibration::from_linear(vec![1.0, 2.0, 3.0]).is_err());
    }

    #[test]
    fn test_from_polynomial() {
        let cal = Calibration::from_polynomial(vec![2.0, 0.0, 1.0]).unwrap();
        assert_eq!(cal.expression().as_str(), "p[0] + p[1] * x**1 + p[2] * x**2");
        assert_relative_eq!(cal.evaluate(3.0).unwrap(), 11.0);
        assert!(Calibration::from_polynomial(vec![2.0]).is_err());
    }

    #[test]
    fn test_from_sqrt_polynomial() {
        let cal = Calibration::from_sqrt_polynomial(vec![1.0, 2.0, 0.0]).unwrap();
        assert_relative_eq!(cal.evaluate(4.0).unwrap(), 3.0);
    }

    #[test]
    fn test_from_interpolation() {
        let cal = Calibration::from_interpolation(&[10.0, 0.0, 20.0], &[100.0, 0.0, 150.0]).unwrap();
        assert!(cal.params().is_empty());
        assert_eq!(cal.points_x(), &[0.0, 10.0, 20.0]);
        assert_relative_eq!(cal.evaluate(5.0).unwrap(), 50.0);
        assert_relative_eq!(cal.evaluate(15.0).unwrap(), 125.0);
        // Linear extrapolation beyond the last point
        assert_relative_eq!(cal.evaluate(30.0).unwrap(), 200.0);
    }

    #[test]
    fn test_interpolation_requires_two_points() {
        assert!(Calibration::from_interpolation(&[1.0], &[1.0]).is_err());
        assert!(Calibration::from_interpolation(&[1.0, 2.0], &[1.0]).is_err());
        assert!(Calibration::from_interpolation(&[1.0, f64::NAN], &[1.0, 2.0]).is_err());
    }

    #[test]
    fn test_interpolation_points_checked_against_domain() {
        let result = CalibrationBuilder::interpolation(&[0.0, 200.0], &[0.0, 10.0])
            .unwrap()
            .domain(Interval::domain(0.0, 100.0).unwrap())
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_preset_builder_with_bounds() {
        let cal = CalibrationBuilder::linear(vec![0.0, 2.0])
            .unwrap()
            .range(Interval::range(0.0, 10.0).unwrap())
            .attr("detector", "NaI")
            .build()
            .unwrap();
        assert_relative_eq!(cal.evaluate(100.0).unwrap(), 10.0);
        assert_eq!(cal.attrs()["detector"], "NaI");
    }
}
