//! Goodness-of-fit diagnostics over the stored calibration points.

use super::aggregate::Calibration;
use calib_core::types::CalibrationError;

/// Summary of how well a calibration reproduces its points.
#[derive(Debug, Clone, PartialEq)]
pub struct FitDiagnostics {
    /// Number of calibration points
    pub n_points: usize,
    /// Points minus parameters
    pub degrees_of_freedom: isize,
    /// Sum of squared residuals
    pub residual_ss: f64,
    /// Root mean squared residual
    pub rmse: f64,
    /// Maximum absolute residual
    pub max_error: f64,
    /// Coefficient of determination
    pub r_squared: f64,
    /// Chi-squared over points with positive `y`
    pub chi_squared: f64,
    /// Chi-squared per degree of freedom
    pub reduced_chi_squared: f64,
}

impl FitDiagnostics {
    /// Check if the fit quality is acceptable.
    ///
    /// # Arguments
    ///
    /// * `tolerance` - Maximum acceptable RMSE
    pub fn is_quality_acceptable(&self, tolerance: f64) -> bool {
        self.rmse <= tolerance
    }
}

impl Calibration {
    /// Calibration evaluated at the stored point inputs.
    pub fn fit_y(&self) -> Result<Vec<f64>, CalibrationError> {
        self.evaluate_many(self.points_x())
    }

    /// Coefficient of determination `1 - SS_res / SS_tot`.
    ///
    /// NaN without points; `-inf` or NaN when all `y` are equal.
    pub fn fit_r_squared(&self) -> Result<f64, CalibrationError> {
        let fit_y = self.fit_y()?;
        let ys = self.points_y();
        let mean = ys.iter().sum::<f64>() / ys.len() as f64;
        let ss_res: f64 = ys.iter().zip(&fit_y).map(|(y, f)| (y - f).powi(2)).sum();
        let ss_tot: f64 = ys.iter().map(|y| (y - mean).powi(2)).sum();
        Ok(1.0 - ss_res / ss_tot)
    }

    /// `Σ (y - f)² / y` over points with `y > 0`.
    pub fn fit_chi_squared(&self) -> Result<f64, CalibrationError> {
        let fit_y = self.fit_y()?;
        Ok(self
            .points_y()
            .iter()
            .zip(&fit_y)
            .filter(|(y, _)| **y > 0.0)
            .map(|(y, f)| (y - f).powi(2) / y)
            .sum())
    }

    /// Number of points minus number of parameters; may be negative.
    pub fn fit_degrees_of_freedom(&self) -> isize {
        self.points_x().len() as isize - self.params().len() as isize
    }

    /// Chi-squared per degree of freedom.
    ///
    /// Not finite when there are no degrees of freedom.
    pub fn fit_reduced_chi_squared(&self) -> Result<f64, CalibrationError> {
        Ok(self.fit_chi_squared()? / self.fit_degrees_of_freedom() as f64)
    }

    /// All diagnostics in one pass.
    pub fn diagnostics(&self) -> Result<FitDiagnostics, CalibrationError> {
        let fit_y = self.fit_y()?;
        let residuals: Vec<f64> = self.points_y().iter().zip(&fit_y).map(|(y, f)| y - f).collect();
        let n_points = residuals.len();
        let residual_ss: f64 = residuals.iter().map(|r| r * r).sum();
        let rmse = if n_points == 0 {
            0.0
        } else {
            (residual_ss / n_points as f64).sqrt()
        };
        let max_error = residuals.iter().map(|r| r.abs()).fold(0.0_f64, f64::max);
        let chi_squared = self.fit_chi_squared()?;
        let degrees_of_freedom = self.fit_degrees_of_freedom();

        Ok(FitDiagnostics {
            n_points,
            degrees_of_freedom,
            residual_ss,
            rmse,
            max_error,
            r_squared: self.fit_r_squared()?,
            chi_squared,
            reduced_chi_squared: chi_squared / degrees_of_freedom as f64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_perfect_fit() {
        let mut cal = Calibration::new("p[0] + p[1] * x", vec![1.0, 1.0]).unwrap();
        cal.fit_points(&[0.0, 1.0, 2.0, 3.0], &[1.0, 3.0, 5.0, 7.0], None, false)
            .unwrap();
        assert_relative_eq!(cal.fit_r_squared().unwrap(), 1.0, epsilon = 1e-10);
        assert_eq!(cal.fit_degrees_of_freedom(), 2);
        assert!(cal.fit_chi_squared().unwrap() < 1e-10);
    }

    #[test]
    fn test_chi_squared_skips_non_positive_y() {
        let mut cal = Calibration::new("p[0] * x", vec![2.0]).unwrap();
        cal.set_points(&[0.0, 1.0, 2.0], &[0.0, 1.0, 4.0]).unwrap();
        // Residuals: 0, -1, 0 -> (1)^2 / 1
        assert_relative_eq!(cal.fit_chi_squared().unwrap(), 1.0);
        assert_relative_eq!(cal.fit_reduced_chi_squared().unwrap(), 0.5);
    }

    #[test]
    fn test_zero_degrees_of_freedom() {
        let mut cal = Calibration::new("p[0] * x", vec![2.0]).unwrap();
        cal.set_points(&[1.0], &[1.0]).unwrap();
        assert_eq!(cal.fit_degrees_of_freedom(), 0);
        assert!(!cal.fit_reduced_chi_squared().unwrap().is_finite());
    }

    #[test]
    fn test_negative_degrees_of_freedom() {
        let cal = Calibration::new("p[0] + p[1] * x", vec![2.0, 1.0]).unwrap();
        assert_eq!(cal.fit_degrees_of_freedom(), -2);
    }

    #[test]
    fn test_diagnostics_summary() {
        let mut cal = Calibration::new("p[0] * x", vec![2.0]).unwrap();
        cal.set_points(&[1.0, 2.0, 3.0], &[2.0, 4.0, 7.0]).unwrap();
        let d = cal.diagnostics().unwrap();
        assert_eq!(d.n_points, 3);
        assert_eq!(d.degrees_of_freedom, 2);
        assert_relative_eq!(d.residual_ss, 1.0);
        assert_relative_eq!(d.max_error, 1.0);
        assert_relative_eq!(d.rmse, (1.0_f64 / 3.0).sqrt());
        assert!(d.is_quality_acceptable(0.6));
        assert!(!d.is_quality_acceptable(0.5));
    }
}
