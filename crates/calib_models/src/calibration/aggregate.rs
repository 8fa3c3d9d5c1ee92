//! The `Calibration` aggregate and its builder.

use super::fitting::{fit_expression, FitOptions, FitReport};
use super::points::check_points;
use calib_core::expr::{evaluate, evaluate_scalar, validate_expression, Expression, Symbol};
use calib_core::types::{CalibrationError, Interval};
use std::collections::BTreeMap;
use std::fmt;
use tracing::debug;

/// Free-form metadata stored with a calibration.
pub type Attrs = BTreeMap<String, serde_json::Value>;

/// Relative tolerance of parameter comparison in `==`.
pub const PARAM_RTOL: f64 = 1e-5;

/// Absolute tolerance of parameter comparison in `==`.
pub const PARAM_ATOL: f64 = 1e-8;

/// `|a - b| <= atol + rtol * |b|`
pub(crate) fn is_close(a: f64, b: f64, rtol: f64, atol: f64) -> bool {
    a == b || (a - b).abs() <= atol + rtol * b.abs()
}

/// A calibration function `y = f(p, x)`.
///
/// Holds a validated expression, its parameters, an optional closed-form
/// inverse, the domain (hard input contract), the range (outputs are clipped
/// into it), the calibration points and free-form metadata.
///
/// Fields are private: every setter re-validates and a failed setter leaves
/// the calibration unchanged.
///
/// Equality compares the canonical expression and the parameters (equal
/// length, element-wise close); domain, range, points and metadata are
/// ignored.
///
/// # Example
///
/// ```
/// use calib_models::calibration::Calibration;
/// use calib_core::types::Interval;
///
/// let cal = Calibration::builder("p[0] + p[1] * x", vec![0.5, 0.25])
///     .inv_expression("(y - p[0]) / p[1]")
///     .domain(Interval::domain(0.0, 8192.0).unwrap())
///     .range(Interval::range(0.0, 3000.0).unwrap())
///     .attr("detector", "HPGe")
///     .build()
///     .unwrap();
///
/// assert_eq!(cal.evaluate(100.0).unwrap(), 25.5);
/// assert_eq!(cal.inverse(25.5, None).unwrap(), 100.0);
/// ```
#[derive(Debug, Clone)]
pub struct Calibration {
    expression: Expression,
    params: Vec<f64>,
    inv_expression: Option<Expression>,
    domain: Interval,
    range: Interval,
    points_x: Vec<f64>,
    points_y: Vec<f64>,
    attrs: Attrs,
}

/// Builder for [`Calibration`].
///
/// Validation is deferred to [`build`](CalibrationBuilder::build).
#[derive(Debug, Clone)]
pub struct CalibrationBuilder {
    expression: String,
    params: Vec<f64>,
    inv_expression: Option<String>,
    domain: Interval,
    range: Interval,
    points: Option<(Vec<f64>, Vec<f64>)>,
    attrs: Attrs,
}

impl CalibrationBuilder {
    /// Start from an expression and its parameters.
    pub fn new(expression: impl Into<String>, params: Vec<f64>) -> Self {
        Self {
            expression: expression.into(),
            params,
            inv_expression: None,
            domain: Interval::default_domain(),
            range: Interval::default_range(),
            points: None,
            attrs: Attrs::new(),
        }
    }

    /// Set the closed-form inverse expression (in `y`).
    pub fn inv_expression(mut self, text: impl Into<String>) -> Self {
        self.inv_expression = Some(text.into());
        self
    }

    /// Set the domain.
    pub fn domain(mut self, domain: Interval) -> Self {
        self.domain = domain;
        self
    }

    /// Set the range.
    pub fn range(mut self, range: Interval) -> Self {
        self.range = range;
        self
    }

    /// Set the calibration points.
    pub fn points(mut self, points_x: &[f64], points_y: &[f64]) -> Self {
        self.points = Some((points_x.to_vec(), points_y.to_vec()));
        self
    }

    /// Replace the metadata.
    pub fn attrs(mut self, attrs: Attrs) -> Self {
        self.attrs = attrs;
        self
    }

    /// Add one metadata entry.
    pub fn attr(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.attrs.insert(key.into(), value.into());
        self
    }

    /// Validate everything and build the calibration.
    pub fn build(self) -> Result<Calibration, CalibrationError> {
        check_params(&self.params)?;
        let expression = validate_expression(
            &self.expression,
            Some(self.params.as_slice()),
            Symbol::X,
            self.domain,
            self.range,
        )?;
        let inv_expression = self
            .inv_expression
            .as_deref()
            .map(|text| validate_inverse(text, &self.params, self.domain, self.range))
            .transpose()?;
        let (points_x, points_y) = match &self.points {
            Some((xs, ys)) => check_points(xs, ys, self.domain, self.range)?,
            None => (Vec::new(), Vec::new()),
        };

        Ok(Calibration {
            expression,
            params: self.params,
            inv_expression,
            domain: self.domain,
            range: self.range,
            points_x,
            points_y,
            attrs: self.attrs,
        })
    }

    /// Fit the expression to the points and build the fitted calibration.
    ///
    /// The builder's parameters are the initial guess; when empty, a guess
    /// of ones is used. With `include_origin` the point `(0, 0)` is added
    /// ahead of the others before fitting.
    pub fn fit_points(
        self,
        points_x: &[f64],
        points_y: &[f64],
        include_origin: bool,
        options: &FitOptions,
    ) -> Result<(Calibration, FitReport), CalibrationError> {
        let (mut xs, mut ys) = check_points(points_x, points_y, self.domain, self.range)?;
        if include_origin {
            xs.insert(0, 0.0);
            ys.insert(0, 0.0);
            (xs, ys) = check_points(&xs, &ys, self.domain, self.range)?;
        }

        let guess = (!self.params.is_empty()).then_some(self.params.as_slice());
        let report = fit_expression(
            &self.expression,
            &xs,
            &ys,
            guess,
            self.domain,
            self.range,
            options,
        )?;

        let mut cal = Self {
            params: report.params.clone(),
            points: None,
            ..self
        }
        .build()?;
        cal.points_x = xs;
        cal.points_y = ys;
        Ok((cal, report))
    }
}

impl Calibration {
    /// Create a calibration with the default domain and range.
    pub fn new(expression: &str, params: Vec<f64>) -> Result<Self, CalibrationError> {
        CalibrationBuilder::new(expression, params).build()
    }

    /// Start a [`CalibrationBuilder`].
    pub fn builder(expression: impl Into<String>, params: Vec<f64>) -> CalibrationBuilder {
        CalibrationBuilder::new(expression, params)
    }

    /// Create a calibration by fitting `expression` to the points.
    ///
    /// Uses the default domain, range and fit options; see
    /// [`CalibrationBuilder::fit_points`] for control over those.
    pub fn from_points(
        expression: &str,
        points_x: &[f64],
        points_y: &[f64],
        params0: Option<&[f64]>,
        include_origin: bool,
    ) -> Result<Self, CalibrationError> {
        let params = params0.map(<[f64]>::to_vec).unwrap_or_default();
        let (cal, _) = CalibrationBuilder::new(expression, params).fit_points(
            points_x,
            points_y,
            include_origin,
            &FitOptions::default(),
        )?;
        Ok(cal)
    }

    // ========================================
    // Accessors
    // ========================================

    /// Canonical forward expression.
    #[inline]
    pub fn expression(&self) -> &Expression {
        &self.expression
    }

    /// Parameters.
    #[inline]
    pub fn params(&self) -> &[f64] {
        &self.params
    }

    /// Canonical inverse expression, if any.
    #[inline]
    pub fn inv_expression(&self) -> Option<&Expression> {
        self.inv_expression.as_ref()
    }

    /// Domain of the forward function.
    #[inline]
    pub fn domain(&self) -> Interval {
        self.domain
    }

    /// Range of the forward function.
    #[inline]
    pub fn range(&self) -> Interval {
        self.range
    }

    /// Calibration point inputs, ascending.
    #[inline]
    pub fn points_x(&self) -> &[f64] {
        &self.points_x
    }

    /// Calibration point outputs, ordered with `points_x`.
    #[inline]
    pub fn points_y(&self) -> &[f64] {
        &self.points_y
    }

    /// Metadata.
    #[inline]
    pub fn attrs(&self) -> &Attrs {
        &self.attrs
    }

    /// Mutable metadata. Metadata is not validated.
    #[inline]
    pub fn attrs_mut(&mut self) -> &mut Attrs {
        &mut self.attrs
    }

    // ========================================
    // Validating setters
    // ========================================

    /// Replace the forward expression, keeping the parameters.
    pub fn set_expression(&mut self, text: &str) -> Result<(), CalibrationError> {
        self.expression = validate_expression(text, Some(self.params.as_slice()), Symbol::X, self.domain, self.range)?;
        Ok(())
    }

    /// Replace the parameters.
    ///
    /// The new parameters must suit the forward expression and cover every
    /// index used by the inverse expression.
    pub fn set_params(&mut self, params: Vec<f64>) -> Result<(), CalibrationError> {
        check_params(&params)?;
        validate_expression(self.expression.as_str(), Some(params.as_slice()), Symbol::X, self.domain, self.range)?;
        if let Some(inv) = &self.inv_expression {
            check_inverse_params(inv, &params)?;
        }
        self.params = params;
        Ok(())
    }

    /// Replace expression and parameters together.
    pub fn set_expression_and_params(&mut self, text: &str, params: Vec<f64>) -> Result<(), CalibrationError> {
        check_params(&params)?;
        let expression = validate_expression(text, Some(params.as_slice()), Symbol::X, self.domain, self.range)?;
        if let Some(inv) = &self.inv_expression {
            check_inverse_params(inv, &params)?;
        }
        self.expression = expression;
        self.params = params;
        Ok(())
    }

    /// Set or clear the inverse expression.
    pub fn set_inv_expression(&mut self, text: Option<&str>) -> Result<(), CalibrationError> {
        self.inv_expression = text
            .map(|t| validate_inverse(t, &self.params, self.domain, self.range))
            .transpose()?;
        Ok(())
    }

    /// Replace the domain.
    ///
    /// The expression is smoke-evaluated over the new domain and the stored
    /// points must lie within it.
    pub fn set_domain(&mut self, domain: Interval) -> Result<(), CalibrationError> {
        self.check_bounds(domain, self.range)?;
        self.domain = domain;
        Ok(())
    }

    /// Replace the range.
    ///
    /// The stored points must lie within the new range.
    pub fn set_range(&mut self, range: Interval) -> Result<(), CalibrationError> {
        self.check_bounds(self.domain, range)?;
        self.range = range;
        Ok(())
    }

    /// Replace the metadata.
    pub fn set_attrs(&mut self, attrs: Attrs) {
        self.attrs = attrs;
    }

    fn check_bounds(&self, domain: Interval, range: Interval) -> Result<(), CalibrationError> {
        validate_expression(self.expression.as_str(), Some(self.params.as_slice()), Symbol::X, domain, range)?;
        if let Some(inv) = &self.inv_expression {
            validate_expression(inv.as_str(), None, Symbol::Y, range, domain)?;
        }
        check_points(&self.points_x, &self.points_y, domain, range)?;
        Ok(())
    }

    // ========================================
    // Points
    // ========================================

    /// Add calibration points to the stored ones.
    ///
    /// The combined set is re-sorted by `x`; existing points precede new
    /// points with the same `x`.
    pub fn add_points(&mut self, points_x: &[f64], points_y: &[f64]) -> Result<(), CalibrationError> {
        let (new_x, new_y) = check_points(points_x, points_y, self.domain, self.range)?;
        let xs: Vec<f64> = self.points_x.iter().copied().chain(new_x).collect();
        let ys: Vec<f64> = self.points_y.iter().copied().chain(new_y).collect();
        let (xs, ys) = check_points(&xs, &ys, self.domain, self.range)?;
        self.points_x = xs;
        self.points_y = ys;
        Ok(())
    }

    /// Replace the stored calibration points.
    pub fn set_points(&mut self, points_x: &[f64], points_y: &[f64]) -> Result<(), CalibrationError> {
        let (xs, ys) = check_points(points_x, points_y, self.domain, self.range)?;
        self.points_x = xs;
        self.points_y = ys;
        Ok(())
    }

    // ========================================
    // Evaluation
    // ========================================

    /// Evaluate the calibration at `x`.
    pub fn evaluate(&self, x: f64) -> Result<f64, CalibrationError> {
        evaluate_scalar(&self.expression, &self.params, x, Symbol::X, self.domain, self.range)
    }

    /// Evaluate the calibration at every element of `xs`.
    pub fn evaluate_many(&self, xs: &[f64]) -> Result<Vec<f64>, CalibrationError> {
        evaluate(&self.expression, &self.params, xs, Symbol::X, self.domain, self.range)
    }

    // ========================================
    // Fitting
    // ========================================

    /// Fit the parameters to the stored points, starting from the current
    /// parameters.
    pub fn fit(&mut self) -> Result<FitReport, CalibrationError> {
        self.fit_with(&FitOptions::default())
    }

    /// [`fit`](Self::fit) with explicit solver options.
    pub fn fit_with(&mut self, options: &FitOptions) -> Result<FitReport, CalibrationError> {
        let report = fit_expression(
            self.expression.as_str(),
            &self.points_x,
            &self.points_y,
            Some(self.params.as_slice()),
            self.domain,
            self.range,
            options,
        )?;
        self.set_params(report.params.clone())?;
        debug!(params = ?self.params, "calibration parameters updated by fit");
        Ok(report)
    }

    /// Replace the points and fit them.
    ///
    /// With `include_origin` the point `(0, 0)` is added after the given
    /// points. `params0` replaces the current parameters as the initial
    /// guess. Nothing changes unless the fit succeeds.
    pub fn fit_points(
        &mut self,
        points_x: &[f64],
        points_y: &[f64],
        params0: Option<&[f64]>,
        include_origin: bool,
    ) -> Result<FitReport, CalibrationError> {
        self.fit_points_with(points_x, points_y, params0, include_origin, &FitOptions::default())
    }

    /// [`fit_points`](Self::fit_points) with explicit solver options.
    pub fn fit_points_with(
        &mut self,
        points_x: &[f64],
        points_y: &[f64],
        params0: Option<&[f64]>,
        include_origin: bool,
        options: &FitOptions,
    ) -> Result<FitReport, CalibrationError> {
        let (mut xs, mut ys) = check_points(points_x, points_y, self.domain, self.range)?;
        if include_origin {
            xs.push(0.0);
            ys.push(0.0);
            (xs, ys) = check_points(&xs, &ys, self.domain, self.range)?;
        }

        let guess = params0.unwrap_or(self.params.as_slice());
        let report = fit_expression(
            self.expression.as_str(),
            &xs,
            &ys,
            Some(guess),
            self.domain,
            self.range,
            options,
        )?;
        self.set_params(report.params.clone())?;
        self.points_x = xs;
        self.points_y = ys;
        Ok(report)
    }
}

fn check_params(params: &[f64]) -> Result<(), CalibrationError> {
    match params.iter().position(|p| !p.is_finite()) {
        Some(j) => Err(CalibrationError::invalid_argument(format!(
            "Parameters must be finite: p[{}] = {}",
            j, params[j]
        ))),
        None => Ok(()),
    }
}

/// Validate an inverse expression in `y`: the domain and range trade places,
/// and its parameter indices must be covered by `params`.
fn validate_inverse(
    text: &str,
    params: &[f64],
    domain: Interval,
    range: Interval,
) -> Result<Expression, CalibrationError> {
    let inv = validate_expression(text, None, Symbol::Y, range, domain)?;
    check_inverse_params(&inv, params)?;
    Ok(inv)
}

fn check_inverse_params(inv: &Expression, params: &[f64]) -> Result<(), CalibrationError> {
    let needed = inv.param_count();
    if needed > params.len() {
        return Err(CalibrationError::ParameterCount {
            expected: needed,
            got: params.len(),
        });
    }
    Ok(())
}

impl PartialEq for Calibration {
    fn eq(&self, other: &Self) -> bool {
        self.expression == other.expression
            && self.params.len() == other.params.len()
            && self
                .params
                .iter()
                .zip(&other.params)
                .all(|(a, b)| is_close(*a, *b, PARAM_RTOL, PARAM_ATOL))
    }
}

const INDENT: &str = "    ";

impl fmt::Display for Calibration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "expression:")?;
        for line in self.expression.as_str().lines() {
            writeln!(f, "{}{}", INDENT, line)?;
        }
        writeln!(f, "params:")?;
        writeln!(f, "{}{:?}", INDENT, self.params)?;
        if let Some(inv) = &self.inv_expression {
            writeln!(f, "inv_expression:")?;
            for line in inv.as_str().lines() {
                writeln!(f, "{}{}", INDENT, line)?;
            }
        }
        writeln!(f, "domain:")?;
        writeln!(f, "{}{}", INDENT, self.domain)?;
        writeln!(f, "range:")?;
        writeln!(f, "{}{}", INDENT, self.range)?;
        if !self.points_x.is_empty() {
            writeln!(f, "calibration points (x):")?;
            writeln!(f, "{}{:?}", INDENT, self.points_x)?;
            writeln!(f, "calibration points (y):")?;
            writeln!(f, "{}{:?}", INDENT, self.points_y)?;
        }
        if !self.attrs.is_empty() {
            writeln!(f, "other attributes:")?;
            let entries: Vec<String> = self
                .attrs
                .iter()
                .map(|(k, v)| format!("{:?}: {}", k, v))
                .collect();
            writeln!(f, "{}{{{}}}", INDENT, entries.join(", "))?;
        }
        Ok(())
    }
}
