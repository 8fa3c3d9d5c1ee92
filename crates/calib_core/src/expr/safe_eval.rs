//! Domain-checked, range-clipped evaluation.

use super::eval::{Environment, Value};
use super::{Expression, Symbol};
use crate::types::{CalibrationError, Interval};

/// Evaluate `expression` at every element of `inputs`.
///
/// - every input must lie in `domain`, otherwise [`CalibrationError::OutOfDomain`];
/// - interpreter errors are aggregated into [`CalibrationError::Evaluation`];
/// - NaN outputs fail with [`CalibrationError::NonReal`];
/// - outputs are clipped into `range`.
///
/// A result that does not depend on the input is broadcast to the input
/// length.
///
/// # Example
///
/// ```
/// use calib_core::expr::{evaluate, Expression, Symbol};
/// use calib_core::types::Interval;
///
/// let expr = Expression::parse("p[0] + p[1] * x").unwrap();
/// let domain = Interval::domain(0.0, 100.0).unwrap();
/// let range = Interval::range(0.0, 150.0).unwrap();
///
/// let y = evaluate(&expr, &[1.0, 2.0], &[0.0, 10.0, 100.0], Symbol::X, domain, range).unwrap();
/// assert_eq!(y, vec![1.0, 21.0, 150.0]);
///
/// assert!(evaluate(&expr, &[1.0, 2.0], &[101.0], Symbol::X, domain, range).is_err());
/// ```
pub fn evaluate(
    expression: &Expression,
    params: &[f64],
    inputs: &[f64],
    symbol: Symbol,
    domain: Interval,
    range: Interval,
) -> Result<Vec<f64>, CalibrationError> {
    check_domain(inputs, symbol, domain)?;

    let value = Environment::new(params, symbol, Value::Array(inputs.to_vec()))
        .run(expression.program())
        .map_err(|errors| CalibrationError::Evaluation { errors })?;

    let outputs = match value {
        Value::Array(v) if v.len() == inputs.len() => v,
        Value::Scalar(a) => vec![a; inputs.len()],
        Value::Array(v) => {
            return Err(CalibrationError::Evaluation {
                errors: vec![format!(
                    "result has shape ({},) but {} has shape ({},)",
                    v.len(),
                    symbol,
                    inputs.len()
                )],
            })
        }
    };

    finish(outputs, range)
}

/// Evaluate `expression` at a single input.
///
/// The result must be a scalar.
pub fn evaluate_scalar(
    expression: &Expression,
    params: &[f64],
    input: f64,
    symbol: Symbol,
    domain: Interval,
    range: Interval,
) -> Result<f64, CalibrationError> {
    check_domain(&[input], symbol, domain)?;

    let value = Environment::new(params, symbol, Value::Scalar(input))
        .run(expression.program())
        .map_err(|errors| CalibrationError::Evaluation { errors })?;

    match value {
        Value::Scalar(a) => {
            let clipped = finish(vec![a], range)?;
            Ok(clipped[0])
        }
        Value::Array(v) => Err(CalibrationError::Evaluation {
            errors: vec![format!(
                "result has shape ({},) but {} is a scalar",
                v.len(),
                symbol
            )],
        }),
    }
}

fn check_domain(inputs: &[f64], symbol: Symbol, domain: Interval) -> Result<(), CalibrationError> {
    match inputs.iter().find(|v| !domain.contains(**v)) {
        Some(&value) => Err(CalibrationError::OutOfDomain {
            symbol: symbol.name().to_string(),
            value,
            lo: domain.lo(),
            hi: domain.hi(),
        }),
        None => Ok(()),
    }
}

fn finish(mut outputs: Vec<f64>, range: Interval) -> Result<Vec<f64>, CalibrationError> {
    let count = outputs.iter().filter(|v| v.is_nan()).count();
    if count > 0 {
        return Err(CalibrationError::NonReal { count });
    }
    for v in outputs.iter_mut() {
        *v = range.clamp(*v);
    }
    Ok(outputs)
}
