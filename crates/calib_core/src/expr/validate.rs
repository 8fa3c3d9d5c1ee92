//! Expression validation.

use super::builtins;
use super::safe_eval::{evaluate, evaluate_scalar};
use super::{Expression, Symbol};
use crate::types::{CalibrationError, Interval};
use rand::Rng;
use tracing::debug;

/// Number of vector samples drawn for the smoke evaluation.
const SMOKE_SAMPLES: usize = 5;

/// Validate an expression and return it in canonical form.
///
/// Checks, in order:
///
/// 1. the text parses;
/// 2. `symbol` appears as a free variable;
/// 3. every called function and every free name is known;
/// 4. parameter indices are contiguous starting at 0;
/// 5. if `params` is given, its length equals the number of indices;
/// 6. if `params` is given, the expression evaluates for one scalar and a
///    vector of samples drawn uniformly from `domain`.
///
/// # Example
///
/// ```
/// use calib_core::expr::{validate_expression, Symbol};
/// use calib_core::types::Interval;
///
/// let domain = Interval::default_domain();
/// let range = Interval::default_range();
///
/// let e = validate_expression("p[0]+p[1]*x", Some(&[0.0, 1.0][..]), Symbol::X, domain, range).unwrap();
/// assert_eq!(e.as_str(), "p[0] + p[1] * x");
///
/// // p[1] is missing
/// assert!(validate_expression("p[0] + p[2] * x", None, Symbol::X, domain, range).is_err());
/// ```
pub fn validate_expression(
    text: &str,
    params: Option<&[f64]>,
    symbol: Symbol,
    domain: Interval,
    range: Interval,
) -> Result<Expression, CalibrationError> {
    let expression = Expression::parse(text)?;

    if !expression.references(symbol) {
        return Err(CalibrationError::invalid_expression(
            format!("Independent variable \"{}\" must appear in the expression", symbol),
            expression.as_str(),
        ));
    }

    check_names(&expression, symbol)?;
    let indices = check_param_indices(&expression)?;

    if let Some(params) = params {
        if indices.len() != params.len() {
            return Err(CalibrationError::ParameterCount {
                expected: indices.len(),
                got: params.len(),
            });
        }
        smoke_evaluate(&expression, params, symbol, domain, range)?;
    }

    Ok(expression)
}

/// Check that parameter indices form `0..n` and return them.
///
/// An expression without parameters passes with an empty list.
pub fn check_param_indices(expression: &Expression) -> Result<Vec<i64>, CalibrationError> {
    let indices = expression.param_indices();
    if let Some(&min) = indices.first() {
        if min != 0 {
            return Err(CalibrationError::parameter_indices(
                "Minimum parameter index in expression is not 0",
                expression.as_str(),
                &indices,
            ));
        }
        // sorted and unique, so contiguous from 0 means indices[i] == i
        if !indices.iter().zip(0i64..).all(|(&j, i)| j == i) {
            return Err(CalibrationError::parameter_indices(
                "Parameter indices in expression are not contiguous",
                expression.as_str(),
                &indices,
            ));
        }
    }
    Ok(indices)
}

/// Reject calls to unknown functions and reads of unknown names.
fn check_names(expression: &Expression, symbol: Symbol) -> Result<(), CalibrationError> {
    let program = expression.program();

    if let Some(func) = program
        .called_functions()
        .into_iter()
        .find(|f| builtins::lookup_function(f).is_none())
    {
        return Err(CalibrationError::invalid_expression(
            format!("Unknown function '{}'", func),
            expression.as_str(),
        ));
    }

    if let Some(name) = program
        .free_names()
        .into_iter()
        .find(|n| *n != symbol.name() && builtins::lookup_constant(n).is_none())
    {
        return Err(CalibrationError::invalid_expression(
            format!("Name '{}' is not defined", name),
            expression.as_str(),
        ));
    }

    Ok(())
}

fn smoke_evaluate(
    expression: &Expression,
    params: &[f64],
    symbol: Symbol,
    domain: Interval,
    range: Interval,
) -> Result<(), CalibrationError> {
    let mut rng = rand::thread_rng();
    let (lo, hi) = domain.bounds();

    let scalar: f64 = rng.gen_range(lo..=hi);
    if let Err(err) = evaluate_scalar(expression, params, scalar, symbol, domain, range) {
        debug!(expression = expression.as_str(), %symbol, value = scalar, error = %err, "scalar smoke evaluation failed");
        return Err(CalibrationError::invalid_expression(
            format!("Cannot evaluate expression for a scalar {} = {}: {}", symbol, scalar, err),
            expression.as_str(),
        ));
    }

    let samples: Vec<f64> = (0..SMOKE_SAMPLES).map(|_| rng.gen_range(lo..=hi)).collect();
    if let Err(err) = evaluate(expression, params, &samples, symbol, domain, range) {
        debug!(expression = expression.as_str(), %symbol, ?samples, error = %err, "array smoke evaluation failed");
        return Err(CalibrationError::invalid_expression(
            format!("Cannot evaluate expression for an array {} = {:?}: {}", symbol, samples, err),
            expression.as_str(),
        ));
    }

    Ok(())
}
