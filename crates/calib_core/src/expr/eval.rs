//! Tree-walking evaluator over the whitelisted AST.
//!
//! Every call builds its own [`Environment`]; nothing is shared between
//! evaluations. Errors from independent sub-expressions are collected so a
//! single failure report lists all of them.

use super::ast::{BinaryOp, Expr, Program, UnaryOp};
use super::builtins::{self, Builtin};
use super::Symbol;
use crate::math::interpolators::{Interpolator, LinearInterpolator};
use std::collections::HashMap;

/// Scalar or 1-D array value.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Value {
    Scalar(f64),
    Array(Vec<f64>),
}

type EvalResult = Result<Value, Vec<String>>;

impl Value {
    fn shape(&self) -> String {
        match self {
            Value::Scalar(_) => "()".to_string(),
            Value::Array(v) => format!("({},)", v.len()),
        }
    }

    fn map(self, f: impl Fn(f64) -> f64) -> Value {
        match self {
            Value::Scalar(a) => Value::Scalar(f(a)),
            Value::Array(v) => Value::Array(v.into_iter().map(f).collect()),
        }
    }

    /// Element-wise binary operation with scalar broadcasting.
    fn zip_with(self, other: Value, f: impl Fn(f64, f64) -> f64) -> Result<Value, String> {
        match (self, other) {
            (Value::Scalar(a), Value::Scalar(b)) => Ok(Value::Scalar(f(a, b))),
            (Value::Scalar(a), Value::Array(v)) => {
                Ok(Value::Array(v.into_iter().map(|b| f(a, b)).collect()))
            }
            (Value::Array(v), Value::Scalar(b)) => {
                Ok(Value::Array(v.into_iter().map(|a| f(a, b)).collect()))
            }
            (Value::Array(u), Value::Array(v)) => {
                if u.len() != v.len() {
                    return Err(format!(
                        "operands could not be broadcast together with shapes ({},) ({},)",
                        u.len(),
                        v.len()
                    ));
                }
                Ok(Value::Array(
                    u.into_iter().zip(v).map(|(a, b)| f(a, b)).collect(),
                ))
            }
        }
    }
}

/// Per-call binding context.
pub(crate) struct Environment<'a> {
    params: &'a [f64],
    symbol: Symbol,
    input: Value,
    locals: HashMap<&'a str, Value>,
}

impl<'a> Environment<'a> {
    pub(crate) fn new(params: &'a [f64], symbol: Symbol, input: Value) -> Self {
        Self {
            params,
            symbol,
            input,
            locals: HashMap::new(),
        }
    }

    /// Run the assignments in order, then evaluate the result.
    ///
    /// Stops at the first statement that fails, reporting every error found
    /// while evaluating that statement.
    pub(crate) fn run(mut self, program: &'a Program) -> EvalResult {
        for assignment in &program.assignments {
            let value = self.eval(&assignment.value)?;
            self.locals.insert(assignment.target.as_str(), value);
        }
        self.eval(&program.result)
    }

    fn eval(&self, expr: &Expr) -> EvalResult {
        match expr {
            Expr::Number { value, .. } => Ok(Value::Scalar(*value)),
            Expr::Name(name) => self.lookup(name),
            Expr::Param(j) => self.param(*j),
            Expr::Array(items) => {
                let values = self.eval_all(items)?;
                let mut out = Vec::with_capacity(values.len());
                for value in values {
                    match value {
                        Value::Scalar(a) => out.push(a),
                        Value::Array(_) => {
                            return Err(vec!["array literal elements must be scalars".to_string()])
                        }
                    }
                }
                Ok(Value::Array(out))
            }
            Expr::Call { func, args } => {
                let builtin = builtins::lookup_function(func)
                    .ok_or_else(|| vec![format!("function '{}' is not defined", func)])?;
                if args.len() != builtin.arity() {
                    return Err(vec![format!(
                        "{}() takes {} argument(s) but {} were given",
                        func,
                        builtin.arity(),
                        args.len()
                    )]);
                }
                let values = self.eval_all(args)?;
                call(func, builtin, values).map_err(|e| vec![e])
            }
            Expr::Unary { op, operand } => {
                let value = self.eval(operand)?;
                Ok(match op {
                    UnaryOp::Plus => value,
                    UnaryOp::Neg => value.map(|a| -a),
                })
            }
            Expr::Binary { op, lhs, rhs } => {
                let (lhs, rhs) = merge(self.eval(lhs), self.eval(rhs))?;
                let f: fn(f64, f64) -> f64 = match op {
                    BinaryOp::Add => |a, b| a + b,
                    BinaryOp::Sub => |a, b| a - b,
                    BinaryOp::Mul => |a, b| a * b,
                    BinaryOp::Div => |a, b| a / b,
                    BinaryOp::Pow => f64::powf,
                };
                lhs.zip_with(rhs, f).map_err(|e| vec![e])
            }
        }
    }

    /// Evaluate every item, collecting all failures.
    fn eval_all(&self, items: &[Expr]) -> Result<Vec<Value>, Vec<String>> {
        let mut values = Vec::with_capacity(items.len());
        let mut errors = Vec::new();
        for item in items {
            match self.eval(item) {
                Ok(v) => values.push(v),
                Err(e) => errors.extend(e),
            }
        }
        if errors.is_empty() {
            Ok(values)
        } else {
            Err(errors)
        }
    }

    fn lookup(&self, name: &str) -> EvalResult {
        if let Some(value) = self.locals.get(name) {
            return Ok(value.clone());
        }
        if name == self.symbol.name() {
            return Ok(self.input.clone());
        }
        if let Some(value) = builtins::lookup_constant(name) {
            return Ok(Value::Scalar(value));
        }
        Err(vec![format!("name '{}' is not defined", name)])
    }

    fn param(&self, j: i64) -> EvalResult {
        usize::try_from(j)
            .ok()
            .and_then(|i| self.params.get(i))
            .map(|v| Value::Scalar(*v))
            .ok_or_else(|| {
                vec![format!(
                    "parameter index {} is out of bounds for {} parameter(s)",
                    j,
                    self.params.len()
                )]
            })
    }
}

fn merge(lhs: EvalResult, rhs: EvalResult) -> Result<(Value, Value), Vec<String>> {
    match (lhs, rhs) {
        (Ok(a), Ok(b)) => Ok((a, b)),
        (Err(mut a), Err(b)) => {
            a.extend(b);
            Err(a)
        }
        (Err(a), Ok(_)) | (Ok(_), Err(a)) => Err(a),
    }
}

fn call(func: &str, builtin: Builtin, mut args: Vec<Value>) -> Result<Value, String> {
    match builtin {
        Builtin::Unary(f) => {
            let a = args.pop().ok_or_else(|| format!("{}() missing argument", func))?;
            Ok(a.map(f))
        }
        Builtin::Binary(f) => {
            let b = args.pop().ok_or_else(|| format!("{}() missing argument", func))?;
            let a = args.pop().ok_or_else(|| format!("{}() missing argument", func))?;
            a.zip_with(b, f)
        }
        Builtin::LinearInterp => {
            let (xp, fp, x) = match <[Value; 3]>::try_from(args) {
                Ok([Value::Array(xp), Value::Array(fp), x]) => (xp, fp, x),
                Ok([xp, fp, _]) => {
                    return Err(format!(
                        "{}() expects 1-D arrays of knots: got shapes {} and {}",
                        func,
                        xp.shape(),
                        fp.shape()
                    ))
                }
                Err(_) => return Err(format!("{}() takes 3 arguments", func)),
            };
            let interp = LinearInterpolator::new(&xp, &fp).map_err(|e| format!("{}(): {}", func, e))?;
            match x {
                Value::Scalar(a) => interp
                    .interpolate(a)
                    .map(Value::Scalar)
                    .map_err(|e| format!("{}(): {}", func, e)),
                Value::Array(v) => v
                    .into_iter()
                    .map(|a| interp.interpolate(a))
                    .collect::<Result<Vec<_>, _>>()
                    .map(Value::Array)
                    .map_err(|e| format!("{}(): {}", func, e)),
            }
        }
    }
}
