//! Sandboxed calibration-expression language.
//!
//! Calibration functions are written as small numeric formulas over one
//! independent variable (`x` for the forward function, `y` for an inverse)
//! and a parameter vector accessed as `p[j]`:
//!
//! ```text
//! p[0] + p[1] * x + p[2] * x**2
//! sqrt(p[0] + p[1] * x)
//! a = p[0] * x
//! a / (1 + p[1] * a)
//! ```
//!
//! Expressions may come from untrusted configuration, so they are parsed into
//! a whitelisted AST and evaluated by a tree-walking interpreter with no
//! access to anything but numbers, the parameters, the independent variable
//! and a fixed set of math functions.
//!
//! ## Entry points
//!
//! - [`Expression::parse`]: syntax check and canonical formatting
//! - [`validate_expression`]: full validation (symbol, parameter indices,
//!   parameter count, smoke evaluation)
//! - [`evaluate`] / [`evaluate_scalar`]: domain-checked, range-clipped
//!   evaluation

mod ast;
mod builtins;
mod eval;
mod format;
mod lexer;
mod parser;
mod safe_eval;
mod validate;

pub use ast::{Assignment, BinaryOp, Expr, Program, UnaryOp};
pub use safe_eval::{evaluate, evaluate_scalar};
pub use validate::{check_param_indices, validate_expression};

use crate::types::CalibrationError;
use std::fmt;
use std::str::FromStr;

/// Independent variable of an expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Symbol {
    /// Forward function input
    X,
    /// Inverse function input
    Y,
}

impl Symbol {
    /// Identifier used in expression text.
    pub fn name(self) -> &'static str {
        match self {
            Symbol::X => "x",
            Symbol::Y => "y",
        }
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Parsed expression in canonical form.
///
/// Equality compares canonical text, so expressions differing only in
/// layout are equal.
///
/// # Example
///
/// ```
/// use calib_core::expr::Expression;
///
/// let a = Expression::parse("p[0]+p[1]*x**2").unwrap();
/// let b = Expression::parse("p[0] + p[1] * (x ** 2)").unwrap();
/// assert_eq!(a, b);
/// assert_eq!(a.as_str(), "p[0] + p[1] * x**2");
/// assert_eq!(a.param_count(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct Expression {
    canonical: String,
    program: Program,
}

impl Expression {
    /// Parse `text` and compute its canonical form.
    ///
    /// Only syntax is checked here; see [`validate_expression`] for the full
    /// set of checks.
    pub fn parse(text: &str) -> Result<Self, CalibrationError> {
        let program = parser::parse_program(text)?;
        let canonical = format::format_program(&program);
        Ok(Self { canonical, program })
    }

    /// Canonical text.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.canonical
    }

    /// Parsed block.
    #[inline]
    pub fn program(&self) -> &Program {
        &self.program
    }

    /// Sorted unique parameter indices.
    pub fn param_indices(&self) -> Vec<i64> {
        self.program.param_indices()
    }

    /// Number of distinct parameter indices.
    pub fn param_count(&self) -> usize {
        self.param_indices().len()
    }

    /// Whether `symbol` is read as a free variable (not only assigned).
    pub fn references(&self, symbol: Symbol) -> bool {
        self.program.free_names().contains(&symbol.name())
    }
}

impl PartialEq for Expression {
    fn eq(&self, other: &Self) -> bool {
        self.canonical == other.canonical
    }
}

impl Eq for Expression {}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical)
    }
}

impl FromStr for Expression {
    type Err = CalibrationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Expression::parse(s)
    }
}
