//! Canonical text form of a parsed expression.
//!
//! Two expressions that differ only in whitespace, comments, redundant
//! parentheses or line-joining format identically:
//!
//! - binary operators are surrounded by single spaces;
//! - `**` hugs its operands when both are simple (a name, a number, or a
//!   negated name/number on the right), e.g. `x**2` but `p[0] ** 2`;
//! - parentheses are emitted only where precedence or associativity
//!   requires them;
//! - assignments are written one per line before the result.

use super::ast::{BinaryOp, Expr, Program, UnaryOp, UNARY_PRECEDENCE};

/// Render `program` in canonical form.
pub(crate) fn format_program(program: &Program) -> String {
    let mut out = String::new();
    for assignment in &program.assignments {
        out.push_str(&assignment.target);
        out.push_str(" = ");
        write_expr(&mut out, &assignment.value);
        out.push('\n');
    }
    write_expr(&mut out, &program.result);
    out
}

fn write_expr(out: &mut String, expr: &Expr) {
    match expr {
        Expr::Number { literal, .. } => out.push_str(literal),
        Expr::Name(name) => out.push_str(name),
        Expr::Param(j) => {
            out.push_str("p[");
            out.push_str(&j.to_string());
            out.push(']');
        }
        Expr::Array(items) => {
            out.push('[');
            write_list(out, items);
            out.push(']');
        }
        Expr::Call { func, args } => {
            out.push_str(func);
            out.push('(');
            write_list(out, args);
            out.push(')');
        }
        Expr::Unary { op, operand } => {
            out.push_str(op.symbol());
            write_operand(out, operand, operand.precedence() < UNARY_PRECEDENCE);
        }
        Expr::Binary { op, lhs, rhs } => {
            let prec = op.precedence();
            let (lhs_parens, rhs_parens) = if *op == BinaryOp::Pow {
                // Right-associative; exponent is parsed at unary level
                (lhs.precedence() <= prec, rhs.precedence() < UNARY_PRECEDENCE)
            } else {
                (lhs.precedence() < prec, rhs.precedence() <= prec)
            };

            let hug = *op == BinaryOp::Pow
                && !lhs_parens
                && !rhs_parens
                && is_simple_power_operand(lhs, false)
                && is_simple_power_operand(rhs, true);

            write_operand(out, lhs, lhs_parens);
            if hug {
                out.push_str(op.symbol());
            } else {
                out.push(' ');
                out.push_str(op.symbol());
                out.push(' ');
            }
            write_operand(out, rhs, rhs_parens);
        }
    }
}

fn write_operand(out: &mut String, expr: &Expr, parens: bool) {
    if parens {
        out.push('(');
        write_expr(out, expr);
        out.push(')');
    } else {
        write_expr(out, expr);
    }
}

fn write_list(out: &mut String, items: &[Expr]) {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        write_expr(out, item);
    }
}

fn is_simple_power_operand(expr: &Expr, allow_negation: bool) -> bool {
    match expr {
        Expr::Number { .. } | Expr::Name(_) => true,
        Expr::Unary {
            op: UnaryOp::Neg,
            operand,
        } if allow_negation => matches!(**operand, Expr::Number { .. } | Expr::Name(_)),
        _ => false,
    }
}
