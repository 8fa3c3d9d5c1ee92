//! Syntax tree of the expression language.

use std::collections::BTreeSet;

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    /// `+a`
    Plus,
    /// `-a`
    Neg,
}

impl UnaryOp {
    pub(crate) fn symbol(self) -> &'static str {
        match self {
            UnaryOp::Plus => "+",
            UnaryOp::Neg => "-",
        }
    }
}

/// Binary arithmetic operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    /// `a + b`
    Add,
    /// `a - b`
    Sub,
    /// `a * b`
    Mul,
    /// `a / b`
    Div,
    /// `a ** b`
    Pow,
}

impl BinaryOp {
    pub(crate) fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Pow => "**",
        }
    }

    pub(crate) fn precedence(self) -> u8 {
        match self {
            BinaryOp::Add | BinaryOp::Sub => 1,
            BinaryOp::Mul | BinaryOp::Div => 2,
            BinaryOp::Pow => 4,
        }
    }
}

/// Precedence of unary operators, between multiplicative and power.
pub(crate) const UNARY_PRECEDENCE: u8 = 3;

/// Precedence of atoms (literals, names, calls, subscripts).
pub(crate) const ATOM_PRECEDENCE: u8 = 5;

/// Expression node.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Numeric literal with its source spelling.
    Number {
        /// Lowercased source text
        literal: String,
        /// Parsed value
        value: f64,
    },
    /// Variable, local or constant. Qualified constants keep their prefix
    /// (e.g. `np.pi`).
    Name(String),
    /// Parameter access `p[j]`.
    Param(i64),
    /// Array literal `[a, b, ...]`.
    Array(Vec<Expr>),
    /// Function call. Qualified functions keep their prefix (e.g. `np.sqrt`).
    Call {
        /// Function name as written
        func: String,
        /// Positional arguments
        args: Vec<Expr>,
    },
    /// Unary operation.
    Unary {
        /// Operator
        op: UnaryOp,
        /// Operand
        operand: Box<Expr>,
    },
    /// Binary operation.
    Binary {
        /// Operator
        op: BinaryOp,
        /// Left operand
        lhs: Box<Expr>,
        /// Right operand
        rhs: Box<Expr>,
    },
}

impl Expr {
    pub(crate) fn precedence(&self) -> u8 {
        match self {
            Expr::Unary { .. } => UNARY_PRECEDENCE,
            Expr::Binary { op, .. } => op.precedence(),
            _ => ATOM_PRECEDENCE,
        }
    }

    /// Visit this node and all descendants in pre-order.
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a Expr)) {
        visit(self);
        match self {
            Expr::Number { .. } | Expr::Name(_) | Expr::Param(_) => {}
            Expr::Array(items) => items.iter().for_each(|e| e.walk(visit)),
            Expr::Call { args, .. } => args.iter().for_each(|e| e.walk(visit)),
            Expr::Unary { operand, .. } => operand.walk(visit),
            Expr::Binary { lhs, rhs, .. } => {
                lhs.walk(visit);
                rhs.walk(visit);
            }
        }
    }
}

/// Local binding `name = value`.
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    /// Bound name
    pub target: String,
    /// Bound expression
    pub value: Expr,
}

/// Complete expression block: zero or more local assignments followed by
/// the result expression.
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    /// Assignments in source order
    pub assignments: Vec<Assignment>,
    /// Final expression
    pub result: Expr,
}

impl Program {
    fn exprs(&self) -> impl Iterator<Item = &Expr> {
        self.assignments
            .iter()
            .map(|a| &a.value)
            .chain(std::iter::once(&self.result))
    }

    /// Sorted unique indices of every `p[j]` in the block.
    pub fn param_indices(&self) -> Vec<i64> {
        let mut indices = BTreeSet::new();
        for expr in self.exprs() {
            expr.walk(&mut |e| {
                if let Expr::Param(j) = e {
                    indices.insert(*j);
                }
            });
        }
        indices.into_iter().collect()
    }

    /// Names read before any local binding shadows them, in first-use order.
    pub fn free_names(&self) -> Vec<&str> {
        let mut bound: BTreeSet<&str> = BTreeSet::new();
        let mut free: Vec<&str> = Vec::new();
        for assignment in &self.assignments {
            collect_free_names(&assignment.value, &bound, &mut free);
            bound.insert(assignment.target.as_str());
        }
        collect_free_names(&self.result, &bound, &mut free);
        free
    }

    /// Names of every called function, in first-use order.
    pub fn called_functions(&self) -> Vec<&str> {
        let mut funcs: Vec<&str> = Vec::new();
        for expr in self.exprs() {
            expr.walk(&mut |e| {
                if let Expr::Call { func, .. } = e {
                    if !funcs.contains(&func.as_str()) {
                        funcs.push(func.as_str());
                    }
                }
            });
        }
        funcs
    }
}

fn collect_free_names<'a>(expr: &'a Expr, bound: &BTreeSet<&'a str>, free: &mut Vec<&'a str>) {
    expr.walk(&mut |e| {
        if let Expr::Name(name) = e {
            let name = name.as_str();
            if !bound.contains(name) && !free.contains(&name) {
                free.push(name);
            }
        }
    });
}
