//! Recursive-descent parser for calibration expressions.
//!
//! Grammar (lowest to highest precedence):
//!
//! ```text
//! program        := NEWLINE* (assignment NEWLINE+)* expr NEWLINE* EOF
//! assignment     := IDENT '=' expr
//! expr           := multiplicative (('+' | '-') multiplicative)*
//! multiplicative := unary (('*' | '/') unary)*
//! unary          := ('+' | '-') unary | power
//! power          := primary ('**' unary)?
//! primary        := NUMBER | 'p' '[' '-'? INTEGER ']' | name | name '(' args ')'
//!                 | '(' expr ')' | '[' args ']'
//! name           := IDENT | ('np' | 'numpy') '.' IDENT
//! ```

use super::ast::{Assignment, BinaryOp, Expr, Program, UnaryOp};
use super::builtins;
use super::lexer::{tokenize, Token, TokenKind};
use crate::types::CalibrationError;

/// Parse an expression block.
pub(crate) fn parse_program(source: &str) -> Result<Program, CalibrationError> {
    let tokens = tokenize(source)?;
    Parser {
        source,
        tokens,
        pos: 0,
        depth: 0,
    }
    .program()
}

/// Limit on both recursive-descent nesting and syntax tree height.
///
/// Formatting and evaluation recurse over the tree, so its height bounds
/// their stack use.
const MAX_DEPTH: usize = 200;

const NESTED_TOO_DEEPLY: &str = "expression is nested too deeply";

struct Parser<'a> {
    source: &'a str,
    tokens: Vec<Token>,
    pos: usize,
    /// Current recursive-descent nesting
    depth: usize,
}

enum Statement {
    Assign(Assignment),
    Expr(Expr),
}

impl Parser<'_> {
    fn peek(&self) -> &TokenKind {
        // tokenize always terminates the stream with Eof
        &self.tokens[self.pos.min(self.tokens.len() - 1)].kind
    }

    fn peek_next(&self) -> &TokenKind {
        &self.tokens[(self.pos + 1).min(self.tokens.len() - 1)].kind
    }

    fn advance(&mut self) -> TokenKind {
        let kind = self.peek().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        kind
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.peek() == kind {
            self.advance();
            true
        } else {
            false
        }
    }

    fn error(&self, message: impl Into<String>) -> CalibrationError {
        let token = &self.tokens[self.pos.min(self.tokens.len() - 1)];
        CalibrationError::Syntax {
            line: token.line,
            column: token.column,
            message: message.into(),
            expression: self.source.to_string(),
        }
    }

    fn unexpected(&self, expected: &str) -> CalibrationError {
        self.error(format!("expected {}, found {}", expected, self.peek().describe()))
    }

    fn expect(&mut self, kind: &TokenKind, expected: &str) -> Result<(), CalibrationError> {
        if self.eat(kind) {
            Ok(())
        } else {
            Err(self.unexpected(expected))
        }
    }

    fn skip_newlines(&mut self) {
        while self.eat(&TokenKind::Newline) {}
    }

    fn program(mut self) -> Result<Program, CalibrationError> {
        let mut assignments = Vec::new();
        let mut result = None;

        self.skip_newlines();
        while *self.peek() != TokenKind::Eof {
            if result.is_some() {
                return Err(self.error("only the last line may be a bare expression"));
            }
            match self.statement()? {
                Statement::Assign(a) => assignments.push(a),
                Statement::Expr(e) => result = Some(e),
            }
            match self.peek() {
                TokenKind::Newline => self.skip_newlines(),
                TokenKind::Eof => {}
                _ => return Err(self.unexpected("end of line")),
            }
        }

        match result {
            Some(result) => Ok(Program {
                assignments,
                result,
            }),
            None if assignments.is_empty() => Err(self.error("empty expression")),
            None => Err(self.error("expression must end with a result, not an assignment")),
        }
    }

    fn statement(&mut self) -> Result<Statement, CalibrationError> {
        let target = match (self.peek(), self.peek_next()) {
            (TokenKind::Ident(name), TokenKind::Assign) => Some(name.clone()),
            _ => None,
        };
        if let Some(target) = target {
            if builtins::is_reserved(&target) {
                return Err(self.error(format!("cannot assign to reserved name '{}'", target)));
            }
            self.advance();
            self.advance();
            let value = self.expr()?.expr;
            return Ok(Statement::Assign(Assignment { target, value }));
        }
        let expr = self.expr()?.expr;
        if *self.peek() == TokenKind::Assign {
            return Err(self.error("can only assign to a plain name"));
        }
        Ok(Statement::Expr(expr))
    }

    /// Enter one level of recursive descent.
    fn descend(&mut self) -> Result<(), CalibrationError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(self.error(NESTED_TOO_DEEPLY));
        }
        Ok(())
    }

    /// Combine children into a node one level taller than the tallest child.
    fn node(&self, expr: Expr, children: usize) -> Result<Node, CalibrationError> {
        let height = children + 1;
        if height > MAX_DEPTH {
            return Err(self.error(NESTED_TOO_DEEPLY));
        }
        Ok(Node { expr, height })
    }

    fn binary(&self, op: BinaryOp, lhs: Node, rhs: Node) -> Result<Node, CalibrationError> {
        let children = lhs.height.max(rhs.height);
        self.node(
            Expr::Binary {
                op,
                lhs: Box::new(lhs.expr),
                rhs: Box::new(rhs.expr),
            },
            children,
        )
    }

    fn expr(&mut self) -> Result<Node, CalibrationError> {
        self.descend()?;
        let node = self.additive();
        self.depth -= 1;
        node
    }

    fn additive(&mut self) -> Result<Node, CalibrationError> {
        let mut lhs = self.multiplicative()?;
        loop {
            let op = match self.peek() {
                TokenKind::Plus => BinaryOp::Add,
                TokenKind::Minus => BinaryOp::Sub,
                _ => return Ok(lhs),
            };
            self.advance();
            let rhs = self.multiplicative()?;
            lhs = self.binary(op, lhs, rhs)?;
        }
    }

    fn multiplicative(&mut self) -> Result<Node, CalibrationError> {
        let mut lhs = self.unary()?;
        loop {
            let op = match self.peek() {
                TokenKind::Star => BinaryOp::Mul,
                TokenKind::Slash => BinaryOp::Div,
                _ => return Ok(lhs),
            };
            self.advance();
            let rhs = self.unary()?;
            lhs = self.binary(op, lhs, rhs)?;
        }
    }

    fn unary(&mut self) -> Result<Node, CalibrationError> {
        self.descend()?;
        let node = self.signed();
        self.depth -= 1;
        node
    }

    fn signed(&mut self) -> Result<Node, CalibrationError> {
        let op = match self.peek() {
            TokenKind::Plus => UnaryOp::Plus,
            TokenKind::Minus => UnaryOp::Neg,
            _ => return self.power(),
        };
        self.advance();
        let operand = self.unary()?;
        self.node(
            Expr::Unary {
                op,
                operand: Box::new(operand.expr),
            },
            operand.height,
        )
    }

    fn power(&mut self) -> Result<Node, CalibrationError> {
        let base = self.primary()?;
        if self.eat(&TokenKind::DoubleStar) {
            let exponent = self.unary()?;
            return self.binary(BinaryOp::Pow, base, exponent);
        }
        Ok(base)
    }

    fn primary(&mut self) -> Result<Node, CalibrationError> {
        match self.peek().clone() {
            TokenKind::Number(literal) => {
                let value = literal
                    .parse::<f64>()
                    .map_err(|_| self.error(format!("invalid numeric literal '{}'", literal)))?;
                self.advance();
                Ok(Node::leaf(Expr::Number { literal, value }))
            }
            TokenKind::LParen => {
                self.advance();
                let inner = self.expr()?;
                self.expect(&TokenKind::RParen, "')'")?;
                Ok(inner)
            }
            TokenKind::LBracket => {
                self.advance();
                let (items, children) = self.arguments(&TokenKind::RBracket, "']'")?;
                self.node(Expr::Array(items), children)
            }
            TokenKind::Ident(name) if name == "p" => {
                self.advance();
                self.parameter().map(Node::leaf)
            }
            TokenKind::Ident(name) => {
                self.advance();
                let name = self.qualified_name(name)?;
                match self.peek() {
                    TokenKind::LParen => {
                        self.advance();
                        let (args, children) = self.arguments(&TokenKind::RParen, "')'")?;
                        self.node(Expr::Call { func: name, args }, children)
                    }
                    TokenKind::LBracket => {
                        Err(self.error(format!("subscripting '{}' is not allowed", name)))
                    }
                    _ => Ok(Node::leaf(Expr::Name(name))),
                }
            }
            _ => Err(self.unexpected("an expression")),
        }
    }

    /// After `p`: `'[' '-'? INTEGER ']'`.
    fn parameter(&mut self) -> Result<Expr, CalibrationError> {
        const USAGE: &str = "parameters must be written as p[<integer literal>]";
        if !self.eat(&TokenKind::LBracket) {
            return Err(self.error(USAGE));
        }
        let negative = self.eat(&TokenKind::Minus);
        let index = match self.peek() {
            TokenKind::Number(literal) if literal.bytes().all(|b| b.is_ascii_digit()) => literal
                .parse::<i64>()
                .map_err(|_| self.error(format!("parameter index {} is too large", literal)))?,
            _ => return Err(self.error(USAGE)),
        };
        self.advance();
        self.expect(&TokenKind::RBracket, "']'")?;
        Ok(Expr::Param(if negative { -index } else { index }))
    }

    /// Attribute access is only allowed as `np.name` / `numpy.name`.
    fn qualified_name(&mut self, head: String) -> Result<String, CalibrationError> {
        if *self.peek() != TokenKind::Dot {
            return Ok(head);
        }
        if !builtins::is_namespace(&head) {
            return Err(self.error(format!("attribute access on '{}' is not allowed", head)));
        }
        self.advance();
        let attr = match self.advance() {
            TokenKind::Ident(attr) => attr,
            _ => return Err(self.error(format!("expected a name after '{}.'", head))),
        };
        if *self.peek() == TokenKind::Dot {
            return Err(self.error(format!(
                "only single-level '{}.' names are allowed",
                head
            )));
        }
        Ok(format!("{}.{}", head, attr))
    }

    /// Comma-separated expressions up to `close`, trailing comma allowed.
    /// Also returns the height of the tallest item.
    fn arguments(&mut self, close: &TokenKind, expected: &str) -> Result<(Vec<Expr>, usize), CalibrationError> {
        let mut items = Vec::new();
        let mut height = 0;
        loop {
            if self.eat(close) {
                return Ok((items, height));
            }
            let item = self.expr()?;
            height = height.max(item.height);
            items.push(item.expr);
            if !self.eat(&TokenKind::Comma) {
                self.expect(close, expected)?;
                return Ok((items, height));
            }
        }
    }
}

/// Parsed subtree with its height.
struct Node {
    expr: Expr,
    height: usize,
}

impl Node {
    fn leaf(expr: Expr) -> Self {
        Self { expr, height: 1 }
    }
}
