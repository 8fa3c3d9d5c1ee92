//! Tokenizer for calibration expressions.

use crate::types::CalibrationError;

/// Token kinds of the expression language.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum TokenKind {
    /// Numeric literal, lowercased source text
    Number(String),
    /// Identifier
    Ident(String),
    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,
    Dot,
    Plus,
    Minus,
    Star,
    Slash,
    DoubleStar,
    Assign,
    /// End of a statement (newline or `;`)
    Newline,
    Eof,
}

impl TokenKind {
    /// Short description used in syntax errors.
    pub(crate) fn describe(&self) -> String {
        match self {
            TokenKind::Number(text) => format!("number '{}'", text),
            TokenKind::Ident(name) => format!("name '{}'", name),
            TokenKind::LParen => "'('".to_string(),
            TokenKind::RParen => "')'".to_string(),
            TokenKind::LBracket => "'['".to_string(),
            TokenKind::RBracket => "']'".to_string(),
            TokenKind::Comma => "','".to_string(),
            TokenKind::Dot => "'.'".to_string(),
            TokenKind::Plus => "'+'".to_string(),
            TokenKind::Minus => "'-'".to_string(),
            TokenKind::Star => "'*'".to_string(),
            TokenKind::Slash => "'/'".to_string(),
            TokenKind::DoubleStar => "'**'".to_string(),
            TokenKind::Assign => "'='".to_string(),
            TokenKind::Newline => "end of line".to_string(),
            TokenKind::Eof => "end of expression".to_string(),
        }
    }
}

/// Token with its 1-based source position.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Token {
    pub kind: TokenKind,
    pub line: usize,
    pub column: usize,
}

struct Lexer<'a> {
    source: &'a str,
    chars: Vec<char>,
    pos: usize,
    line: usize,
    column: usize,
    depth: usize,
}

/// Split `source` into tokens, always terminated by [`TokenKind::Eof`].
///
/// Newlines inside brackets are insignificant; a backslash before a newline
/// joins the lines; `#` starts a comment running to the end of the line.
pub(crate) fn tokenize(source: &str) -> Result<Vec<Token>, CalibrationError> {
    Lexer {
        source,
        chars: source.chars().collect(),
        pos: 0,
        line: 1,
        column: 1,
        depth: 0,
    }
    .run()
}

impl Lexer<'_> {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.chars.get(self.pos).copied()?;
        self.pos += 1;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn error(&self, line: usize, column: usize, message: impl Into<String>) -> CalibrationError {
        CalibrationError::Syntax {
            line,
            column,
            message: message.into(),
            expression: self.source.to_string(),
        }
    }

    fn run(mut self) -> Result<Vec<Token>, CalibrationError> {
        let mut tokens = Vec::new();

        while let Some(c) = self.peek() {
            let (line, column) = (self.line, self.column);
            let push = |tokens: &mut Vec<Token>, kind| tokens.push(Token { kind, line, column });

            match c {
                ' ' | '\t' | '\r' => {
                    self.bump();
                }
                '#' => {
                    while let Some(c) = self.peek() {
                        if c == '\n' {
                            break;
                        }
                        self.bump();
                    }
                }
                '\\' => {
                    self.bump();
                    while matches!(self.peek(), Some(' ' | '\t' | '\r')) {
                        self.bump();
                    }
                    if self.bump() != Some('\n') {
                        return Err(self.error(line, column, "unexpected character after line continuation"));
                    }
                }
                '\n' => {
                    self.bump();
                    if self.depth == 0 {
                        push(&mut tokens, TokenKind::Newline);
                    }
                }
                ';' => {
                    if self.depth > 0 {
                        return Err(self.error(line, column, "unexpected ';' inside brackets"));
                    }
                    self.bump();
                    push(&mut tokens, TokenKind::Newline);
                }
                '0'..='9' => {
                    let kind = self.number(line, column)?;
                    push(&mut tokens, kind);
                }
                '.' if matches!(self.peek_at(1), Some('0'..='9')) => {
                    let kind = self.number(line, column)?;
                    push(&mut tokens, kind);
                }
                c if c.is_ascii_alphabetic() || c == '_' => {
                    let mut name = String::new();
                    while let Some(c) = self.peek() {
                        if c.is_ascii_alphanumeric() || c == '_' {
                            name.push(c);
                            self.bump();
                        } else {
                            break;
                        }
                    }
                    push(&mut tokens, TokenKind::Ident(name));
                }
                _ => {
                    self.bump();
                    let kind = match c {
                        '(' => {
                            self.depth += 1;
                            TokenKind::LParen
                        }
                        '[' => {
                            self.depth += 1;
                            TokenKind::LBracket
                        }
                        ')' => {
                            self.depth = self.depth.saturating_sub(1);
                            TokenKind::RParen
                        }
                        ']' => {
                            self.depth = self.depth.saturating_sub(1);
                            TokenKind::RBracket
                        }
                        ',' => TokenKind::Comma,
                        '.' => TokenKind::Dot,
                        '+' => TokenKind::Plus,
                        '-' => TokenKind::Minus,
                        '/' => TokenKind::Slash,
                        '*' => {
                            if self.peek() == Some('*') {
                                self.bump();
                                TokenKind::DoubleStar
                            } else {
                                TokenKind::Star
                            }
                        }
                        '=' => {
                            if self.peek() == Some('=') {
                                return Err(self.error(line, column, "comparisons are not supported"));
                            }
                            TokenKind::Assign
                        }
                        other => {
                            return Err(self.error(
                                line,
                                column,
                                format!("unexpected character '{}'", other),
                            ));
                        }
                    };
                    push(&mut tokens, kind);
                }
            }
        }

        tokens.push(Token {
            kind: TokenKind::Eof,
            line: self.line,
            column: self.column,
        });
        Ok(tokens)
    }

    /// `digits ['.' digits] [('e'|'E') ['+'|'-'] digits]`, or a leading `.`.
    fn number(&mut self, line: usize, column: usize) -> Result<TokenKind, CalibrationError> {
        let mut text = String::new();

        self.digits(&mut text);
        if self.peek() == Some('.') {
            text.push('.');
            self.bump();
            self.digits(&mut text);
        }
        if matches!(self.peek(), Some('e' | 'E')) {
            let sign = matches!(self.peek_at(1), Some('+' | '-'));
            let digit_at = if sign { 2 } else { 1 };
            if !matches!(self.peek_at(digit_at), Some('0'..='9')) {
                return Err(self.error(line, column, "invalid exponent in numeric literal"));
            }
            text.push('e');
            self.bump();
            if sign {
                if let Some(s) = self.bump() {
                    text.push(s);
                }
            }
            self.digits(&mut text);
        }

        if matches!(self.peek(), Some(c) if c.is_ascii_alphanumeric() || c == '_' || c == '.') {
            return Err(self.error(line, column, "invalid numeric literal"));
        }
        Ok(TokenKind::Number(text))
    }

    fn digits(&mut self, text: &mut String) {
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() {
                text.push(c);
                self.bump();
            } else {
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        tokenize(source)
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn test_simple_expression() {
        assert_eq!(
            kinds("p[0] + x**2"),
            vec![
                TokenKind::Ident("p".into()),
                TokenKind::LBracket,
                TokenKind::Number("0".into()),
                TokenKind::RBracket,
                TokenKind::Plus,
                TokenKind::Ident("x".into()),
                TokenKind::DoubleStar,
                TokenKind::Number("2".into()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_numbers() {
        assert_eq!(
            kinds("1.5E-3 .5 2. 10"),
            vec![
                TokenKind::Number("1.5e-3".into()),
                TokenKind::Number(".5".into()),
                TokenKind::Number("2.".into()),
                TokenKind::Number("10".into()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_invalid_numbers() {
        assert!(tokenize("1e").is_err());
        assert!(tokenize("12abc").is_err());
        assert!(tokenize("1.2.3").is_err());
    }

    #[test]
    fn test_newlines_and_comments() {
        assert_eq!(
            kinds("a = x # comment\na"),
            vec![
                TokenKind::Ident("a".into()),
                TokenKind::Assign,
                TokenKind::Ident("x".into()),
                TokenKind::Newline,
                TokenKind::Ident("a".into()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_newline_inside_brackets_ignored() {
        assert_eq!(
            kinds("(x +\n 1)"),
            vec![
                TokenKind::LParen,
                TokenKind::Ident("x".into()),
                TokenKind::Plus,
                TokenKind::Number("1".into()),
                TokenKind::RParen,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_line_continuation() {
        assert_eq!(kinds("x + \\\n 1").len(), 4);
        assert!(tokenize("x \\ 1").is_err());
    }

    #[test]
    fn test_rejected_characters() {
        for source in ["'os'", "x == 1", "x @ y", "x % 2", "{1}"] {
            match tokenize(source) {
                Err(CalibrationError::Syntax { .. }) => {}
                other => panic!("Expected syntax error for {:?}, got {:?}", source, other),
            }
        }
    }

    #[test]
    fn test_positions() {
        let tokens = tokenize("a = 1\n  x").unwrap();
        let x = tokens
            .iter()
            .find(|t| t.kind == TokenKind::Ident("x".into()))
            .unwrap();
        assert_eq!((x.line, x.column), (2, 3));
    }
}
