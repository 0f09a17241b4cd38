//! Restricted arithmetic evaluator.
//!
//! Accepts numeric literals, `+ - * /`, parentheses, and unary minus, with
//! the usual precedence and left associativity:
//!
//! ```text
//! expr    := term (('+' | '-') term)*
//! term    := factor (('*' | '/') factor)*
//! factor  := '-' factor | primary
//! primary := NUMBER | '(' expr ')'
//! ```
//!
//! Anything else (names, calls, other operators) is rejected at tokenization.

use thiserror::Error;

/// Nesting limit for parentheses and unary minus.
const MAX_DEPTH: usize = 128;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ExprError {
    #[error("empty expression")]
    Empty,

    #[error("unexpected character '{ch}' at position {pos}")]
    UnexpectedChar { ch: char, pos: usize },

    #[error("invalid number '{literal}' at position {pos}")]
    InvalidNumber { literal: String, pos: usize },

    #[error("unexpected {found} at position {pos}")]
    UnexpectedToken { found: String, pos: usize },

    #[error("unexpected end of expression")]
    UnexpectedEnd,

    #[error("division by zero")]
    DivisionByZero,

    #[error("result is not a finite number")]
    Overflow,

    #[error("expression nested too deeply")]
    TooDeep,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Token {
    Num(f64),
    Plus,
    Minus,
    Star,
    Slash,
    LParen,
    RParen,
}

impl Token {
    fn describe(&self) -> String {
        match self {
            Token::Num(n) => format!("number {n}"),
            Token::Plus => "'+'".to_string(),
            Token::Minus => "'-'".to_string(),
            Token::Star => "'*'".to_string(),
            Token::Slash => "'/'".to_string(),
            Token::LParen => "'('".to_string(),
            Token::RParen => "')'".to_string(),
        }
    }
}

/// Evaluate an arithmetic expression.
pub fn evaluate(input: &str) -> Result<f64, ExprError> {
    let tokens = tokenize(input)?;
    if tokens.is_empty() {
        return Err(ExprError::Empty);
    }
    let mut parser = Parser {
        tokens: &tokens,
        index: 0,
        depth: 0,
    };
    let value = parser.expr()?;
    if let Some((token, pos)) = parser.peek() {
        return Err(ExprError::UnexpectedToken {
            found: token.describe(),
            pos,
        });
    }
    Ok(value)
}

fn tokenize(input: &str) -> Result<Vec<(Token, usize)>, ExprError> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let token = match c {
            c if c.is_whitespace() => {
                i += 1;
                continue;
            }
            '+' => Token::Plus,
            '-' => Token::Minus,
            '*' => Token::Star,
            '/' => Token::Slash,
            '(' => Token::LParen,
            ')' => Token::RParen,
            c if c.is_ascii_digit() || c == '.' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                let literal: String = chars[start..i].iter().collect();
                let value = literal
                    .parse::<f64>()
                    .map_err(|_| ExprError::InvalidNumber {
                        literal: literal.clone(),
                        pos: start,
                    })?;
                tokens.push((Token::Num(value), start));
                continue;
            }
            other => return Err(ExprError::UnexpectedChar { ch: other, pos: i }),
        };
        tokens.push((token, i));
        i += 1;
    }

    Ok(tokens)
}

struct Parser<'a> {
    tokens: &'a [(Token, usize)],
    index: usize,
    depth: usize,
}

impl Parser<'_> {
    fn peek(&self) -> Option<(Token, usize)> {
        self.tokens.get(self.index).copied()
    }

    fn next(&mut self) -> Option<(Token, usize)> {
        let token = self.peek();
        if token.is_some() {
            self.index += 1;
        }
        token
    }

    fn expr(&mut self) -> Result<f64, ExprError> {
        let mut value = self.term()?;
        while let Some((op @ (Token::Plus | Token::Minus), _)) = self.peek() {
            self.index += 1;
            let rhs = self.term()?;
            value = match op {
                Token::Plus => value + rhs,
                _ => value - rhs,
            };
            value = finite(value)?;
        }
        Ok(value)
    }

    fn term(&mut self) -> Result<f64, ExprError> {
        let mut value = self.factor()?;
        while let Some((op @ (Token::Star | Token::Slash), _)) = self.peek() {
            self.index += 1;
            let rhs = self.factor()?;
            value = match op {
                Token::Star => value * rhs,
                _ => {
                    if rhs == 0.0 {
                        return Err(ExprError::DivisionByZero);
                    }
                    value / rhs
                }
            };
            value = finite(value)?;
        }
        Ok(value)
    }

    fn factor(&mut self) -> Result<f64, ExprError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(ExprError::TooDeep);
        }
        let result = match self.peek() {
            Some((Token::Minus, _)) => {
                self.index += 1;
                self.factor().map(|v| -v)
            }
            _ => self.primary(),
        };
        self.depth -= 1;
        result
    }

    fn primary(&mut self) -> Result<f64, ExprError> {
        match self.next() {
            Some((Token::Num(n), _)) => finite(n),
            Some((Token::LParen, _)) => {
                let value = self.expr()?;
                match self.next() {
                    Some((Token::RParen, _)) => Ok(value),
                    Some((token, pos)) => Err(ExprError::UnexpectedToken {
                        found: token.describe(),
                        pos,
                    }),
                    None => Err(ExprError::UnexpectedEnd),
                }
            }
            Some((token, pos)) => Err(ExprError::UnexpectedToken {
                found: token.describe(),
                pos,
            }),
            None => Err(ExprError::UnexpectedEnd),
        }
    }
}

fn finite(value: f64) -> Result<f64, ExprError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(ExprError::Overflow)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval(s: &str) -> f64 {
        evaluate(s).unwrap()
    }

    #[test]
    fn test_basic_operators() {
        assert_eq!(eval("2+2"), 4.0);
        assert_eq!(eval("10 - 4"), 6.0);
        assert_eq!(eval("10*5"), 50.0);
        assert_eq!(eval("7 / 2"), 3.5);
    }

    #[test]
    fn test_precedence_and_associativity() {
        assert_eq!(eval("2 + 3 * 4"), 14.0);
        assert_eq!(eval("(2 + 3) * 4"), 20.0);
        assert_eq!(eval("10 - 4 - 3"), 3.0);
        assert_eq!(eval("100 / 10 / 5"), 2.0);
        assert_eq!(eval("2 * 3 + 8 / 4 - 1"), 7.0);
    }

    #[test]
    fn test_unary_minus() {
        assert_eq!(eval("-5"), -5.0);
        assert_eq!(eval("--5"), 5.0);
        assert_eq!(eval("3 * -2"), -6.0);
        assert_eq!(eval("-(2 + 3)"), -5.0);
        assert_eq!(eval("2 - -2"), 4.0);
    }

    #[test]
    fn test_decimals() {
        assert!((eval("157.09*493.89") - 77582.3601).abs() < 1e-6);
        assert!((eval("50000*1.10") - 55000.0).abs() < 1e-6);
        assert_eq!(eval(".5 + 5."), 5.5);
    }

    #[test]
    fn test_nested_parentheses() {
        assert_eq!(eval("((((1))))"), 1.0);
        assert_eq!(eval("(55000 - 5000) / (2 * (3 + 2))"), 5000.0);
    }

    #[test]
    fn test_incomplete_expression() {
        assert_eq!(evaluate("2 +"), Err(ExprError::UnexpectedEnd));
        assert_eq!(evaluate("(1 + 2"), Err(ExprError::UnexpectedEnd));
        assert_eq!(evaluate("-"), Err(ExprError::UnexpectedEnd));
    }

    #[test]
    fn test_division_by_zero() {
        assert_eq!(evaluate("1/0"), Err(ExprError::DivisionByZero));
        assert_eq!(evaluate("5 / (2 - 2)"), Err(ExprError::DivisionByZero));
    }

    #[test]
    fn test_empty() {
        assert_eq!(evaluate(""), Err(ExprError::Empty));
        assert_eq!(evaluate("   "), Err(ExprError::Empty));
    }

    #[test]
    fn test_rejects_non_arithmetic() {
        assert!(matches!(
            evaluate("__import__('os')"),
            Err(ExprError::UnexpectedChar { ch: '_', pos: 0 })
        ));
        assert!(matches!(
            evaluate("2 ** 3"),
            Err(ExprError::UnexpectedToken { pos: 3, .. })
        ));
        assert!(matches!(evaluate("7 % 2"), Err(ExprError::UnexpectedChar { ch: '%', .. })));
        assert!(matches!(evaluate("1e5"), Err(ExprError::UnexpectedChar { ch: 'e', .. })));
        assert!(matches!(evaluate("+1"), Err(ExprError::UnexpectedToken { pos: 0, .. })));
    }

    #[test]
    fn test_trailing_tokens() {
        assert!(matches!(evaluate("1 2"), Err(ExprError::UnexpectedToken { pos: 2, .. })));
        assert!(matches!(evaluate("(1))"), Err(ExprError::UnexpectedToken { pos: 3, .. })));
    }

    #[test]
    fn test_invalid_number() {
        assert!(matches!(evaluate("1.2.3"), Err(ExprError::InvalidNumber { pos: 0, .. })));
        assert!(matches!(evaluate("."), Err(ExprError::InvalidNumber { .. })));
    }

    #[test]
    fn test_overflow() {
        let huge = format!("1{} * 1{}", "0".repeat(200), "0".repeat(200));
        assert_eq!(evaluate(&huge), Err(ExprError::Overflow));
    }

    #[test]
    fn test_depth_limit() {
        let deep = format!("{}1{}", "(".repeat(500), ")".repeat(500));
        assert_eq!(evaluate(&deep), Err(ExprError::TooDeep));
        let negations = format!("{}1", "-".repeat(500));
        assert_eq!(evaluate(&negations), Err(ExprError::TooDeep));
    }

    #[test]
    fn test_error_messages_non_empty() {
        for bad in ["2 +", "1/0", "", "abc", "1.2.3", "(", ")"] {
            let err = evaluate(bad).unwrap_err();
            assert!(!err.to_string().is_empty(), "empty message for {bad:?}");
        }
    }
}
