//! Recursive-descent parser
//!
//! Precedence, lowest first: `?:`, `||`, `&&`, equality, comparison,
//! additive, multiplicative, unary, primary.

use super::lexer::{tokenize, Token, TokenKind};
use super::value::Value;
use super::EvaluationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Plus,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Eq,
    NotEq,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

/// Expression tree
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Value),
    Array(Vec<Expr>),
    Ident(String),
    Unary(UnaryOp, Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    Conditional { cond: Box<Expr>, then: Box<Expr>, otherwise: Box<Expr> },
    Call { name: String, args: Vec<Expr> },
}

pub(crate) fn parse(source: &str) -> Result<Expr, EvaluationError> {
    let tokens = tokenize(source)?;
    let mut parser = Parser { tokens, pos: 0, depth: 0 };
    let expr = parser.expression()?;
    match parser.peek() {
        TokenKind::Eof => Ok(expr),
        _ => Err(parser.unexpected()),
    }
}

/// Deepest nesting accepted, counting groups, unary operators and
/// operator chains; keeps parsing and evaluation off the end of the stack
const MAX_DEPTH: usize = 256;

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> &TokenKind {
        &self.tokens[self.pos.min(self.tokens.len() - 1)].kind
    }

    fn offset(&self) -> usize {
        self.tokens[self.pos.min(self.tokens.len() - 1)].offset
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

    fn expect(&mut self, kind: &TokenKind, what: &str) -> Result<(), EvaluationError> {
        if self.eat(kind) {
            Ok(())
        } else {
            Err(EvaluationError::Parse { message: format!("expected {what}"), offset: self.offset() })
        }
    }

    fn unexpected(&self) -> EvaluationError {
        let message = match self.peek() {
            TokenKind::Eof => "unexpected end of expression".to_string(),
            other => format!("unexpected token {other:?}"),
        };
        EvaluationError::Parse { message, offset: self.offset() }
    }

    fn enter(&mut self) -> Result<(), EvaluationError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(EvaluationError::Parse {
                message: "expression nested too deeply".into(),
                offset: self.offset(),
            });
        }
        Ok(())
    }

    fn expression(&mut self) -> Result<Expr, EvaluationError> {
        self.enter()?;
        let expr = self.conditional();
        self.depth -= 1;
        expr
    }

    fn conditional(&mut self) -> Result<Expr, EvaluationError> {
        let cond = self.or()?;
        if !self.eat(&TokenKind::Question) {
            return Ok(cond);
        }
        let then = self.expression()?;
        self.expect(&TokenKind::Colon, "':' in conditional")?;
        let otherwise = self.expression()?;
        Ok(Expr::Conditional { cond: Box::new(cond), then: Box::new(then), otherwise: Box::new(otherwise) })
    }

    fn binary_level(
        &mut self,
        next: fn(&mut Self) -> Result<Expr, EvaluationError>,
        ops: &[(TokenKind, BinaryOp)],
    ) -> Result<Expr, EvaluationError> {
        let base = self.depth;
        let mut lhs = next(self)?;
        'outer: loop {
            for (token, op) in ops {
                if self.eat(token) {
                    // every link deepens the left-leaning tree
                    self.enter()?;
                    let rhs = next(self)?;
                    lhs = Expr::Binary(*op, Box::new(lhs), Box::new(rhs));
                    continue 'outer;
                }
            }
            self.depth = base;
            return Ok(lhs);
        }
    }

    fn or(&mut self) -> Result<Expr, EvaluationError> {
        self.binary_level(Self::and, &[(TokenKind::OrOr, BinaryOp::Or)])
    }

    fn and(&mut self) -> Result<Expr, EvaluationError> {
        self.binary_level(Self::equality, &[(TokenKind::AndAnd, BinaryOp::And)])
    }

    fn equality(&mut self) -> Result<Expr, EvaluationError> {
        self.binary_level(
            Self::comparison,
            &[(TokenKind::EqEq, BinaryOp::Eq), (TokenKind::NotEq, BinaryOp::NotEq)],
        )
    }

    fn comparison(&mut self) -> Result<Expr, EvaluationError> {
        self.binary_level(
            Self::additive,
            &[
                (TokenKind::Le, BinaryOp::Le),
                (TokenKind::Ge, BinaryOp::Ge),
                (TokenKind::Lt, BinaryOp::Lt),
                (TokenKind::Gt, BinaryOp::Gt),
            ],
        )
    }

    fn additive(&mut self) -> Result<Expr, EvaluationError> {
        self.binary_level(
            Self::multiplicative,
            &[(TokenKind::Plus, BinaryOp::Add), (TokenKind::Minus, BinaryOp::Sub)],
        )
    }

    fn multiplicative(&mut self) -> Result<Expr, EvaluationError> {
        self.binary_level(
            Self::unary,
            &[
                (TokenKind::Star, BinaryOp::Mul),
                (TokenKind::Slash, BinaryOp::Div),
                (TokenKind::Percent, BinaryOp::Rem),
            ],
        )
    }

    fn unary(&mut self) -> Result<Expr, EvaluationError> {
        let op = match self.peek() {
            TokenKind::Minus => UnaryOp::Neg,
            TokenKind::Plus => UnaryOp::Plus,
            TokenKind::Bang => UnaryOp::Not,
            _ => return self.primary(),
        };
        self.advance();
        self.enter()?;
        let operand = self.unary();
        self.depth -= 1;
        Ok(Expr::Unary(op, Box::new(operand?)))
    }

    fn primary(&mut self) -> Result<Expr, EvaluationError> {
        match self.peek().clone() {
            TokenKind::Number(n) => {
                self.advance();
                Ok(Expr::Literal(Value::Number(n)))
            }
            TokenKind::Str(s) => {
                self.advance();
                Ok(Expr::Literal(Value::String(s)))
            }
            TokenKind::True => {
                self.advance();
                Ok(Expr::Literal(Value::Bool(true)))
            }
            TokenKind::False => {
                self.advance();
                Ok(Expr::Literal(Value::Bool(false)))
            }
            TokenKind::Null => {
                self.advance();
                Ok(Expr::Literal(Value::Null))
            }
            TokenKind::LParen => {
                self.advance();
                let inner = self.expression()?;
                self.expect(&TokenKind::RParen, "')'")?;
                Ok(inner)
            }
            TokenKind::LBracket => {
                self.advance();
                let items = self.list(&TokenKind::RBracket, "']'")?;
                Ok(Expr::Array(items))
            }
            TokenKind::Ident(name) => {
                self.advance();
                if self.eat(&TokenKind::LParen) {
                    let args = self.list(&TokenKind::RParen, "')'")?;
                    Ok(Expr::Call { name, args })
                } else {
                    Ok(Expr::Ident(name))
                }
            }
            _ => Err(self.unexpected()),
        }
    }

    /// Comma-separated expressions up to `close`; the opener is consumed
    fn list(&mut self, close: &TokenKind, what: &str) -> Result<Vec<Expr>, EvaluationError> {
        let mut items = Vec::new();
        if self.eat(close) {
            return Ok(items);
        }
        loop {
            items.push(self.expression()?);
            if self.eat(&TokenKind::Comma) {
                continue;
            }
            self.expect(close, what)?;
            return Ok(items);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn num(n: f64) -> Box<Expr> {
        Box::new(Expr::Literal(Value::Number(n)))
    }

    #[test]
    fn test_precedence() {
        assert_eq!(
            parse("1 + 2 * 3").unwrap(),
            Expr::Binary(BinaryOp::Add, num(1.0), Box::new(Expr::Binary(BinaryOp::Mul, num(2.0), num(3.0))))
        );
        assert_eq!(
            parse("(1 + 2) * 3").unwrap(),
            Expr::Binary(BinaryOp::Mul, Box::new(Expr::Binary(BinaryOp::Add, num(1.0), num(2.0))), num(3.0))
        );
    }

    #[test]
    fn test_left_associative() {
        assert_eq!(
            parse("8 - 4 - 2").unwrap(),
            Expr::Binary(BinaryOp::Sub, Box::new(Expr::Binary(BinaryOp::Sub, num(8.0), num(4.0))), num(2.0))
        );
    }

    #[test]
    fn test_nested_ternary_is_right_associative() {
        let expr = parse("a ? 1 : b ? 2 : 3").unwrap();
        let Expr::Conditional { otherwise, .. } = expr else { panic!("expected conditional") };
        assert!(matches!(*otherwise, Expr::Conditional { .. }));
    }

    #[test]
    fn test_calls_and_arrays() {
        assert_eq!(
            parse("max(1, [2])").unwrap(),
            Expr::Call {
                name: "max".into(),
                args: vec![Expr::Literal(Value::Number(1.0)), Expr::Array(vec![Expr::Literal(Value::Number(2.0))])],
            }
        );
        assert_eq!(parse("today()").unwrap(), Expr::Call { name: "today".into(), args: vec![] });
    }

    #[test]
    fn test_syntax_errors() {
        assert!(matches!(parse("1 +"), Err(EvaluationError::Parse { .. })));
        assert!(matches!(parse("(1"), Err(EvaluationError::Parse { .. })));
        assert!(matches!(parse("1 2"), Err(EvaluationError::Parse { offset: 2, .. })));
        assert!(matches!(parse("a ? b"), Err(EvaluationError::Parse { .. })));
        assert!(matches!(parse(""), Err(EvaluationError::Parse { .. })));
    }

    fn too_deep(result: Result<Expr, EvaluationError>) -> bool {
        matches!(result, Err(EvaluationError::Parse { message, .. }) if message == "expression nested too deeply")
    }

    #[test]
    fn test_deep_nesting_is_an_error() {
        let groups = format!("{}a{}", "(".repeat(5000), ")".repeat(5000));
        assert!(too_deep(parse(&groups)));
        assert!(too_deep(parse(&format!("{}1", "-".repeat(5000)))));
        assert!(too_deep(parse(&format!("{}true", "!".repeat(5000)))));
        assert!(too_deep(parse(&vec!["1"; 5000].join(" + "))));
    }

    #[test]
    fn test_moderate_nesting_parses() {
        let groups = format!("{}1{}", "(".repeat(50), ")".repeat(50));
        assert_eq!(parse(&groups).unwrap(), Expr::Literal(Value::Number(1.0)));
        assert!(parse(&vec!["1"; 100].join(" + ")).is_ok());
        assert!(parse(&format!("{}1", "-".repeat(100))).is_ok());
    }
}
