//! Tokenizer for derived-field expressions

use super::EvaluationError;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum TokenKind {
    Number(f64),
    Str(String),
    Ident(String),
    True,
    False,
    Null,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,
    Question,
    Colon,
    Bang,
    EqEq,
    NotEq,
    Lt,
    Le,
    Gt,
    Ge,
    AndAnd,
    OrOr,
    Eof,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Token {
    pub kind: TokenKind,
    pub offset: usize,
}

pub(crate) fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '$'
}

pub(crate) fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

pub(crate) fn tokenize(source: &str) -> Result<Vec<Token>, EvaluationError> {
    Lexer { source, pos: 0 }.run()
}

struct Lexer<'a> {
    source: &'a str,
    pos: usize,
}

impl<'a> Lexer<'a> {
    fn run(mut self) -> Result<Vec<Token>, EvaluationError> {
        let mut tokens = Vec::new();
        loop {
            self.skip_whitespace();
            let offset = self.pos;
            let Some(c) = self.peek() else {
                tokens.push(Token { kind: TokenKind::Eof, offset });
                return Ok(tokens);
            };
            let kind = match c {
                '0'..='9' | '.' => self.number()?,
                '"' | '\'' => TokenKind::Str(self.string(c)?),
                c if is_ident_start(c) => self.word(),
                _ => self.punct(c)?,
            };
            tokens.push(Token { kind, offset });
        }
    }

    fn peek(&self) -> Option<char> {
        self.source[self.pos..].chars().next()
    }

    fn peek_at(&self, n: usize) -> Option<char> {
        self.source[self.pos..].chars().nth(n)
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.bump();
        }
    }

    fn error(&self, message: impl Into<String>, offset: usize) -> EvaluationError {
        EvaluationError::Parse { message: message.into(), offset }
    }

    fn number(&mut self) -> Result<TokenKind, EvaluationError> {
        let start = self.pos;
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.bump();
        }
        if self.peek() == Some('.') {
            self.bump();
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.bump();
            }
        }
        if matches!(self.peek(), Some('e' | 'E')) {
            let sign = matches!(self.peek_at(1), Some('+' | '-'));
            let digit_at = if sign { 2 } else { 1 };
            if self.peek_at(digit_at).is_some_and(|c| c.is_ascii_digit()) {
                for _ in 0..digit_at {
                    self.bump();
                }
                while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                    self.bump();
                }
            }
        }
        let text = &self.source[start..self.pos];
        if self.peek().is_some_and(is_ident_start) {
            return Err(self.error(format!("invalid number '{text}'"), start));
        }
        text.parse::<f64>()
            .map(TokenKind::Number)
            .map_err(|_| self.error(format!("invalid number '{text}'"), start))
    }

    fn string(&mut self, quote: char) -> Result<String, EvaluationError> {
        let start = self.pos;
        self.bump();
        let mut out = String::new();
        loop {
            match self.bump() {
                None => return Err(self.error("unterminated string", start)),
                Some(c) if c == quote => return Ok(out),
                Some('\\') => {
                    let escaped = self.bump().ok_or_else(|| self.error("unterminated string", start))?;
                    match escaped {
                        'n' => out.push('\n'),
                        't' => out.push('\t'),
                        'r' => out.push('\r'),
                        'b' => out.push('\u{8}'),
                        'f' => out.push('\u{c}'),
                        'u' => out.push(self.unicode_escape(start)?),
                        other => out.push(other),
                    }
                }
                Some(c) => out.push(c),
            }
        }
    }

    fn unicode_escape(&mut self, start: usize) -> Result<char, EvaluationError> {
        let first = self.hex4(start)?;
        if (0xD800..0xDC00).contains(&first) {
            // surrogate pair, as emitted by JSON encoders
            if self.peek() == Some('\\') && self.peek_at(1) == Some('u') {
                self.bump();
                self.bump();
                let second = self.hex4(start)?;
                let combined = 0x10000 + ((first - 0xD800) << 10) + (second.wrapping_sub(0xDC00) & 0x3FF);
                return char::from_u32(combined).ok_or_else(|| self.error("invalid unicode escape", start));
            }
        }
        char::from_u32(first).ok_or_else(|| self.error("invalid unicode escape", start))
    }

    fn hex4(&mut self, start: usize) -> Result<u32, EvaluationError> {
        let end = self.pos + 4;
        let digits = self
            .source
            .get(self.pos..end)
            .ok_or_else(|| self.error("invalid unicode escape", start))?;
        let value = u32::from_str_radix(digits, 16).map_err(|_| self.error("invalid unicode escape", start))?;
        self.pos = end;
        Ok(value)
    }

    fn word(&mut self) -> TokenKind {
        let start = self.pos;
        while self.peek().is_some_and(is_ident_char) {
            self.bump();
        }
        match &self.source[start..self.pos] {
            "true" => TokenKind::True,
            "false" => TokenKind::False,
            "null" | "undefined" => TokenKind::Null,
            ident => TokenKind::Ident(ident.to_string()),
        }
    }

    fn punct(&mut self, c: char) -> Result<TokenKind, EvaluationError> {
        let offset = self.pos;
        self.bump();
        let next = self.peek();
        let kind = match (c, next) {
            ('=', Some('=')) => {
                self.bump();
                if self.peek() == Some('=') {
                    self.bump();
                }
                TokenKind::EqEq
            }
            ('!', Some('=')) => {
                self.bump();
                if self.peek() == Some('=') {
                    self.bump();
                }
                TokenKind::NotEq
            }
            ('<', Some('=')) => {
                self.bump();
                TokenKind::Le
            }
            ('>', Some('=')) => {
                self.bump();
                TokenKind::Ge
            }
            ('&', Some('&')) => {
                self.bump();
                TokenKind::AndAnd
            }
            ('|', Some('|')) => {
                self.bump();
                TokenKind::OrOr
            }
            ('+', _) => TokenKind::Plus,
            ('-', _) => TokenKind::Minus,
            ('*', _) => TokenKind::Star,
            ('/', _) => TokenKind::Slash,
            ('%', _) => TokenKind::Percent,
            ('(', _) => TokenKind::LParen,
            (')', _) => TokenKind::RParen,
            ('[', _) => TokenKind::LBracket,
            (']', _) => TokenKind::RBracket,
            (',', _) => TokenKind::Comma,
            ('?', _) => TokenKind::Question,
            (':', _) => TokenKind::Colon,
            ('!', _) => TokenKind::Bang,
            ('<', _) => TokenKind::Lt,
            ('>', _) => TokenKind::Gt,
            (other, _) => return Err(self.error(format!("unexpected character '{other}'"), offset)),
        };
        Ok(kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        tokenize(source).unwrap().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_operators_and_literals() {
        assert_eq!(
            kinds("a >= 1.5e2 ? 'x' : \"y\""),
            vec![
                TokenKind::Ident("a".into()),
                TokenKind::Ge,
                TokenKind::Number(150.0),
                TokenKind::Question,
                TokenKind::Str("x".into()),
                TokenKind::Colon,
                TokenKind::Str("y".into()),
                TokenKind::Eof,
            ]
        );
        assert_eq!(kinds("a === b")[1], TokenKind::EqEq);
        assert_eq!(kinds("a !== b")[1], TokenKind::NotEq);
        assert_eq!(kinds("undefined"), vec![TokenKind::Null, TokenKind::Eof]);
    }

    #[test]
    fn test_json_string_escapes() {
        assert_eq!(kinds(r#""a\"b\né""#)[0], TokenKind::Str("a\"b\né".into()));
        assert_eq!(kinds(r#""\ud83d\ude00""#)[0], TokenKind::Str("\u{1F600}".into()));
    }

    #[test]
    fn test_errors_carry_offset() {
        assert_eq!(
            tokenize("1 + #").unwrap_err(),
            EvaluationError::Parse { message: "unexpected character '#'".into(), offset: 4 }
        );
        assert!(matches!(tokenize("'open"), Err(EvaluationError::Parse { offset: 0, .. })));
        assert!(tokenize("12abc").is_err());
        assert!(tokenize("a = b").is_err());
    }
}
