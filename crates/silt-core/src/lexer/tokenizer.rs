//! Single-pass SQL tokenizer.

use super::{Keyword, Span, Token, TokenKind};
use crate::error::{Error, Result};

/// A lexer that tokenizes query text.
pub struct Lexer<'a> {
    /// The input query text.
    input: &'a str,
    /// The current byte position.
    pos: usize,
    /// The byte position of the start of the current token.
    start: usize,
}

impl<'a> Lexer<'a> {
    /// Creates a new lexer for the given input.
    #[must_use]
    pub const fn new(input: &'a str) -> Self {
        Self {
            input,
            pos: 0,
            start: 0,
        }
    }

    /// Returns the current character without advancing.
    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    /// Returns the character after the current one without advancing.
    fn peek_next(&self) -> Option<char> {
        let mut chars = self.input[self.pos..].chars();
        chars.next();
        chars.next()
    }

    /// Advances to the next character and returns it.
    fn advance(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(|c| c.is_ascii_whitespace()) {
            self.advance();
        }
    }

    fn make_token(&self, kind: TokenKind) -> Token {
        Token::new(kind, Span::new(self.start, self.pos))
    }

    /// Scans an identifier or keyword.
    fn scan_identifier(&mut self) -> Token {
        while self
            .peek()
            .is_some_and(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            self.advance();
        }

        let text = &self.input[self.start..self.pos];
        match Keyword::from_str(text) {
            Some(keyword) => self.make_token(TokenKind::Keyword(keyword)),
            None => self.make_token(TokenKind::Identifier(text.to_ascii_lowercase())),
        }
    }

    /// Scans an integer or float literal (digits with at most one '.').
    fn scan_number(&mut self) -> Token {
        let mut is_float = false;

        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
        }

        if self.peek() == Some('.') && self.peek_next().is_some_and(|c| c.is_ascii_digit()) {
            is_float = true;
            self.advance();
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.advance();
            }
        }

        let text = &self.input[self.start..self.pos];
        if is_float {
            match text.parse::<f32>() {
                Ok(f) => self.make_token(TokenKind::Float(f)),
                Err(e) => self.make_token(TokenKind::Error(format!("invalid float: {e}"))),
            }
        } else {
            match text.parse::<i64>() {
                Ok(i) => self.make_token(TokenKind::Integer(i)),
                Err(e) => self.make_token(TokenKind::Error(format!("invalid integer: {e}"))),
            }
        }
    }

    /// Scans a string literal. No escape sequence beyond the closing quote.
    fn scan_string(&mut self) -> Token {
        self.advance(); // opening quote
        let content_start = self.pos;

        loop {
            match self.peek() {
                Some('\'') => break,
                Some(_) => {
                    self.advance();
                }
                None => {
                    return self
                        .make_token(TokenKind::Error("unterminated string literal".into()));
                }
            }
        }

        let content = self.input[content_start..self.pos].to_owned();
        self.advance(); // closing quote
        self.make_token(TokenKind::String(content))
    }

    /// Scans a bytea literal: `\x` followed by hex pairs.
    fn scan_bytea(&mut self) -> Token {
        self.advance(); // backslash
        self.advance(); // x

        let mut bytes = Vec::new();
        let mut pending = String::new();
        while self.peek().is_some_and(|c| c.is_ascii_hexdigit()) {
            pending.push(self.advance().unwrap());
            if pending.len() == 2 {
                bytes.push(u8::from_str_radix(&pending, 16).unwrap());
                pending.clear();
            }
        }

        if !pending.is_empty() {
            return self
                .make_token(TokenKind::Error("odd number of hex digits in bytea literal".into()));
        }

        self.make_token(TokenKind::Bytea(bytes))
    }

    /// Scans the next token.
    #[must_use]
    pub fn next_token(&mut self) -> Token {
        self.skip_whitespace();
        self.start = self.pos;

        let c = match self.peek() {
            Some(c) => c,
            None => return self.make_token(TokenKind::Eof),
        };

        match c {
            '(' => {
                self.advance();
                self.make_token(TokenKind::LeftParen)
            }
            ')' => {
                self.advance();
                self.make_token(TokenKind::RightParen)
            }
            ',' => {
                self.advance();
                self.make_token(TokenKind::Comma)
            }
            ';' => {
                self.advance();
                self.make_token(TokenKind::Semicolon)
            }
            '.' => {
                self.advance();
                self.make_token(TokenKind::Dot)
            }
            '+' => {
                self.advance();
                self.make_token(TokenKind::Plus)
            }
            '-' => {
                self.advance();
                self.make_token(TokenKind::Minus)
            }
            '*' => {
                self.advance();
                self.make_token(TokenKind::Star)
            }
            '/' => {
                self.advance();
                self.make_token(TokenKind::Slash)
            }
            '=' => {
                self.advance();
                self.make_token(TokenKind::Eq)
            }
            '<' => {
                self.advance();
                if self.peek() == Some('>') {
                    self.advance();
                    self.make_token(TokenKind::NotEq)
                } else if self.peek() == Some('=') {
                    self.advance();
                    self.make_token(TokenKind::LtEq)
                } else {
                    self.make_token(TokenKind::Lt)
                }
            }
            '>' => {
                self.advance();
                if self.peek() == Some('=') {
                    self.advance();
                    self.make_token(TokenKind::GtEq)
                } else {
                    self.make_token(TokenKind::Gt)
                }
            }
            '\'' => self.scan_string(),
            '\\' if self.peek_next() == Some('x') => self.scan_bytea(),
            c if c.is_ascii_digit() => self.scan_number(),
            c if c.is_ascii_alphabetic() || c == '_' => self.scan_identifier(),
            c => {
                self.advance();
                self.make_token(TokenKind::Error(format!("unexpected character '{c}'")))
            }
        }
    }

    /// Tokenizes the entire input, failing on the first malformed token.
    pub fn tokenize(&mut self) -> Result<Vec<Token>> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token();
            if let TokenKind::Error(msg) = &token.kind {
                return Err(Error::Lex(format!("{msg} (at byte {})", token.span.start)));
            }
            let is_eof = token.is_eof();
            tokens.push(token);
            if is_eof {
                break;
            }
        }
        Ok(tokens)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token_kinds(input: &str) -> Vec<TokenKind> {
        Lexer::new(input)
            .tokenize()
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(token_kinds(""), vec![TokenKind::Eof]);
        assert_eq!(token_kinds("  \n\t "), vec![TokenKind::Eof]);
    }

    #[test]
    fn test_keywords_case_insensitive() {
        assert_eq!(
            token_kinds("select FROM wHeRe"),
            vec![
                TokenKind::Keyword(Keyword::Select),
                TokenKind::Keyword(Keyword::From),
                TokenKind::Keyword(Keyword::Where),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_identifiers_lowercased() {
        assert_eq!(
            token_kinds("Users bar_baz _qux"),
            vec![
                TokenKind::Identifier("users".into()),
                TokenKind::Identifier("bar_baz".into()),
                TokenKind::Identifier("_qux".into()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_numbers() {
        assert_eq!(
            token_kinds("42 3.14 0"),
            vec![
                TokenKind::Integer(42),
                TokenKind::Float(3.14),
                TokenKind::Integer(0),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_strings() {
        assert_eq!(
            token_kinds("'hello' ''"),
            vec![
                TokenKind::String("hello".into()),
                TokenKind::String(String::new()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_unterminated_string_is_lex_error() {
        assert!(Lexer::new("'oops").tokenize().is_err());
    }

    #[test]
    fn test_bytea_literal() {
        assert_eq!(
            token_kinds("\\x48454c4c4f"),
            vec![
                TokenKind::Bytea(vec![0x48, 0x45, 0x4c, 0x4c, 0x4f]),
                TokenKind::Eof,
            ]
        );
        assert!(Lexer::new("\\x123").tokenize().is_err());
    }

    #[test]
    fn test_operators() {
        assert_eq!(
            token_kinds("+ - * / = <> < <= > >="),
            vec![
                TokenKind::Plus,
                TokenKind::Minus,
                TokenKind::Star,
                TokenKind::Slash,
                TokenKind::Eq,
                TokenKind::NotEq,
                TokenKind::Lt,
                TokenKind::LtEq,
                TokenKind::Gt,
                TokenKind::GtEq,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_punctuation() {
        assert_eq!(
            token_kinds("( ) , ; ."),
            vec![
                TokenKind::LeftParen,
                TokenKind::RightParen,
                TokenKind::Comma,
                TokenKind::Semicolon,
                TokenKind::Dot,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_unknown_character_is_lex_error() {
        assert!(Lexer::new("select @").tokenize().is_err());
    }

    #[test]
    fn test_simple_statement() {
        assert_eq!(
            token_kinds("SELECT a FROM t WHERE b = 'x';"),
            vec![
                TokenKind::Keyword(Keyword::Select),
                TokenKind::Identifier("a".into()),
                TokenKind::Keyword(Keyword::From),
                TokenKind::Identifier("t".into()),
                TokenKind::Keyword(Keyword::Where),
                TokenKind::Identifier("b".into()),
                TokenKind::Eq,
                TokenKind::String("x".into()),
                TokenKind::Semicolon,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_span_tracking() {
        let tokens = Lexer::new("select id").tokenize().unwrap();
        assert_eq!(tokens[0].span, Span::new(0, 6));
        assert_eq!(tokens[1].span, Span::new(7, 9));
    }
}
