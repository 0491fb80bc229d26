use serde::Serialize;
use tracing::debug;

use crate::error::{Phase, StaticError};

#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize)]
#[rustfmt::skip]
pub enum TokenType {
  // Single-character tokens.
  LeftParen, RightParen, LeftBrace, RightBrace,
  Comma, Dot, Minus, Plus, Semicolon, Slash, Star,
  Question, Colon,

  // One or two character tokens.
  Bang, BangEqual,
  Equal, EqualEqual,
  Greater, GreaterEqual,
  Less, LessEqual,

  // Literals.
  Identifier, String, Number,

  // Keywords.
  And, Break, Class, Else, False, Fun, For, If, Nil, Or,
  Print, Return, Super, This, True, Var, While,

  Eof
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Literal {
    Identifier(String),
    Str(String),
    Number(f64),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Token {
    pub ty: TokenType,
    pub lexeme: String,
    pub literal: Option<Literal>,
    pub line: usize,
    pub col: i64,
}

/// Tokenizes the whole input. Lexical problems are collected alongside the
/// tokens rather than stopping the scan, and the token list always ends with
/// an `Eof` token.
pub fn scan_tokens(input: &str) -> (Vec<Token>, Vec<StaticError>) {
    let mut scanner = Scanner::new(input);

    scanner.scan_tokens();

    debug!(
        tokens = scanner.tokens.len(),
        errors = scanner.errors.len(),
        "scanned input"
    );

    (scanner.tokens, scanner.errors)
}

fn keyword(text: &str) -> Option<TokenType> {
    match text {
        "and" => Some(TokenType::And),
        "break" => Some(TokenType::Break),
        "class" => Some(TokenType::Class),
        "else" => Some(TokenType::Else),
        "false" => Some(TokenType::False),
        "for" => Some(TokenType::For),
        "fun" => Some(TokenType::Fun),
        "if" => Some(TokenType::If),
        "nil" => Some(TokenType::Nil),
        "or" => Some(TokenType::Or),
        "print" => Some(TokenType::Print),
        "return" => Some(TokenType::Return),
        "super" => Some(TokenType::Super),
        "this" => Some(TokenType::This),
        "true" => Some(TokenType::True),
        "var" => Some(TokenType::Var),
        "while" => Some(TokenType::While),
        _ => None,
    }
}

struct Scanner {
    source: Vec<char>,
    tokens: Vec<Token>,
    errors: Vec<StaticError>,
    start: usize,
    current: usize,
    line: usize,
    // index into `source` of the first character of the current line
    line_start: usize,
    start_col: i64,
}

impl Scanner {
    fn new(input: &str) -> Scanner {
        Scanner {
            source: input.chars().collect(),
            tokens: Vec::new(),
            errors: Vec::new(),
            start: 0,
            current: 0,
            line: 1,
            line_start: 0,
            start_col: 1,
        }
    }

    fn scan_tokens(&mut self) {
        while !self.done() {
            self.start = self.current;
            self.start_col = self.col_of(self.start);
            self.scan_token();
        }

        self.tokens.push(Token {
            ty: TokenType::Eof,
            lexeme: String::new(),
            literal: None,
            line: self.line,
            col: self.col_of(self.current),
        })
    }

    fn scan_token(&mut self) {
        let c = self.advance();

        match c {
            '(' => self.add_token(TokenType::LeftParen),
            ')' => self.add_token(TokenType::RightParen),
            '{' => self.add_token(TokenType::LeftBrace),
            '}' => self.add_token(TokenType::RightBrace),
            ',' => self.add_token(TokenType::Comma),
            '.' => self.add_token(TokenType::Dot),
            '-' => self.add_token(TokenType::Minus),
            '+' => self.add_token(TokenType::Plus),
            ';' => self.add_token(TokenType::Semicolon),
            '*' => self.add_token(TokenType::Star),
            '?' => self.add_token(TokenType::Question),
            ':' => self.add_token(TokenType::Colon),
            '!' => {
                let matches_eq = self.matches('=');
                self.add_token(if matches_eq {
                    TokenType::BangEqual
                } else {
                    TokenType::Bang
                })
            }
            '=' => {
                let matches_eq = self.matches('=');
                self.add_token(if matches_eq {
                    TokenType::EqualEqual
                } else {
                    TokenType::Equal
                })
            }
            '<' => {
                let matches_eq = self.matches('=');
                self.add_token(if matches_eq {
                    TokenType::LessEqual
                } else {
                    TokenType::Less
                })
            }
            '>' => {
                let matches_eq = self.matches('=');
                self.add_token(if matches_eq {
                    TokenType::GreaterEqual
                } else {
                    TokenType::Greater
                })
            }
            '/' => {
                if self.matches('/') {
                    while self.peek() != '\n' && !self.done() {
                        self.advance();
                    }
                } else if self.matches('*') {
                    self.block_comment()
                } else {
                    self.add_token(TokenType::Slash)
                }
            }
            ' ' | '\r' | '\t' => {}
            '\n' => self.newline(),
            '"' => self.string(),
            _ => {
                if Scanner::is_decimal_digit(c) {
                    self.number()
                } else if Scanner::is_alpha(c) {
                    self.identifier()
                } else {
                    self.error(format!("Unexpected character '{}'.", c))
                }
            }
        }
    }

    fn block_comment(&mut self) {
        let mut depth = 1;

        while !self.done() {
            let c = self.advance();
            if c == '\n' {
                self.newline();
            } else if c == '/' && self.matches('*') {
                depth += 1;
            } else if c == '*' && self.matches('/') {
                depth -= 1;
                if depth == 0 {
                    return;
                }
            }
        }

        self.error("Unclosed block comment.")
    }

    fn string(&mut self) {
        while self.peek() != '"' && !self.done() {
            if self.peek() == '\n' {
                self.advance();
                self.newline();
            } else {
                self.advance();
            }
        }

        if self.done() {
            self.error("Unterminated string.");
            return;
        }

        // the closing quote
        self.advance();

        let value: String = self.source[self.start + 1..self.current - 1]
            .iter()
            .collect();
        self.add_token_literal(TokenType::String, Some(Literal::Str(value)))
    }

    fn number(&mut self) {
        while Scanner::is_decimal_digit(self.peek()) {
            self.advance();
        }

        if self.peek() == '.' && Scanner::is_decimal_digit(self.peek_next()) {
            self.advance();
        }

        while Scanner::is_decimal_digit(self.peek()) {
            self.advance();
        }

        let text: String = self.source[self.start..self.current].iter().collect();
        match text.parse::<f64>() {
            Ok(val) => self.add_token_literal(TokenType::Number, Some(Literal::Number(val))),
            Err(err) => self.error(format!("Unable to parse number '{}': {}.", text, err)),
        }
    }

    fn identifier(&mut self) {
        while Scanner::is_alphanumeric(self.peek()) {
            self.advance();
        }

        let text: String = self.source[self.start..self.current].iter().collect();

        match keyword(&text) {
            Some(token_type) => self.add_token(token_type),
            None => self.add_token_literal(TokenType::Identifier, Some(Literal::Identifier(text))),
        }
    }

    fn is_alpha(c: char) -> bool {
        c.is_ascii_alphabetic() || c == '_'
    }

    fn is_decimal_digit(c: char) -> bool {
        c.is_ascii_digit()
    }

    fn is_alphanumeric(c: char) -> bool {
        Scanner::is_alpha(c) || Scanner::is_decimal_digit(c)
    }

    fn newline(&mut self) {
        self.line += 1;
        self.line_start = self.current;
    }

    fn col_of(&self, idx: usize) -> i64 {
        (idx - self.line_start) as i64 + 1
    }

    fn error(&mut self, message: impl Into<String>) {
        self.errors.push(StaticError::at_line(
            Phase::Lexical,
            self.line,
            self.start_col,
            message,
        ))
    }

    fn matches(&mut self, c: char) -> bool {
        if self.done() || self.peek() != c {
            return false;
        }

        self.current += 1;
        true
    }

    fn advance(&mut self) -> char {
        self.current += 1;
        self.source[self.current - 1]
    }

    fn add_token(&mut self, token_type: TokenType) {
        self.add_token_literal(token_type, None)
    }

    fn add_token_literal(&mut self, token_type: TokenType, literal: Option<Literal>) {
        let text: String = self.source[self.start..self.current].iter().collect();

        self.tokens.push(Token {
            ty: token_type,
            lexeme: text,
            literal,
            line: self.line,
            col: self.start_col,
        })
    }

    fn peek(&self) -> char {
        if self.done() {
            '\0'
        } else {
            self.source[self.current]
        }
    }

    fn peek_next(&self) -> char {
        if self.current + 1 >= self.source.len() {
            '\0'
        } else {
            self.source[self.current + 1]
        }
    }

    fn done(&self) -> bool {
        self.current >= self.source.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn types(input: &str) -> Vec<TokenType> {
        let (tokens, errors) = scan_tokens(input);
        assert!(errors.is_empty(), "unexpected errors {:?}", errors);
        tokens.iter().map(|tok| tok.ty).collect()
    }

    #[test]
    fn one_and_two_char_operators() {
        assert_eq!(
            types("! != = == < <= > >= ? :"),
            vec![
                TokenType::Bang,
                TokenType::BangEqual,
                TokenType::Equal,
                TokenType::EqualEqual,
                TokenType::Less,
                TokenType::LessEqual,
                TokenType::Greater,
                TokenType::GreaterEqual,
                TokenType::Question,
                TokenType::Colon,
                TokenType::Eof,
            ]
        );
    }

    #[test]
    fn keywords_and_identifiers() {
        let (tokens, _) = scan_tokens("var breakfast = break;");
        assert_eq!(tokens[0].ty, TokenType::Var);
        assert_eq!(tokens[1].ty, TokenType::Identifier);
        assert_eq!(
            tokens[1].literal,
            Some(Literal::Identifier("breakfast".to_string()))
        );
        assert_eq!(tokens[3].ty, TokenType::Break);
    }

    #[test]
    fn number_literals() {
        let (tokens, _) = scan_tokens("12 3.25 7.");
        assert_eq!(tokens[0].literal, Some(Literal::Number(12.0)));
        assert_eq!(tokens[1].literal, Some(Literal::Number(3.25)));
        // a trailing dot is not part of the number
        assert_eq!(tokens[2].literal, Some(Literal::Number(7.0)));
        assert_eq!(tokens[3].ty, TokenType::Dot);
    }

    #[test]
    fn number_round_trip() {
        for n in &[0.0, 1.0, 2.5, 123.456, 1e-7, 98765.4321] {
            let text = format!("{}", n);
            let (tokens, errors) = scan_tokens(&text);
            assert!(errors.is_empty());
            assert_eq!(tokens[0].literal, Some(Literal::Number(*n)));
        }
    }

    #[test]
    fn strings_have_no_escapes() {
        let (tokens, _) = scan_tokens(r#""a\nb""#);
        assert_eq!(tokens[0].literal, Some(Literal::Str(r"a\nb".to_string())));
    }

    #[test]
    fn multiline_string_advances_line() {
        let (tokens, _) = scan_tokens("\"a\nb\" x");
        assert_eq!(tokens[1].line, 2);
    }

    #[test]
    fn unterminated_string() {
        let (tokens, errors) = scan_tokens("\"abc\n");
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].message, "Unterminated string.");
        assert_eq!(errors[0].line, 2);
        assert_eq!(tokens.last().map(|tok| tok.ty), Some(TokenType::Eof));
    }

    #[test]
    fn comments() {
        assert_eq!(types("// nothing here\n1"), vec![TokenType::Number, TokenType::Eof]);
        assert_eq!(types("/* a /* b */ c */"), vec![TokenType::Eof]);
        assert_eq!(
            types("1 /* x \n /* y */ \n */ 2"),
            vec![TokenType::Number, TokenType::Number, TokenType::Eof]
        );
    }

    #[test]
    fn unbalanced_block_comment() {
        let (tokens, errors) = scan_tokens("/* a /* b */");
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].message, "Unclosed block comment.");
        assert_eq!(tokens.len(), 1);
    }

    #[test]
    fn unexpected_character_keeps_scanning() {
        let (tokens, errors) = scan_tokens("1 @ 2 # 3");
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].message, "Unexpected character '@'.");
        assert_eq!(errors[1].message, "Unexpected character '#'.");
        assert_eq!(tokens.len(), 4);
    }

    #[test]
    fn lines_and_columns() {
        let (tokens, _) = scan_tokens("var a;\n  print a;");
        assert_eq!((tokens[0].line, tokens[0].col), (1, 1));
        assert_eq!((tokens[1].line, tokens[1].col), (1, 5));
        assert_eq!((tokens[3].line, tokens[3].col), (2, 3));
    }
}
