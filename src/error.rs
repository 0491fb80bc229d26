use serde::Serialize;
use thiserror::Error;

use crate::scanner;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Lexical,
    Parse,
    Resolve,
}

/// A diagnostic produced before any code runs. Any one of these keeps the
/// program from being evaluated.
#[derive(Debug, Clone, PartialEq, Serialize, Error)]
#[error("[line {line}] Error{location}: {message}")]
pub struct StaticError {
    pub phase: Phase,
    pub line: usize,
    pub col: i64,
    /// `""`, `" at end"` or `" at '<lexeme>'"`.
    pub location: String,
    pub message: String,
}

impl StaticError {
    pub fn at_line(phase: Phase, line: usize, col: i64, message: impl Into<String>) -> StaticError {
        StaticError {
            phase,
            line,
            col,
            location: String::new(),
            message: message.into(),
        }
    }

    pub fn at_token(phase: Phase, tok: &scanner::Token, message: impl Into<String>) -> StaticError {
        let location = match tok.ty {
            scanner::TokenType::Eof => " at end".to_string(),
            _ => format!(" at '{}'", tok.lexeme),
        };
        StaticError {
            phase,
            line: tok.line,
            col: tok.col,
            location,
            message: message.into(),
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize)]
pub enum RuntimeErrorKind {
    UndefinedVariable,
    UninitializedVariable,
    OperandType,
    DivisionByZero,
    NotCallable,
    Arity,
    UndefinedProperty,
    NotAnInstance,
    InvalidSuperclass,
    Native,
    Output,
}

#[derive(Debug, Clone, PartialEq, Serialize, Error)]
#[error("{message}\n[line {line}]")]
pub struct RuntimeError {
    pub kind: RuntimeErrorKind,
    pub line: usize,
    pub col: i64,
    pub message: String,
}

impl RuntimeError {
    pub fn new(
        kind: RuntimeErrorKind,
        line: usize,
        col: i64,
        message: impl Into<String>,
    ) -> RuntimeError {
        RuntimeError {
            kind,
            line,
            col,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn token(ty: scanner::TokenType, lexeme: &str) -> scanner::Token {
        scanner::Token {
            ty,
            lexeme: lexeme.to_string(),
            literal: None,
            line: 3,
            col: 7,
        }
    }

    #[test]
    fn static_error_where_text() {
        let at_end = StaticError::at_token(Phase::Parse, &token(scanner::TokenType::Eof, ""), "Expect expression.");
        assert_eq!(at_end.to_string(), "[line 3] Error at end: Expect expression.");

        let at_lexeme = StaticError::at_token(
            Phase::Parse,
            &token(scanner::TokenType::Identifier, "foo"),
            "Invalid assignment target.",
        );
        assert_eq!(
            at_lexeme.to_string(),
            "[line 3] Error at 'foo': Invalid assignment target."
        );

        let bare = StaticError::at_line(Phase::Lexical, 1, 2, "Unterminated string.");
        assert_eq!(bare.to_string(), "[line 1] Error: Unterminated string.");
    }

    #[test]
    fn runtime_error_display() {
        let err = RuntimeError::new(RuntimeErrorKind::DivisionByZero, 4, 3, "Division by zero.");
        assert_eq!(err.to_string(), "Division by zero.\n[line 4]");
    }

    #[test]
    fn diagnostics_serialize() {
        let err = StaticError::at_line(Phase::Resolve, 2, 1, "Can't return from top-level code.");
        let json = serde_json::to_string(&err).unwrap();
        assert!(json.contains("\"phase\":\"resolve\""));
        assert!(json.contains("\"line\":2"));
    }
}
