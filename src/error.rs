// ABOUTME: Error types for evaluation failures

use crate::value::Value;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseErrorKind {
    EofAtTopLevel,
    UnexpectedEofMidList,
    UnexpectedClosingDelimiter,
    InvalidNumberLiteral,
    InvalidBooleanLiteral,
    InvalidToken,
    InvalidEscapeSequence,
}

impl std::fmt::Display for ParseErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ParseErrorKind::EofAtTopLevel => "end of input",
            ParseErrorKind::UnexpectedEofMidList => "unexpected end of input inside list",
            ParseErrorKind::UnexpectedClosingDelimiter => "unexpected closing delimiter",
            ParseErrorKind::InvalidNumberLiteral => "invalid number literal",
            ParseErrorKind::InvalidBooleanLiteral => "invalid boolean literal",
            ParseErrorKind::InvalidToken => "invalid token",
            ParseErrorKind::InvalidEscapeSequence => "invalid escape sequence",
        };
        write!(f, "{}", s)
    }
}

#[derive(Error, Debug, Clone)]
pub enum LispError {
    #[error("parse error: {kind}: {detail}")]
    Parse {
        kind: ParseErrorKind,
        detail: String,
    },

    #[error("{function}: expected {expected}, got {actual} at argument {position}")]
    TypeMismatch {
        function: String,
        expected: String,
        actual: String,
        position: usize,
    },

    #[error("unbound variable: {0}")]
    UnboundVariable(String),

    #[error("{function}: expected {expected} argument{}, got {actual}", if *.expected == "1" { "" } else { "s" })]
    ArityError {
        function: String,
        expected: String,
        actual: usize,
    },

    #[error("{function}: index {index} out of range for length {length}")]
    RangeError {
        function: String,
        index: usize,
        length: usize,
    },

    #[error("out of memory")]
    OutOfMemory,

    #[error("internal error: {0}")]
    Internal(String),
}

impl LispError {
    pub fn type_error(function: &str, expected: &str, actual: Value, position: usize) -> Self {
        LispError::TypeMismatch {
            function: function.to_string(),
            expected: expected.to_string(),
            actual: actual.type_name().to_string(),
            position,
        }
    }

    pub fn arity_error(function: &str, expected: impl Into<String>, actual: usize) -> Self {
        LispError::ArityError {
            function: function.to_string(),
            expected: expected.into(),
            actual,
        }
    }

    pub fn range_error(function: &str, index: usize, length: usize) -> Self {
        LispError::RangeError {
            function: function.to_string(),
            index,
            length,
        }
    }

    pub fn parse(kind: ParseErrorKind, detail: impl Into<String>) -> Self {
        LispError::Parse {
            kind,
            detail: detail.into(),
        }
    }
}
