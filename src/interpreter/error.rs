use std::io;
use std::path::PathBuf;

use thiserror::Error;

use super::{CLOSE_MARKER, OPEN_MARKER};

/// Errors raised while running a script
#[derive(Error, Debug)]
pub enum Error {
    #[error("script must start with {} and end with {}", OPEN_MARKER, CLOSE_MARKER)]
    Format,

    #[error("line {line}: {message}")]
    Syntax { line: usize, message: String },

    #[error("line {line}: cannot evaluate `{expression}`: {source}")]
    Evaluation {
        line: usize,
        expression: String,
        #[source]
        source: EvalError,
    },

    #[error("file not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl Error {
    pub fn syntax(line: usize, message: impl Into<String>) -> Self {
        Self::Syntax {
            line,
            message: message.into(),
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Why an arithmetic expression was rejected or failed to evaluate
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvalError {
    #[error("empty expression")]
    Empty,

    #[error("unexpected character '{0}'")]
    UnexpectedChar(char),

    #[error("unexpected {0}")]
    UnexpectedToken(String),

    #[error("unexpected end of expression")]
    UnexpectedEnd,

    #[error("invalid number literal '{0}'")]
    InvalidNumber(String),

    #[error("attribute access is not allowed ('{0}.')")]
    AttributeAccess(String),

    #[error("function calls are not allowed ('{0}(')")]
    Call(String),

    #[error("unknown variable '{0}'")]
    UnknownVariable(String),

    #[error("variable '{0}' has no value yet")]
    Uninitialized(String),

    #[error("division by zero")]
    DivisionByZero,

    #[error("integer overflow")]
    Overflow,

    #[error("expression nested deeper than {0} levels")]
    TooDeep(usize),

    #[error("expression has more than {0} operators")]
    TooLong(usize),
}

/// Non-numeric reply to an input request. Reported to the user, never propagated.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid input '{input}': please enter a whole number")]
pub struct InputParseError {
    pub input: String,
}

pub type Result<T> = std::result::Result<T, Error>;
