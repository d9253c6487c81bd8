//! Compile-time diagnostics and the sink they are reported to.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use thiserror::Error;

/// Line number (starting at one).
pub type Position = u32;

/// A scan or parse error tied to a source line.
///
/// Displays in the classic interpreter format, e.g.
/// `[line 3] Error at ';': Expect expression.`
#[derive(Debug, Error, PartialEq)]
#[error("[line {pos}] Error{at}: {error}")]
pub struct FullParseError {
    pub pos: Position,
    pub at: At,
    pub error: ParseError,
}

/// Where in the token stream a parse error was noticed.  Scanner errors
/// have no token to point at.
#[derive(Debug, PartialEq)]
pub enum At {
    Nothing,
    Token(String),
    End,
}

impl fmt::Display for At {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            At::Nothing => Ok(()),
            At::Token(lexeme) => write!(f, " at '{}'", lexeme),
            At::End => write!(f, " at end"),
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum ParseError {
    #[error("Unexpected character.")]
    BadChar,
    #[error("Unterminated string.")]
    UnterminatedString,
    #[error("Cannot parse number literal.")]
    BadNumberLiteral,
    #[error("Expect {0}.")]
    Expected(&'static str),
    #[error("Expect expression.")]
    ExpectedExpression,
    #[error("Invalid assignment target.")]
    InvalidAssignmentTarget,
    #[error("Can't have more than 255 arguments.")]
    TooManyArguments,
    #[error("Can't have more than 255 parameters.")]
    TooManyParameters,
}

/// Sink collecting every compile error of a single scan-and-parse run.
///
/// Shared as an `Rc` between the scanner and the parser so both phases
/// report into the same list; the driver drains it afterwards.  A run
/// that reported anything here must not reach the evaluator.
#[derive(Debug, Default)]
pub struct Diag {
    errors: RefCell<Vec<FullParseError>>,
}

impl Diag {
    pub fn new() -> Rc<Diag> {
        Rc::new(Diag::default())
    }

    pub fn report(&self, error: FullParseError) {
        self.errors.borrow_mut().push(error);
    }

    pub fn had_error(&self) -> bool {
        !self.errors.borrow().is_empty()
    }

    /// Drain all reported errors, oldest first.
    pub fn take_errors(&self) -> Vec<FullParseError> {
        self.errors.take()
    }
}
