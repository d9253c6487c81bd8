//! API to control the interpreter.

use std::io::prelude::*;
use std::rc::Rc;

use thiserror::Error;

use crate::ctx::Context;
use crate::diag::{Diag, FullParseError};
use crate::eval::{Evaluator, FullRuntimeError};
use crate::parser::Parser;

/// Tree-walk interpreter.
///
/// # Example
///
/// Invoke the interpreter a first time to define a function then additional
/// times to call this function:
///
/// ```
/// # use twlox::interpreter::{Interpreter, LoxError};
///
/// let mut output: Vec<u8> = Vec::new();
/// let mut interp = Interpreter::new(&mut output);
///
/// let func_def = r#"
///     fun max(x, y) {
///         if (x > y) {
///             return x;
///         } else {
///             return y;
///         }
///     }
/// "#;
/// interp.eval(func_def)?;
///
/// interp.eval("print max(10,20);").expect("interpreter error");
/// interp.eval("print max(5,4);").expect("interpreter error");
///
/// assert_eq!(output, b"20\n5\n");
/// # Ok::<(), LoxError>(())
/// ```
#[derive(Debug)]
pub struct Interpreter<'t, W: Write> {
    ctx: Rc<Context>,
    evaluator: Evaluator<'t, W>,
}

/// Errors the interpreter can raise.
#[derive(Debug, Error)]
pub enum LoxError {
    /// Everything the scanner and parser reported for the source, in
    /// order.  The program was not evaluated.
    #[error("{}", format_compile_errors(.0))]
    Compile(Vec<FullParseError>),

    /// Error occurring during evaluation.
    #[error(transparent)]
    Runtime(#[from] FullRuntimeError),
}

fn format_compile_errors(errors: &[FullParseError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}

impl<W: Write> Interpreter<'_, W> {
    pub fn new(output: &mut W) -> Interpreter<'_, W> {
        let ctx = Context::new();
        Interpreter {
            ctx: ctx.clone(),
            evaluator: Evaluator::new(output, ctx),
        }
    }

    /// Run `source` through scanning, parsing and evaluation.
    ///
    /// Compile errors are collected across the whole source and returned
    /// together; a source with any compile error is not evaluated at all.
    /// Definitions persist between calls, so a REPL can feed lines one at
    /// a time, and a runtime error leaves the session usable.
    pub fn eval(&mut self, source: &str) -> Result<(), LoxError> {
        let diag = Diag::new();
        let mut parser = Parser::new(source, self.ctx.clone(), diag.clone());
        let prg = parser.parse_program();
        if diag.had_error() {
            return Err(LoxError::Compile(diag.take_errors()));
        }
        self.evaluator.interpret(&prg)?;
        Ok(())
    }
}
