//! Tree-walking evaluator.

use std::cell::RefCell;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fmt;
use std::io;
use std::io::prelude::*;
use std::rc::Rc;
use std::time::{SystemTime, UNIX_EPOCH};

use thiserror::Error;

use crate::ast::{BinOp, Expr, LogicalOp, Stmt, UnaryOp};
use crate::ctx::{Context, Symbol};
use crate::diag::Position;

#[derive(Debug, PartialEq, Clone)]
pub enum Value {
    Nil,
    Number(f64),
    Bool(bool),
    Str(String),
    Function(Function),
}

#[derive(Clone)]
pub struct Function {
    name: Symbol,
    arity: usize,
    body: FunctionBody,
}

#[derive(Clone)]
enum FunctionBody {
    Builtin(fn(&[Value]) -> Result<Value, RuntimeError>),
    // Parameters, body, and the frame the function was declared in.  The
    // frame makes the function a closure: the body resolves free names in
    // the scope of the declaration, not of the call.
    User(Vec<Symbol>, Rc<Stmt>, Rc<Env>),
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Function")
            .field("name", &self.name)
            .field("arity", &self.arity)
            .finish()
    }
}

impl PartialEq for Function {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for Function {}

impl Value {
    /// Only `nil` and `false` are falsey; `0` and `""` are truthy.
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::Nil | Value::Bool(false))
    }

    /// `nil` equals only `nil`; values of different kinds are never equal;
    /// values of the same kind compare structurally.
    fn equals(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Number(l), Value::Number(r)) => l == r,
            (Value::Bool(l), Value::Bool(r)) => l == r,
            (Value::Str(l), Value::Str(r)) => l == r,
            (Value::Function(l), Value::Function(r)) => l == r,
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "nil"),
            // An f64 holding an exact integer renders without a fraction.
            Value::Number(n) => write!(f, "{}", n),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Str(s) => write!(f, "{}", s),
            Value::Function(func) => write!(f, "function {}/{}", func.name, func.arity),
        }
    }
}

/// A runtime error located at the line of the token that raised it.
///
/// Displays in the classic two-line format:
///
/// ```text
/// Operands must be numbers.
/// [line 3]
/// ```
#[derive(Debug, Error)]
#[error("{error}\n[line {pos}]")]
pub struct FullRuntimeError {
    pub pos: Position,
    pub error: RuntimeError,
}

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("Operand must be a number.")]
    NumberOperand,
    #[error("Operands must be numbers.")]
    NumberOperands,
    #[error("Operands must be two numbers or two strings.")]
    AddOperands,
    #[error("Undefined variable '{0}'.")]
    UndefinedVariable(String),
    #[error("Can only call functions and classes.")]
    NotCallable,
    #[error("Expected {expected} arguments but got {got}.")]
    BadNumberOfArguments { expected: usize, got: usize },
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Walks statements against a chain of environment frames.
///
/// A runtime error aborts the current [`Evaluator::interpret`] call only;
/// the evaluator and its global frame stay usable, which is what keeps a
/// REPL session alive across bad lines.
#[derive(Debug)]
pub struct Evaluator<'t, W: Write> {
    output: &'t mut W,
    globals: Rc<Env>,
    // Return channel: set by `Stmt::Return`, drained at the call site.
    // While it is set, statement execution unwinds without doing work.
    is_returning: Option<Value>,
}

impl<'a, W: Write> Evaluator<'a, W> {
    pub fn new(output: &'a mut W, ctx: Rc<Context>) -> Evaluator<'a, W> {
        let globals = Env::new();
        globals.add_builtin(&ctx.symbol("clock"), 0, builtin_clock);
        globals.add_builtin(&ctx.symbol("sqrt"), 1, builtin_sqrt);
        Evaluator {
            output,
            globals,
            is_returning: None,
        }
    }

    /// Execute statements in order against the global frame.
    pub fn interpret(&mut self, stmts: &[Stmt]) -> Result<(), FullRuntimeError> {
        let result = self.eval_stmts(stmts, self.globals.clone());
        // A stray top-level `return` must not leak into the next call.
        self.is_returning = None;
        result
    }

    fn eval_stmts(&mut self, stmts: &[Stmt], env: Rc<Env>) -> Result<(), FullRuntimeError> {
        for stmt in stmts {
            self.eval_stmt(stmt, env.clone())?
        }
        Ok(())
    }

    fn eval_stmt(&mut self, stmt: &Stmt, env: Rc<Env>) -> Result<(), FullRuntimeError> {
        if self.is_returning.is_some() {
            return Ok(());
        }

        match stmt {
            Stmt::Nop => (),
            Stmt::Expr(e) => {
                self.eval_expr(e, env)?;
            }
            Stmt::Print(pos, e) => {
                let v = self.eval_expr(e, env)?;
                writeln!(self.output, "{}", v).map_err(|e| FullRuntimeError {
                    pos: *pos,
                    error: RuntimeError::Io(e),
                })?;
            }
            Stmt::VarDecl(sym, init) => {
                let val = self.eval_expr(init, env.clone())?;
                env.define(sym, val);
            }
            Stmt::FunDecl(name, params, body) => {
                env.define(
                    name,
                    Value::Function(Function {
                        name: name.clone(),
                        arity: params.len(),
                        body: FunctionBody::User(params.clone(), body.clone(), env.clone()),
                    }),
                );
            }
            Stmt::Block(stmts) => {
                // The frame lives only for this call; dropping the Rc on
                // exit (normal, error or return) is the scope restoration.
                self.eval_stmts(stmts, Env::with_parent(Some(env)))?;
            }
            Stmt::If(cond, then_branch, else_branch) => {
                if self.eval_expr(cond, env.clone())?.is_truthy() {
                    self.eval_stmt(then_branch, env)?;
                } else {
                    self.eval_stmt(else_branch, env)?;
                }
            }
            Stmt::While(cond, body) => {
                while self.eval_expr(cond, env.clone())?.is_truthy() {
                    self.eval_stmt(body, env.clone())?;
                    if self.is_returning.is_some() {
                        break;
                    }
                }
            }
            Stmt::Return(e) => {
                debug_assert!(self.is_returning.is_none());
                self.is_returning = Some(self.eval_expr(e, env)?);
            }
        };
        Ok(())
    }

    fn eval_expr(&mut self, expr: &Expr, env: Rc<Env>) -> Result<Value, FullRuntimeError> {
        match expr {
            Expr::Nil => Ok(Value::Nil),
            Expr::Number(n) => Ok(Value::Number(*n)),
            Expr::Str(s) => Ok(Value::Str(s.clone())),
            Expr::Bool(b) => Ok(Value::Bool(*b)),
            Expr::Group(e) => self.eval_expr(e, env),
            Expr::Var(pos, sym) => match env.get(sym) {
                Some(val) => Ok(val),
                None => Err(FullRuntimeError {
                    pos: *pos,
                    error: RuntimeError::UndefinedVariable(sym.name().to_owned()),
                }),
            },
            Expr::Unary(pos, op, e) => {
                let v = self.eval_expr(e, env)?;
                match op {
                    UnaryOp::Not => Ok(Value::Bool(!v.is_truthy())),
                    UnaryOp::Neg => {
                        if let Value::Number(n) = v {
                            Ok(Value::Number(-n))
                        } else {
                            Err(FullRuntimeError {
                                pos: *pos,
                                error: RuntimeError::NumberOperand,
                            })
                        }
                    }
                }
            }
            Expr::Binary(pos, op, lhs, rhs) => {
                let l = self.eval_expr(lhs, env.clone())?;
                let r = self.eval_expr(rhs, env)?;
                eval_binary(*pos, *op, l, r)
            }
            Expr::Logical(op, lhs, rhs) => {
                let l = self.eval_expr(lhs, env.clone())?;
                // The deciding operand comes back unconverted.
                match op {
                    LogicalOp::Or if l.is_truthy() => Ok(l),
                    LogicalOp::And if !l.is_truthy() => Ok(l),
                    _ => self.eval_expr(rhs, env),
                }
            }
            Expr::Assign(pos, sym, rhs) => {
                let val = self.eval_expr(rhs, env.clone())?;
                if env.assign(sym, val.clone()) {
                    Ok(val)
                } else {
                    Err(FullRuntimeError {
                        pos: *pos,
                        error: RuntimeError::UndefinedVariable(sym.name().to_owned()),
                    })
                }
            }
            Expr::Call(pos, callee, args) => {
                let callee = self.eval_expr(callee, env.clone())?;
                let f = match callee {
                    Value::Function(f) => f,
                    _ => {
                        return Err(FullRuntimeError {
                            pos: *pos,
                            error: RuntimeError::NotCallable,
                        });
                    }
                };
                let args = args
                    .iter()
                    .map(|a| self.eval_expr(a, env.clone()))
                    .collect::<Result<Vec<Value>, FullRuntimeError>>()?;
                if args.len() != f.arity {
                    return Err(FullRuntimeError {
                        pos: *pos,
                        error: RuntimeError::BadNumberOfArguments {
                            expected: f.arity,
                            got: args.len(),
                        },
                    });
                }
                self.call_function(*pos, &f, args)
            }
        }
    }

    fn call_function(
        &mut self,
        pos: Position,
        f: &Function,
        args: Vec<Value>,
    ) -> Result<Value, FullRuntimeError> {
        match &f.body {
            FunctionBody::Builtin(pfn) => {
                pfn(&args).map_err(|error| FullRuntimeError { pos, error })
            }
            FunctionBody::User(params, body, closure) => {
                let frame = Env::with_parent(Some(closure.clone()));
                for (p, v) in params.iter().zip(args) {
                    frame.define(p, v);
                }
                self.eval_stmt(body, frame)?;
                // Falling off the end of a body yields nil.
                Ok(self.is_returning.take().unwrap_or(Value::Nil))
            }
        }
    }
}

fn eval_binary(pos: Position, op: BinOp, l: Value, r: Value) -> Result<Value, FullRuntimeError> {
    match op {
        BinOp::Equal => Ok(Value::Bool(l.equals(&r))),
        BinOp::NotEqual => Ok(Value::Bool(!l.equals(&r))),
        BinOp::Add => match (l, r) {
            (Value::Number(l), Value::Number(r)) => Ok(Value::Number(l + r)),
            (Value::Str(l), Value::Str(r)) => Ok(Value::Str(l + &r)),
            _ => Err(FullRuntimeError {
                pos,
                error: RuntimeError::AddOperands,
            }),
        },
        BinOp::Sub => {
            let (l, r) = number_operands(pos, l, r)?;
            Ok(Value::Number(l - r))
        }
        BinOp::Mul => {
            let (l, r) = number_operands(pos, l, r)?;
            Ok(Value::Number(l * r))
        }
        BinOp::Div => {
            // IEEE-754 semantics: dividing by zero yields an infinity.
            let (l, r) = number_operands(pos, l, r)?;
            Ok(Value::Number(l / r))
        }
        BinOp::Less => {
            let (l, r) = number_operands(pos, l, r)?;
            Ok(Value::Bool(l < r))
        }
        BinOp::LessEqual => {
            let (l, r) = number_operands(pos, l, r)?;
            Ok(Value::Bool(l <= r))
        }
        BinOp::Greater => {
            let (l, r) = number_operands(pos, l, r)?;
            Ok(Value::Bool(l > r))
        }
        BinOp::GreaterEqual => {
            let (l, r) = number_operands(pos, l, r)?;
            Ok(Value::Bool(l >= r))
        }
    }
}

fn number_operands(pos: Position, l: Value, r: Value) -> Result<(f64, f64), FullRuntimeError> {
    if let (Value::Number(l), Value::Number(r)) = (l, r) {
        Ok((l, r))
    } else {
        Err(FullRuntimeError {
            pos,
            error: RuntimeError::NumberOperands,
        })
    }
}

fn builtin_clock(_args: &[Value]) -> Result<Value, RuntimeError> {
    Ok(Value::Number(
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("error when getting current time")
            .as_secs_f64(),
    ))
}

fn builtin_sqrt(args: &[Value]) -> Result<Value, RuntimeError> {
    if let Value::Number(n) = args[0] {
        Ok(Value::Number(n.sqrt()))
    } else {
        Err(RuntimeError::NumberOperand)
    }
}

/// A scope frame: bindings plus the enclosing frame.  Chains are acyclic
/// and end at the globals.  Frames are shared (`Rc`) because a closure may
/// keep its defining frame alive past the block that created it.
#[derive(Debug)]
struct Env {
    parent: Option<Rc<Env>>,
    bindings: RefCell<HashMap<Symbol, Value>>,
}

impl Env {
    fn new() -> Rc<Env> {
        Self::with_parent(None)
    }

    fn with_parent(parent: Option<Rc<Env>>) -> Rc<Env> {
        Rc::new(Env {
            parent,
            bindings: RefCell::new(HashMap::new()),
        })
    }

    /// Install `val` in this frame.  Redeclaring a name overwrites it.
    fn define(&self, sym: &Symbol, val: Value) {
        self.bindings.borrow_mut().insert(sym.clone(), val);
    }

    /// Overwrite the innermost existing binding of `sym`.  Returns false
    /// when the name is nowhere on the chain.
    fn assign(&self, sym: &Symbol, val: Value) -> bool {
        if let Entry::Occupied(mut entry) = self.bindings.borrow_mut().entry(sym.clone()) {
            entry.insert(val);
            true
        } else if let Some(parent) = self.parent.as_ref() {
            parent.assign(sym, val)
        } else {
            false
        }
    }

    fn get(&self, sym: &Symbol) -> Option<Value> {
        match self.bindings.borrow().get(sym) {
            Some(v) => Some(v.clone()),
            None => self.parent.as_ref().and_then(|p| p.get(sym)),
        }
    }

    fn add_builtin(
        &self,
        name: &Symbol,
        arity: usize,
        body: fn(&[Value]) -> Result<Value, RuntimeError>,
    ) {
        self.define(
            name,
            Value::Function(Function {
                name: name.clone(),
                arity,
                body: FunctionBody::Builtin(body),
            }),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval_expr(expr: &Expr) -> Result<Value, FullRuntimeError> {
        let mut out: Vec<u8> = Vec::new();
        let ctx = Context::new();
        let mut evaluator = Evaluator::new(&mut out, ctx);
        let globals = evaluator.globals.clone();
        let val = evaluator.eval_expr(expr, globals)?;
        assert!(out.is_empty());
        Ok(val)
    }

    fn eval_prg(prg: &[Stmt]) -> Result<String, FullRuntimeError> {
        let ctx = Context::new();
        eval_prg_with_ctx(ctx, prg)
    }

    fn eval_prg_with_ctx(ctx: Rc<Context>, prg: &[Stmt]) -> Result<String, FullRuntimeError> {
        let mut out: Vec<u8> = Vec::new();
        let mut e = Evaluator::new(&mut out, ctx.clone());
        e.globals
            .add_builtin(&ctx.symbol("__test_ultimate_answer__"), 0, |_| {
                Ok(Value::Number(42.0))
            });
        e.globals
            .add_builtin(&ctx.symbol("__test_min__"), 2, |args| {
                match (&args[0], &args[1]) {
                    (Value::Number(l), Value::Number(r)) => {
                        Ok(Value::Number(if *l <= *r { *l } else { *r }))
                    }
                    _ => Err(RuntimeError::NumberOperands),
                }
            });
        e.interpret(prg)?;
        Ok(String::from_utf8(out).expect("error while converting output"))
    }

    fn num(n: f64) -> Box<Expr> {
        Box::new(Expr::Number(n))
    }

    fn string(s: &str) -> Box<Expr> {
        Box::new(Expr::Str(s.to_string()))
    }

    #[test]
    fn literals() -> Result<(), FullRuntimeError> {
        assert_eq!(eval_expr(&Expr::Number(1.0))?, Value::Number(1.0));
        assert_eq!(eval_expr(&Expr::Nil)?, Value::Nil);
        assert_eq!(eval_expr(&Expr::Bool(true))?, Value::Bool(true));
        assert_eq!(
            eval_expr(&Expr::Str("foo".to_string()))?,
            Value::Str("foo".to_string())
        );
        Ok(())
    }

    #[test]
    fn unary_minus() -> Result<(), FullRuntimeError> {
        assert_eq!(
            eval_expr(&Expr::Unary(1, UnaryOp::Neg, num(1.0)))?,
            Value::Number(-1.0)
        );
        Ok(())
    }

    #[test]
    fn unary_minus_on_bool() {
        match eval_expr(&Expr::Unary(3, UnaryOp::Neg, Box::new(Expr::Bool(true)))) {
            Err(FullRuntimeError {
                pos: 3,
                error: RuntimeError::NumberOperand,
            }) => (),
            out => panic!("unexpected output: {:?}", out),
        }
    }

    #[test]
    fn logical_not_uses_truthiness() -> Result<(), FullRuntimeError> {
        assert_eq!(
            eval_expr(&Expr::Unary(1, UnaryOp::Not, Box::new(Expr::Bool(true))))?,
            Value::Bool(false)
        );
        assert_eq!(
            eval_expr(&Expr::Unary(1, UnaryOp::Not, Box::new(Expr::Nil)))?,
            Value::Bool(true)
        );
        // 0 and "" are truthy.
        assert_eq!(
            eval_expr(&Expr::Unary(1, UnaryOp::Not, num(0.0)))?,
            Value::Bool(false)
        );
        assert_eq!(
            eval_expr(&Expr::Unary(1, UnaryOp::Not, string("")))?,
            Value::Bool(false)
        );
        Ok(())
    }

    #[test]
    fn arithmetic() -> Result<(), FullRuntimeError> {
        assert_eq!(
            eval_expr(&Expr::Binary(1, BinOp::Sub, num(1.0), num(3.0)))?,
            Value::Number(-2.0)
        );
        assert_eq!(
            eval_expr(&Expr::Binary(1, BinOp::Div, num(6.0), num(2.0)))?,
            Value::Number(3.0)
        );
        assert_eq!(
            eval_expr(&Expr::Binary(
                1,
                BinOp::Add,
                num(1.0),
                Box::new(Expr::Binary(1, BinOp::Mul, num(2.0), num(3.0)))
            ))?,
            Value::Number(7.0)
        );
        Ok(())
    }

    #[test]
    fn division_by_zero_is_infinite() -> Result<(), FullRuntimeError> {
        assert_eq!(
            eval_expr(&Expr::Binary(1, BinOp::Div, num(6.0), num(0.0)))?,
            Value::Number(f64::INFINITY)
        );
        Ok(())
    }

    #[test]
    fn string_concatenation() -> Result<(), FullRuntimeError> {
        assert_eq!(
            eval_expr(&Expr::Binary(1, BinOp::Add, string("foo"), string("bar")))?,
            Value::Str("foobar".to_string())
        );
        Ok(())
    }

    #[test]
    fn adding_number_and_string_fails() {
        match eval_expr(&Expr::Binary(2, BinOp::Add, num(1.0), string("x"))) {
            Err(FullRuntimeError {
                pos: 2,
                error: RuntimeError::AddOperands,
            }) => (),
            out => panic!("unexpected output: {:?}", out),
        }
    }

    #[test]
    fn arithmetic_on_non_numbers_fails() {
        match eval_expr(&Expr::Binary(1, BinOp::Mul, string("a"), num(2.0))) {
            Err(FullRuntimeError {
                error: RuntimeError::NumberOperands,
                ..
            }) => (),
            out => panic!("unexpected output: {:?}", out),
        }
    }

    #[test]
    fn comparisons() -> Result<(), FullRuntimeError> {
        assert_eq!(
            eval_expr(&Expr::Binary(1, BinOp::Less, num(1.0), num(2.0)))?,
            Value::Bool(true)
        );
        assert_eq!(
            eval_expr(&Expr::Binary(1, BinOp::LessEqual, num(2.0), num(2.0)))?,
            Value::Bool(true)
        );
        assert_eq!(
            eval_expr(&Expr::Binary(1, BinOp::Greater, num(3.0), num(2.0)))?,
            Value::Bool(true)
        );
        assert_eq!(
            eval_expr(&Expr::Binary(1, BinOp::GreaterEqual, num(1.0), num(2.0)))?,
            Value::Bool(false)
        );
        Ok(())
    }

    #[test]
    fn comparing_strings_fails() {
        match eval_expr(&Expr::Binary(1, BinOp::Less, string("a"), string("b"))) {
            Err(FullRuntimeError {
                error: RuntimeError::NumberOperands,
                ..
            }) => (),
            out => panic!("unexpected output: {:?}", out),
        }
    }

    #[test]
    fn equality() -> Result<(), FullRuntimeError> {
        assert_eq!(
            eval_expr(&Expr::Binary(1, BinOp::Equal, Box::new(Expr::Nil), Box::new(Expr::Nil)))?,
            Value::Bool(true)
        );
        assert_eq!(
            eval_expr(&Expr::Binary(
                1,
                BinOp::Equal,
                Box::new(Expr::Nil),
                Box::new(Expr::Bool(false))
            ))?,
            Value::Bool(false)
        );
        assert_eq!(
            eval_expr(&Expr::Binary(1, BinOp::Equal, num(2.0), num(2.0)))?,
            Value::Bool(true)
        );
        assert_eq!(
            eval_expr(&Expr::Binary(1, BinOp::Equal, num(1.0), string("1")))?,
            Value::Bool(false)
        );
        assert_eq!(
            eval_expr(&Expr::Binary(1, BinOp::NotEqual, num(6.0), num(2.0)))?,
            Value::Bool(true)
        );
        assert_eq!(
            eval_expr(&Expr::Binary(1, BinOp::Equal, string("a"), string("a")))?,
            Value::Bool(true)
        );
        Ok(())
    }

    #[test]
    fn logical_operators_yield_the_deciding_operand() -> Result<(), FullRuntimeError> {
        assert_eq!(
            eval_expr(&Expr::Logical(LogicalOp::Or, Box::new(Expr::Nil), string("x")))?,
            Value::Str("x".to_string())
        );
        assert_eq!(
            eval_expr(&Expr::Logical(LogicalOp::Or, num(1.0), string("x")))?,
            Value::Number(1.0)
        );
        assert_eq!(
            eval_expr(&Expr::Logical(
                LogicalOp::And,
                Box::new(Expr::Bool(false)),
                num(1.0)
            ))?,
            Value::Bool(false)
        );
        assert_eq!(
            eval_expr(&Expr::Logical(LogicalOp::And, num(1.0), num(2.0)))?,
            Value::Number(2.0)
        );
        Ok(())
    }

    #[test]
    fn short_circuit_skips_the_right_operand() -> Result<(), FullRuntimeError> {
        // The right operand references an undefined variable; it must not
        // be evaluated when the left operand decides.
        let ctx = Context::new();
        let boom = Box::new(Expr::Var(1, ctx.symbol("no_such_var")));
        let mut out: Vec<u8> = Vec::new();
        let mut evaluator = Evaluator::new(&mut out, ctx);
        let globals = evaluator.globals.clone();
        assert_eq!(
            evaluator.eval_expr(
                &Expr::Logical(LogicalOp::Or, Box::new(Expr::Bool(true)), boom.clone()),
                globals.clone()
            )?,
            Value::Bool(true)
        );
        assert_eq!(
            evaluator.eval_expr(
                &Expr::Logical(LogicalOp::And, Box::new(Expr::Bool(false)), boom),
                globals
            )?,
            Value::Bool(false)
        );
        Ok(())
    }

    #[test]
    fn print_stmt() -> Result<(), FullRuntimeError> {
        assert_eq!(eval_prg(&[Stmt::Print(1, num(42.0))])?, "42\n");
        Ok(())
    }

    #[test]
    fn integer_valued_numbers_print_without_fraction() -> Result<(), FullRuntimeError> {
        assert_eq!(
            eval_prg(&[
                Stmt::Print(1, num(3.0)),
                Stmt::Print(1, num(2.5)),
                Stmt::Print(1, Box::new(Expr::Binary(1, BinOp::Div, num(5.0), num(2.0)))),
            ])?,
            "3\n2.5\n2.5\n"
        );
        Ok(())
    }

    #[test]
    fn set_and_get_var() -> Result<(), FullRuntimeError> {
        let ctx = Context::new();
        assert_eq!(
            eval_prg_with_ctx(
                ctx.clone(),
                &[
                    Stmt::VarDecl(ctx.symbol("foo"), num(42.0)),
                    Stmt::Print(1, Box::new(Expr::Var(1, ctx.symbol("foo"))))
                ]
            )?,
            "42\n"
        );
        Ok(())
    }

    #[test]
    fn redeclaring_a_var_overwrites() -> Result<(), FullRuntimeError> {
        let ctx = Context::new();
        let foo = ctx.symbol("foo");
        assert_eq!(
            eval_prg_with_ctx(
                ctx,
                &[
                    Stmt::VarDecl(foo.clone(), num(42.0)),
                    Stmt::VarDecl(foo.clone(), num(24.0)),
                    Stmt::Print(1, Box::new(Expr::Var(1, foo))),
                ]
            )?,
            "24\n"
        );
        Ok(())
    }

    #[test]
    fn assignment_yields_the_assigned_value() -> Result<(), FullRuntimeError> {
        let ctx = Context::new();
        let foo = ctx.symbol("foo");
        assert_eq!(
            eval_prg_with_ctx(
                ctx,
                &[
                    Stmt::VarDecl(foo.clone(), Box::new(Expr::Nil)),
                    Stmt::Print(1, Box::new(Expr::Assign(1, foo, num(3.0)))),
                ]
            )?,
            "3\n"
        );
        Ok(())
    }

    #[test]
    fn assigning_an_unknown_var_fails() {
        let ctx = Context::new();
        let foo = ctx.symbol("foo");
        match eval_prg_with_ctx(
            ctx,
            &[Stmt::Expr(Box::new(Expr::Assign(2, foo.clone(), num(42.0))))],
        ) {
            Err(FullRuntimeError {
                pos: 2,
                error: RuntimeError::UndefinedVariable(name),
            }) if name == foo.name() => (),
            out => panic!("unexpected output: {:?}", out),
        }
    }

    #[test]
    fn reading_an_unknown_var_fails() {
        let ctx = Context::new();
        match eval_prg_with_ctx(
            ctx.clone(),
            &[Stmt::Print(1, Box::new(Expr::Var(7, ctx.symbol("ghost"))))],
        ) {
            Err(FullRuntimeError {
                pos: 7,
                error: RuntimeError::UndefinedVariable(name),
            }) if name == "ghost" => (),
            out => panic!("unexpected output: {:?}", out),
        }
    }

    #[test]
    fn call_builtin_function_without_arg() -> Result<(), FullRuntimeError> {
        let ctx = Context::new();
        let sym = ctx.symbol("__test_ultimate_answer__");
        assert_eq!(
            eval_prg_with_ctx(
                ctx,
                &[Stmt::Print(
                    1,
                    Box::new(Expr::Call(1, Box::new(Expr::Var(1, sym)), vec![]))
                )],
            )?,
            "42\n"
        );
        Ok(())
    }

    #[test]
    fn call_function_with_bad_number_of_arguments() {
        let ctx = Context::new();
        let sym = ctx.symbol("__test_ultimate_answer__");
        match eval_prg_with_ctx(
            ctx,
            &[Stmt::Print(
                1,
                Box::new(Expr::Call(
                    4,
                    Box::new(Expr::Var(1, sym)),
                    vec![Expr::Bool(true)],
                )),
            )],
        ) {
            Err(FullRuntimeError {
                pos: 4,
                error: RuntimeError::BadNumberOfArguments {
                    expected: 0,
                    got: 1,
                },
            }) => (),
            out => panic!("unexpected output: {:?}", out),
        }
    }

    #[test]
    fn calling_a_non_function_fails() {
        match eval_expr(&Expr::Call(5, num(1.0), vec![])) {
            Err(FullRuntimeError {
                pos: 5,
                error: RuntimeError::NotCallable,
            }) => (),
            out => panic!("unexpected output: {:?}", out),
        }
    }

    #[test]
    fn call_builtin_sqrt() -> Result<(), FullRuntimeError> {
        let ctx = Context::new();
        assert_eq!(
            eval_prg_with_ctx(
                ctx.clone(),
                &[Stmt::Print(
                    1,
                    Box::new(Expr::Call(
                        1,
                        Box::new(Expr::Var(1, ctx.symbol("sqrt"))),
                        vec![Expr::Number(4.0)]
                    ))
                )],
            )?,
            "2\n"
        );
        Ok(())
    }

    #[test]
    fn call_builtin_function_with_several_args() -> Result<(), FullRuntimeError> {
        let ctx = Context::new();
        let min = ctx.symbol("__test_min__");
        assert_eq!(
            eval_prg_with_ctx(
                ctx,
                &[Stmt::Print(
                    1,
                    Box::new(Expr::Call(
                        1,
                        Box::new(Expr::Var(1, min)),
                        vec![Expr::Number(2.0), Expr::Number(1.0)]
                    ))
                )],
            )?,
            "1\n"
        );
        Ok(())
    }

    #[test]
    fn clock_returns_a_number() -> Result<(), FullRuntimeError> {
        let ctx = Context::new();
        let mut out: Vec<u8> = Vec::new();
        let mut evaluator = Evaluator::new(&mut out, ctx.clone());
        let globals = evaluator.globals.clone();
        match evaluator.eval_expr(
            &Expr::Call(1, Box::new(Expr::Var(1, ctx.symbol("clock"))), vec![]),
            globals,
        )? {
            Value::Number(n) => assert!(n > 0.0),
            v => panic!("unexpected value: {:?}", v),
        }
        Ok(())
    }

    #[test]
    fn runtime_error_display_format() {
        let e = FullRuntimeError {
            pos: 3,
            error: RuntimeError::AddOperands,
        };
        assert_eq!(
            e.to_string(),
            "Operands must be two numbers or two strings.\n[line 3]"
        );
    }
}
