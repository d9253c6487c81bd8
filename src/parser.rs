//! Recursive-descent parser with panic-mode recovery.

use std::rc::Rc;

use crate::ast::{BinOp, Expr, LogicalOp, Stmt, UnaryOp};
use crate::ctx::{Context, Symbol};
use crate::diag::{At, Diag, FullParseError, ParseError, Position};
use crate::scanner::Scanner;
use crate::token::Token;

/// Calls and function declarations accept at most this many arguments.
const MAX_CALL_ARGS: usize = 255;

/// Parses a token stream pulled from an owned [`Scanner`].
///
/// Syntax errors go to the shared [`Diag`] sink; after each one the parser
/// resynchronizes at the next statement boundary so a single run reports
/// as many errors as possible.
#[derive(Debug)]
pub struct Parser<'s> {
    scanner: Scanner<'s>,
    current_token: Token,
    current_pos: Position,
    diag: Rc<Diag>,
}

impl<'s> Parser<'s> {
    pub fn new(source: &'s str, ctx: Rc<Context>, diag: Rc<Diag>) -> Parser<'s> {
        let mut scanner = Scanner::new(source, ctx, diag.clone());
        let (current_pos, current_token) = scanner.get_token();
        Parser {
            scanner,
            current_token,
            current_pos,
            diag,
        }
    }

    /// Parse a whole program.  The returned list covers everything that did
    /// parse; whether it is trustworthy is the sink's `had_error` call.
    pub fn parse_program(&mut self) -> Vec<Stmt> {
        let mut prg = vec![];
        while self.current_token != Token::Eof {
            match self.declaration() {
                Ok(stmt) => prg.push(stmt),
                Err(e) => {
                    self.diag.report(e);
                    self.synchronize();
                }
            }
        }
        prg
    }

    #[allow(dead_code)]
    fn parse_expression(&mut self) -> Result<Expr, FullParseError> {
        self.expression()
    }

    fn declaration(&mut self) -> Result<Stmt, FullParseError> {
        match self.current_token {
            Token::Var => self.var_decl(),
            Token::Fun => self.fun_decl(),
            _ => self.statement(),
        }
    }

    /// Parse variable declaration.
    /// Current token is Token::Var.
    fn var_decl(&mut self) -> Result<Stmt, FullParseError> {
        self.advance();
        let name = self.identifier("variable name")?;
        let init = match self.current_token {
            Token::Equal => {
                self.advance();
                self.expression()?
            }
            _ => Expr::Nil,
        };
        self.consume(Token::Semicolon, "';' after variable declaration")?;
        Ok(Stmt::VarDecl(name, Box::new(init)))
    }

    /// Current token is Token::Fun.
    fn fun_decl(&mut self) -> Result<Stmt, FullParseError> {
        self.advance();
        let name = self.identifier("function name")?;
        self.consume(Token::LeftParen, "'(' after function name")?;
        let mut params = vec![];
        if Token::RightParen != self.current_token {
            loop {
                if params.len() >= MAX_CALL_ARGS {
                    self.diag
                        .report(self.error_at_current(ParseError::TooManyParameters));
                }
                params.push(self.identifier("parameter name")?);
                if Token::Comma != self.current_token {
                    break;
                }
                self.advance();
            }
        }
        self.consume(Token::RightParen, "')' after parameters")?;
        if self.current_token != Token::LeftCurly {
            return Err(self.error_at_current(ParseError::Expected("'{' before function body")));
        }
        let body = self.block()?;
        Ok(Stmt::FunDecl(name, params, Rc::new(body)))
    }

    fn identifier(&mut self, what: &'static str) -> Result<Symbol, FullParseError> {
        if let Token::Identifier(id) = self.current_token.clone() {
            self.advance();
            Ok(id)
        } else {
            Err(self.error_at_current(ParseError::Expected(what)))
        }
    }

    fn statement(&mut self) -> Result<Stmt, FullParseError> {
        match self.current_token {
            Token::Print => {
                let pos = self.current_pos;
                self.advance();
                let expr = Box::new(self.expression()?);
                self.consume(Token::Semicolon, "';' after value")?;
                Ok(Stmt::Print(pos, expr))
            }
            Token::LeftCurly => self.block(),
            Token::If => {
                self.advance();
                self.consume(Token::LeftParen, "'(' after 'if'")?;
                let cond = Box::new(self.expression()?);
                self.consume(Token::RightParen, "')' after if condition")?;
                let then_branch = Box::new(self.statement()?);
                let else_branch = if let Token::Else = self.current_token {
                    self.advance();
                    Box::new(self.statement()?)
                } else {
                    Box::new(Stmt::Nop)
                };
                Ok(Stmt::If(cond, then_branch, else_branch))
            }
            Token::While => {
                self.advance();
                self.consume(Token::LeftParen, "'(' after 'while'")?;
                let cond = Box::new(self.expression()?);
                self.consume(Token::RightParen, "')' after condition")?;
                let body = Box::new(self.statement()?);
                Ok(Stmt::While(cond, body))
            }
            Token::For => self.for_stmt(),
            Token::Semicolon => {
                self.advance();
                Ok(Stmt::Nop)
            }
            Token::Return => {
                self.advance();
                let ret_expr = if self.current_token == Token::Semicolon {
                    Expr::Nil
                } else {
                    self.expression()?
                };
                self.consume(Token::Semicolon, "';' after return value")?;
                Ok(Stmt::Return(Box::new(ret_expr)))
            }
            _ => {
                let expr = Box::new(self.expression()?);
                self.consume(Token::Semicolon, "';' after expression")?;
                Ok(Stmt::Expr(expr))
            }
        }
    }

    /// Current token is Token::For.
    ///
    /// There is no `for` node in the AST; the clauses desugar to a `while`
    /// loop, wrapped in a block when the initializer introduces a variable.
    fn for_stmt(&mut self) -> Result<Stmt, FullParseError> {
        self.advance();
        self.consume(Token::LeftParen, "'(' after 'for'")?;

        let init = match self.current_token {
            Token::Semicolon => {
                self.advance();
                None
            }
            Token::Var => Some(self.var_decl()?),
            _ => {
                let expr = Box::new(self.expression()?);
                self.consume(Token::Semicolon, "';' after loop initializer")?;
                Some(Stmt::Expr(expr))
            }
        };

        let cond = if self.current_token == Token::Semicolon {
            Expr::Bool(true)
        } else {
            self.expression()?
        };
        self.consume(Token::Semicolon, "';' after loop condition")?;

        let incr = if self.current_token == Token::RightParen {
            None
        } else {
            Some(self.expression()?)
        };
        self.consume(Token::RightParen, "')' after for clauses")?;

        let mut body = self.statement()?;
        if let Some(incr) = incr {
            body = Stmt::Block(vec![body, Stmt::Expr(Box::new(incr))]);
        }
        let mut stmt = Stmt::While(Box::new(cond), Box::new(body));
        if let Some(init) = init {
            stmt = Stmt::Block(vec![init, stmt]);
        }
        Ok(stmt)
    }

    fn block(&mut self) -> Result<Stmt, FullParseError> {
        self.consume(Token::LeftCurly, "'{' before block")?;
        let mut stmts = vec![];
        loop {
            match self.current_token {
                Token::RightCurly => {
                    self.advance();
                    break;
                }
                Token::Eof => {
                    return Err(self.error_at_current(ParseError::Expected("'}' after block")));
                }
                _ => stmts.push(self.declaration()?),
            }
        }
        Ok(Stmt::Block(stmts))
    }

    fn expression(&mut self) -> Result<Expr, FullParseError> {
        self.assignment()
    }

    fn assignment(&mut self) -> Result<Expr, FullParseError> {
        let lhs = self.logic_or()?;
        if Token::Equal == self.current_token {
            let equals = self.error_at_current(ParseError::InvalidAssignmentTarget);
            self.advance();
            let rhs = self.assignment()?;
            if let Expr::Var(pos, sym) = lhs {
                Ok(Expr::Assign(pos, sym, Box::new(rhs)))
            } else {
                // Report at the '=' but keep the expression that did parse;
                // nothing is gained by abandoning the statement.
                self.diag.report(equals);
                Ok(lhs)
            }
        } else {
            Ok(lhs)
        }
    }

    fn logic_or(&mut self) -> Result<Expr, FullParseError> {
        let mut expr = self.logic_and()?;
        while Token::Or == self.current_token {
            self.advance();
            expr = Expr::Logical(LogicalOp::Or, Box::new(expr), Box::new(self.logic_and()?));
        }
        Ok(expr)
    }

    fn logic_and(&mut self) -> Result<Expr, FullParseError> {
        let mut expr = self.equality()?;
        while Token::And == self.current_token {
            self.advance();
            expr = Expr::Logical(LogicalOp::And, Box::new(expr), Box::new(self.equality()?));
        }
        Ok(expr)
    }

    fn equality(&mut self) -> Result<Expr, FullParseError> {
        let mut expr = self.comparison()?;
        loop {
            let op = match self.current_token {
                Token::EqualEqual => BinOp::Equal,
                Token::BangEqual => BinOp::NotEqual,
                _ => break,
            };
            let pos = self.current_pos;
            self.advance();
            expr = Expr::Binary(pos, op, Box::new(expr), Box::new(self.comparison()?));
        }
        Ok(expr)
    }

    fn comparison(&mut self) -> Result<Expr, FullParseError> {
        let mut expr = self.term()?;
        loop {
            let op = match self.current_token {
                Token::Less => BinOp::Less,
                Token::LessEqual => BinOp::LessEqual,
                Token::Greater => BinOp::Greater,
                Token::GreaterEqual => BinOp::GreaterEqual,
                _ => break,
            };
            let pos = self.current_pos;
            self.advance();
            expr = Expr::Binary(pos, op, Box::new(expr), Box::new(self.term()?));
        }
        Ok(expr)
    }

    fn term(&mut self) -> Result<Expr, FullParseError> {
        let mut expr = self.factor()?;
        loop {
            let op = match self.current_token {
                Token::Plus => BinOp::Add,
                Token::Minus => BinOp::Sub,
                _ => break,
            };
            let pos = self.current_pos;
            self.advance();
            expr = Expr::Binary(pos, op, Box::new(expr), Box::new(self.factor()?));
        }
        Ok(expr)
    }

    fn factor(&mut self) -> Result<Expr, FullParseError> {
        let mut expr = self.unary()?;
        loop {
            let op = match self.current_token {
                Token::Star => BinOp::Mul,
                Token::Slash => BinOp::Div,
                _ => break,
            };
            let pos = self.current_pos;
            self.advance();
            expr = Expr::Binary(pos, op, Box::new(expr), Box::new(self.unary()?));
        }
        Ok(expr)
    }

    fn unary(&mut self) -> Result<Expr, FullParseError> {
        let op = match self.current_token {
            Token::Minus => UnaryOp::Neg,
            Token::Bang => UnaryOp::Not,
            _ => return self.call(),
        };
        let pos = self.current_pos;
        self.advance();
        Ok(Expr::Unary(pos, op, Box::new(self.unary()?)))
    }

    fn call(&mut self) -> Result<Expr, FullParseError> {
        let mut expr = self.primary()?;
        // Calls chain: `f(1)(2)` calls whatever `f(1)` returned.
        while let Token::LeftParen = self.current_token {
            self.advance();
            let mut args = vec![];
            if Token::RightParen != self.current_token {
                loop {
                    if args.len() >= MAX_CALL_ARGS {
                        self.diag
                            .report(self.error_at_current(ParseError::TooManyArguments));
                    }
                    args.push(self.expression()?);
                    if Token::Comma != self.current_token {
                        break;
                    }
                    self.advance();
                }
            }
            // The closing parenthesis locates runtime call errors.
            let paren_pos = self.current_pos;
            self.consume(Token::RightParen, "')' after arguments")?;
            expr = Expr::Call(paren_pos, Box::new(expr), args);
        }
        Ok(expr)
    }

    fn primary(&mut self) -> Result<Expr, FullParseError> {
        match self.current_token.clone() {
            Token::Identifier(sym) => {
                let expr = Expr::Var(self.current_pos, sym);
                self.advance();
                Ok(expr)
            }
            Token::Nil => {
                self.advance();
                Ok(Expr::Nil)
            }
            Token::Number(n) => {
                self.advance();
                Ok(Expr::Number(n))
            }
            Token::Str(s) => {
                self.advance();
                Ok(Expr::Str(s))
            }
            Token::True => {
                self.advance();
                Ok(Expr::Bool(true))
            }
            Token::False => {
                self.advance();
                Ok(Expr::Bool(false))
            }
            Token::LeftParen => {
                self.advance();
                let expr = self.expression()?;
                self.consume(Token::RightParen, "')' after expression")?;
                Ok(Expr::Group(Box::new(expr)))
            }
            _ => Err(self.error_at_current(ParseError::ExpectedExpression)),
        }
    }

    fn advance(&mut self) {
        let (pos, token) = self.scanner.get_token();
        self.current_token = token;
        self.current_pos = pos;
    }

    fn consume(&mut self, expected: Token, what: &'static str) -> Result<(), FullParseError> {
        if self.current_token == expected {
            self.advance();
            Ok(())
        } else {
            Err(self.error_at_current(ParseError::Expected(what)))
        }
    }

    fn error_at_current(&self, error: ParseError) -> FullParseError {
        let at = if self.current_token == Token::Eof {
            At::End
        } else {
            At::Token(self.current_token.lexeme())
        };
        FullParseError {
            pos: self.current_pos,
            at,
            error,
        }
    }

    /// Panic-mode recovery: discard tokens until just past a `;` or right
    /// before a keyword that starts a statement, then parsing can resume at
    /// `declaration`.
    ///
    /// The offending token itself is always discarded so recovery makes
    /// progress even when it is one of the statement keywords.
    fn synchronize(&mut self) {
        let mut discarded = self.current_token.clone();
        self.advance();
        loop {
            if discarded == Token::Semicolon {
                return;
            }
            match self.current_token {
                Token::Eof
                | Token::Class
                | Token::Fun
                | Token::Var
                | Token::For
                | Token::If
                | Token::While
                | Token::Print
                | Token::Return => return,
                _ => {
                    discarded = self.current_token.clone();
                    self.advance();
                }
            }
        }
    }
}
