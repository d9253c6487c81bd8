//! Shared interpreter context: the string interner and the keyword table.

use std::borrow::Borrow;
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::rc::Rc;

use crate::token::Token;

/// An interned, immutable string.  Symbols handed out by the same
/// [`Context`] are unique per spelling and so compare by address.
#[derive(Debug, Hash, Clone)]
pub struct Symbol(Rc<str>);

impl Symbol {
    pub fn name(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for Symbol {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl PartialEq for Symbol {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for Symbol {}

/// Mostly read-only state shared by the scanner, parser and evaluator of a
/// session: known symbols plus the keyword-to-token mapping.
///
/// Shared as an `Rc` because scanners and evaluators of the same session
/// must agree on symbol identity.
#[derive(Debug)]
pub struct Context {
    symbols: RefCell<HashSet<Symbol>>,
    keywords: HashMap<Symbol, Token>,
}

impl Context {
    pub fn new() -> Rc<Self> {
        let mut symbols = HashSet::new();
        let mut keywords = HashMap::new();
        for (name, token) in KEYWORDS.iter().cloned() {
            let sym = Symbol(Rc::from(name));
            symbols.insert(sym.clone());
            keywords.insert(sym, token);
        }

        Rc::new(Context {
            symbols: RefCell::new(symbols),
            keywords,
        })
    }

    /// Intern the given string if needed and return its symbol.
    pub fn symbol(&self, name: &str) -> Symbol {
        let mut symbols = self.symbols.borrow_mut();
        if let Some(sym) = symbols.get(name) {
            sym.clone()
        } else {
            let sym = Symbol(Rc::from(name));
            symbols.insert(sym.clone());
            sym
        }
    }

    /// Return the token associated with the given symbol if it is a keyword.
    pub fn keyword(&self, sym: &Symbol) -> Option<Token> {
        self.keywords.get(sym).cloned()
    }
}

// `class`, `super` and `this` are scanned but reserved: the parser never
// accepts them.
const KEYWORDS: [(&str, Token); 16] = [
    ("and", Token::And),
    ("class", Token::Class),
    ("else", Token::Else),
    ("false", Token::False),
    ("fun", Token::Fun),
    ("for", Token::For),
    ("if", Token::If),
    ("nil", Token::Nil),
    ("or", Token::Or),
    ("print", Token::Print),
    ("return", Token::Return),
    ("super", Token::Super),
    ("this", Token::This),
    ("true", Token::True),
    ("var", Token::Var),
    ("while", Token::While),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symbols_with_same_name_are_equal() {
        let ctx = Context::new();
        assert_eq!(ctx.symbol("foo"), ctx.symbol("foo"));
    }

    #[test]
    fn symbols_with_different_names_are_different() {
        let ctx = Context::new();
        assert_ne!(ctx.symbol("foo"), ctx.symbol("bar"));
    }

    #[test]
    fn symbol_name_round_trips() {
        let ctx = Context::new();
        assert_eq!(ctx.symbol("foo").name(), "foo");
    }

    #[test]
    fn keywords_are_pre_interned() {
        let ctx = Context::new();
        assert_eq!(ctx.keyword(&ctx.symbol("while")), Some(Token::While));
        assert_eq!(ctx.keyword(&ctx.symbol("class")), Some(Token::Class));
        assert_eq!(ctx.keyword(&ctx.symbol("whale")), None);
    }
}
