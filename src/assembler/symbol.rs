//! Scoped symbol table.
//!
//! Names starting with [`SCOPE_PREFIX`] live in the scope opened by the most
//! recent global label, every other name lives in [`GLOBAL`]. A symbol may be
//! defined once per pass; the value recorded by the resolve pass is what
//! makes forward references work in the final pass.

use std::collections::HashMap;
use std::fmt;

use super::context::Pass;
use crate::diagnostic::{Diagnostic, ErrorKind};

pub const SCOPE_PREFIX: char = '@';
pub const GLOBAL: u32 = 0;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Int(i32),
    Str(Vec<u8>),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(value) => write!(f, "{value}"),
            Value::Str(s) => write!(f, "\"{}\"", String::from_utf8_lossy(s)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol {
    pub name: String,
    pub scope: u32,
    pub value: Value,
    /// Pass of the most recent definition.
    pub pass: Pass,
    pub constant: bool,
}

#[derive(Debug, Default)]
pub struct SymbolTable {
    symbols: Vec<Symbol>,
    index: HashMap<(String, u32), usize>,
}

/// Scope a name belongs to when used inside scope `current`.
pub fn scope_for(name: &str, current: u32) -> u32 {
    if name.starts_with(SCOPE_PREFIX) {
        current
    } else {
        GLOBAL
    }
}

pub fn is_local(name: &str) -> bool {
    name.starts_with(SCOPE_PREFIX)
}

/// Checks that `name` can be bound.
pub fn validate(name: &str) -> Result<(), Diagnostic> {
    let body = name.strip_prefix(SCOPE_PREFIX).unwrap_or(name);
    let valid = body
        .chars()
        .next()
        .map_or(false, |c| c.is_alphabetic() || c == '_' || c == '.')
        && body
            .chars()
            .all(|c| c.is_alphanumeric() || c == '_' || c == '.');

    if valid {
        Ok(())
    } else {
        Err(ErrorKind::InvalidSymbolName(name.to_owned()).into())
    }
}

impl SymbolTable {
    pub fn new() -> SymbolTable {
        SymbolTable::default()
    }

    pub(crate) fn len(&self) -> usize {
        self.symbols.len()
    }

    /// Binds `name` in `scope`.
    ///
    /// Redefining a constant that was already defined in the same pass is an
    /// error; anything else overwrites the stored value.
    pub fn define(
        &mut self,
        name: &str,
        scope: u32,
        value: Value,
        constant: bool,
        pass: Pass,
    ) -> Result<&Symbol, Diagnostic> {
        validate(name)?;

        let key = (name.to_owned(), scope);
        let index = match self.index.get(&key) {
            Some(&index) => {
                let existing = &mut self.symbols[index];
                if existing.constant && existing.pass == pass {
                    return Err(ErrorKind::RedefinedConstantSymbol(name.to_owned()).into());
                }
                existing.value = value;
                existing.pass = pass;
                existing.constant = constant;
                index
            }
            None => {
                self.symbols.push(Symbol {
                    name: name.to_owned(),
                    scope,
                    value,
                    pass,
                    constant,
                });
                let index = self.symbols.len() - 1;
                self.index.insert(key, index);
                index
            }
        };

        log::trace!("defined `{name}` in scope {scope}");
        Ok(&self.symbols[index])
    }

    pub fn resolve(&self, name: &str, scope: u32) -> Option<&Symbol> {
        self.index
            .get(&(name.to_owned(), scope))
            .map(|&index| &self.symbols[index])
    }

    /// Resolves `name` as written inside scope `current`.
    pub fn lookup(&self, name: &str, current: u32) -> Option<&Symbol> {
        self.resolve(name, scope_for(name, current))
    }
}
