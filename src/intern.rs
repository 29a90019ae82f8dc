//! String interning and the grammar symbol table.
//!
//! Grounded on `alap_gen_ng/src/symbol.rs`'s `SymbolTable`: an
//! insert-only map keyed by name, returning the existing symbol on a
//! repeat lookup. `Associativity`/`AssociativePrecedence` follow the
//! same shape used there for precedence bookkeeping.

use std::collections::BTreeMap;
use std::fmt;

use crate::bitset::TokenSet;
use crate::ids::SymbolId;
use crate::location::Location;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolKind {
    Terminal,
    NonTerminal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Associativity {
    Left,
    Right,
    NonAssoc,
    Unknown,
}

impl Default for Associativity {
    fn default() -> Self {
        Associativity::Unknown
    }
}

impl fmt::Display for Associativity {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Associativity::Left => write!(f, "left"),
            Associativity::Right => write!(f, "right"),
            Associativity::NonAssoc => write!(f, "nonassoc"),
            Associativity::Unknown => write!(f, "unknown"),
        }
    }
}

/// A grammar symbol. Lives in `Grammar::symbols`, keyed by `SymbolId`
/// once indices are assigned; before that the symbol table tracks it
/// by name only (see `SymbolTable::intern`).
#[derive(Debug, Clone)]
pub struct Symbol {
    pub id: SymbolId,
    pub name: String,
    pub kind: SymbolKind,
    pub precedence: Option<u32>,
    pub associativity: Associativity,
    /// Nonterminals only.
    pub nullable: bool,
    /// Nonterminals only; sized once the terminal count is known.
    pub first: Option<TokenSet>,
    pub destructor: Option<(String, Location)>,
    pub value_type: Option<String>,
    pub stack_type_tag: Option<u32>,
    /// Nonterminals only: rules whose LHS is this symbol, in
    /// declaration order.
    pub rules: Vec<crate::ids::RuleId>,
    pub defined_at: Option<Location>,
    pub used_at: Vec<Location>,
}

impl Symbol {
    fn new(id: SymbolId, name: String, kind: SymbolKind) -> Self {
        Self {
            id,
            name,
            kind,
            precedence: None,
            associativity: Associativity::Unknown,
            nullable: false,
            first: None,
            destructor: None,
            value_type: None,
            stack_type_tag: None,
            rules: Vec::new(),
            defined_at: None,
            used_at: Vec::new(),
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.kind == SymbolKind::Terminal
    }

    pub fn is_nonterminal(&self) -> bool {
        self.kind == SymbolKind::NonTerminal
    }

    /// Kind is determined purely by the first character of the name:
    /// uppercase is a terminal, anything else a nonterminal. This is
    /// the grammar-file naming convention the parser enforces.
    fn kind_from_name(name: &str) -> SymbolKind {
        match name.chars().next() {
            Some(c) if c.is_ascii_uppercase() => SymbolKind::Terminal,
            _ => SymbolKind::NonTerminal,
        }
    }
}

/// Insert-only symbol table. Symbols are created on first reference
/// and keep a stable identity (their `Vec` slot) for the rest of the
/// run; `SymbolId`s are only assigned later by `Grammar::finalize`
/// once every symbol has been seen and the table is sorted by name.
#[derive(Debug, Default)]
pub struct SymbolTable {
    by_name: BTreeMap<String, usize>,
    symbols: Vec<Symbol>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the existing symbol for `name`, or creates one whose
    /// kind is inferred from the first character.
    pub fn intern(&mut self, name: &str) -> usize {
        if let Some(&slot) = self.by_name.get(name) {
            return slot;
        }
        let slot = self.symbols.len();
        let kind = Symbol::kind_from_name(name);
        self.symbols.push(Symbol::new(SymbolId::new(0), name.to_string(), kind));
        self.by_name.insert(name.to_string(), slot);
        slot
    }

    pub fn lookup(&self, name: &str) -> Option<usize> {
        self.by_name.get(name).copied()
    }

    pub fn get(&self, slot: usize) -> &Symbol {
        &self.symbols[slot]
    }

    pub fn get_mut(&mut self, slot: usize) -> &mut Symbol {
        &mut self.symbols[slot]
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Consume the table, handing back its raw symbol list in
    /// insertion order. `Grammar::finalize` sorts and re-indexes it.
    pub fn into_symbols(self) -> Vec<Symbol> {
        self.symbols
    }

    pub fn iter(&self) -> impl Iterator<Item = &Symbol> {
        self.symbols.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uppercase_name_is_terminal() {
        let mut table = SymbolTable::new();
        let slot = table.intern("PLUS");
        assert!(table.get(slot).is_terminal());
    }

    #[test]
    fn lowercase_name_is_nonterminal() {
        let mut table = SymbolTable::new();
        let slot = table.intern("expr");
        assert!(table.get(slot).is_nonterminal());
    }

    #[test]
    fn repeat_intern_returns_same_slot() {
        let mut table = SymbolTable::new();
        let a = table.intern("expr");
        let b = table.intern("expr");
        assert_eq!(a, b);
        assert_eq!(table.len(), 1);
    }
}
