//! The grammar data model and the finalization step that turns the
//! raw output of the grammar parser into an indexed `Grammar` ready
//! for precedence resolution and nullable/FIRST analysis.

use crate::diagnostics::Diagnostics;
use crate::ids::{RuleId, SymbolId};
use crate::intern::{Symbol, SymbolKind, SymbolTable};
use crate::location::Location;

/// One element of a rule's right-hand side.
#[derive(Debug, Clone)]
pub struct RhsSymbol {
    pub symbol: SymbolId,
    pub alias: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Rule {
    pub id: RuleId,
    pub lhs: SymbolId,
    pub lhs_alias: Option<String>,
    pub rhs: Vec<RhsSymbol>,
    pub precedence_symbol: Option<SymbolId>,
    pub action: Option<(String, Location)>,
    pub line: u32,
    pub can_reduce: bool,
}

impl Rule {
    pub fn is_empty(&self) -> bool {
        self.rhs.is_empty()
    }
}

/// The `%`-declarations that are not encoded directly on a symbol.
#[derive(Debug, Default, Clone)]
pub struct Directives {
    pub name: Option<String>,
    pub include: Option<String>,
    pub code: Option<String>,
    pub token_destructor: Option<(String, Location)>,
    pub token_prefix: Option<String>,
    pub syntax_error: Option<(String, Location)>,
    pub parse_accept: Option<(String, Location)>,
    pub parse_failure: Option<(String, Location)>,
    pub stack_overflow: Option<(String, Location)>,
    pub extra_argument: Option<String>,
    pub token_type: Option<String>,
    pub stack_size: Option<String>,
    pub start_symbol: Option<String>,
}

/// Output of the grammar parser: a symbol table and rule list that
/// have not yet been sorted/indexed.
#[derive(Debug, Default)]
pub struct RawGrammar {
    pub symbols: SymbolTable,
    pub rules: Vec<RuleBuilder>,
    pub directives: Directives,
}

/// A rule as built incrementally while scanning `IN_RHS`, referring to
/// symbols by table slot (pre-finalization) rather than `SymbolId`.
#[derive(Debug, Clone)]
pub struct RuleBuilder {
    pub lhs: usize,
    pub lhs_alias: Option<String>,
    pub rhs: Vec<(usize, Option<String>)>,
    pub precedence_symbol: Option<usize>,
    pub action: Option<(String, Location)>,
    pub line: u32,
}

/// The finalized, indexed grammar: every symbol has a `SymbolId`
/// matching its position in `symbols`, terminals occupy the prefix
/// `0..nterminal`, and every rule refers to symbols by `SymbolId`.
#[derive(Debug)]
pub struct Grammar {
    pub symbols: Vec<Symbol>,
    pub rules: Vec<Rule>,
    pub nterminal: usize,
    pub start_symbol: SymbolId,
    pub error_symbol: Option<SymbolId>,
    pub default_symbol: SymbolId,
    pub directives: Directives,
}

impl Grammar {
    pub fn terminal_count(&self) -> usize {
        self.nterminal
    }

    pub fn symbol(&self, id: SymbolId) -> &Symbol {
        &self.symbols[id.index()]
    }

    pub fn symbol_mut(&mut self, id: SymbolId) -> &mut Symbol {
        &mut self.symbols[id.index()]
    }

    pub fn rule(&self, id: RuleId) -> &Rule {
        &self.rules[id.index()]
    }

    pub fn rules(&self) -> impl Iterator<Item = &Rule> {
        self.rules.iter()
    }

    pub fn symbol_by_name(&self, name: &str) -> Option<SymbolId> {
        self.symbols
            .iter()
            .find(|s| s.name == name)
            .map(|s| s.id)
    }

    /// Build the indexed `Grammar` from the parser's raw output.
    /// Implements: the "{default}" pseudo-terminal append, the
    /// name-sort that assigns indices (terminals-first invariant),
    /// start-symbol resolution with fallback, the start-symbol-on-RHS
    /// check, and unused-symbol warnings.
    pub fn finalize(raw: RawGrammar, file: &str, diag: &mut Diagnostics) -> Grammar {
        let mut symbols = raw.symbols.into_symbols();

        // Ensure "$" (end of input) and "error" exist even if the
        // grammar text never mentioned them, and append the
        // "{default}" sentinel used by the table compressor.
        ensure_symbol(&mut symbols, "$");
        ensure_symbol(&mut symbols, "error");
        let default_slot = ensure_symbol(&mut symbols, "{default}");

        let mut order: Vec<usize> = (0..symbols.len()).collect();
        order.sort_by(|&a, &b| symbols[a].name.cmp(&symbols[b].name));

        let mut new_index_of = vec![0u32; symbols.len()];
        for (new_index, &old_slot) in order.iter().enumerate() {
            new_index_of[old_slot] = new_index as u32;
        }

        let mut sorted_symbols: Vec<Symbol> = order
            .iter()
            .enumerate()
            .map(|(new_index, &old_slot)| {
                let mut sym = symbols[old_slot].clone();
                sym.id = SymbolId::new(new_index as u32);
                sym
            })
            .collect();

        let nterminal = sorted_symbols
            .iter()
            .take_while(|s| s.kind == SymbolKind::Terminal)
            .count();

        let default_symbol = SymbolId::new(new_index_of[default_slot]);

        // Remap rules to use the sorted SymbolIds, and remap each
        // nonterminal's rule list in declaration order.
        let mut rules = Vec::with_capacity(raw.rules.len());
        for (i, rb) in raw.rules.into_iter().enumerate() {
            let lhs = SymbolId::new(new_index_of[rb.lhs]);
            let rhs = rb
                .rhs
                .into_iter()
                .map(|(slot, alias)| RhsSymbol {
                    symbol: SymbolId::new(new_index_of[slot]),
                    alias,
                })
                .collect::<Vec<_>>();
            let precedence_symbol = rb.precedence_symbol.map(|slot| SymbolId::new(new_index_of[slot]));
            let id = RuleId::new(i as u32);
            sorted_symbols[lhs.index()].rules.push(id);
            rules.push(Rule {
                id,
                lhs,
                lhs_alias: rb.lhs_alias,
                rhs,
                precedence_symbol,
                action: rb.action,
                line: rb.line,
                can_reduce: false,
            });
        }

        let error_symbol = sorted_symbols
            .iter()
            .find(|s| s.name == "error")
            .map(|s| s.id);

        let start_symbol = resolve_start_symbol(&sorted_symbols, &rules, &raw.directives, file, diag);

        check_start_not_on_rhs(&rules, start_symbol, &sorted_symbols, file, diag);
        warn_unused_symbols(&sorted_symbols, file, diag);

        Grammar {
            symbols: sorted_symbols,
            rules,
            nterminal,
            start_symbol,
            error_symbol,
            default_symbol,
            directives: raw.directives,
        }
    }
}

fn ensure_symbol(symbols: &mut Vec<Symbol>, name: &str) -> usize {
    if let Some(slot) = symbols.iter().position(|s| s.name == name) {
        return slot;
    }
    let kind = if name.chars().next().map_or(false, |c| c.is_ascii_uppercase()) || name == "$" {
        SymbolKind::Terminal
    } else {
        SymbolKind::NonTerminal
    };
    let mut sym = new_placeholder_symbol(name, kind);
    sym.id = SymbolId::new(0);
    symbols.push(sym);
    symbols.len() - 1
}

// Small helper kept separate so `ensure_symbol` reads top-down; not a
// public constructor since `Symbol`'s fields are otherwise built only
// through `SymbolTable::intern`.
fn new_placeholder_symbol(name: &str, kind: SymbolKind) -> Symbol {
    Symbol {
        id: SymbolId::new(0),
        name: name.to_string(),
        kind,
        precedence: None,
        associativity: crate::intern::Associativity::Unknown,
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

/// Resolve `%start_symbol`, falling back to the LHS of the first rule
/// with a diagnostic if the declared name is not a known nonterminal
/// — grounded on the original source's `FindStates` start-symbol
/// handling.
fn resolve_start_symbol(
    symbols: &[Symbol],
    rules: &[Rule],
    directives: &Directives,
    file: &str,
    diag: &mut Diagnostics,
) -> SymbolId {
    let first_rule_lhs = rules.first().map(|r| r.lhs);
    if let Some(name) = &directives.start_symbol {
        if let Some(sym) = symbols.iter().find(|s| &s.name == name && s.is_nonterminal()) {
            return sym.id;
        }
        if let Some(fallback) = first_rule_lhs {
            diag.error(
                file,
                None,
                format!(
                    "The specified start symbol \"{}\" is not in a nonterminal of the grammar, \"{}\" will be used instead",
                    name, symbols[fallback.index()].name
                ),
            );
            return fallback;
        }
    }
    first_rule_lhs.unwrap_or(SymbolId::new(0))
}

fn check_start_not_on_rhs(
    rules: &[Rule],
    start: SymbolId,
    symbols: &[Symbol],
    file: &str,
    diag: &mut Diagnostics,
) {
    for rule in rules {
        if rule.rhs.iter().any(|r| r.symbol == start) {
            diag.error(
                file,
                Some(rule.line),
                format!(
                    "The start symbol \"{}\" occurs on the right-hand side of a rule, this will result in a parser which does not work properly",
                    symbols[start.index()].name
                ),
            );
        }
    }
}

fn warn_unused_symbols(symbols: &[Symbol], file: &str, diag: &mut Diagnostics) {
    for sym in symbols {
        if sym.name == "$" || sym.name == "{default}" || sym.name == "error" {
            continue;
        }
        if sym.used_at.is_empty() {
            if let Some(loc) = sym.defined_at {
                let what = if sym.is_terminal() { "Token" } else { "Non-terminal" };
                diag.warning(file, Some(loc.line), format!("{} \"{}\" is not used", what, sym.name));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn builder(lhs: usize, rhs: Vec<usize>) -> RuleBuilder {
        RuleBuilder {
            lhs,
            lhs_alias: None,
            rhs: rhs.into_iter().map(|s| (s, None)).collect(),
            precedence_symbol: None,
            action: None,
            line: 1,
        }
    }

    #[test]
    fn terminals_form_prefix_after_finalize() {
        let mut table = SymbolTable::new();
        let start = table.intern("start");
        let a = table.intern("A");
        table.get_mut(start).defined_at = Some(Location::start());
        table.get_mut(a).used_at.push(Location::start());
        let raw = RawGrammar {
            symbols: table,
            rules: vec![builder(start, vec![a])],
            directives: Directives::default(),
        };
        let mut diag = Diagnostics::new();
        let grammar = Grammar::finalize(raw, "g.y", &mut diag);
        for s in &grammar.symbols[..grammar.nterminal] {
            assert!(s.is_terminal());
        }
        for s in &grammar.symbols[grammar.nterminal..] {
            assert!(s.is_nonterminal());
        }
    }

    #[test]
    fn start_symbol_on_rhs_is_an_error() {
        let mut table = SymbolTable::new();
        let s = table.intern("s");
        let a = table.intern("A");
        let raw = RawGrammar {
            symbols: table,
            rules: vec![builder(s, vec![s, a])],
            directives: Directives {
                start_symbol: Some("s".to_string()),
                ..Default::default()
            },
        };
        let mut diag = Diagnostics::new();
        Grammar::finalize(raw, "g.y", &mut diag);
        assert_eq!(diag.error_count(), 1);
    }
}
