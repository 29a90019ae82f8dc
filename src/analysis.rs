//! Lambda & FIRST analyzer.
//!
//! Two fixed-point loops over the rule list, grounded on the original
//! tool's `FindFirstSets` in tools/lemon/lemon.c: first nullability,
//! then FIRST, each iterated until a full pass makes no change.
//! `TokenSet::union_with` supplies the change flag that drives both
//! loops.

use crate::bitset::TokenSet;
use crate::grammar::Grammar;
use crate::ids::SymbolId;

/// Compute nullability for every nonterminal, then seed and saturate
/// every nonterminal's FIRST set. Must run after [`crate::precedence`]
/// and before LR(0) construction, which relies on both.
pub fn analyze(grammar: &mut Grammar) {
    compute_nullable(grammar);
    compute_first_sets(grammar);
}

fn compute_nullable(grammar: &mut Grammar) {
    loop {
        let mut changed = false;
        for rule in &grammar.rules {
            if grammar.symbols[rule.lhs.index()].nullable {
                continue;
            }
            let all_nullable = rule
                .rhs
                .iter()
                .all(|r| grammar.symbols[r.symbol.index()].nullable);
            if all_nullable {
                grammar.symbols[rule.lhs.index()].nullable = true;
                changed = true;
            }
        }
        if !changed {
            break;
        }
    }
}

fn compute_first_sets(grammar: &mut Grammar) {
    let terminal_count = grammar.terminal_count();
    for sym in grammar.symbols.iter_mut().skip(terminal_count) {
        sym.first = Some(TokenSet::new(terminal_count));
    }

    loop {
        let mut changed = false;
        for rule in &grammar.rules {
            let mut addition = TokenSet::new(terminal_count);
            for rhs in &rule.rhs {
                let sym = &grammar.symbols[rhs.symbol.index()];
                if sym.is_terminal() {
                    addition.insert(rhs.symbol);
                    break;
                }
                if let Some(first) = &sym.first {
                    addition.union_with(first);
                }
                if !sym.nullable {
                    break;
                }
            }
            let lhs = &mut grammar.symbols[rule.lhs.index()];
            let first = lhs.first.get_or_insert_with(|| TokenSet::new(terminal_count));
            if first.union_with(&addition) {
                changed = true;
            }
        }
        if !changed {
            break;
        }
    }
}

/// FIRST of a symbol sequence, used by closure construction (Component
/// F) to seed a new configuration's follow set from what follows the
/// dot. Stops at (and includes) the first non-nullable symbol.
pub fn first_of_sequence(grammar: &Grammar, symbols: &[SymbolId]) -> (TokenSet, bool) {
    let terminal_count = grammar.terminal_count();
    let mut set = TokenSet::new(terminal_count);
    for &id in symbols {
        let sym = &grammar.symbols[id.index()];
        if sym.is_terminal() {
            set.insert(id);
            return (set, false);
        }
        if let Some(first) = &sym.first {
            set.union_with(first);
        }
        if !sym.nullable {
            return (set, false);
        }
    }
    (set, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::Diagnostics;
    use crate::grammar::{Directives, RawGrammar, RuleBuilder};
    use crate::intern::SymbolTable;

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
    fn nullable_chain_propagates() {
        let mut table = SymbolTable::new();
        let a = table.intern("a");
        let b = table.intern("b");
        let raw = RawGrammar {
            symbols: table,
            rules: vec![builder(a, vec![]), builder(b, vec![a, a])],
            directives: Directives::default(),
        };
        let mut diag = Diagnostics::new();
        let mut grammar = Grammar::finalize(raw, "g.y", &mut diag);
        analyze(&mut grammar);
        let a_id = grammar.symbol_by_name("a").unwrap();
        let b_id = grammar.symbol_by_name("b").unwrap();
        assert!(grammar.symbol(a_id).nullable);
        assert!(grammar.symbol(b_id).nullable);
        assert!(grammar.symbol(b_id).first.as_ref().unwrap().is_empty());
    }

    #[test]
    fn first_set_stops_at_terminal() {
        let mut table = SymbolTable::new();
        let expr = table.intern("expr");
        let num = table.intern("NUM");
        let raw = RawGrammar {
            symbols: table,
            rules: vec![builder(expr, vec![num])],
            directives: Directives::default(),
        };
        let mut diag = Diagnostics::new();
        let mut grammar = Grammar::finalize(raw, "g.y", &mut diag);
        analyze(&mut grammar);
        let expr_id = grammar.symbol_by_name("expr").unwrap();
        let num_id = grammar.symbol_by_name("NUM").unwrap();
        assert!(grammar.symbol(expr_id).first.as_ref().unwrap().contains(num_id));
    }
}
