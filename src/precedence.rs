//! Rule precedence resolution.
//!
//! Grounded on the original tool's rule-precedence pass in `main()`
//! (tools/lemon/lemon.c): a rule's precedence is either the explicit
//! `[TOKEN]` mark recorded by the grammar parser, or — failing that —
//! the precedence of the first terminal that appears on its
//! right-hand side, scanned left to right. Rules with no terminal on
//! the RHS and no precedence mark stay unresolved and take part in no
//! conflict resolution.

use crate::grammar::Grammar;

/// Assign `rule.precedence_symbol` to every rule that doesn't already
/// carry an explicit `[TOKEN]` mark, by scanning its RHS for the first
/// symbol that has a declared precedence.
pub fn assign_rule_precedence(grammar: &mut Grammar) {
    for rule in &mut grammar.rules {
        if rule.precedence_symbol.is_some() {
            continue;
        }
        for rhs in &rule.rhs {
            let sym = &grammar.symbols[rhs.symbol.index()];
            if sym.is_terminal() && sym.precedence.is_some() {
                rule.precedence_symbol = Some(rhs.symbol);
                break;
            }
        }
    }
}
