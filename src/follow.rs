//! Follow-set propagator.
//!
//! Grounded on `FindLinks`/`FindFollowSets` in the original tool
//! (tools/lemon/lemon.c): backward links recorded during LR(0)
//! construction are first turned into forward links, then the
//! follow-set fixed point runs purely over forward links until no
//! configuration's set changes.

use crate::lr0::Automaton;

/// Convert every configuration's backward links into the reverse
/// forward link on the link's target, then saturate follow sets along
/// forward links to a fixed point.
pub fn propagate(automaton: &mut Automaton) {
    find_links(automaton);
    find_follow_sets(automaton);
}

fn find_links(automaton: &mut Automaton) {
    for i in 0..automaton.configs.len() {
        let backward = automaton.configs[i].backward_links.clone();
        for target in backward {
            automaton.configs[target.index()].forward_links.push(crate::ids::ConfigId::new(i as u32));
        }
    }
}

fn find_follow_sets(automaton: &mut Automaton) {
    let mut incomplete = vec![true; automaton.configs.len()];
    loop {
        let mut progress = false;
        for i in 0..automaton.configs.len() {
            if !incomplete[i] {
                continue;
            }
            let forward = automaton.configs[i].forward_links.clone();
            let follow = automaton.configs[i].follow.clone();
            for target in forward {
                if automaton.configs[target.index()].follow.union_with(&follow) {
                    incomplete[target.index()] = true;
                    progress = true;
                }
            }
            incomplete[i] = false;
        }
        if !progress {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::analyze;
    use crate::diagnostics::Diagnostics;
    use crate::grammar::{Directives, Grammar, RawGrammar, RuleBuilder};
    use crate::intern::SymbolTable;
    use crate::lr0;

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

    fn build_automaton() -> (Grammar, lr0::Automaton) {
        // start ::= a .
        // a ::= b a .
        // a ::= NUM .
        // b ::= .
        let mut table = SymbolTable::new();
        let start = table.intern("start");
        let a = table.intern("a");
        let b = table.intern("b");
        let num = table.intern("NUM");
        let raw = RawGrammar {
            symbols: table,
            rules: vec![
                builder(start, vec![a]),
                builder(a, vec![b, a]),
                builder(a, vec![num]),
                builder(b, vec![]),
            ],
            directives: Directives { start_symbol: Some("start".to_string()), ..Default::default() },
        };
        let mut diag = Diagnostics::new();
        let mut grammar = Grammar::finalize(raw, "g.y", &mut diag);
        crate::precedence::assign_rule_precedence(&mut grammar);
        analyze(&mut grammar);
        let automaton = lr0::build(&grammar, &mut diag, "g.y");
        (grammar, automaton)
    }

    #[test]
    fn follow_sets_satisfy_propagation_edges() {
        let (_grammar, mut automaton) = build_automaton();
        propagate(&mut automaton);
        for i in 0..automaton.configs.len() {
            let forward = automaton.configs[i].forward_links.clone();
            for target in forward {
                let source = &automaton.configs[i].follow;
                let dest = &automaton.configs[target.index()].follow;
                for bit in source.iter() {
                    assert!(dest.iter().any(|b| b == bit), "follow set not propagated across edge");
                }
            }
        }
    }

    #[test]
    fn end_of_input_reaches_final_reduce_of_start_rule() {
        let (grammar, mut automaton) = build_automaton();
        propagate(&mut automaton);
        let start_rule = grammar.symbol(grammar.start_symbol).rules[0];
        let found = automaton
            .configs
            .iter()
            .any(|c| c.rule == start_rule && c.dot == 1 && c.follow.contains(crate::ids::END_OF_INPUT));
        assert!(found, "start rule's final configuration should follow on end-of-input");
    }
}
