//! LR(0) state constructor.
//!
//! Grounded on `getstate`/`buildshifts`/`Configlist_closure` in the
//! original tool (tools/lemon/lemon.c): canonical state construction
//! via basis hash-consing, with propagation links recorded as they're
//! discovered (backward links during shift construction, forward
//! links during closure) for the follow-set fixed point in
//! [`crate::follow`] to run over later.

use std::collections::{HashMap, VecDeque};

use crate::analysis::first_of_sequence;
use crate::bitset::TokenSet;
use crate::diagnostics::Diagnostics;
use crate::grammar::Grammar;
use crate::ids::{ConfigId, RuleId, StateId, SymbolId, END_OF_INPUT};

/// An LR(0) item plus its LALR follow set and the propagation links
/// used to saturate that follow set once every state exists.
#[derive(Debug)]
pub struct Config {
    pub rule: RuleId,
    pub dot: usize,
    pub follow: TokenSet,
    pub forward_links: Vec<ConfigId>,
    pub backward_links: Vec<ConfigId>,
    pub state: Option<StateId>,
}

impl Config {
    pub fn is_complete(&self, grammar: &Grammar) -> bool {
        self.dot >= grammar.rule(self.rule).rhs.len()
    }
}

#[derive(Debug)]
pub struct State {
    pub id: StateId,
    pub basis: Vec<ConfigId>,
    pub closure: Vec<ConfigId>,
    pub shifts: Vec<(SymbolId, StateId)>,
}

/// The whole LR(0) automaton: a flat config arena plus the states
/// that reference into it. State 0 is always the start state.
#[derive(Debug)]
pub struct Automaton {
    pub configs: Vec<Config>,
    pub states: Vec<State>,
}

impl Automaton {
    pub fn config(&self, id: ConfigId) -> &Config {
        &self.configs[id.index()]
    }
}

/// Build the canonical LR(0) automaton for `grammar`. Requires
/// [`crate::analysis::analyze`] to have already populated nullable
/// flags and FIRST sets.
pub fn build(grammar: &Grammar, diag: &mut Diagnostics, file: &str) -> Automaton {
    let mut b = Builder {
        grammar,
        configs: Vec::new(),
        states: Vec::new(),
        state_index: HashMap::new(),
        pending: VecDeque::new(),
        diag,
        file: file.to_string(),
    };

    let initial_basis: Vec<ConfigId> = grammar
        .symbol(grammar.start_symbol)
        .rules
        .iter()
        .map(|&rule| {
            let id = b.new_config(rule, 0);
            b.configs[id.index()].follow.insert(END_OF_INPUT);
            id
        })
        .collect();
    let mut table = HashMap::new();
    for &id in &initial_basis {
        let c = &b.configs[id.index()];
        table.insert((c.rule, c.dot), id);
    }
    b.get_state(initial_basis, table);

    while let Some(state_id) = b.pending.pop_front() {
        b.build_shifts(state_id);
    }

    Automaton { configs: b.configs, states: b.states }
}

struct Builder<'g, 'd> {
    grammar: &'g Grammar,
    configs: Vec<Config>,
    states: Vec<State>,
    state_index: HashMap<Vec<(RuleId, usize)>, StateId>,
    pending: VecDeque<StateId>,
    diag: &'d mut Diagnostics,
    file: String,
}

impl<'g, 'd> Builder<'g, 'd> {
    fn new_config(&mut self, rule: RuleId, dot: usize) -> ConfigId {
        let id = ConfigId::new(self.configs.len() as u32);
        self.configs.push(Config {
            rule,
            dot,
            follow: TokenSet::new(self.grammar.terminal_count()),
            forward_links: Vec::new(),
            backward_links: Vec::new(),
            state: None,
        });
        id
    }

    /// `getstate`: resolve a (possibly brand-new) basis to a canonical
    /// state, merging propagation links onto a preexisting match.
    fn get_state(&mut self, mut basis: Vec<ConfigId>, mut table: HashMap<(RuleId, usize), ConfigId>) -> StateId {
        basis.sort_by_key(|&id| {
            let c = &self.configs[id.index()];
            (c.rule, c.dot)
        });
        let key: Vec<(RuleId, usize)> = basis
            .iter()
            .map(|&id| {
                let c = &self.configs[id.index()];
                (c.rule, c.dot)
            })
            .collect();

        if let Some(&existing) = self.state_index.get(&key) {
            let existing_basis = self.states[existing.index()].basis.clone();
            for (&new_id, &old_id) in basis.iter().zip(existing_basis.iter()) {
                let links = std::mem::take(&mut self.configs[new_id.index()].backward_links);
                self.configs[old_id.index()].backward_links.extend(links);
            }
            return existing;
        }

        let id = StateId::new(self.states.len() as u32);
        for &cid in &basis {
            self.configs[cid.index()].state = Some(id);
        }
        let closure = self.compute_closure(basis.clone(), id, &mut table);
        log::trace!("state {}: basis {} configs, closure {} configs", id, basis.len(), closure.len());
        self.states.push(State { id, basis, closure, shifts: Vec::new() });
        self.state_index.insert(key, id);
        self.pending.push_back(id);
        id
    }

    /// `Configlist_closure`: saturate a basis into its full closure,
    /// recording a forward propagation link whenever everything past
    /// the newly-closed-over nonterminal in the parent rule is
    /// nullable (so the parent's own follow set must flow in too).
    fn compute_closure(
        &mut self,
        mut list: Vec<ConfigId>,
        state_id: StateId,
        table: &mut HashMap<(RuleId, usize), ConfigId>,
    ) -> Vec<ConfigId> {
        let mut i = 0;
        while i < list.len() {
            let cid = list[i];
            let (rule, dot) = {
                let c = &self.configs[cid.index()];
                (c.rule, c.dot)
            };
            let rhs = &self.grammar.rule(rule).rhs;
            if dot < rhs.len() {
                let sp = rhs[dot].symbol;
                if self.grammar.symbol(sp).is_nonterminal() {
                    let is_error = self.grammar.error_symbol == Some(sp);
                    if self.grammar.symbol(sp).rules.is_empty() && !is_error {
                        self.diag.error(
                            self.file.as_str(),
                            Some(self.grammar.rule(rule).line),
                            format!("Nonterminal \"{}\" has no rules.", self.grammar.symbol(sp).name),
                        );
                    }
                    let tail: Vec<SymbolId> = self.grammar.rule(rule).rhs[dot + 1..].iter().map(|r| r.symbol).collect();
                    let (first, fully_nullable) = first_of_sequence(self.grammar, &tail);
                    let child_rules = self.grammar.symbol(sp).rules.clone();
                    for new_rule in child_rules {
                        let key = (new_rule, 0);
                        let existed = table.contains_key(&key);
                        let new_id = *table.entry(key).or_insert_with(|| ConfigId::new(self.configs.len() as u32));
                        if !existed {
                            self.configs.push(Config {
                                rule: new_rule,
                                dot: 0,
                                follow: TokenSet::new(self.grammar.terminal_count()),
                                forward_links: Vec::new(),
                                backward_links: Vec::new(),
                                state: Some(state_id),
                            });
                            list.push(new_id);
                        }
                        self.configs[new_id.index()].follow.union_with(&first);
                        if fully_nullable {
                            self.configs[cid.index()].forward_links.push(new_id);
                        }
                    }
                }
            }
            i += 1;
        }
        list.sort_by_key(|&id| {
            let c = &self.configs[id.index()];
            (c.rule, c.dot)
        });
        list
    }

    /// `buildshifts`: partition the closure by the symbol following
    /// the dot, build a successor basis per partition, and record the
    /// resulting shift action.
    fn build_shifts(&mut self, state_id: StateId) {
        let closure = self.states[state_id.index()].closure.clone();
        let mut used = vec![false; closure.len()];
        let mut shifts = Vec::new();

        for i in 0..closure.len() {
            if used[i] {
                continue;
            }
            let cid = closure[i];
            if self.configs[cid.index()].is_complete(self.grammar) {
                continue;
            }
            let sp = {
                let c = &self.configs[cid.index()];
                self.grammar.rule(c.rule).rhs[c.dot].symbol
            };

            let mut table = HashMap::new();
            let mut basis = Vec::new();
            for j in i..closure.len() {
                if used[j] {
                    continue;
                }
                let bcfp = closure[j];
                if self.configs[bcfp.index()].is_complete(self.grammar) {
                    continue;
                }
                let (brule, bdot) = {
                    let c = &self.configs[bcfp.index()];
                    (c.rule, c.dot)
                };
                let bsp = self.grammar.rule(brule).rhs[bdot].symbol;
                if bsp != sp {
                    continue;
                }
                used[j] = true;
                let key = (brule, bdot + 1);
                let new_id = *table.entry(key).or_insert_with(|| self.new_config(brule, bdot + 1));
                self.configs[new_id.index()].backward_links.push(bcfp);
                if !basis.contains(&new_id) {
                    basis.push(new_id);
                }
            }

            let successor = self.get_state(basis, table);
            shifts.push((sp, successor));
        }

        self.states[state_id.index()].shifts = shifts;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::analyze;
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

    fn small_grammar() -> Grammar {
        // start ::= expr .
        // expr ::= expr PLUS expr .
        // expr ::= NUM .
        let mut table = SymbolTable::new();
        let start = table.intern("start");
        let expr = table.intern("expr");
        let plus = table.intern("PLUS");
        let num = table.intern("NUM");
        table.get_mut(plus).precedence = Some(1);
        let raw = RawGrammar {
            symbols: table,
            rules: vec![
                builder(start, vec![expr]),
                builder(expr, vec![expr, plus, expr]),
                builder(expr, vec![num]),
            ],
            directives: Directives { start_symbol: Some("start".to_string()), ..Default::default() },
        };
        let mut diag = Diagnostics::new();
        let mut grammar = Grammar::finalize(raw, "g.y", &mut diag);
        crate::precedence::assign_rule_precedence(&mut grammar);
        analyze(&mut grammar);
        grammar
    }

    #[test]
    fn start_state_has_accept_ready_basis() {
        let grammar = small_grammar();
        let mut diag = Diagnostics::new();
        let automaton = build(&grammar, &mut diag, "g.y");
        assert_eq!(diag.error_count(), 0);
        assert!(!automaton.states.is_empty());
        let s0 = &automaton.states[0];
        assert_eq!(s0.basis.len(), 1);
        let start_rule_id = grammar.symbol(grammar.start_symbol).rules[0];
        assert_eq!(automaton.config(s0.basis[0]).rule, start_rule_id);
        assert_eq!(automaton.config(s0.basis[0]).dot, 0);
    }

    #[test]
    fn closure_adds_every_rule_of_symbol_after_dot() {
        let grammar = small_grammar();
        let mut diag = Diagnostics::new();
        let automaton = build(&grammar, &mut diag, "g.y");
        let s0 = &automaton.states[0];
        let expr_id = grammar.symbol_by_name("expr").unwrap();
        let expr_rule_count = grammar.symbol(expr_id).rules.len();
        let expr_configs_at_dot0 = s0
            .closure
            .iter()
            .filter(|&&cid| {
                let c = automaton.config(cid);
                c.dot == 0 && grammar.rule(c.rule).lhs == expr_id
            })
            .count();
        assert_eq!(expr_configs_at_dot0, expr_rule_count);
    }

    #[test]
    fn states_are_canonical_by_basis() {
        let grammar = small_grammar();
        let mut diag = Diagnostics::new();
        let automaton = build(&grammar, &mut diag, "g.y");
        let mut seen = std::collections::HashSet::new();
        for state in &automaton.states {
            let key: Vec<(u32, usize)> = state
                .basis
                .iter()
                .map(|&id| {
                    let c = automaton.config(id);
                    (c.rule.index() as u32, c.dot)
                })
                .collect();
            assert!(seen.insert(key), "duplicate state basis found");
        }
    }
}
