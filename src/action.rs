//! Action builder & conflict resolver.
//!
//! Grounded on `FindActions`/`resolve_conflict`/`actioncmp` in the
//! original tool (tools/lemon/lemon.c): one reduce action per
//! (configuration, follow terminal) pair with the dot at the rule's
//! end, one ACCEPT action in state 0, then a sort by
//! `(lookahead, kind, rule)` followed by a single adjacency pass that
//! resolves same-lookahead conflicts via precedence/associativity.

use crate::diagnostics::Diagnostics;
use crate::grammar::Grammar;
use crate::ids::{RuleId, StateId, SymbolId};
use crate::intern::Associativity;
use crate::lr0::Automaton;

/// Mirrors the original tool's `enum e_action`; declaration order is
/// significant, it is the tie-break used when sorting actions that
/// share a lookahead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ActionKind {
    Shift,
    Accept,
    Reduce,
    Error,
    Conflict,
    ShiftResolved,
    ReduceResolved,
    Unused,
}

#[derive(Debug, Clone, Copy)]
pub enum ActionPayload {
    State(StateId),
    Rule(RuleId),
    None,
}

#[derive(Debug, Clone)]
pub struct Action {
    pub lookahead: SymbolId,
    pub kind: ActionKind,
    pub payload: ActionPayload,
}

/// Per-state action lists, indexed in parallel with `Automaton::states`.
#[derive(Debug)]
pub struct ActionTable {
    pub actions: Vec<Vec<Action>>,
}

/// Build every state's action list and resolve same-lookahead
/// conflicts. `automaton`'s follow sets must already be saturated by
/// [`crate::follow::propagate`].
pub fn build_actions(grammar: &Grammar, automaton: &Automaton, diag: &mut Diagnostics, file: &str) -> ActionTable {
    let mut actions: Vec<Vec<Action>> = vec![Vec::new(); automaton.states.len()];

    for (state_idx, state) in automaton.states.iter().enumerate() {
        for &(sp, target) in &state.shifts {
            actions[state_idx].push(Action { lookahead: sp, kind: ActionKind::Shift, payload: ActionPayload::State(target) });
        }
        for &cid in &state.closure {
            let config = automaton.config(cid);
            if config.is_complete(grammar) {
                for terminal in 0..grammar.terminal_count() {
                    let sym = SymbolId::new(terminal as u32);
                    if config.follow.contains(sym) {
                        actions[state_idx].push(Action { lookahead: sym, kind: ActionKind::Reduce, payload: ActionPayload::Rule(config.rule) });
                    }
                }
            }
        }
    }

    let start_terminal_lhs = grammar.start_symbol;
    actions[0].push(Action { lookahead: start_terminal_lhs, kind: ActionKind::Accept, payload: ActionPayload::None });

    for state_actions in &mut actions {
        state_actions.sort_by_key(|a| (a.lookahead, a.kind, rule_index(a)));
    }

    let mut conflicts = 0u32;
    for (state_idx, state_actions) in actions.iter_mut().enumerate() {
        let mut i = 0;
        while i + 1 < state_actions.len() {
            let mut j = i + 1;
            while j < state_actions.len() && state_actions[j].lookahead == state_actions[i].lookahead {
                conflicts += resolve_pair(state_actions, i, j, grammar, diag, file, state_idx);
                j += 1;
            }
            i = j;
        }
    }
    if conflicts > 0 {
        log::warn!("{} unresolved shift/reduce or reduce/reduce conflicts", conflicts);
    }
    for _ in 0..conflicts {
        diag.record_conflict();
    }

    mark_reducible_rules(grammar, &actions, diag, file);

    ActionTable { actions }
}

fn rule_index(action: &Action) -> u32 {
    match action.payload {
        ActionPayload::Rule(r) => r.index() as u32,
        _ => 0,
    }
}

#[allow(clippy::too_many_arguments)]
fn resolve_pair(
    actions: &mut [Action],
    i: usize,
    j: usize,
    grammar: &Grammar,
    diag: &mut Diagnostics,
    file: &str,
    state_idx: usize,
) -> u32 {
    let (ki, kj) = (actions[i].kind, actions[j].kind);
    match (ki, kj) {
        (ActionKind::Shift, ActionKind::Reduce) => {
            let shift_symbol = actions[i].lookahead;
            let rule = match actions[j].payload {
                ActionPayload::Rule(r) => r,
                _ => return 0,
            };
            let shift_prec = grammar.symbol(shift_symbol).precedence;
            let reduce_sym = grammar.rule(rule).precedence_symbol;
            let reduce_prec = reduce_sym.and_then(|s| grammar.symbol(s).precedence);
            match (shift_prec, reduce_prec) {
                (Some(sp), Some(rp)) if sp > rp => {
                    actions[j].kind = ActionKind::ReduceResolved;
                    0
                }
                (Some(sp), Some(rp)) if sp < rp => {
                    actions[i].kind = ActionKind::ShiftResolved;
                    0
                }
                (Some(_), Some(_)) => {
                    let assoc = grammar.symbol(shift_symbol).associativity;
                    match assoc {
                        Associativity::Right => {
                            actions[j].kind = ActionKind::ReduceResolved;
                            0
                        }
                        Associativity::Left => {
                            actions[i].kind = ActionKind::ShiftResolved;
                            0
                        }
                        _ => {
                            actions[j].kind = ActionKind::Conflict;
                            diag.record_conflict_note(state_idx, file, grammar, rule, shift_symbol);
                            1
                        }
                    }
                }
                _ => {
                    actions[j].kind = ActionKind::Conflict;
                    diag.record_conflict_note(state_idx, file, grammar, rule, shift_symbol);
                    1
                }
            }
        }
        (ActionKind::Reduce, ActionKind::Reduce) => {
            let (rx, ry) = match (actions[i].payload, actions[j].payload) {
                (ActionPayload::Rule(a), ActionPayload::Rule(b)) => (a, b),
                _ => return 0,
            };
            let px = grammar.rule(rx).precedence_symbol.and_then(|s| grammar.symbol(s).precedence);
            let py = grammar.rule(ry).precedence_symbol.and_then(|s| grammar.symbol(s).precedence);
            match (px, py) {
                (Some(a), Some(b)) if a != b => {
                    if a > b {
                        actions[j].kind = ActionKind::ReduceResolved;
                    } else {
                        actions[i].kind = ActionKind::ReduceResolved;
                    }
                    0
                }
                _ => {
                    actions[j].kind = ActionKind::Conflict;
                    diag.record_conflict_note(state_idx, file, grammar, ry, actions[j].lookahead);
                    1
                }
            }
        }
        _ => 0,
    }
}

trait ConflictNote {
    fn record_conflict_note(&mut self, state_idx: usize, file: &str, grammar: &Grammar, rule: RuleId, lookahead: SymbolId);
}

impl ConflictNote for Diagnostics {
    fn record_conflict_note(&mut self, state_idx: usize, file: &str, grammar: &Grammar, rule: RuleId, lookahead: SymbolId) {
        self.warning(
            file,
            Some(grammar.rule(rule).line),
            format!(
                "** Parsing conflict ** in state {} on lookahead \"{}\": rule {} conflicts.",
                state_idx,
                grammar.symbol(lookahead).name,
                rule.index()
            ),
        );
    }
}

/// "This rule can not be reduced.": every rule must be the payload of
/// at least one surviving (non-unused, non-conflict) reduce action.
fn mark_reducible_rules(grammar: &Grammar, actions: &[Vec<Action>], diag: &mut Diagnostics, file: &str) {
    let mut reachable = vec![false; grammar.rules().count()];
    for state_actions in actions {
        for action in state_actions {
            if action.kind == ActionKind::Reduce {
                if let ActionPayload::Rule(r) = action.payload {
                    reachable[r.index()] = true;
                }
            }
        }
    }
    for rule in grammar.rules() {
        if !reachable[rule.id.index()] {
            diag.error(file, Some(rule.line), "This rule can not be reduced.".to_string());
        }
    }
}
