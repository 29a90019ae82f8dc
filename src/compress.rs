//! Table compressor: collapses repeated reduce actions into a single
//! per-state default.
//!
//! Grounded on the original tool's default-action compaction in
//! `ReportTable`/`compute_action` setup (tools/lemon/lemon.c): when a
//! state has two or more reduce actions that all reduce by the same
//! rule, only one needs to be listed explicitly — the rest collapse
//! into a single default action on the sentinel `{default}` symbol,
//! and the now-redundant individual entries are marked unused.

use std::collections::HashMap;

use crate::action::{Action, ActionKind, ActionPayload, ActionTable};
use crate::grammar::Grammar;

/// For every state, if two or more plain `Reduce` actions share a rule
/// payload, replace them with one default action and mark the
/// originals `Unused`. Conflict-resolved reduces keep their own
/// lookahead uncollapsed, since each ties to the specific shift or
/// rule it won against. Skipped entirely when `-c` is passed.
pub fn compress(grammar: &Grammar, table: &mut ActionTable) {
    for state_actions in &mut table.actions {
        let mut counts: HashMap<u32, usize> = HashMap::new();
        for action in state_actions.iter() {
            if let (ActionKind::Reduce, ActionPayload::Rule(r)) = (action.kind, action.payload) {
                *counts.entry(r.index() as u32).or_insert(0) += 1;
            }
        }
        let default_rule = counts
            .iter()
            .filter(|(_, &n)| n >= 2)
            .max_by_key(|(&r, &n)| (n, std::cmp::Reverse(r)))
            .map(|(&r, _)| r);
        if let Some(rule_idx) = default_rule {
            let mut first = true;
            for action in state_actions.iter_mut() {
                if let (ActionKind::Reduce, ActionPayload::Rule(r)) = (action.kind, action.payload) {
                    if r.index() as u32 == rule_idx {
                        if first {
                            action.lookahead = grammar.default_symbol;
                            first = false;
                        } else {
                            action.kind = ActionKind::Unused;
                        }
                    }
                }
            }
        }
        state_actions.sort_by_key(|a| (a.lookahead, a.kind, rule_key(a)));
    }
}

fn rule_key(action: &Action) -> u32 {
    match action.payload {
        ActionPayload::Rule(r) => r.index() as u32,
        _ => 0,
    }
}
