//! Report & header emitter.
//!
//! Grounded on `ReportOutput`/`ConfigPrint`/`PrintAction`/`ReportHeader`
//! in the original tool (tools/lemon/lemon.c): a state-by-state
//! `.out` listing of configurations and actions, and a `.h` header of
//! terminal `#define`s that is left untouched when its content would
//! be unchanged, preserving the file's mtime for make-style builds.

use std::io::{self, Write};

use crate::action::{ActionKind, ActionPayload, ActionTable};
use crate::grammar::Grammar;
use crate::ids::ConfigId;
use crate::lr0::Automaton;

/// Render one configuration the way `ConfigPrint` does: `lhs ::= a b *
/// c d` with the dot rendered at its current position.
fn format_config(grammar: &Grammar, automaton: &Automaton, cid: ConfigId) -> String {
    let config = automaton.config(cid);
    let rule = grammar.rule(config.rule);
    let mut out = format!("{} ::=", grammar.symbol(rule.lhs).name);
    for i in 0..=rule.rhs.len() {
        if i == config.dot {
            out.push_str(" *");
        }
        if i == rule.rhs.len() {
            break;
        }
        out.push_str(&format!(" {}", grammar.symbol(rule.rhs[i].symbol).name));
    }
    out
}

fn format_action(grammar: &Grammar, action: &crate::action::Action) -> Option<String> {
    let name = &grammar.symbol(action.lookahead).name;
    match (action.kind, action.payload) {
        (ActionKind::Shift, ActionPayload::State(s)) => Some(format!("{:>30} shift  {}", name, s.index())),
        (ActionKind::Reduce, ActionPayload::Rule(r)) | (ActionKind::ReduceResolved, ActionPayload::Rule(r)) => {
            Some(format!("{:>30} reduce {}", name, r.index()))
        }
        (ActionKind::Accept, _) => Some(format!("{:>30} accept", name)),
        (ActionKind::Error, _) => Some(format!("{:>30} error", name)),
        (ActionKind::Conflict, ActionPayload::Rule(r)) => {
            Some(format!("{:>30} reduce {:<3} ** Parsing conflict **", name, r.index()))
        }
        (ActionKind::ShiftResolved, _) | (ActionKind::Unused, _) => None,
        _ => None,
    }
}

/// Write the `.out` state report. `basis_only` corresponds to `-b`.
pub fn write_report(
    grammar: &Grammar,
    automaton: &Automaton,
    actions: &ActionTable,
    basis_only: bool,
    out: &mut dyn Write,
) -> io::Result<()> {
    for (i, state) in automaton.states.iter().enumerate() {
        writeln!(out, "State {}:", i)?;
        let list: &[ConfigId] = if basis_only { &state.basis } else { &state.closure };
        for &cid in list {
            let config = automaton.config(cid);
            if config.dot == grammar.rule(config.rule).rhs.len() {
                writeln!(out, "    ({:<3}) {}", config.rule.index(), format_config(grammar, automaton, cid))?;
            } else {
                writeln!(out, "          {}", format_config(grammar, automaton, cid))?;
            }
        }
        writeln!(out)?;
        for action in &actions.actions[i] {
            if let Some(rendered) = format_action(grammar, action) {
                writeln!(out, "{}", rendered)?;
            }
        }
        writeln!(out)?;
    }
    Ok(())
}

/// Print summary statistics in the `-s` format.
pub fn write_statistics(
    grammar: &Grammar,
    automaton: &Automaton,
    conflicts: u32,
    out: &mut dyn Write,
) -> io::Result<()> {
    writeln!(out, "{} terminal symbols", grammar.terminal_count())?;
    writeln!(out, "{} non-terminal symbols", grammar.symbols.len() - grammar.terminal_count())?;
    writeln!(out, "{} total symbols", grammar.symbols.len())?;
    writeln!(out, "{} rules", grammar.rules.len())?;
    writeln!(out, "{} states", automaton.states.len())?;
    writeln!(out, "{} parsing conflicts", conflicts)?;
    Ok(())
}

/// Build the `.h` header content (one `#define` per terminal, skipping
/// index 0 which is the end-of-input sentinel, not a real token).
pub fn header_text(grammar: &Grammar) -> String {
    let prefix = grammar.directives.token_prefix.as_deref().unwrap_or("");
    let mut out = String::new();
    for sym in &grammar.symbols[1..grammar.terminal_count()] {
        out.push_str(&format!("#define {}{:<30} {:>2}\n", prefix, sym.name, sym.id.index()));
    }
    out
}

/// Write the header only if its content would differ from what's
/// already on disk, so an unchanged grammar never touches the file's
/// mtime.
pub fn write_header_if_changed(path: &std::path::Path, content: &str) -> io::Result<()> {
    if let Ok(existing) = std::fs::read_to_string(path) {
        if existing == content {
            return Ok(());
        }
    }
    std::fs::write(path, content)
}
