//! A standalone LALR(1) parser generator.
//!
//! Pipeline, leaves first: [`grammar_parser`] produces a [`grammar::RawGrammar`]
//! from grammar-specification text, [`grammar::Grammar::finalize`] sorts and
//! indexes it, [`precedence`] assigns rule precedence, [`analysis`]
//! computes nullability and FIRST sets, [`lr0`] builds the canonical
//! state graph, [`follow`] saturates LALR follow sets, [`action`]
//! builds and resolves the per-state action lists, [`compress`] folds
//! repeated reduces into per-state defaults, and [`report`] / [`codegen`]
//! emit the `.out`/`.h`/`.c` outputs.

pub mod action;
pub mod analysis;
pub mod bitset;
pub mod codegen;
pub mod compress;
pub mod diagnostics;
pub mod follow;
pub mod grammar;
pub mod grammar_parser;
pub mod ids;
pub mod intern;
pub mod lexer;
pub mod location;
pub mod lr0;
pub mod precedence;
pub mod report;
pub mod template;

use std::path::Path;

use diagnostics::Diagnostics;
use grammar::Grammar;

/// Result of running the full analysis pipeline short of code emission:
/// everything a caller needs to write reports, headers, and generated
/// source, plus the accumulated diagnostics.
pub struct Analyzed {
    pub grammar: Grammar,
    pub automaton: lr0::Automaton,
    pub actions: action::ActionTable,
    pub diagnostics: Diagnostics,
}

/// Run components C through I (parse, finalize, precedence, analyze,
/// LR(0), follow, actions, optional compression) over grammar source
/// text. An empty grammar (no rules at all) is recorded as an error
/// and short-circuits before the LR(0)/LALR machinery runs.
pub fn analyze(source: &str, file: &str, skip_compression: bool) -> Analyzed {
    let mut diagnostics = Diagnostics::new();
    let raw = grammar_parser::parse_grammar(source, file, &mut diagnostics);
    if raw.rules.is_empty() {
        diagnostics.error(file, None, "Empty grammar.".to_string());
    }
    let parse_clean = !diagnostics.has_errors();

    let mut grammar = Grammar::finalize(raw, file, &mut diagnostics);

    // Parsing left the grammar object too unreliable to analyze; stop
    // here rather than running the LR(0)/LALR machinery over it.
    if !parse_clean {
        let empty = lr0::Automaton { configs: Vec::new(), states: Vec::new() };
        return Analyzed { grammar, automaton: empty, actions: action::ActionTable { actions: Vec::new() }, diagnostics };
    }

    precedence::assign_rule_precedence(&mut grammar);
    analysis::analyze(&mut grammar);
    let mut automaton = lr0::build(&grammar, &mut diagnostics, file);
    follow::propagate(&mut automaton);
    let mut actions = action::build_actions(&grammar, &automaton, &mut diagnostics, file);
    if !skip_compression {
        compress::compress(&grammar, &mut actions);
    }

    Analyzed { grammar, automaton, actions, diagnostics }
}

/// Reprint a finalized grammar's rules in `lhs ::= rhs .` form, the
/// way `-g` does; used both for the CLI flag and for reprint
/// round-trip tests.
pub fn reprint_grammar(grammar: &Grammar) -> String {
    let mut out = String::new();
    for rule in &grammar.rules {
        out.push_str(&grammar.symbol(rule.lhs).name);
        out.push_str(" ::=");
        for rhs in &rule.rhs {
            out.push(' ');
            out.push_str(&grammar.symbol(rhs.symbol).name);
            if let Some(alias) = &rhs.alias {
                out.push_str(&format!("({})", alias));
            }
        }
        out.push_str(" .\n");
    }
    out
}

/// Derive `<basename>.<ext>` alongside (or under `out_dir`, if given)
/// the input grammar path.
pub fn sibling_output_path(input: &Path, out_dir: Option<&Path>, extension: &str) -> std::path::PathBuf {
    let mut path = match out_dir {
        Some(dir) => dir.join(input.file_name().unwrap_or_default()),
        None => input.to_path_buf(),
    };
    path.set_extension(extension);
    path
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_grammar_is_rejected() {
        let result = analyze("", "g.y", false);
        assert!(result.diagnostics.has_errors());
        assert!(result.automaton.states.is_empty());
    }

    #[test]
    fn trivial_grammar_analyzes_cleanly() {
        let result = analyze("start ::= A .\n", "g.y", false);
        assert_eq!(result.diagnostics.error_count(), 0);
        assert_eq!(result.automaton.states.len(), 2);
    }

    #[test]
    fn reprint_round_trip_preserves_rule_shape() {
        let result = analyze("start ::= A .\n", "g.y", false);
        let text = reprint_grammar(&result.grammar);
        let reparsed = analyze(&text, "g.y", false);
        assert_eq!(reparsed.grammar.rules.len(), result.grammar.rules.len());
    }

    #[test]
    fn sibling_output_path_changes_extension_only() {
        let path = sibling_output_path(Path::new("/tmp/grammar.y"), None, "h");
        assert_eq!(path, Path::new("/tmp/grammar.h"));
    }
}
