//! End-to-end scenarios exercising the full analysis pipeline.

use lemon::{analyze, codegen, reprint_grammar, report, template};

fn analyzed(src: &str) -> lemon::Analyzed {
    analyze(src, "g.y", false)
}

#[test]
fn e1_trivial_accept() {
    let result = analyzed("%token_prefix T_.\nstart ::= A.\n");
    assert_eq!(result.diagnostics.error_count(), 0);
    assert_eq!(result.automaton.states.len(), 2);
    assert_eq!(result.grammar.rules.len(), 1);

    let header = report::header_text(&result.grammar);
    let line = header.lines().find(|l| l.contains("T_A")).expect("T_A define present");
    assert!(line.starts_with("#define T_A"));
    assert!(line.trim_end().ends_with('1'));

    let accepts_in_state_zero = result.actions.actions[0]
        .iter()
        .any(|a| a.kind == lemon::action::ActionKind::Accept);
    assert!(accepts_in_state_zero);
}

#[test]
fn e2_precedence_resolves_shift_reduce() {
    let src = "%left PLUS.\nstart ::= expr.\nexpr ::= expr PLUS expr.\nexpr ::= INT.\n";
    let result = analyzed(src);
    assert_eq!(result.diagnostics.conflict_count(), 0);

    let has_resolution = result
        .actions
        .actions
        .iter()
        .flatten()
        .any(|a| matches!(a.kind, lemon::action::ActionKind::ShiftResolved | lemon::action::ActionKind::ReduceResolved));
    assert!(has_resolution);
}

#[test]
fn e3_unresolvable_conflict() {
    let src = "start ::= expr.\nexpr ::= expr PLUS expr.\nexpr ::= INT.\n";
    let result = analyzed(src);
    assert!(result.diagnostics.exit_code() >= 1);

    let mut out = Vec::new();
    report::write_report(&result.grammar, &result.automaton, &result.actions, false, &mut out).unwrap();
    let text = String::from_utf8(out).unwrap();
    assert!(text.contains("** Parsing conflict **"));
}

#[test]
fn e4_unreachable_rule() {
    let src = "start ::= A.\nx ::= Y.\n";
    let result = analyzed(src);
    assert!(result.diagnostics.error_count() >= 1);

    let mut out = Vec::new();
    result.diagnostics.emit(&mut out).unwrap();
    let text = String::from_utf8(out).unwrap();
    assert!(text.contains("This rule can not be reduced"));
}

#[test]
fn e5_start_symbol_on_rhs() {
    let src = "%start_symbol s.\ns ::= s A.\n";
    let result = analyzed(src);
    let mut out = Vec::new();
    result.diagnostics.emit(&mut out).unwrap();
    let text = String::from_utf8(out).unwrap();
    assert!(text.to_lowercase().contains("start symbol"));
    assert!(result.diagnostics.error_count() >= 1);
}

#[test]
fn e6_nullable_chain() {
    let src = "%start_symbol b.\na ::= .\nb ::= a a.\n";
    let result = analyzed(src);
    assert_eq!(result.diagnostics.error_count(), 0);
    let a = result.grammar.symbol_by_name("a").unwrap();
    let b = result.grammar.symbol_by_name("b").unwrap();
    assert!(result.grammar.symbol(a).nullable);
    assert!(result.grammar.symbol(b).nullable);
    let first_b = result.grammar.symbol(b).first.as_ref().unwrap();
    assert_eq!(first_b.iter().count(), 0);
}

#[test]
fn e7_unused_token_warning() {
    let result = analyzed("start ::= A.\n%left UNUSED.\n");
    assert_eq!(result.diagnostics.error_count(), 0);
    assert_eq!(result.diagnostics.exit_code(), 0);
    assert!(result.diagnostics.warning_count() >= 1);

    let mut out = Vec::new();
    result.diagnostics.emit(&mut out).unwrap();
    let text = String::from_utf8(out).unwrap();
    assert!(text.contains("UNUSED"));

    let clean = analyzed("start ::= A.\n");
    assert_eq!(clean.diagnostics.warning_count(), 0);
}

#[test]
fn unused_nonterminal_warning() {
    let result = analyzed("start ::= A.\nextra ::= B.\n");
    assert!(result.diagnostics.warning_count() >= 1);

    let mut out = Vec::new();
    result.diagnostics.emit(&mut out).unwrap();
    let text = String::from_utf8(out).unwrap();
    assert!(text.contains("extra"));
}

#[test]
fn warning_non_interference_exits_zero() {
    let src = "start ::= A.\n%left UNUSED.\n";
    let result = analyzed(src);
    assert!(result.diagnostics.warning_count() > 0);
    assert_eq!(result.diagnostics.error_count(), 0);
    assert_eq!(result.diagnostics.conflict_count(), 0);
    assert_eq!(result.diagnostics.exit_code(), 0);
}

#[test]
fn conflict_accounting_matches_exit_code() {
    let src = "start ::= expr.\nexpr ::= expr PLUS expr.\nexpr ::= INT.\n";
    let result = analyzed(src);
    assert_eq!(result.diagnostics.exit_code(), (result.diagnostics.error_count() + result.diagnostics.conflict_count()) as i32);
    assert!(result.diagnostics.exit_code() > 0);
}

#[test]
fn reprint_round_trip_preserves_rules_and_precedence() {
    let src = "%left PLUS.\nstart ::= expr.\nexpr ::= expr PLUS expr.\nexpr ::= INT.\n";
    let first = analyzed(src);
    let text = reprint_grammar(&first.grammar);
    let second = analyzed(&text);
    assert_eq!(first.grammar.rules.len(), second.grammar.rules.len());
    for (r1, r2) in first.grammar.rules.iter().zip(second.grammar.rules.iter()) {
        assert_eq!(r1.rhs.len(), r2.rhs.len());
    }
}

#[test]
fn header_idempotence_preserves_mtime() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("g.h");

    let result = analyzed("start ::= A.\n");
    let header = report::header_text(&result.grammar);
    report::write_header_if_changed(&path, &header).unwrap();
    let mtime_before = std::fs::metadata(&path).unwrap().modified().unwrap();

    std::thread::sleep(std::time::Duration::from_millis(10));
    report::write_header_if_changed(&path, &header).unwrap();
    let mtime_after = std::fs::metadata(&path).unwrap().modified().unwrap();

    assert_eq!(mtime_before, mtime_after);
}

#[test]
fn determinism_generates_byte_identical_output() {
    let src = "%left PLUS.\nstart ::= expr.\nexpr ::= expr PLUS expr.\nexpr ::= INT.\n";

    let first = analyzed(src);
    let tmpl = template::parse(template::DEFAULT_TEMPLATE);
    let mut g1 = first.grammar;
    let out1 = codegen::generate(&mut g1, &first.automaton, &first.actions, &tmpl, "g.y", false);

    let second = analyzed(src);
    let mut g2 = second.grammar;
    let out2 = codegen::generate(&mut g2, &second.automaton, &second.actions, &tmpl, "g.y", false);

    assert_eq!(out1, out2);
}

#[test]
fn symbol_ordering_is_ascii_sorted_with_terminals_first() {
    let result = analyzed("start ::= A B.\nb ::= A.\n");
    let names: Vec<&str> = result.grammar.symbols.iter().map(|s| s.name.as_str()).collect();
    let mut sorted_names = names.clone();
    sorted_names.sort();
    assert_eq!(names, sorted_names);

    let nterm = result.grammar.terminal_count();
    for sym in &result.grammar.symbols[..nterm] {
        assert!(sym.is_terminal());
    }
}

#[test]
fn codegen_contains_expected_constants_for_trivial_grammar() {
    let result = analyzed("start ::= A.\n");
    let tmpl = template::parse(template::DEFAULT_TEMPLATE);
    let mut grammar = result.grammar;
    let generated = codegen::generate(&mut grammar, &result.automaton, &result.actions, &tmpl, "g.y", false);
    assert!(generated.contains("#define YYNSTATE 2"));
    assert!(generated.contains("#define YYNRULE 1"));
}
