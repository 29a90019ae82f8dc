//! The grammar-file parser: a state machine that turns the token
//! stream from [`crate::lexer`] into a [`RawGrammar`].
//!
//! Grounded directly on `parseonetoken`/`Parse` in the original tool
//! (tools/lemon/lemon.c): the same state names, the same resync
//! behaviour on a malformed rule or declaration, and the same
//! declaration-keyword dispatch table. The token stream here has
//! already been split into `Ident`/`Code`/`Str`/punctuation by the
//! lexer, so the character-class tests the original performs inline
//! (`safe_isalpha`, `safe_isupper`, ...) collapse into matches on
//! `TokenKind`.

use crate::diagnostics::Diagnostics;
use crate::grammar::{Directives, RawGrammar, RuleBuilder};
use crate::intern::Associativity;
use crate::lexer::{LexError, Lexer, Token, TokenKind};
use crate::location::Location;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DeclArgSlot {
    Name,
    Include,
    Code,
    TokenDestructor,
    TokenPrefix,
    SyntaxError,
    ParseAccept,
    ParseFailure,
    StackOverflow,
    ExtraArgument,
    TokenType,
    StackSize,
    StartSymbol,
    SymbolDestructor(usize),
    SymbolDatatype(usize),
}

enum State {
    WaitingForDeclOrRule,
    WaitingForDeclKeyword,
    WaitingForDeclArg(DeclArgSlot, &'static str),
    WaitingForPrecedenceSymbol(Associativity),
    WaitingForDestructorSymbol,
    WaitingForDatatypeSymbol,
    WaitingForArrow { lhs: usize, lhs_alias: Option<String> },
    LhsAlias1 { lhs: usize },
    LhsAlias2 { lhs: usize, alias: String },
    InRhs(RuleBuilder),
    RhsAlias1(RuleBuilder),
    RhsAlias2(RuleBuilder, String),
    PrecedenceMark1,
    PrecedenceMark2,
    ResyncAfterRuleError,
    ResyncAfterDeclError,
}

/// Parses the whole grammar file text into a [`RawGrammar`], recording
/// errors and warnings on `diag` as it goes. Never panics on
/// malformed input: it resyncs at the next `.` or `%` the way the
/// original parser does.
pub fn parse_grammar(source: &str, file: &str, diag: &mut Diagnostics) -> RawGrammar {
    let mut raw = RawGrammar::default();
    let mut state = State::WaitingForDeclOrRule;
    let mut prev_rule: Option<usize> = None;
    let mut prec_counter: u32 = 0;

    let mut lexer = Lexer::new(source);
    loop {
        let token = match lexer.next_token() {
            Ok(Some(t)) => t,
            Ok(None) => break,
            Err(e) => {
                report_lex_error(&e, file, diag);
                break;
            }
        };
        step(&mut state, token, &mut raw, &mut prev_rule, &mut prec_counter, file, diag);
    }

    match state {
        State::WaitingForDeclOrRule | State::ResyncAfterDeclError | State::ResyncAfterRuleError => {}
        _ => diag.error(file, None, "Unexpected end of file while parsing the grammar.".to_string()),
    }

    raw
}

fn report_lex_error(err: &LexError, file: &str, diag: &mut Diagnostics) {
    let (loc, msg) = match err {
        LexError::UnterminatedString(loc) => (
            *loc,
            "String starting on this line is not terminated before the end of the file.".to_string(),
        ),
        LexError::UnterminatedCodeBlock(loc) => (
            *loc,
            "C code starting on this line is not terminated before the end of the file.".to_string(),
        ),
        LexError::UnterminatedComment(loc) => (*loc, "Comment starting on this line is not terminated.".to_string()),
    };
    diag.error(file, Some(loc.line), msg);
}

fn is_lower_ident(s: &str) -> bool {
    s.chars().next().map_or(false, |c| c.is_ascii_lowercase() || c == '_')
}

fn is_upper_ident(s: &str) -> bool {
    s.chars().next().map_or(false, |c| c.is_ascii_uppercase())
}

/// Record the first location a symbol is named in a declaration
/// context (LHS of a rule, precedence mark, `%destructor`/`%type`)
/// rather than merely referenced on a RHS; feeds the unused-symbol
/// warning in `warn_unused_symbols`.
fn mark_defined(sym: &mut crate::intern::Symbol, loc: Location) {
    if sym.defined_at.is_none() {
        sym.defined_at = Some(loc);
    }
}

#[allow(clippy::too_many_arguments)]
fn step(
    state: &mut State,
    token: Token,
    raw: &mut RawGrammar,
    prev_rule: &mut Option<usize>,
    prec_counter: &mut u32,
    file: &str,
    diag: &mut Diagnostics,
) {
    let loc = token.location;
    let next = std::mem::replace(state, State::WaitingForDeclOrRule);
    *state = match next {
        State::WaitingForDeclOrRule => match &token.kind {
            TokenKind::Percent => State::WaitingForDeclKeyword,
            // A declaration that takes a single argument (as opposed
            // to %left/%right/%nonassoc's token list) may optionally
            // be closed with a trailing '.'; harmless to accept here
            // since a bare '.' can otherwise never legally start a
            // rule or another declaration.
            TokenKind::Dot => State::WaitingForDeclOrRule,
            TokenKind::Ident(name) if is_lower_ident(name) => {
                let slot = raw.symbols.intern(name);
                mark_defined(raw.symbols.get_mut(slot), loc);
                State::WaitingForArrow { lhs: slot, lhs_alias: None }
            }
            TokenKind::Code(text) => {
                attach_trailing_code(raw, *prev_rule, text.clone(), loc, file, diag);
                State::WaitingForDeclOrRule
            }
            TokenKind::LBracket => State::PrecedenceMark1,
            other => {
                diag.error(
                    file,
                    Some(loc.line),
                    format!("Token \"{}\" should be either \"%\" or a nonterminal name.", describe(other)),
                );
                State::WaitingForDeclOrRule
            }
        },
        State::PrecedenceMark1 => {
            match &token.kind {
                TokenKind::Ident(name) if is_upper_ident(name) => {
                    if let Some(idx) = *prev_rule {
                        if raw.rules[idx].precedence_symbol.is_some() {
                            diag.error(
                                file,
                                Some(loc.line),
                                "Precedence mark on this line is not the first to follow the previous rule."
                                    .to_string(),
                            );
                        } else {
                            let slot = raw.symbols.intern(name);
                            raw.symbols.get_mut(slot).used_at.push(loc);
                            raw.rules[idx].precedence_symbol = Some(slot);
                        }
                    } else {
                        diag.error(
                            file,
                            Some(loc.line),
                            format!("There is no prior rule to assign precedence \"[{}]\".", name),
                        );
                    }
                }
                _ => {
                    diag.error(file, Some(loc.line), "The precedence symbol must be a terminal.".to_string());
                }
            }
            State::PrecedenceMark2
        }
        State::PrecedenceMark2 => {
            if token.kind != TokenKind::RBracket {
                diag.error(file, Some(loc.line), "Missing \"]\" on precedence mark.".to_string());
            }
            State::WaitingForDeclOrRule
        }
        State::WaitingForArrow { lhs, lhs_alias } => match &token.kind {
            TokenKind::Arrow => State::InRhs(RuleBuilder {
                lhs,
                lhs_alias,
                rhs: Vec::new(),
                precedence_symbol: None,
                action: None,
                line: loc.line,
            }),
            TokenKind::LParen if lhs_alias.is_none() => State::LhsAlias1 { lhs },
            _ => {
                diag.error(
                    file,
                    Some(loc.line),
                    format!(
                        "Expected to see a \"::=\" following the LHS symbol \"{}\".",
                        raw.symbols.get(lhs).name
                    ),
                );
                State::ResyncAfterRuleError
            }
        },
        State::LhsAlias1 { lhs } => match &token.kind {
            TokenKind::Ident(name) => State::LhsAlias2 { lhs, alias: name.clone() },
            _ => {
                diag.error(
                    file,
                    Some(loc.line),
                    format!("\"{}\" is not a valid alias for the LHS \"{}\"", describe(&token.kind), raw.symbols.get(lhs).name),
                );
                State::ResyncAfterRuleError
            }
        },
        State::LhsAlias2 { lhs, alias } => match &token.kind {
            TokenKind::RParen => State::WaitingForArrow { lhs, lhs_alias: Some(alias) },
            _ => {
                diag.error(file, Some(loc.line), format!("Missing \")\" following LHS alias name \"{}\".", alias));
                State::ResyncAfterRuleError
            }
        },
        State::InRhs(mut rule) => match &token.kind {
            TokenKind::Dot => {
                rule.line = loc.line;
                let idx = raw.rules.len();
                for rhs in &rule.rhs {
                    raw.symbols.get_mut(rhs.0).used_at.push(loc);
                }
                raw.rules.push(rule);
                *prev_rule = Some(idx);
                State::WaitingForDeclOrRule
            }
            TokenKind::Ident(name) => {
                let slot = raw.symbols.intern(name);
                rule.rhs.push((slot, None));
                State::InRhs(rule)
            }
            TokenKind::LParen if !rule.rhs.is_empty() => State::RhsAlias1(rule),
            other => {
                diag.error(file, Some(loc.line), format!("Illegal character on RHS of rule: \"{}\".", describe(other)));
                State::ResyncAfterRuleError
            }
        },
        State::RhsAlias1(rule) => match &token.kind {
            TokenKind::Ident(name) => State::RhsAlias2(rule, name.clone()),
            other => {
                let symbol_name = rule.rhs.last().map(|(s, _)| raw.symbols.get(*s).name.clone()).unwrap_or_default();
                diag.error(
                    file,
                    Some(loc.line),
                    format!("\"{}\" is not a valid alias for the RHS symbol \"{}\"", describe(other), symbol_name),
                );
                State::ResyncAfterRuleError
            }
        },
        State::RhsAlias2(mut rule, alias) => match &token.kind {
            TokenKind::RParen => {
                if let Some(last) = rule.rhs.last_mut() {
                    last.1 = Some(alias);
                }
                State::InRhs(rule)
            }
            _ => {
                diag.error(file, Some(loc.line), format!("Missing \")\" following RHS alias name \"{}\".", alias));
                State::ResyncAfterRuleError
            }
        },
        State::WaitingForDeclKeyword => match &token.kind {
            TokenKind::Ident(name) => decl_keyword(name, loc, prec_counter, file, diag),
            other => {
                diag.error(file, Some(loc.line), format!("Illegal declaration keyword: \"{}\".", describe(other)));
                State::ResyncAfterDeclError
            }
        },
        State::WaitingForDestructorSymbol => match &token.kind {
            TokenKind::Ident(name) => {
                let slot = raw.symbols.intern(name);
                mark_defined(raw.symbols.get_mut(slot), loc);
                State::WaitingForDeclArg(DeclArgSlot::SymbolDestructor(slot), "destructor")
            }
            _ => {
                diag.error(file, Some(loc.line), "Symbol name missing after %destructor keyword".to_string());
                State::ResyncAfterDeclError
            }
        },
        State::WaitingForDatatypeSymbol => match &token.kind {
            TokenKind::Ident(name) => {
                let slot = raw.symbols.intern(name);
                mark_defined(raw.symbols.get_mut(slot), loc);
                State::WaitingForDeclArg(DeclArgSlot::SymbolDatatype(slot), "type")
            }
            _ => {
                diag.error(file, Some(loc.line), "Symbol name missing after %type keyword".to_string());
                State::ResyncAfterDeclError
            }
        },
        State::WaitingForPrecedenceSymbol(assoc) => match &token.kind {
            TokenKind::Dot => State::WaitingForDeclOrRule,
            TokenKind::Ident(name) if is_upper_ident(name) => {
                let slot = raw.symbols.intern(name);
                let sym = raw.symbols.get_mut(slot);
                mark_defined(sym, loc);
                if sym.precedence.is_some() {
                    diag.error(file, Some(loc.line), format!("Symbol \"{}\" has already been given a precedence.", name));
                } else {
                    sym.precedence = Some(*prec_counter);
                    sym.associativity = assoc;
                }
                State::WaitingForPrecedenceSymbol(assoc)
            }
            other => {
                diag.error(file, Some(loc.line), format!("Can't assign a precedence to \"{}\".", describe(other)));
                State::WaitingForPrecedenceSymbol(assoc)
            }
        },
        State::WaitingForDeclArg(slot, keyword) => {
            let text = match &token.kind {
                TokenKind::Ident(s) => Some(s.clone()),
                TokenKind::Str(s) => Some(s.clone()),
                TokenKind::Code(s) => Some(s.clone()),
                _ => None,
            };
            match text {
                Some(text) => {
                    store_decl_arg(raw, slot, text, loc, diag, file, keyword);
                    State::WaitingForDeclOrRule
                }
                None => {
                    diag.error(file, Some(loc.line), format!("Illegal argument to %{}: {}", keyword, describe(&token.kind)));
                    State::ResyncAfterDeclError
                }
            }
        }
        State::ResyncAfterRuleError => match &token.kind {
            TokenKind::Dot => State::WaitingForDeclOrRule,
            _ => State::ResyncAfterRuleError,
        },
        State::ResyncAfterDeclError => match &token.kind {
            TokenKind::Dot => State::WaitingForDeclOrRule,
            TokenKind::Percent => State::WaitingForDeclKeyword,
            _ => State::ResyncAfterDeclError,
        },
    };
}

fn describe(kind: &TokenKind) -> String {
    match kind {
        TokenKind::Percent => "%".to_string(),
        TokenKind::Arrow => "::=".to_string(),
        TokenKind::Dot => ".".to_string(),
        TokenKind::LParen => "(".to_string(),
        TokenKind::RParen => ")".to_string(),
        TokenKind::LBracket => "[".to_string(),
        TokenKind::RBracket => "]".to_string(),
        TokenKind::Ident(s) => s.clone(),
        TokenKind::Code(_) => "{...}".to_string(),
        TokenKind::Str(s) => format!("\"{}\"", s),
        TokenKind::Punct(c) => c.to_string(),
    }
}

fn decl_keyword(name: &str, loc: Location, prec_counter: &mut u32, file: &str, diag: &mut Diagnostics) -> State {
    match name {
        "name" => State::WaitingForDeclArg(DeclArgSlot::Name, "name"),
        "include" => State::WaitingForDeclArg(DeclArgSlot::Include, "include"),
        "code" => State::WaitingForDeclArg(DeclArgSlot::Code, "code"),
        "token_destructor" => State::WaitingForDeclArg(DeclArgSlot::TokenDestructor, "token_destructor"),
        "token_prefix" => State::WaitingForDeclArg(DeclArgSlot::TokenPrefix, "token_prefix"),
        "syntax_error" => State::WaitingForDeclArg(DeclArgSlot::SyntaxError, "syntax_error"),
        "parse_accept" => State::WaitingForDeclArg(DeclArgSlot::ParseAccept, "parse_accept"),
        "parse_failure" => State::WaitingForDeclArg(DeclArgSlot::ParseFailure, "parse_failure"),
        "stack_overflow" => State::WaitingForDeclArg(DeclArgSlot::StackOverflow, "stack_overflow"),
        "extra_argument" => State::WaitingForDeclArg(DeclArgSlot::ExtraArgument, "extra_argument"),
        "token_type" => State::WaitingForDeclArg(DeclArgSlot::TokenType, "token_type"),
        "stack_size" => State::WaitingForDeclArg(DeclArgSlot::StackSize, "stack_size"),
        "start_symbol" => State::WaitingForDeclArg(DeclArgSlot::StartSymbol, "start_symbol"),
        "left" => {
            *prec_counter += 1;
            State::WaitingForPrecedenceSymbol(Associativity::Left)
        }
        "right" => {
            *prec_counter += 1;
            State::WaitingForPrecedenceSymbol(Associativity::Right)
        }
        "nonassoc" => {
            *prec_counter += 1;
            State::WaitingForPrecedenceSymbol(Associativity::NonAssoc)
        }
        "destructor" => State::WaitingForDestructorSymbol,
        "type" => State::WaitingForDatatypeSymbol,
        other => {
            diag.error(file, Some(loc.line), format!("Unknown declaration keyword: \"%{}\".", other));
            State::ResyncAfterDeclError
        }
    }
}

fn store_decl_arg(
    raw: &mut RawGrammar,
    slot: DeclArgSlot,
    text: String,
    loc: Location,
    diag: &mut Diagnostics,
    file: &str,
    keyword: &str,
) {
    macro_rules! set_once {
        ($field:expr) => {
            if $field.is_some() {
                diag.error(
                    file,
                    Some(loc.line),
                    format!("The argument \"{}\" to declaration \"%{}\" is not the first.", text, keyword),
                );
            } else {
                $field = Some(text);
            }
        };
    }
    let d = &mut raw.directives;
    match slot {
        DeclArgSlot::Name => set_once!(d.name),
        DeclArgSlot::Include => set_once!(d.include),
        DeclArgSlot::Code => set_once!(d.code),
        DeclArgSlot::TokenPrefix => set_once!(d.token_prefix),
        DeclArgSlot::ExtraArgument => set_once!(d.extra_argument),
        DeclArgSlot::TokenType => set_once!(d.token_type),
        DeclArgSlot::StackSize => set_once!(d.stack_size),
        DeclArgSlot::StartSymbol => set_once!(d.start_symbol),
        DeclArgSlot::TokenDestructor => {
            if d.token_destructor.is_some() {
                diag.error(file, Some(loc.line), format!("The argument \"{}\" to declaration \"%{}\" is not the first.", text, keyword));
            } else {
                d.token_destructor = Some((text, loc));
            }
        }
        DeclArgSlot::SyntaxError => set_code_once(&mut d.syntax_error, text, loc, keyword, file, diag),
        DeclArgSlot::ParseAccept => set_code_once(&mut d.parse_accept, text, loc, keyword, file, diag),
        DeclArgSlot::ParseFailure => set_code_once(&mut d.parse_failure, text, loc, keyword, file, diag),
        DeclArgSlot::StackOverflow => set_code_once(&mut d.stack_overflow, text, loc, keyword, file, diag),
        DeclArgSlot::SymbolDestructor(s) => {
            let sym = raw.symbols.get_mut(s);
            if sym.destructor.is_some() {
                diag.error(file, Some(loc.line), format!("The argument \"{}\" to declaration \"%{}\" is not the first.", text, keyword));
            } else {
                sym.destructor = Some((text, loc));
            }
        }
        DeclArgSlot::SymbolDatatype(s) => {
            let sym = raw.symbols.get_mut(s);
            if sym.value_type.is_some() {
                diag.error(file, Some(loc.line), format!("The argument \"{}\" to declaration \"%{}\" is not the first.", text, keyword));
            } else {
                sym.value_type = Some(text);
            }
        }
    }
}

fn set_code_once(
    field: &mut Option<(String, Location)>,
    text: String,
    loc: Location,
    keyword: &str,
    file: &str,
    diag: &mut Diagnostics,
) {
    if field.is_some() {
        diag.error(file, Some(loc.line), format!("The argument \"{}\" to declaration \"%{}\" is not the first.", text, keyword));
    } else {
        *field = Some((text, loc));
    }
}

fn attach_trailing_code(
    raw: &mut RawGrammar,
    prev_rule: Option<usize>,
    text: String,
    loc: Location,
    file: &str,
    diag: &mut Diagnostics,
) {
    match prev_rule {
        None => diag.error(
            file,
            Some(loc.line),
            "There is not a prior rule upon which to attach the code fragment which begins on this line.".to_string(),
        ),
        Some(idx) => {
            if raw.rules[idx].action.is_some() {
                diag.error(
                    file,
                    Some(loc.line),
                    "Code fragment beginning on this line is not the first to follow the previous rule.".to_string(),
                );
            } else {
                raw.rules[idx].action = Some((text, loc));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(src: &str) -> (RawGrammar, Diagnostics) {
        let mut diag = Diagnostics::new();
        let raw = parse_grammar(src, "g.y", &mut diag);
        (raw, diag)
    }

    #[test]
    fn parses_simple_rule() {
        let (raw, diag) = parse("start ::= A B.\n");
        assert_eq!(diag.error_count(), 0);
        assert_eq!(raw.rules.len(), 1);
        assert_eq!(raw.rules[0].rhs.len(), 2);
    }

    #[test]
    fn parses_declarations_and_precedence() {
        let (raw, diag) = parse(
            "%name MyParser.\n%token_type {i64}.\n%left PLUS MINUS.\nexpr ::= expr PLUS expr.\nexpr ::= NUM.\n",
        );
        assert_eq!(diag.error_count(), 0);
        assert_eq!(raw.directives.name.as_deref(), Some("MyParser"));
        assert_eq!(raw.directives.token_type.as_deref(), Some("i64"));
        let plus = raw.symbols.lookup("PLUS").unwrap();
        assert_eq!(raw.symbols.get(plus).precedence, Some(1));
    }

    #[test]
    fn rule_action_attaches_to_previous_rule() {
        let (raw, diag) = parse("start ::= A. { do_thing(); }\n");
        assert_eq!(diag.error_count(), 0);
        assert!(raw.rules[0].action.is_some());
    }

    #[test]
    fn aliases_are_recorded() {
        let (raw, diag) = parse("start(s) ::= A(a) B(b).\n");
        assert_eq!(diag.error_count(), 0);
        assert_eq!(raw.rules[0].lhs_alias.as_deref(), Some("s"));
        assert_eq!(raw.rules[0].rhs[0].1.as_deref(), Some("a"));
        assert_eq!(raw.rules[0].rhs[1].1.as_deref(), Some("b"));
    }

    #[test]
    fn malformed_rule_resyncs_at_dot() {
        let (raw, diag) = parse("start ::= A ? B.\nstart2 ::= C.\n");
        assert!(diag.error_count() >= 1);
        assert_eq!(raw.rules.len(), 1);
        assert_eq!(raw.rules[0].lhs, raw.symbols.lookup("start2").unwrap());
    }

    #[test]
    fn unknown_declaration_keyword_resyncs() {
        let (raw, diag) = parse("%bogus foo.\nstart ::= A.\n");
        assert!(diag.error_count() >= 1);
        assert_eq!(raw.rules.len(), 1);
    }

    #[test]
    fn precedence_mark_assigns_rule_precedence() {
        let (raw, diag) = parse("%left PLUS.\nexpr ::= expr PLUS expr [PLUS].\n");
        assert_eq!(diag.error_count(), 0);
        let plus = raw.symbols.lookup("PLUS").unwrap();
        assert_eq!(raw.rules[0].precedence_symbol, Some(plus));
    }
}
