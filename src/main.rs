use clap::crate_authors;
use structopt::StructOpt;

use std::fs;
use std::io::Write;
use std::path::PathBuf;

use lemon::{codegen, report, template};

#[derive(Debug, StructOpt)]
#[structopt(name = "lemon", about = "LALR(1) parser generator", author = crate_authors!())]
struct CliOptions {
    /// Report shows only basis configurations.
    #[structopt(short = "b")]
    basis_only: bool,
    /// Skip action-table compression.
    #[structopt(short = "c")]
    no_compress: bool,
    /// Write outputs to DIR (default: alongside input).
    #[structopt(short = "d", parse(from_os_str))]
    out_dir: Option<PathBuf>,
    /// Only reprint the cleaned grammar on stdout; skip generation.
    #[structopt(short = "g")]
    reprint_only: bool,
    /// Emit a combined-output style and skip the separate header.
    #[structopt(short = "m")]
    combined_header: bool,
    /// Suppress the .out report.
    #[structopt(short = "q")]
    quiet_report: bool,
    /// Print summary statistics to stdout.
    #[structopt(short = "s")]
    statistics: bool,
    /// Template file path.
    #[structopt(short = "t", parse(from_os_str))]
    template_path: Option<PathBuf>,
    /// Print version.
    #[structopt(short = "x")]
    version: bool,
    /// The grammar specification path.
    #[structopt(parse(from_os_str))]
    grammar_path: Option<PathBuf>,
}

fn main() {
    env_logger::init();
    let opts = CliOptions::from_args();

    if opts.version {
        println!("lemon {}", clap::crate_version!());
        std::process::exit(0);
    }

    let grammar_path = match &opts.grammar_path {
        Some(p) => p.clone(),
        None => {
            eprintln!("lemon: no grammar specification given");
            std::process::exit(1);
        }
    };

    let source = match fs::read_to_string(&grammar_path) {
        Ok(text) => text,
        Err(e) => {
            eprintln!("{}: {}", grammar_path.display(), e);
            std::process::exit(1);
        }
    };

    let file = grammar_path.to_string_lossy().to_string();
    log::info!("analyzing {}", file);
    let analyzed = lemon::analyze(&source, &file, opts.no_compress);
    log::debug!(
        "{} states, {} rules, {} errors, {} conflicts",
        analyzed.automaton.states.len(),
        analyzed.grammar.rules.len(),
        analyzed.diagnostics.error_count(),
        analyzed.diagnostics.conflict_count(),
    );

    if opts.reprint_only {
        print!("{}", lemon::reprint_grammar(&analyzed.grammar));
        analyzed.diagnostics.emit(&mut std::io::stderr()).ok();
        std::process::exit(analyzed.diagnostics.exit_code());
    }

    if !opts.quiet_report {
        let out_path = lemon::sibling_output_path(&grammar_path, opts.out_dir.as_deref(), "out");
        match fs::File::create(&out_path) {
            Ok(mut f) => {
                if let Err(e) = report::write_report(&analyzed.grammar, &analyzed.automaton, &analyzed.actions, opts.basis_only, &mut f) {
                    eprintln!("{}: {}", out_path.display(), e);
                    std::process::exit(1);
                }
            }
            Err(e) => {
                eprintln!("{}: {}", out_path.display(), e);
                std::process::exit(1);
            }
        }
    }

    // Code generation runs whenever the grammar parsed cleanly enough for
    // the LR(0)/LALR machinery to produce at least a start state; later
    // semantic errors (an unreduced rule, a missing nonterminal) still
    // surface through the exit code but no longer suppress the outputs.
    if !analyzed.automaton.states.is_empty() {
        let template_text = match template::load(opts.template_path.as_deref(), &grammar_path) {
            Ok(text) => text,
            Err(e) => {
                eprintln!("template: {}", e);
                std::process::exit(1);
            }
        };
        let tmpl = template::parse(&template_text);
        let mut grammar = analyzed.grammar;
        let generated = codegen::generate(&mut grammar, &analyzed.automaton, &analyzed.actions, &tmpl, &file, opts.combined_header);

        let c_path = lemon::sibling_output_path(&grammar_path, opts.out_dir.as_deref(), "c");
        if let Err(e) = fs::write(&c_path, generated) {
            eprintln!("{}: {}", c_path.display(), e);
            std::process::exit(1);
        }

        if !opts.combined_header {
            let h_path = lemon::sibling_output_path(&grammar_path, opts.out_dir.as_deref(), "h");
            let header = report::header_text(&grammar);
            if let Err(e) = report::write_header_if_changed(&h_path, &header) {
                eprintln!("{}: {}", h_path.display(), e);
                std::process::exit(1);
            }
        }

        if opts.statistics {
            report::write_statistics(&grammar, &analyzed.automaton, analyzed.diagnostics.conflict_count(), &mut std::io::stdout()).ok();
        }
    }

    if analyzed.diagnostics.conflict_count() > 0 {
        eprintln!("{} parsing conflicts.", analyzed.diagnostics.conflict_count());
    }

    analyzed.diagnostics.emit(&mut std::io::stderr()).ok();
    let code = analyzed.diagnostics.exit_code();
    let _ = std::io::stdout().flush();
    std::process::exit(code);
}
