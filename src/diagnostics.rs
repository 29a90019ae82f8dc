//! Error/warning accumulation and 79-column wrapped stderr rendering.
//!
//! Grounded on the original tool's `ErrorMsg`/`findbreak` pair: each
//! message is prefixed with `file:line: `, then greedily broken near
//! column 79 at a space, or just past a hyphen, never mid-word.

use std::fmt;

const LINE_WIDTH: usize = 79;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "Error"),
            Severity::Warning => write!(f, "Warning"),
        }
    }
}

#[derive(Debug, Clone)]
struct Entry {
    file: String,
    line: Option<u32>,
    severity: Severity,
    message: String,
}

/// Accumulates every error/warning raised during analysis and renders
/// them, wrapped to `LINE_WIDTH` columns, when asked.
#[derive(Debug, Default)]
pub struct Diagnostics {
    entries: Vec<Entry>,
    error_count: u32,
    warning_count: u32,
    conflict_count: u32,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn error(&mut self, file: &str, line: Option<u32>, message: impl Into<String>) {
        self.error_count += 1;
        self.entries.push(Entry {
            file: file.to_string(),
            line,
            severity: Severity::Error,
            message: message.into(),
        });
    }

    pub fn warning(&mut self, file: &str, line: Option<u32>, message: impl Into<String>) {
        self.warning_count += 1;
        self.entries.push(Entry {
            file: file.to_string(),
            line,
            severity: Severity::Warning,
            message: message.into(),
        });
    }

    pub fn record_conflict(&mut self) {
        self.conflict_count += 1;
    }

    pub fn error_count(&self) -> u32 {
        self.error_count
    }

    pub fn warning_count(&self) -> u32 {
        self.warning_count
    }

    pub fn conflict_count(&self) -> u32 {
        self.conflict_count
    }

    pub fn has_errors(&self) -> bool {
        self.error_count > 0
    }

    /// Process exit code: errors plus unresolved conflicts (warnings
    /// never contribute).
    pub fn exit_code(&self) -> i32 {
        (self.error_count + self.conflict_count) as i32
    }

    /// Write every accumulated entry to `out`, in the order raised.
    pub fn emit(&self, out: &mut dyn std::io::Write) -> std::io::Result<()> {
        for entry in &self.entries {
            let prefix = match entry.line {
                Some(line) => format!("{}:{}: ", entry.file, line),
                None => format!("{}: ", entry.file),
            };
            let message = entry.message.trim_end_matches('.');
            let text = format!("{}: {}.", entry.severity, message);
            for wrapped in wrap_message(&text, LINE_WIDTH.saturating_sub(prefix.len()).max(10)) {
                writeln!(out, "{}{}", prefix, wrapped)?;
            }
        }
        Ok(())
    }
}

/// Find the best break point in `msg[..=max]`: prefer the last space,
/// fall back to just past a hyphen, fall back to `max` itself (hard
/// break). Mirrors the original source's `findbreak`.
fn find_break(msg: &[char], max: usize) -> usize {
    let max = max.min(msg.len());
    let mut spot = max;
    for (i, &c) in msg.iter().enumerate().take(max + 1) {
        if c == '\n' {
            return i;
        }
        if c == '-' && i < max.saturating_sub(1) {
            spot = i + 1;
        }
        if c == ' ' {
            spot = i;
        }
        if i == msg.len() {
            return i;
        }
    }
    spot
}

fn wrap_message(message: &str, width: usize) -> Vec<String> {
    let chars: Vec<char> = message.trim_end_matches('\n').chars().collect();
    if chars.is_empty() {
        return vec![String::new()];
    }
    let mut lines = Vec::new();
    let mut base = 0;
    while base < chars.len() {
        let end = find_break(&chars[base..], width).max(1).min(chars.len() - base);
        let line: String = chars[base..base + end].iter().collect();
        lines.push(line);
        let mut restart = base + end;
        while restart < chars.len() && chars[restart] == ' ' {
            restart += 1;
        }
        if restart <= base {
            break;
        }
        base = restart;
    }
    lines
}
