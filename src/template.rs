//! Template location & parsing.
//!
//! Grounded on the original tool's `find_template`/`parsetemplate`
//! pair: a template is plain text split into literal regions by lines
//! whose first two characters are `%%`. The emitter walks the regions
//! in order, writing a literal region verbatim and, between two
//! regions, writing the block generated for that index.

use std::io;
use std::path::{Path, PathBuf};

/// A bundled copy of the template used when no `-t` flag, sibling
/// `.lt` file, or `PATH` hit is found.
pub const DEFAULT_TEMPLATE: &str = include_str!("../templates/default.lt");

#[derive(Debug, Clone)]
pub enum Segment {
    Literal(String),
    /// 1-based insertion point, matching the component list in §4.K.
    Insert(u32),
}

#[derive(Debug, Clone)]
pub struct Template {
    pub segments: Vec<Segment>,
}

/// Split template text on `%%` lines into alternating literal/insert
/// segments. A template with N `%%` lines yields insertion points
/// `1..=N`.
pub fn parse(text: &str) -> Template {
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut marker = 0u32;
    for line in text.lines() {
        if line.starts_with("%%") {
            segments.push(Segment::Literal(std::mem::take(&mut current)));
            marker += 1;
            segments.push(Segment::Insert(marker));
        } else {
            current.push_str(line);
            current.push('\n');
        }
    }
    segments.push(Segment::Literal(current));
    Template { segments }
}

/// Resolve the template to use, in the order specified: an explicit
/// `-t` path, a sibling `.lt` of the grammar file, a `lempar.lt` found
/// on `PATH`, then the bundled default.
pub fn load(cli_path: Option<&Path>, grammar_path: &Path) -> io::Result<String> {
    if let Some(path) = cli_path {
        return std::fs::read_to_string(path);
    }
    let sibling = grammar_path.with_extension("lt");
    if sibling.is_file() {
        return std::fs::read_to_string(sibling);
    }
    if let Some(found) = search_path("lempar.lt") {
        return std::fs::read_to_string(found);
    }
    Ok(DEFAULT_TEMPLATE.to_string())
}

fn search_path(name: &str) -> Option<PathBuf> {
    let path_var = std::env::var_os("PATH")?;
    std::env::split_paths(&path_var)
        .map(|dir| dir.join(name))
        .find(|candidate| candidate.is_file())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn twelve_markers_yield_twelve_insert_segments() {
        let text = "%%\n".repeat(12);
        let template = parse(&text);
        let inserts = template.segments.iter().filter(|s| matches!(s, Segment::Insert(_))).count();
        assert_eq!(inserts, 12);
    }

    #[test]
    fn literal_text_is_preserved_between_markers() {
        let text = "before\n%%\nmiddle\n%%\nafter\n";
        let template = parse(text);
        let literals: Vec<&str> = template
            .segments
            .iter()
            .filter_map(|s| match s {
                Segment::Literal(t) => Some(t.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(literals, vec!["before\n", "middle\n", "after\n"]);
    }

    #[test]
    fn default_template_has_twelve_markers() {
        let template = parse(DEFAULT_TEMPLATE);
        let inserts = template.segments.iter().filter(|s| matches!(s, Segment::Insert(_))).count();
        assert_eq!(inserts, 12);
    }
}
