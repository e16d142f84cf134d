//! Extraction of holes from annotated ProbLog sources.
//!
//! [`parse`] runs in two passes. The [`scanner`] slices the text into units
//! tagged with their position relative to hole markers; assembly then
//! groups the units of each marker, parses its terms and builds the
//! [`Template`] together with the ordered [`HoleRecord`]s.

mod hole;
mod scanner;
mod template;
mod terms;

#[cfg(test)]
mod tests;

use serde::Serialize;
use thiserror::Error;

pub use hole::{HoleRecord, NetworkDecl, RegenPolicy, hole_hash};
pub use scanner::{Unit, UnitStatus, line_col};
pub use template::Template;

use scanner::{HOLE_OPEN, NETWORK_OPEN};
use template::TemplateBuilder;

/// Errors raised while extracting holes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("unterminated marker starting at line {line}, column {column}")]
    UnterminatedMarker { line: usize, column: usize },

    #[error("mismatched '{found}' inside marker at line {line}, column {column}")]
    MismatchedBracket {
        found: char,
        line: usize,
        column: usize,
    },

    #[error("malformed marker at line {line}")]
    MalformedMarker { line: usize },

    #[error("marker at line {line} declares no terms")]
    EmptyMarker { line: usize },

    #[error("marker at line {line} contains an empty term")]
    EmptyTerm { line: usize },

    #[error(
        "invalid FUP value '{value}' at line {line} (expected True, true, T, False, false or F)"
    )]
    InvalidRegenPolicy { value: String, line: usize },
}

/// Result of extracting holes from a source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParsedSource {
    pub template: Template,
    /// Holes in source order; index `i` fills placeholder `i`.
    pub holes: Vec<HoleRecord>,
    pub networks: Vec<NetworkDecl>,
    /// Whether the source carries its own `query(...)`.
    pub has_executable_query: bool,
}

impl ParsedSource {
    #[cfg(test)]
    pub fn hole(&self, hash: &str) -> Option<&HoleRecord> {
        self.holes.iter().find(|h| h.hash == hash)
    }
}

/// Scan a source into units without assembling a template.
#[cfg(test)]
pub fn scan_units(source: &str) -> Result<Vec<Unit>, ParseError> {
    scanner::scan(source).map(|scan| scan.units)
}

/// Extract holes and network annotations from `source`.
pub fn parse(source: &str) -> Result<ParsedSource, ParseError> {
    let scan = scanner::scan(source)?;

    let mut builder = TemplateBuilder::default();
    let mut holes = Vec::new();
    let mut networks = Vec::new();
    let mut marker = MarkerText::default();

    for unit in &scan.units {
        match unit.status {
            UnitStatus::None => {
                builder.push_fixed(&unit.code);
                builder.push_fixed(&unit.comment);
            }
            UnitStatus::Body => marker.absorb(unit),
            UnitStatus::End => {
                marker.absorb(unit);
                let done = std::mem::take(&mut marker);
                let line = line_col(source, done.offset).0;

                if let Some(content) = done.inner(HOLE_OPEN) {
                    let terms = marker_terms(content, line)?;
                    let hole = HoleRecord::from_terms(&terms, &unit.head, done.comments, line)?;
                    builder.push_hole(hole.comments.clone());
                    holes.push(hole);
                } else if let Some(content) = done.inner(NETWORK_OPEN) {
                    let terms = marker_terms(content, line)?;
                    let decl = NetworkDecl::from_terms(&terms, line);
                    builder.push_inline(&done.comments, &decl.rendered);
                    networks.push(decl);
                } else {
                    return Err(ParseError::MalformedMarker { line });
                }
            }
        }
    }

    Ok(ParsedSource {
        template: builder.finish(),
        holes,
        networks,
        has_executable_query: scan.has_query,
    })
}

fn marker_terms(content: &str, line: usize) -> Result<Vec<terms::Term>, ParseError> {
    let terms = terms::split_terms(content).ok_or(ParseError::EmptyTerm { line })?;
    if terms.is_empty() {
        return Err(ParseError::EmptyMarker { line });
    }
    Ok(terms)
}

/// Code and comments of one marker, gathered from its units.
#[derive(Debug, Default)]
struct MarkerText {
    code: String,
    comments: Vec<String>,
    offset: usize,
}

impl MarkerText {
    fn absorb(&mut self, unit: &Unit) {
        if self.code.is_empty() {
            self.offset = unit.offset;
        }
        self.code.push_str(&unit.code);
        let comment = unit.comment.trim();
        if !comment.is_empty() {
            self.comments.push(comment.to_string());
        }
    }

    /// Content between the opening token and the closing bracket.
    fn inner(&self, open: &str) -> Option<&str> {
        self.code
            .trim_start()
            .strip_prefix(open)
            .and_then(|rest| rest.strip_suffix(')'))
    }
}
