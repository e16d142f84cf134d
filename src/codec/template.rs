//! `{variable}` substitution for prompt and command templates.
//!
//! - `{name}` is replaced by the value of `name` (surrounding spaces inside
//!   the braces are ignored)
//! - `{{` renders `{` and `}}` renders `}`
//! - a lone `}` is kept as-is
//!
//! Undefined variables are errors, never empty substitutions.

use std::collections::HashMap;
use thiserror::Error;

/// Errors raised while rendering a template.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    #[error("undefined variable '{name}' at position {position} in template")]
    UndefinedVariable { name: String, position: usize },

    #[error("unmatched '{{' at position {position} in template")]
    UnmatchedBrace { position: usize },

    #[error("empty variable name '{{}}' at position {position} in template")]
    EmptyVariableName { position: usize },
}

/// A piece of a parsed template.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Piece<'a> {
    Text(&'a str),
    Brace(char),
    Variable { name: &'a str, position: usize },
}

fn pieces(template: &str) -> Result<Vec<Piece<'_>>, TemplateError> {
    let mut out = Vec::new();
    let bytes = template.as_bytes();
    let mut text_start = 0;
    let mut i = 0;

    while i < bytes.len() {
        match (bytes[i], bytes.get(i + 1).copied()) {
            (b'{', Some(b'{')) | (b'}', Some(b'}')) => {
                out.push(Piece::Text(&template[text_start..i]));
                out.push(Piece::Brace(bytes[i] as char));
                i += 2;
                text_start = i;
            }
            (b'{', _) => {
                out.push(Piece::Text(&template[text_start..i]));
                let close = template[i + 1..]
                    .find('}')
                    .ok_or(TemplateError::UnmatchedBrace { position: i })?;
                let name = template[i + 1..i + 1 + close].trim();
                if name.is_empty() {
                    return Err(TemplateError::EmptyVariableName { position: i });
                }
                out.push(Piece::Variable { name, position: i });
                i += close + 2;
                text_start = i;
            }
            _ => i += 1,
        }
    }
    out.push(Piece::Text(&template[text_start..]));

    Ok(out)
}

/// Render `template`, substituting every `{name}` from `variables`.
///
/// # Examples
///
/// ```text
/// render_template("Fill {count} hole(s) using {tools}.", &vars)
///   -> "Fill 2 hole(s) using search_tool."
/// ```
pub fn render_template(
    template: &str,
    variables: &HashMap<String, String>,
) -> Result<String, TemplateError> {
    let mut result = String::with_capacity(template.len());

    for piece in pieces(template)? {
        match piece {
            Piece::Text(text) => result.push_str(text),
            Piece::Brace(ch) => result.push(ch),
            Piece::Variable { name, position } => {
                let value = variables
                    .get(name)
                    .ok_or_else(|| TemplateError::UndefinedVariable {
                        name: name.to_string(),
                        position,
                    })?;
                result.push_str(value);
            }
        }
    }

    Ok(result)
}

/// Names of the variables a template references, in order of first use.
pub fn referenced_variables(template: &str) -> Result<Vec<String>, TemplateError> {
    let mut names: Vec<String> = Vec::new();
    for piece in pieces(template)? {
        if let Piece::Variable { name, .. } = piece
            && !names.iter().any(|n| n == name)
        {
            names.push(name.to_string());
        }
    }
    Ok(names)
}

/// Build a variables map from key-value pairs.
pub fn vars<I, K, V>(pairs: I) -> HashMap<String, String>
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}
