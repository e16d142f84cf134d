//! Splitting marker content into `key[:value]` terms.

/// One top-level term of a marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Term {
    pub key: String,
    /// Value after the first top-level `:`, trimmed and unquoted.
    pub value: Option<String>,
}

/// Split marker content on top-level commas.
///
/// Commas inside `[...]`, `(...)` or double quotes do not split. Returns
/// `None` when a term is empty (`a,,b` or a trailing comma); an entirely
/// blank content yields an empty list.
pub fn split_terms(content: &str) -> Option<Vec<Term>> {
    if content.trim().is_empty() {
        return Some(Vec::new());
    }

    let mut terms = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    let mut quoted = false;
    let mut escaped = false;

    for ch in content.chars() {
        if escaped {
            escaped = false;
            current.push(ch);
            continue;
        }
        match ch {
            '\\' => escaped = true,
            '"' => quoted = !quoted,
            '(' | '[' if !quoted => depth += 1,
            ')' | ']' if !quoted => depth = depth.saturating_sub(1),
            ',' if !quoted && depth == 0 => {
                terms.push(parse_term(&current)?);
                current.clear();
                continue;
            }
            _ => {}
        }
        current.push(ch);
    }
    terms.push(parse_term(&current)?);

    Some(terms)
}

fn parse_term(raw: &str) -> Option<Term> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    match top_level_colon(raw) {
        Some(idx) => Some(Term {
            key: raw[..idx].trim().to_string(),
            value: Some(unquote(raw[idx + 1..].trim()).to_string()),
        }),
        None => Some(Term {
            key: raw.to_string(),
            value: None,
        }),
    }
}

fn top_level_colon(raw: &str) -> Option<usize> {
    let mut quoted = false;
    let mut escaped = false;
    for (idx, ch) in raw.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match ch {
            '\\' => escaped = true,
            '"' => quoted = !quoted,
            ':' if !quoted => return Some(idx),
            _ => {}
        }
    }
    None
}

fn unquote(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value)
}
