//! Dynamic requirement slots and external queries.

use regex::Regex;
use std::collections::BTreeMap;
use std::sync::LazyLock;
use tracing::warn;

/// `/* Key */` slot inside a requirement.
static SLOT_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/\*\s*(\w+)\s*\*/").expect("Invalid slot regex"));

/// A neural predicate declaration line, `nn(...) :: head.`.
static NETWORK_LINE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*nn\s*\(.*\)\s*::\s*\w+.*\.\s*$").expect("Invalid network line regex")
});

/// Replace every `/* Key */` slot of `requirement` with its value.
///
/// Slots whose key has no value are kept and logged.
pub fn fill_slots(requirement: &str, values: &BTreeMap<String, String>) -> String {
    SLOT_REGEX
        .replace_all(requirement, |caps: &regex::Captures<'_>| {
            let key = &caps[1];
            match values.get(key) {
                Some(value) => value.clone(),
                None => {
                    warn!(key = %key, "no value for dynamic slot, leaving it in place");
                    caps[0].to_string()
                }
            }
        })
        .into_owned()
}

/// Keys of the slots in `requirement`.
pub fn slot_keys(requirement: &str) -> Vec<String> {
    SLOT_REGEX
        .captures_iter(requirement)
        .map(|c| c[1].to_string())
        .collect()
}

/// Rewrite a program for evaluation against an external query.
///
/// Every `nn(...) :: ...` line is removed and `query` is appended.
pub fn with_external_query(program: &str, query: &str) -> String {
    let mut lines: Vec<&str> = program
        .split('\n')
        .filter(|line| !NETWORK_LINE_REGEX.is_match(line))
        .collect();
    lines.push(query);
    lines.join("\n")
}

/// Parse `KEY=VALUE` pairs as given on the command line.
pub fn parse_assignments<I, S>(pairs: I) -> Result<BTreeMap<String, String>, String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut values = BTreeMap::new();
    for pair in pairs {
        let pair = pair.as_ref();
        let (key, value) = pair
            .split_once('=')
            .ok_or_else(|| format!("expected KEY=VALUE, got '{}'", pair))?;
        let key = key.trim();
        if key.is_empty() {
            return Err(format!("empty key in '{}'", pair));
        }
        values.insert(key.to_string(), value.to_string());
    }
    Ok(values)
}
