//! Parsing generator and critic responses.
//!
//! Both collaborators answer with fenced blocks holding one JSON object
//! each. Decoding is strict first; when a block is not valid JSON (raw
//! newlines inside strings are common) each field is located by its key.

use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::LazyLock;
use tracing::warn;

static HASH_FIELD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""HASH"\s*:\s*"([^"]+)""#).expect("Invalid HASH regex"));
static CODE_FIELD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#""Code"\s*:\s*"((?:\\.|[^"\\])*)""#).expect("Invalid Code regex")
});
static SUMMARY_FIELD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#""ErrorSummary"\s*:\s*"((?:\\.|[^"\\])*)""#).expect("Invalid ErrorSummary regex")
});
static FIX_FIELD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#""SuggestedFix"\s*:\s*"((?:\\.|[^"\\])*)""#).expect("Invalid SuggestedFix regex")
});
static REGEN_FIELD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#""NeedRegenerate"\s*:\s*"?'?([A-Za-z]+)"#).expect("Invalid NeedRegenerate regex")
});

const FENCE: &str = "```";

/// One fenced block of a response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FencedBlock {
    /// Info string after the opening fence (`problog`, `report`, ...).
    pub tag: String,
    pub body: String,
}

/// Find every fenced block in `text`.
///
/// Fences inside JSON strings do not close a block. Backslash escapes are
/// skipped both inside and outside strings.
pub fn fenced_blocks(text: &str) -> Vec<FencedBlock> {
    let mut blocks = Vec::new();
    let mut rest = text;

    while let Some(open) = rest.find(FENCE) {
        let after = &rest[open + FENCE.len()..];
        let Some(newline) = after.find('\n') else {
            break;
        };
        let tag = after[..newline].trim().to_string();
        let body = &after[newline + 1..];

        let Some(close) = closing_fence(body).or_else(|| body.find(FENCE)) else {
            warn!(tag = %tag, "dropping unterminated fenced block");
            break;
        };
        blocks.push(FencedBlock {
            tag,
            body: body[..close].trim().to_string(),
        });
        rest = &body[close + FENCE.len()..];
    }

    blocks
}

fn closing_fence(body: &str) -> Option<usize> {
    let bytes = body.as_bytes();
    let mut quoted = false;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => {
                i += 2;
                continue;
            }
            b'"' => quoted = !quoted,
            b'`' if !quoted && body[i..].starts_with(FENCE) => return Some(i),
            _ => {}
        }
        i += 1;
    }
    None
}

/// Undo the JSON escapes a model is likely to emit.
pub fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('"') => out.push('"'),
            Some('\\') => out.push('\\'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

#[derive(Debug, Deserialize)]
struct CodeBlock {
    #[serde(rename = "HASH")]
    hash: String,
    #[serde(rename = "Code")]
    code: String,
}

fn decode_code_block(body: &str) -> Option<Vec<(String, String)>> {
    if let Ok(block) = serde_json::from_str::<CodeBlock>(body) {
        return Some(vec![(block.hash, block.code)]);
    }
    if let Ok(list) = serde_json::from_str::<Vec<CodeBlock>>(body) {
        return Some(list.into_iter().map(|b| (b.hash, b.code)).collect());
    }

    let hash = HASH_FIELD.captures(body)?.get(1)?.as_str().trim().to_string();
    let code = CODE_FIELD.captures(body)?.get(1)?.as_str();
    Some(vec![(hash, unescape(code))])
}

/// Extract `hash -> code` fragments from a generator response.
///
/// Every fenced block is considered regardless of its tag. A later block
/// for the same hash replaces an earlier one.
pub fn parse_fragments(response: &str) -> BTreeMap<String, String> {
    let mut fragments = BTreeMap::new();
    for block in fenced_blocks(response) {
        match decode_code_block(&block.body) {
            Some(pairs) => fragments.extend(pairs),
            None => warn!(tag = %block.tag, "dropping undecodable code block"),
        }
    }
    fragments
}

/// The critic's decision on one fragment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Resolved,
    NeedsRegeneration,
}

/// A decoded critic report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub hash: String,
    pub error_summary: String,
    pub suggested_fix: String,
    pub verdict: Verdict,
}

impl Report {
    /// Feedback text handed to the generator on the next round.
    pub fn feedback(&self) -> String {
        let mut parts = Vec::new();
        if !self.error_summary.trim().is_empty() {
            parts.push(format!("Problem: {}", self.error_summary.trim()));
        }
        if !self.suggested_fix.trim().is_empty() {
            parts.push(format!("Suggested fix: {}", self.suggested_fix.trim()));
        }
        if parts.is_empty() {
            "The previous code was rejected.".to_string()
        } else {
            parts.join("\n")
        }
    }
}

#[derive(Debug, Deserialize)]
struct ReportBlock {
    #[serde(rename = "HASH")]
    hash: String,
    #[serde(rename = "ErrorSummary", default)]
    error_summary: Option<String>,
    #[serde(rename = "SuggestedFix", default)]
    suggested_fix: Option<String>,
    #[serde(rename = "NeedRegenerate", default)]
    need_regenerate: Value,
}

/// Interpret a `NeedRegenerate` value.
///
/// Anything unrecognized counts as a request to regenerate.
pub fn verdict_from(value: &Value) -> Verdict {
    let text = match value {
        Value::Bool(true) => return Verdict::NeedsRegeneration,
        Value::Bool(false) => return Verdict::Resolved,
        Value::String(s) => s.trim().trim_matches(['"', '\'']).to_string(),
        other => other.to_string(),
    };
    match text.as_str() {
        "True" | "true" | "T" | "yes" => Verdict::NeedsRegeneration,
        "False" | "false" | "F" | "no" => Verdict::Resolved,
        _ => {
            warn!(value = %value, "unrecognized NeedRegenerate value, regenerating");
            Verdict::NeedsRegeneration
        }
    }
}

fn decode_report_block(body: &str) -> Option<Report> {
    if let Ok(block) = serde_json::from_str::<ReportBlock>(body) {
        return Some(Report {
            hash: block.hash,
            error_summary: block.error_summary.unwrap_or_default(),
            suggested_fix: block.suggested_fix.unwrap_or_default(),
            verdict: verdict_from(&block.need_regenerate),
        });
    }

    let hash = capture(&HASH_FIELD, body)?.trim().to_string();
    let need = capture(&REGEN_FIELD, body).map_or(Value::Null, Value::String);
    Some(Report {
        hash,
        error_summary: capture(&SUMMARY_FIELD, body).unwrap_or_default(),
        suggested_fix: capture(&FIX_FIELD, body).unwrap_or_default(),
        verdict: verdict_from(&need),
    })
}

fn capture(re: &Regex, body: &str) -> Option<String> {
    re.captures(body)
        .and_then(|c| c.get(1))
        .map(|m| unescape(m.as_str()))
}

/// Extract reports from a critic response, keyed by hash.
///
/// Blocks tagged `report` are used; when there are none, blocks tagged
/// `json` are tried instead.
pub fn parse_reports(response: &str) -> BTreeMap<String, Report> {
    let blocks = fenced_blocks(response);
    let tagged = |tag: &str| -> Vec<&FencedBlock> {
        blocks.iter().filter(|b| b.tag.eq_ignore_ascii_case(tag)).collect()
    };
    let mut selected = tagged("report");
    if selected.is_empty() {
        selected = tagged("json");
    }

    let mut reports = BTreeMap::new();
    for block in selected {
        match decode_report_block(&block.body) {
            Some(report) => {
                reports.insert(report.hash.clone(), report);
            }
            None => warn!(tag = %block.tag, "dropping undecodable report block"),
        }
    }
    reports
}
