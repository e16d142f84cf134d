//! Hole and network records built from marker terms.

use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::debug;

use super::ParseError;
use super::scanner::normalize_ws;
use super::terms::Term;

/// Whether a hole must be generated even when a cached fragment exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RegenPolicy {
    MustRegenerate,
    ReuseAllowed,
}

impl RegenPolicy {
    /// Parse an `FUP` value. Empty input means the default.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "" | "True" | "true" | "T" => Some(RegenPolicy::MustRegenerate),
            "False" | "false" | "F" => Some(RegenPolicy::ReuseAllowed),
            _ => None,
        }
    }
}

/// One `langda(...)` marker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HoleRecord {
    pub hash: String,
    /// Head of the enclosing clause, empty for standalone holes.
    pub head: String,
    pub tool: Option<String>,
    pub network: Option<String>,
    pub requirement: String,
    pub regen: RegenPolicy,
    /// Comments written inside or right after the marker.
    pub comments: Vec<String>,
    pub line: usize,
}

impl HoleRecord {
    pub(crate) fn from_terms(
        terms: &[Term],
        head: &str,
        comments: Vec<String>,
        line: usize,
    ) -> Result<Self, ParseError> {
        let mut tool = None;
        let mut network = None;
        let mut requirement = String::new();
        let mut regen = RegenPolicy::MustRegenerate;

        for term in terms {
            let value = term.value.clone().unwrap_or_default();
            match term.key.as_str() {
                "LLM" => requirement = value,
                "LOT" => tool = non_empty(value),
                "NET" => network = non_empty(value),
                "FUP" => {
                    regen = RegenPolicy::parse(&value)
                        .ok_or(ParseError::InvalidRegenPolicy { value, line })?;
                }
                other => debug!(key = other, line, "ignoring unknown hole key"),
            }
        }

        let head = normalize_ws(head);
        let hash = hole_hash(&head, tool.as_deref(), network.as_deref(), &requirement);

        Ok(Self {
            hash,
            head,
            tool,
            network,
            requirement,
            regen,
            comments,
            line,
        })
    }
}

/// One `lann(...)` marker, rendered inline as an `nn(...)` term.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NetworkDecl {
    pub keys: Vec<String>,
    pub rendered: String,
    pub line: usize,
}

impl NetworkDecl {
    pub(crate) fn from_terms(terms: &[Term], line: usize) -> Self {
        let keys: Vec<String> = terms.iter().map(|t| t.key.clone()).collect();
        let rendered = format!("nn({})", keys.join(","));
        Self {
            keys,
            rendered,
            line,
        }
    }
}

#[derive(Serialize)]
struct HashIdentity {
    #[serde(rename = "HEAD")]
    head: Option<String>,
    #[serde(rename = "LLM")]
    requirement: Option<String>,
    #[serde(rename = "LOT")]
    tool: Option<String>,
    #[serde(rename = "NET")]
    network: Option<String>,
}

/// Compute the stable 8-character hash of a hole's identity fields.
///
/// Each field is whitespace-normalized; empty fields hash as `null`. The
/// regen policy is not part of the identity.
pub fn hole_hash(head: &str, tool: Option<&str>, network: Option<&str>, requirement: &str) -> String {
    let field = |s: &str| {
        let normalized = normalize_ws(s);
        (!normalized.is_empty()).then_some(normalized)
    };
    let identity = HashIdentity {
        head: field(head),
        requirement: field(requirement),
        tool: tool.and_then(field),
        network: network.and_then(field),
    };
    let canonical = serde_json::to_value(&identity)
        .map(|v| v.to_string())
        .unwrap_or_default();

    let digest = Sha256::digest(canonical.as_bytes());
    hex::encode_upper(digest)[..8].to_string()
}

fn non_empty(value: String) -> Option<String> {
    (!value.trim().is_empty()).then_some(value)
}
