//! Configuration types and defaults for holefill.
//!
//! This module defines the command profile type and the default value
//! functions used by the Config struct.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// An external command used as the generator, the critic or the evaluator.
///
/// The command is a template: it is split with shell-words (no shell is
/// involved) and each argument is rendered with `{prompt_file}`,
/// `{program_file}`, `{role}`, `{tools}` and `{round}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommandProfile {
    /// Command template. Empty means "not configured".
    pub command: String,

    /// Wall-clock limit for one invocation.
    #[serde(default = "default_command_timeout_seconds")]
    pub timeout_seconds: u64,

    /// Extra environment variables for the child process.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub environment: BTreeMap<String, String>,
}

impl Default for CommandProfile {
    fn default() -> Self {
        Self {
            command: String::new(),
            timeout_seconds: default_command_timeout_seconds(),
            environment: BTreeMap::new(),
        }
    }
}

impl CommandProfile {
    /// Whether a command has been configured.
    pub fn is_configured(&self) -> bool {
        !self.command.trim().is_empty()
    }
}

/// Default tools advertised to the generator.
pub fn default_tools() -> Vec<String> {
    vec!["retriever_tool".to_string(), "search_tool".to_string()]
}

// Default value functions for serde
pub(crate) fn default_max_rounds() -> u32 {
    3
}
pub(crate) fn default_eval_timeout_seconds() -> u64 {
    120
}
pub(crate) fn default_command_timeout_seconds() -> u64 {
    600
}
pub(crate) fn default_placeholder() -> String {
    "{{LANGDA}}".to_string()
}
pub(crate) fn default_state_dir() -> String {
    crate::context::DEFAULT_STATE_DIR.to_string()
}
pub(crate) fn default_true() -> bool {
    true
}
