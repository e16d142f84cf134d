//! Config struct definition and default implementation.

use super::types::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Configuration for holefill.
///
/// This struct represents the contents of `holefill.yaml`.
/// Unknown fields in the YAML are ignored for forward compatibility.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    // =========================================================================
    // Workflow settings
    // =========================================================================
    /// Round budget per task (generation misses and rejected rounds).
    #[serde(default = "default_max_rounds")]
    pub max_rounds: u32,

    /// Run the evaluate phase (false: generated code is accepted as-is).
    #[serde(default = "default_true")]
    pub evaluate: bool,

    /// Hard wall-clock limit for one evaluator run.
    #[serde(default = "default_eval_timeout_seconds")]
    pub eval_timeout_seconds: u64,

    /// Token left in the template at every hole position.
    #[serde(default = "default_placeholder")]
    pub placeholder: String,

    /// Tools advertised to the generator.
    #[serde(default = "default_tools")]
    pub tools: Vec<String>,

    // =========================================================================
    // Storage settings
    // =========================================================================
    /// State directory relative to the project root (cache and history).
    #[serde(default = "default_state_dir")]
    pub state_dir: String,

    /// Write prompts and responses of each round under the history directory.
    #[serde(default = "default_true")]
    pub save_artifacts: bool,

    // =========================================================================
    // Collaborators
    // =========================================================================
    /// Command producing code for pending holes.
    #[serde(default)]
    pub generator: CommandProfile,

    /// Command judging generated code. Falls back to the generator when unset.
    #[serde(default)]
    pub critic: CommandProfile,

    /// Command executing the reconstructed program.
    #[serde(default)]
    pub evaluator: CommandProfile,

    /// Prompt template overrides keyed by `generate`, `regenerate`, `evaluate`.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub prompt_templates: BTreeMap<String, String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_rounds: default_max_rounds(),
            evaluate: true,
            eval_timeout_seconds: default_eval_timeout_seconds(),
            placeholder: default_placeholder(),
            tools: default_tools(),
            state_dir: default_state_dir(),
            save_artifacts: true,
            generator: CommandProfile::default(),
            critic: CommandProfile::default(),
            evaluator: CommandProfile::default(),
            prompt_templates: BTreeMap::new(),
        }
    }
}
