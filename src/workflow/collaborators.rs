//! Seams to the external collaborators of a task.
//!
//! The controller never spawns processes or talks to a model directly; it
//! is handed implementations of these traits.

use crate::error::Result;
use std::time::Duration;

/// A language model acting as generator or critic.
pub trait LanguageModel {
    /// Send `prompt` and return the raw response text.
    ///
    /// An `Err` is fatal for the task.
    fn invoke(&mut self, prompt: &str, tools: &[String]) -> Result<String>;
}

/// Outcome of executing a candidate program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EvalOutcome {
    /// The program ran; its output.
    Output(String),
    /// The run exceeded its wall-clock limit and was stopped.
    TimedOut,
    /// The run failed; error text.
    Failed(String),
}

impl EvalOutcome {
    /// Text handed to the critic.
    pub fn feedback(&self, timeout: Duration) -> String {
        match self {
            EvalOutcome::Output(text) => text.clone(),
            EvalOutcome::TimedOut => format!(
                "Evaluation timed out after {} seconds.",
                timeout.as_secs()
            ),
            EvalOutcome::Failed(text) => format!("Evaluation failed:\n{}", text.trim_end()),
        }
    }
}

/// The program-execution engine.
pub trait Evaluator {
    /// Run `program` under a hard `timeout`. Never fails the task.
    fn run(&mut self, program: &str, timeout: Duration) -> EvalOutcome;
}
