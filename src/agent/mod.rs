//! Subprocess collaborators.
//!
//! Any command-line model client can act as generator or critic, and any
//! command-line ProbLog runner as evaluator:
//!
//! - **executor**: command template rendering, timeout and output capture
//! - **collaborators**: `CommandModel` and `CommandEvaluator`
//!
//! Commands are split with shell-words and never run through a shell.
//! Inputs (`{prompt_file}`, `{program_file}`) and the stdout/stderr logs
//! of every call land in the run's log directory.

mod collaborators;
mod executor;

pub use collaborators::{CommandEvaluator, CommandModel};
