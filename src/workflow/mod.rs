//! Synthesis workflow.
//!
//! A task moves through `Init -> {Generate <-> Evaluate} -> Done`:
//!
//! - **state**: the `TaskState` value threaded through every step
//! - **transitions**: pure functions from one state to the next
//! - **collaborators**: traits for the generator, critic and evaluator
//! - **dynamic**: `/* Key */` requirement slots and external queries
//! - **controller**: the driver wiring transitions to collaborators,
//!   the cache and the run history

mod collaborators;
mod controller;
mod dynamic;
mod state;
mod transitions;


pub use collaborators::{EvalOutcome, Evaluator, LanguageModel};
pub use controller::{SynthesisTask, TaskOptions, TaskResult};
pub use dynamic::{parse_assignments, slot_keys};
