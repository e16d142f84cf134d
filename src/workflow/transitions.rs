//! Pure phase transitions.
//!
//! Each function takes the previous state plus what a collaborator
//! produced and returns the next state. Nothing here performs I/O.

use std::collections::BTreeMap;

use super::state::{HoleSlot, Phase, TaskState};
use crate::codec::{Report, Verdict};

/// Feedback for a fragment the critic did not mention.
pub const MISSING_VERDICT_FEEDBACK: &str = "The review returned no verdict for this code.";

/// Start a task from its slots. Without pending holes the task is done.
pub fn init(slots: Vec<HoleSlot>, max_rounds: u32) -> TaskState {
    let mut state = TaskState::new(slots, max_rounds);
    state.phase = if state.has_pending() {
        Phase::Generate
    } else {
        Phase::Done
    };
    state
}

/// Apply a generator response.
///
/// Any pending hash absent from `fragments` is a miss: the budget shrinks
/// and Generate is entered again with the same pending set. Otherwise the
/// round advances and candidates are either sent to Evaluate or, when the
/// task does not evaluate, frozen.
pub fn after_generate(
    mut state: TaskState,
    fragments: &BTreeMap<String, String>,
    evaluate: bool,
) -> TaskState {
    let mut missed = false;
    for slot in state.slots.iter_mut().filter(|s| !s.resolved) {
        match fragments.get(&slot.hash) {
            Some(code) => slot.content = Some(code.clone()),
            None => missed = true,
        }
    }

    if missed {
        state.budget = state.budget.saturating_sub(1);
        state.phase = if state.budget == 0 {
            Phase::Done
        } else {
            Phase::Generate
        };
        return state;
    }

    state.round += 1;
    for slot in state.slots.iter_mut().filter(|s| !s.resolved) {
        slot.feedback = None;
        if !evaluate {
            slot.resolved = true;
        }
    }
    state.phase = if evaluate {
        Phase::Evaluate
    } else {
        Phase::Done
    };
    state
}

/// Apply critic reports to every candidate under review.
///
/// Resolved fragments are frozen; rejected ones stay pending with the
/// critic's rationale as feedback.
pub fn after_evaluate(mut state: TaskState, reports: &BTreeMap<String, Report>) -> TaskState {
    for slot in state.slots.iter_mut().filter(|s| !s.resolved) {
        match reports.get(&slot.hash) {
            Some(report) if report.verdict == Verdict::Resolved => {
                slot.resolved = slot.content.is_some();
                slot.feedback = None;
            }
            Some(report) => slot.feedback = Some(report.feedback()),
            None => slot.feedback = Some(MISSING_VERDICT_FEEDBACK.to_string()),
        }
    }

    if !state.has_pending() {
        state.phase = Phase::Done;
        return state;
    }

    state.budget = state.budget.saturating_sub(1);
    state.phase = if state.budget == 0 {
        Phase::Done
    } else {
        Phase::Generate
    };
    state
}

/// Force the task to its terminal phase.
pub fn finish(mut state: TaskState) -> TaskState {
    state.phase = Phase::Done;
    state
}
