//! Task state threaded through the workflow transitions.

use serde::Serialize;

/// Phase of a synthesis task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Init,
    Generate,
    Evaluate,
    Done,
}

impl Phase {
    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Init => "init",
            Phase::Generate => "generate",
            Phase::Evaluate => "evaluate",
            Phase::Done => "done",
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Progress of one hole.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HoleSlot {
    pub hash: String,
    /// Latest content: the resolved fragment, or the last generated candidate.
    pub content: Option<String>,
    /// Frozen for the rest of the task.
    pub resolved: bool,
    /// Whether `content` came from the cache.
    pub cached: bool,
    /// Rationale from the last review, handed to the next generation.
    pub feedback: Option<String>,
}

impl HoleSlot {
    pub fn pending(hash: impl Into<String>) -> Self {
        Self {
            hash: hash.into(),
            content: None,
            resolved: false,
            cached: false,
            feedback: None,
        }
    }

    pub fn from_cache(hash: impl Into<String>, content: String) -> Self {
        Self {
            hash: hash.into(),
            content: Some(content),
            resolved: true,
            cached: true,
            feedback: None,
        }
    }

    /// Resolved content, if frozen.
    pub fn resolved_content(&self) -> Option<&str> {
        if self.resolved {
            self.content.as_deref()
        } else {
            None
        }
    }
}

/// The in-flight synthesis session.
///
/// Slots are index-aligned with the parsed holes. Transitions consume a
/// state and return the next one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskState {
    pub phase: Phase,
    /// Completed generation rounds.
    pub round: u32,
    /// Remaining budget (generation misses and rejected rounds).
    pub budget: u32,
    pub slots: Vec<HoleSlot>,
}

impl TaskState {
    pub fn new(slots: Vec<HoleSlot>, max_rounds: u32) -> Self {
        Self {
            phase: Phase::Init,
            round: 0,
            budget: max_rounds,
            slots,
        }
    }

    pub fn is_done(&self) -> bool {
        self.phase == Phase::Done
    }

    /// Hashes of holes that are not resolved yet, in source order.
    pub fn pending_hashes(&self) -> Vec<&str> {
        self.slots
            .iter()
            .filter(|s| !s.resolved)
            .map(|s| s.hash.as_str())
            .collect()
    }

    pub fn has_pending(&self) -> bool {
        self.slots.iter().any(|s| !s.resolved)
    }

    /// Fragments for reconstruction: resolved content only.
    pub fn resolved_fragments(&self) -> Vec<Option<String>> {
        self.slots
            .iter()
            .map(|s| s.resolved_content().map(str::to_string))
            .collect()
    }

    /// Fragments for reconstruction: resolved or last generated content.
    pub fn best_fragments(&self) -> Vec<Option<String>> {
        self.slots.iter().map(|s| s.content.clone()).collect()
    }
}
