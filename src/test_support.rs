//! Shared test helpers: a working-directory guard and scripted collaborators.

use crate::cache::{FragmentStore, SyncStats};
use crate::error::{HolefillError, Result};
use crate::workflow::{EvalOutcome, Evaluator, LanguageModel};
use std::collections::{BTreeMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::{LazyLock, Mutex, MutexGuard};
use std::time::Duration;

static CWD_LOCK: LazyLock<Mutex<()>> = LazyLock::new(|| Mutex::new(()));

pub(crate) struct DirGuard {
    original: PathBuf,
    _lock: MutexGuard<'static, ()>,
}

impl DirGuard {
    pub(crate) fn new(new_dir: &Path) -> Self {
        // Changing the process current working directory is global and not thread-safe.
        // Lock it so tests don't race even if a #[serial] annotation is missed.
        let lock = CWD_LOCK.lock().unwrap_or_else(|poison| poison.into_inner());
        let original = std::env::current_dir().unwrap();
        std::env::set_current_dir(new_dir).unwrap();
        Self {
            original,
            _lock: lock,
        }
    }
}

impl Drop for DirGuard {
    fn drop(&mut self) {
        let _ = std::env::set_current_dir(&self.original);
    }
}

/// Language model answering from a script.
///
/// Responses are consumed in order; once the script runs out the last
/// response is repeated. Every prompt is recorded.
#[derive(Debug, Default)]
pub(crate) struct ScriptedModel {
    responses: VecDeque<String>,
    last: Option<String>,
    failure: Option<String>,
    pub(crate) prompts: Vec<String>,
}

impl ScriptedModel {
    pub(crate) fn new<I, S>(responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            responses: responses.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// A model whose process always fails.
    pub(crate) fn failing(message: &str) -> Self {
        Self {
            failure: Some(message.to_string()),
            ..Self::default()
        }
    }

    pub(crate) fn calls(&self) -> usize {
        self.prompts.len()
    }
}

impl LanguageModel for ScriptedModel {
    fn invoke(&mut self, prompt: &str, _tools: &[String]) -> Result<String> {
        self.prompts.push(prompt.to_string());
        if let Some(message) = &self.failure {
            return Err(HolefillError::CollaboratorError(message.clone()));
        }
        if let Some(next) = self.responses.pop_front() {
            self.last = Some(next);
        }
        Ok(self.last.clone().unwrap_or_default())
    }
}

/// Evaluator answering from a script, repeating the last outcome.
#[derive(Debug)]
pub(crate) struct ScriptedEvaluator {
    outcomes: VecDeque<EvalOutcome>,
    last: EvalOutcome,
    pub(crate) programs: Vec<String>,
    pub(crate) timeouts: Vec<Duration>,
}

impl ScriptedEvaluator {
    pub(crate) fn new<I: IntoIterator<Item = EvalOutcome>>(outcomes: I) -> Self {
        Self {
            outcomes: outcomes.into_iter().collect(),
            last: EvalOutcome::Output(String::new()),
            programs: Vec::new(),
            timeouts: Vec::new(),
        }
    }

    pub(crate) fn output(text: &str) -> Self {
        Self::new([EvalOutcome::Output(text.to_string())])
    }
}

impl Evaluator for ScriptedEvaluator {
    fn run(&mut self, program: &str, timeout: Duration) -> EvalOutcome {
        self.programs.push(program.to_string());
        self.timeouts.push(timeout);
        if let Some(next) = self.outcomes.pop_front() {
            self.last = next;
        }
        self.last.clone()
    }
}

/// Store whose every operation fails, for fatal-path tests.
#[derive(Debug, Default)]
pub(crate) struct BrokenStore;

impl BrokenStore {
    fn fail<T>(&self) -> Result<T> {
        Err(HolefillError::CacheError("disk unavailable".to_string()))
    }
}

impl FragmentStore for BrokenStore {
    fn namespace(&self) -> &str {
        "broken"
    }

    fn get(&self, _hash: &str) -> Result<Option<String>> {
        self.fail()
    }

    fn upsert(&mut self, _hash: &str, _content: &str) -> Result<()> {
        self.fail()
    }

    fn resync(&mut self, _mapping: &BTreeMap<String, String>) -> Result<SyncStats> {
        self.fail()
    }

    fn entries(&self) -> Result<BTreeMap<String, String>> {
        self.fail()
    }

    fn clear(&mut self) -> Result<usize> {
        self.fail()
    }
}

/// Generator response with one fenced block per `(hash, code)` pair.
pub(crate) fn code_response(pairs: &[(&str, &str)]) -> String {
    pairs
        .iter()
        .map(|(hash, code)| {
            format!(
                "```problog\n{}\n```",
                serde_json::json!({ "HASH": hash, "Code": code })
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Critic response with one report block per `(hash, need_regenerate)` pair.
pub(crate) fn report_response(pairs: &[(&str, bool)]) -> String {
    pairs
        .iter()
        .map(|(hash, regenerate)| {
            let summary = if *regenerate { "does not meet the requirement" } else { "" };
            format!(
                "```report\n{}\n```",
                serde_json::json!({
                    "HASH": hash,
                    "ErrorSummary": summary,
                    "SuggestedFix": "",
                    "NeedRegenerate": regenerate,
                })
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}
