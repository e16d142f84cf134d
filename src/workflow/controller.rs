//! Task driver.
//!
//! Runs the transitions against injected collaborators, writes the run
//! history and commits resolved fragments to the cache once the task is
//! done. Only cache and collaborator process failures abort a task;
//! everything else ends in a result listing what stayed unresolved.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use serde_json::json;
use tracing::{debug, info, warn};

use super::collaborators::{EvalOutcome, Evaluator, LanguageModel};
use super::dynamic::{fill_slots, with_external_query};
use super::state::{HoleSlot, Phase, TaskState};
use super::transitions;
use crate::cache::{FragmentStore, SyncStats};
use crate::codec::{self, PromptSet, Verdict};
use crate::config::Config;
use crate::error::Result;
use crate::history::{HistoryAction, HistoryEvent, RunHistory};
use crate::merge::reconstruct;
use crate::source::{self, HoleRecord, ParsedSource, RegenPolicy, Template};

/// Settings of one task.
#[derive(Debug, Clone)]
pub struct TaskOptions {
    pub max_rounds: u32,
    /// Generate+evaluate variant; `false` accepts the first complete generation.
    pub evaluate: bool,
    /// Try the cache for every hole regardless of its regen policy.
    pub load: bool,
    pub eval_timeout: Duration,
    pub placeholder: String,
    pub tools: Vec<String>,
    /// Values for `/* Key */` slots in requirements.
    pub ext: BTreeMap<String, String>,
    /// Facts and queries appended when the source has no query of its own.
    pub query_ext: Option<String>,
}

impl TaskOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_rounds: config.max_rounds,
            evaluate: config.evaluate,
            load: false,
            eval_timeout: config.eval_timeout(),
            placeholder: config.placeholder.clone(),
            tools: config.tools.clone(),
            ext: BTreeMap::new(),
            query_ext: None,
        }
    }
}

impl Default for TaskOptions {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// Outcome of a finished task.
#[derive(Debug, Clone)]
pub struct TaskResult {
    pub document: String,
    pub elapsed: Duration,
    pub rounds_used: u32,
    /// Holes without an accepted fragment, in source order.
    pub unresolved_hashes: Vec<String>,
    /// Changes the final resync made to the cache.
    pub cache_stats: SyncStats,
}

impl TaskResult {
    pub fn is_complete(&self) -> bool {
        self.unresolved_hashes.is_empty()
    }
}

/// One synthesis task over injected collaborators and storage.
pub struct SynthesisTask<'a> {
    options: TaskOptions,
    prompts: PromptSet,
    store: &'a mut dyn FragmentStore,
    generator: &'a mut dyn LanguageModel,
    critic: &'a mut dyn LanguageModel,
    evaluator: &'a mut dyn Evaluator,
    history: Option<RunHistory>,
    step: u32,
}

impl<'a> SynthesisTask<'a> {
    pub fn new(
        options: TaskOptions,
        store: &'a mut dyn FragmentStore,
        generator: &'a mut dyn LanguageModel,
        critic: &'a mut dyn LanguageModel,
        evaluator: &'a mut dyn Evaluator,
    ) -> Self {
        Self {
            options,
            prompts: PromptSet::default(),
            store,
            generator,
            critic,
            evaluator,
            history: None,
            step: 0,
        }
    }

    pub fn with_prompts(mut self, prompts: PromptSet) -> Self {
        self.prompts = prompts;
        self
    }

    pub fn with_history(mut self, history: RunHistory) -> Self {
        self.history = Some(history);
        self
    }

    /// Run the task over `source` to completion.
    pub fn run(&mut self, source: &str) -> Result<TaskResult> {
        let started = Instant::now();
        self.record(
            HistoryAction::RunStarted,
            None,
            json!({
                "namespace": self.store.namespace(),
                "max_rounds": self.options.max_rounds,
                "evaluate": self.options.evaluate,
                "load": self.options.load,
            }),
        );

        let parsed = source::parse(source)?;
        info!(
            holes = parsed.holes.len(),
            networks = parsed.networks.len(),
            has_query = parsed.has_executable_query,
            "parsed source"
        );
        self.record(
            HistoryAction::Parsed,
            None,
            json!({
                "holes": parsed.holes.iter().map(|h| &h.hash).collect::<Vec<_>>(),
                "networks": parsed.networks.len(),
                "has_query": parsed.has_executable_query,
            }),
        );

        let holes = self.requirements(&parsed);
        let mut state = self.init(&parsed)?;

        while !state.is_done() {
            debug!(phase = %state.phase, round = state.round, budget = state.budget, "step");
            state = match state.phase {
                Phase::Generate => self.generate(state, &parsed.template, &holes)?,
                Phase::Evaluate => self.evaluate(state, &parsed, &holes)?,
                Phase::Init | Phase::Done => transitions::finish(state),
            };
        }

        self.complete(state, &parsed.template, started)
    }

    // =========================================================================
    // Phases
    // =========================================================================

    /// Holes with dynamic slots filled. Hashes are left untouched.
    fn requirements(&self, parsed: &ParsedSource) -> Vec<HoleRecord> {
        parsed
            .holes
            .iter()
            .cloned()
            .map(|mut hole| {
                hole.requirement = fill_slots(&hole.requirement, &self.options.ext);
                hole
            })
            .collect()
    }

    fn init(&mut self, parsed: &ParsedSource) -> Result<TaskState> {
        let mut slots = Vec::with_capacity(parsed.holes.len());
        for hole in &parsed.holes {
            let reusable = self.options.load || hole.regen == RegenPolicy::ReuseAllowed;
            let cached = if reusable {
                self.store.get(&hole.hash)?
            } else {
                None
            };
            match cached {
                Some(content) => {
                    debug!(hash = %hole.hash, "using cached fragment");
                    slots.push(HoleSlot::from_cache(&hole.hash, content));
                }
                None => slots.push(HoleSlot::pending(&hole.hash)),
            }
        }

        let state = transitions::init(slots, self.options.max_rounds);
        info!(
            pending = state.pending_hashes().len(),
            cached = state.slots.iter().filter(|s| s.cached).count(),
            "task initialized"
        );
        Ok(state)
    }

    fn generate(
        &mut self,
        state: TaskState,
        template: &Template,
        holes: &[HoleRecord],
    ) -> Result<TaskState> {
        let attempt = state.round + 1;
        let program = generation_program(template, &state, holes, &self.options.placeholder);
        let hashes: Vec<String> = state
            .pending_hashes()
            .into_iter()
            .map(str::to_string)
            .collect();
        let hash_refs: Vec<&str> = hashes.iter().map(String::as_str).collect();
        let regenerate = state
            .slots
            .iter()
            .any(|s| !s.resolved && s.feedback.is_some());

        let prompt = self.prompts.generation_prompt(
            &program,
            &self.options.tools,
            &hash_refs,
            regenerate,
        )?;
        self.step += 1;
        self.artifact("generate-prompt.md", &prompt);

        info!(round = attempt, holes = hashes.len(), regenerate, "requesting code");
        let response = self.generator.invoke(&prompt, &self.options.tools)?;
        self.artifact("generate-response.md", &response);

        let fragments = codec::parse_fragments(&response);
        for hash in fragments.keys().filter(|h| !hashes.contains(h)) {
            debug!(hash = %hash, "ignoring code for a hole that is not pending");
        }
        let missing: Vec<&String> = hashes
            .iter()
            .filter(|h| !fragments.contains_key(*h))
            .collect();
        if !missing.is_empty() {
            warn!(round = attempt, missing = ?missing, "generator response misses holes");
        }

        self.record(
            HistoryAction::Generated,
            Some(attempt),
            json!({
                "requested": &hashes,
                "missing": missing,
                "regenerate": regenerate,
            }),
        );

        Ok(transitions::after_generate(
            state,
            &fragments,
            self.options.evaluate,
        ))
    }

    fn evaluate(
        &mut self,
        state: TaskState,
        parsed: &ParsedSource,
        holes: &[HoleRecord],
    ) -> Result<TaskState> {
        let candidate = reconstruct(
            &parsed.template,
            &state.best_fragments(),
            &self.options.placeholder,
        );
        self.artifact("candidate.pl", &candidate);

        let program = if parsed.has_executable_query {
            Some(candidate.clone())
        } else {
            self.options
                .query_ext
                .as_deref()
                .map(|query| with_external_query(&candidate, query))
        };

        let evaluation = match program {
            Some(program) => {
                let outcome = self.evaluator.run(&program, self.options.eval_timeout);
                let kind = match &outcome {
                    EvalOutcome::Output(_) => "output",
                    EvalOutcome::TimedOut => "timed_out",
                    EvalOutcome::Failed(_) => "failed",
                };
                if kind != "output" {
                    warn!(round = state.round, outcome = kind, "evaluation did not produce a result");
                }
                self.record(
                    HistoryAction::Evaluated,
                    Some(state.round),
                    json!({ "outcome": kind }),
                );
                let text = outcome.feedback(self.options.eval_timeout);
                self.artifact("evaluation.txt", &text);
                Some(text)
            }
            None => {
                warn!("source has no query and no external query is set, reviewing without a test run");
                self.record(
                    HistoryAction::Evaluated,
                    Some(state.round),
                    json!({ "outcome": "skipped" }),
                );
                None
            }
        };

        let reports: Vec<String> = state
            .slots
            .iter()
            .zip(holes)
            .filter(|(slot, _)| !slot.resolved)
            .filter_map(|(slot, hole)| {
                slot.content
                    .as_deref()
                    .map(|code| codec::report_block(hole, code))
            })
            .collect();

        let prompt = self
            .prompts
            .evaluation_prompt(&candidate, evaluation.as_deref(), &reports)?;
        self.artifact("evaluate-prompt.md", &prompt);

        info!(round = state.round, fragments = reports.len(), "requesting review");
        let response = self.critic.invoke(&prompt, &self.options.tools)?;
        self.artifact("evaluate-response.md", &response);

        let verdicts = codec::parse_reports(&response);
        let round = state.round;
        let next = transitions::after_evaluate(state, &verdicts);

        let (accepted, rejected): (Vec<&HoleSlot>, Vec<&HoleSlot>) = next
            .slots
            .iter()
            .filter(|s| !s.cached && verdicts.contains_key(&s.hash))
            .partition(|s| verdicts[&s.hash].verdict == Verdict::Resolved);
        self.record(
            HistoryAction::Critiqued,
            Some(round),
            json!({
                "resolved": accepted.iter().map(|s| &s.hash).collect::<Vec<_>>(),
                "rejected": rejected.iter().map(|s| &s.hash).collect::<Vec<_>>(),
                "pending": next.pending_hashes(),
            }),
        );

        Ok(next)
    }

    fn complete(
        &mut self,
        state: TaskState,
        template: &Template,
        started: Instant,
    ) -> Result<TaskResult> {
        let document = reconstruct(template, &state.best_fragments(), &self.options.placeholder);

        let resolved: BTreeMap<String, String> = state
            .slots
            .iter()
            .filter_map(|s| {
                s.resolved_content()
                    .map(|content| (s.hash.clone(), content.to_string()))
            })
            .collect();
        let cache_stats = self.store.resync(&resolved)?;

        let unresolved_hashes: Vec<String> = state
            .pending_hashes()
            .into_iter()
            .map(str::to_string)
            .collect();
        if !unresolved_hashes.is_empty() {
            warn!(unresolved = ?unresolved_hashes, "task finished with unresolved holes");
        }

        let elapsed = started.elapsed();
        self.step += 1;
        self.artifact("final.pl", &document);
        self.record(
            HistoryAction::Completed,
            Some(state.round),
            json!({
                "elapsed_ms": elapsed.as_millis() as u64,
                "unresolved": unresolved_hashes,
                "cache": cache_stats,
            }),
        );
        info!(
            rounds = state.round,
            unresolved = unresolved_hashes.len(),
            elapsed_ms = elapsed.as_millis() as u64,
            "task completed"
        );

        Ok(TaskResult {
            document,
            elapsed,
            rounds_used: state.round,
            unresolved_hashes,
            cache_stats,
        })
    }

    // =========================================================================
    // History
    // =========================================================================

    fn record(&self, action: HistoryAction, round: Option<u32>, details: serde_json::Value) {
        let Some(history) = &self.history else {
            return;
        };
        let mut event: HistoryEvent = history.event(action).with_details(details);
        if let Some(round) = round {
            event = event.with_round(round);
        }
        if let Err(e) = history.record(&event) {
            warn!(error = %e, "failed to record history event");
        }
    }

    fn artifact(&self, name: &str, content: &str) {
        let Some(history) = &self.history else {
            return;
        };
        let name = format!("{:02}-{}", self.step, name);
        if let Err(e) = history.save_artifact(&name, content) {
            warn!(error = %e, "failed to save artifact");
        }
    }
}

/// Program shown to the generator: resolved fragments merged in and every
/// pending hole replaced by its requirement block, in template order.
pub fn generation_program(
    template: &Template,
    state: &TaskState,
    holes: &[HoleRecord],
    placeholder: &str,
) -> String {
    let pieces: Vec<Option<String>> = state
        .slots
        .iter()
        .zip(holes)
        .map(|(slot, hole)| match slot.resolved_content() {
            Some(content) => content.to_string(),
            None => codec::requirement_block(hole, slot.feedback.as_deref()),
        })
        .map(Some)
        .collect();
    reconstruct(template, &pieces, placeholder)
}
