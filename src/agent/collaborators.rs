//! Command-backed generator, critic and evaluator.

use super::executor::{CommandRun, execute_command};
use crate::codec::vars;
use crate::config::CommandProfile;
use crate::error::{HolefillError, Result};
use crate::fs::atomic_write_file;
use crate::workflow::{EvalOutcome, Evaluator, LanguageModel};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// Lines of stderr quoted in failure messages.
const STDERR_TAIL_LINES: usize = 20;

/// A language model reached through an external command.
///
/// The prompt is written to `{prompt_file}`; the response is the
/// command's stdout.
#[derive(Debug, Clone)]
pub struct CommandModel {
    role: String,
    profile: CommandProfile,
    working_dir: PathBuf,
    logs_dir: PathBuf,
    calls: u32,
}

impl CommandModel {
    pub fn new(
        role: &str,
        profile: CommandProfile,
        working_dir: impl Into<PathBuf>,
        logs_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            role: role.to_string(),
            profile,
            working_dir: working_dir.into(),
            logs_dir: logs_dir.into(),
            calls: 0,
        }
    }

    pub fn calls(&self) -> u32 {
        self.calls
    }
}

impl LanguageModel for CommandModel {
    fn invoke(&mut self, prompt: &str, tools: &[String]) -> Result<String> {
        if !self.profile.is_configured() {
            return Err(HolefillError::CollaboratorError(format!(
                "no {role} command configured\n\
                 Fix: set {role}.command in holefill.yaml.",
                role = self.role
            )));
        }

        self.calls += 1;
        let label = format!("{}-{:02}", self.role, self.calls);
        let prompt_file = write_input(&self.logs_dir, &format!("{}.prompt.md", label), prompt)?;

        let variables = vars([
            ("prompt_file", path_string(&prompt_file)),
            ("role", self.role.clone()),
            ("tools", tools.join(",")),
            ("round", self.calls.to_string()),
        ]);

        let run = execute_command(
            &self.profile,
            &label,
            &variables,
            &self.working_dir,
            &self.logs_dir,
            Duration::from_secs(self.profile.timeout_seconds),
        )?;
        info!(role = %self.role, call = self.calls, duration_ms = run.duration.as_millis() as u64, "model command finished");

        if run.timed_out {
            return Err(HolefillError::CollaboratorError(format!(
                "{} command timed out after {} seconds: {}",
                self.role, self.profile.timeout_seconds, run.command
            )));
        }
        if !run.is_success() {
            return Err(HolefillError::CollaboratorError(failure_message(
                &self.role, &run,
            )));
        }

        run.stdout()
    }
}

/// A program runner reached through an external command.
///
/// The program is written to `{program_file}`. A profile timeout shorter
/// than the requested one caps the run.
#[derive(Debug, Clone)]
pub struct CommandEvaluator {
    profile: CommandProfile,
    working_dir: PathBuf,
    logs_dir: PathBuf,
    runs: u32,
}

impl CommandEvaluator {
    pub fn new(
        profile: CommandProfile,
        working_dir: impl Into<PathBuf>,
        logs_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            profile,
            working_dir: working_dir.into(),
            logs_dir: logs_dir.into(),
            runs: 0,
        }
    }

    fn execute(&mut self, program: &str, timeout: Duration) -> Result<CommandRun> {
        self.runs += 1;
        let label = format!("evaluator-{:02}", self.runs);
        let program_file = write_input(&self.logs_dir, &format!("{}.pl", label), program)?;

        let variables = vars([
            ("program_file", path_string(&program_file)),
            ("role", "evaluator".to_string()),
            ("round", self.runs.to_string()),
        ]);
        let timeout = timeout.min(Duration::from_secs(self.profile.timeout_seconds));

        execute_command(
            &self.profile,
            &label,
            &variables,
            &self.working_dir,
            &self.logs_dir,
            timeout,
        )
    }
}

impl Evaluator for CommandEvaluator {
    fn run(&mut self, program: &str, timeout: Duration) -> EvalOutcome {
        if !self.profile.is_configured() {
            return EvalOutcome::Failed(
                "no evaluator command configured (set evaluator.command in holefill.yaml)"
                    .to_string(),
            );
        }

        let run = match self.execute(program, timeout) {
            Ok(run) => run,
            Err(e) => return EvalOutcome::Failed(e.to_string()),
        };
        debug!(run = self.runs, duration_ms = run.duration.as_millis() as u64, "evaluator finished");

        if run.timed_out {
            return EvalOutcome::TimedOut;
        }
        if !run.is_success() {
            return EvalOutcome::Failed(failure_message("evaluator", &run));
        }
        match run.stdout() {
            Ok(output) => EvalOutcome::Output(output),
            Err(e) => EvalOutcome::Failed(e.to_string()),
        }
    }
}

fn write_input(dir: &Path, name: &str, content: &str) -> Result<PathBuf> {
    let path = dir.join(name);
    atomic_write_file(&path, content).map_err(|e| {
        HolefillError::CollaboratorError(format!("failed to write command input: {}", e))
    })?;
    Ok(path)
}

fn path_string(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

fn failure_message(role: &str, run: &CommandRun) -> String {
    let status = run
        .exit_code
        .map_or_else(|| "a signal".to_string(), |code| format!("status {}", code));
    let tail = run.stderr_tail(STDERR_TAIL_LINES);
    if tail.trim().is_empty() {
        format!("{} command exited with {}: {}", role, status, run.command)
    } else {
        format!(
            "{} command exited with {}: {}\n{}",
            role, status, run.command, tail
        )
    }
}
