//! Run history for synthesis tasks.
//!
//! Every task appends NDJSON events (one JSON object per line) to
//! `<state_dir>/history/<namespace>.ndjson`. When artifacts are enabled the
//! prompts, responses and candidate programs of each round are written
//! under `<state_dir>/history/<namespace>/<run_id>/`.
//!
//! # Event Format
//!
//! - `ts`: RFC3339 timestamp
//! - `action`: what happened (`run_started`, `parsed`, `generated`, ...)
//! - `actor`: `user@host`
//! - `run`: run identifier shared by every event of one task
//! - `round`: round counter when the event belongs to a round
//! - `details`: freeform object

use crate::context::ProjectContext;
use crate::error::{HolefillError, Result};
use crate::fs::atomic_write_file;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;

/// Things a task reports while it runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryAction {
    RunStarted,
    Parsed,
    Generated,
    Evaluated,
    Critiqued,
    Completed,
}

/// One history record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEvent {
    pub ts: DateTime<Utc>,
    pub action: HistoryAction,
    pub actor: String,
    pub run: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub round: Option<u32>,
    pub details: Value,
}

impl HistoryEvent {
    /// Create an event stamped with the current time and actor.
    pub fn new(action: HistoryAction, run: impl Into<String>) -> Self {
        Self {
            ts: Utc::now(),
            action,
            actor: actor_string(),
            run: run.into(),
            round: None,
            details: Value::Object(serde_json::Map::new()),
        }
    }

    pub fn with_round(mut self, round: u32) -> Self {
        self.round = Some(round);
        self
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = details;
        self
    }

    /// Serialize to a single JSON line.
    pub fn to_ndjson_line(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| {
            HolefillError::UserError(format!("failed to serialize history event: {}", e))
        })
    }
}

fn actor_string() -> String {
    let user = std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "unknown".to_string());

    let host = hostname::get()
        .map(|h| h.to_string_lossy().to_string())
        .unwrap_or_else(|_| "unknown".to_string());

    format!("{}@{}", user, host)
}

/// History sink for one task run.
#[derive(Debug, Clone)]
pub struct RunHistory {
    run_id: String,
    log_path: PathBuf,
    artifact_dir: Option<PathBuf>,
}

impl RunHistory {
    /// Open the history of `namespace` for a new run.
    pub fn open(ctx: &ProjectContext, namespace: &str, save_artifacts: bool) -> Self {
        let run_id = Utc::now().format("%Y%m%dT%H%M%S%.3fZ").to_string();
        let history_dir = ctx.history_dir();
        Self {
            log_path: history_dir.join(format!("{}.ndjson", namespace)),
            artifact_dir: save_artifacts.then(|| history_dir.join(namespace).join(&run_id)),
            run_id,
        }
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn log_path(&self) -> &PathBuf {
        &self.log_path
    }

    /// Directory of this run's artifacts, when enabled.
    pub fn artifact_dir(&self) -> Option<&PathBuf> {
        self.artifact_dir.as_ref()
    }

    /// Start an event for this run.
    pub fn event(&self, action: HistoryAction) -> HistoryEvent {
        HistoryEvent::new(action, &self.run_id)
    }

    /// Append an event to the NDJSON log.
    pub fn record(&self, event: &HistoryEvent) -> Result<()> {
        let line = event.to_ndjson_line()?;

        if let Some(parent) = self.log_path.parent()
            && !parent.exists()
        {
            fs::create_dir_all(parent).map_err(|e| {
                HolefillError::UserError(format!(
                    "failed to create history directory '{}': {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_path)
            .map_err(|e| {
                HolefillError::UserError(format!(
                    "failed to open history file '{}': {}",
                    self.log_path.display(),
                    e
                ))
            })?;

        writeln!(file, "{}", line).map_err(|e| {
            HolefillError::UserError(format!(
                "failed to write history to '{}': {}",
                self.log_path.display(),
                e
            ))
        })
    }

    /// Save an artifact of this run. Does nothing when artifacts are off.
    pub fn save_artifact(&self, name: &str, content: &str) -> Result<Option<PathBuf>> {
        let Some(dir) = &self.artifact_dir else {
            return Ok(None);
        };
        let path = dir.join(name);
        atomic_write_file(&path, content)
            .map_err(|e| HolefillError::UserError(format!("failed to save artifact: {}", e)))?;
        Ok(Some(path))
    }
}

/// Read every event of a namespace's history, skipping unreadable lines.
#[cfg(test)]
pub fn read_events(ctx: &ProjectContext, namespace: &str) -> Result<Vec<HistoryEvent>> {
    let path = ctx.history_dir().join(format!("{}.ndjson", namespace));
    if !path.exists() {
        return Ok(Vec::new());
    }
    let content = fs::read_to_string(&path).map_err(|e| {
        HolefillError::UserError(format!(
            "failed to read history file '{}': {}",
            path.display(),
            e
        ))
    })?;
    Ok(content
        .lines()
        .filter_map(|line| serde_json::from_str(line).ok())
        .collect())
}
