//! Project path resolution for holefill.
//!
//! A project is a directory holding an optional `holefill.yaml` and a state
//! directory (default `.holefill/`) with the fragment cache and run history:
//!
//! ```text
//! <root>/
//!   holefill.yaml
//!   .holefill/
//!     cache/<namespace>.json
//!     history/<namespace>.ndjson
//!     history/<namespace>/<run>/...
//! ```

use crate::error::{HolefillError, Result};
use std::env;
use std::path::{Path, PathBuf};

/// Name of the project config file.
pub const CONFIG_FILE_NAME: &str = "holefill.yaml";

/// Default state directory relative to the project root.
pub const DEFAULT_STATE_DIR: &str = ".holefill";

/// Resolved project paths. All paths are absolute when built from an
/// absolute root.
#[derive(Debug, Clone)]
pub struct ProjectContext {
    /// Directory the project was resolved from.
    pub root: PathBuf,

    /// Path to `holefill.yaml` (may not exist).
    pub config_path: PathBuf,

    /// Directory for cache and history.
    pub state_dir: PathBuf,
}

impl ProjectContext {
    /// Resolve the project from the current working directory.
    pub fn resolve() -> Result<Self> {
        let cwd = env::current_dir().map_err(|e| {
            HolefillError::UserError(format!("failed to get current working directory: {}", e))
        })?;
        Ok(Self::resolve_from(cwd))
    }

    /// Resolve the project rooted at `root` with the default layout.
    pub fn resolve_from<P: AsRef<Path>>(root: P) -> Self {
        let root = root.as_ref().to_path_buf();
        Self {
            config_path: root.join(CONFIG_FILE_NAME),
            state_dir: root.join(DEFAULT_STATE_DIR),
            root,
        }
    }

    /// Use a different config file.
    pub fn with_config_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_path = self.root.join(path);
        self
    }

    /// Use a different state directory. Relative paths are taken from the root.
    pub fn with_state_dir<P: AsRef<Path>>(mut self, state_dir: P) -> Self {
        self.state_dir = self.root.join(state_dir);
        self
    }

    /// Directory holding one JSON file per cache namespace.
    pub fn cache_dir(&self) -> PathBuf {
        self.state_dir.join("cache")
    }

    /// Directory holding NDJSON run logs and saved artifacts.
    pub fn history_dir(&self) -> PathBuf {
        self.state_dir.join("history")
    }

    /// Whether a config file exists.
    pub fn has_config(&self) -> bool {
        self.config_path.is_file()
    }
}
