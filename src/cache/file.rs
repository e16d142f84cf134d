//! JSON-file fragment store.

use super::{FragmentStore, SyncStats, validate_namespace};
use crate::error::{HolefillError, Result};
use crate::fs::atomic_write_file;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// A [`FragmentStore`] persisted as `<dir>/<namespace>.json`.
///
/// The file is read on every access and rewritten atomically on every
/// change, so a crash never leaves a half-written namespace. One writer per
/// namespace is assumed; there is no cross-process locking.
#[derive(Debug, Clone)]
pub struct FileStore {
    namespace: String,
    path: PathBuf,
}

impl FileStore {
    /// Bind a store to `namespace` inside `cache_dir`.
    pub fn open<P: AsRef<Path>>(cache_dir: P, namespace: &str) -> Result<Self> {
        validate_namespace(namespace)?;
        Ok(Self {
            namespace: namespace.to_string(),
            path: cache_dir.as_ref().join(format!("{}.json", namespace)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// List namespaces that have a cache file in `cache_dir`.
    pub fn namespaces<P: AsRef<Path>>(cache_dir: P) -> Result<Vec<String>> {
        let cache_dir = cache_dir.as_ref();
        if !cache_dir.exists() {
            return Ok(Vec::new());
        }
        let entries = fs::read_dir(cache_dir).map_err(|e| {
            HolefillError::CacheError(format!(
                "failed to list cache directory '{}': {}",
                cache_dir.display(),
                e
            ))
        })?;

        let mut names: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| {
                let name = entry.file_name().into_string().ok()?;
                let stem = name.strip_suffix(".json")?;
                (!stem.starts_with('.')).then(|| stem.to_string())
            })
            .collect();
        names.sort();
        Ok(names)
    }

    fn load(&self) -> Result<BTreeMap<String, String>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let content = fs::read_to_string(&self.path).map_err(|e| {
            HolefillError::CacheError(format!(
                "failed to read cache file '{}': {}",
                self.path.display(),
                e
            ))
        })?;
        serde_json::from_str(&content).map_err(|e| {
            HolefillError::CacheError(format!(
                "corrupt cache file '{}': {}",
                self.path.display(),
                e
            ))
        })
    }

    fn store(&self, entries: &BTreeMap<String, String>) -> Result<()> {
        let json = serde_json::to_string_pretty(entries).map_err(|e| {
            HolefillError::CacheError(format!("failed to serialize cache: {}", e))
        })?;
        atomic_write_file(&self.path, &format!("{}\n", json))
            .map_err(|e| HolefillError::CacheError(e.to_string()))?;
        debug!(namespace = %self.namespace, entries = entries.len(), "cache written");
        Ok(())
    }
}

impl FragmentStore for FileStore {
    fn namespace(&self) -> &str {
        &self.namespace
    }

    fn get(&self, hash: &str) -> Result<Option<String>> {
        Ok(self.load()?.remove(hash))
    }

    fn upsert(&mut self, hash: &str, content: &str) -> Result<()> {
        let mut entries = self.load()?;
        entries.insert(hash.to_string(), content.to_string());
        self.store(&entries)
    }

    fn resync(&mut self, mapping: &BTreeMap<String, String>) -> Result<SyncStats> {
        let stats = SyncStats::between(&self.load()?, mapping);
        self.store(mapping)?;
        Ok(stats)
    }

    fn entries(&self) -> Result<BTreeMap<String, String>> {
        self.load()
    }

    fn clear(&mut self) -> Result<usize> {
        // A corrupt file is still removable.
        let removed = match self.load() {
            Ok(entries) => entries.len(),
            Err(e) => {
                warn!(error = %e, "clearing unreadable cache file");
                0
            }
        };
        if self.path.exists() {
            fs::remove_file(&self.path).map_err(|e| {
                HolefillError::CacheError(format!(
                    "failed to remove cache file '{}': {}",
                    self.path.display(),
                    e
                ))
            })?;
        }
        Ok(removed)
    }
}
