//! Fragment cache: durable `hash -> content` mappings per namespace.
//!
//! The [`FragmentStore`] trait is the seam the workflow controller uses.
//! [`FileStore`] keeps one JSON object per namespace under
//! `<state_dir>/cache/` and rewrites it atomically. Tests use an in-memory
//! store.

mod file;
#[cfg(test)]
mod memory;


pub use file::FileStore;
#[cfg(test)]
pub use memory::MemoryStore;

use crate::error::{HolefillError, Result};
use regex::Regex;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::LazyLock;

static NAMESPACE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9._-]+$").expect("Invalid namespace regex"));

/// Counts reported by [`FragmentStore::resync`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SyncStats {
    pub added: usize,
    pub updated: usize,
    pub deleted: usize,
    pub retained: usize,
}

impl SyncStats {
    /// Compare an old mapping with the one replacing it.
    pub fn between(old: &BTreeMap<String, String>, new: &BTreeMap<String, String>) -> Self {
        let mut stats = SyncStats::default();
        for (hash, content) in new {
            match old.get(hash) {
                None => stats.added += 1,
                Some(previous) if previous != content => stats.updated += 1,
                Some(_) => stats.retained += 1,
            }
        }
        stats.deleted = old.keys().filter(|hash| !new.contains_key(*hash)).count();
        stats
    }
}

/// Storage for resolved fragments of one namespace.
pub trait FragmentStore {
    /// Namespace this store is bound to.
    fn namespace(&self) -> &str;

    /// Content cached for `hash`, if any.
    fn get(&self, hash: &str) -> Result<Option<String>>;

    /// Insert or replace one entry.
    fn upsert(&mut self, hash: &str, content: &str) -> Result<()>;

    /// Replace the whole namespace with `mapping`.
    ///
    /// After a successful return the stored mapping equals `mapping`.
    fn resync(&mut self, mapping: &BTreeMap<String, String>) -> Result<SyncStats>;

    /// Every stored entry, ordered by hash.
    fn entries(&self) -> Result<BTreeMap<String, String>>;

    /// Remove every entry, returning how many were removed.
    fn clear(&mut self) -> Result<usize>;
}

/// Check a namespace name for use as a file stem.
pub fn validate_namespace(namespace: &str) -> Result<()> {
    if NAMESPACE_REGEX.is_match(namespace) && namespace != "." && namespace != ".." {
        Ok(())
    } else {
        Err(HolefillError::UserError(format!(
            "invalid cache namespace '{}': use letters, digits, '.', '_' or '-'",
            namespace
        )))
    }
}
