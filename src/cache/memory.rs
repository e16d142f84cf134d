//! In-memory fragment store.

use super::{FragmentStore, SyncStats, validate_namespace};
use crate::error::Result;
use std::collections::BTreeMap;

/// A [`FragmentStore`] backed by a map, for tests and dry runs.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    namespace: String,
    entries: BTreeMap<String, String>,
}

impl MemoryStore {
    pub fn new(namespace: &str) -> Result<Self> {
        validate_namespace(namespace)?;
        Ok(Self {
            namespace: namespace.to_string(),
            entries: BTreeMap::new(),
        })
    }

    /// Start from existing entries.
    pub fn with_entries<I, K, V>(mut self, entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.entries
            .extend(entries.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }
}

impl FragmentStore for MemoryStore {
    fn namespace(&self) -> &str {
        &self.namespace
    }

    fn get(&self, hash: &str) -> Result<Option<String>> {
        Ok(self.entries.get(hash).cloned())
    }

    fn upsert(&mut self, hash: &str, content: &str) -> Result<()> {
        self.entries.insert(hash.to_string(), content.to_string());
        Ok(())
    }

    fn resync(&mut self, mapping: &BTreeMap<String, String>) -> Result<SyncStats> {
        let stats = SyncStats::between(&self.entries, mapping);
        self.entries = mapping.clone();
        Ok(stats)
    }

    fn entries(&self) -> Result<BTreeMap<String, String>> {
        Ok(self.entries.clone())
    }

    fn clear(&mut self) -> Result<usize> {
        let removed = self.entries.len();
        self.entries.clear();
        Ok(removed)
    }
}
