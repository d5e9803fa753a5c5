//! Per-entity bookkeeping for the next commit.

use std::collections::BTreeMap;

/// What the provenance generator needs to know about a touched entity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntityIndexEntry {
    pub to_be_deleted: bool,
    pub is_restored: bool,
    pub resp_agent: String,
    pub primary_source: Option<String>,
}

/// Entities touched since the last commit, in identifier order.
#[derive(Debug, Default, Clone)]
pub struct EntityIndex {
    entries: BTreeMap<String, EntityIndexEntry>,
}

impl EntityIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `entity` was touched by `agent`, keeping its flags.
    pub fn touch(
        &mut self,
        entity: &str,
        agent: &str,
        primary_source: Option<&str>,
    ) -> &mut EntityIndexEntry {
        let entry = self.entries.entry(entity.to_string()).or_default();
        entry.resp_agent = agent.to_string();
        entry.primary_source = primary_source.map(str::to_string);
        entry
    }

    pub fn get(&self, entity: &str) -> Option<&EntityIndexEntry> {
        self.entries.get(entity)
    }

    pub fn is_deleted(&self, entity: &str) -> bool {
        self.get(entity).is_some_and(|e| e.to_be_deleted)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &EntityIndexEntry)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
