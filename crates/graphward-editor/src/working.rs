//! The staged working copy of the dataset.
//!
//! `current` is what the editor sees; `base` is what the remote dataset held
//! for the same entities at hydration time (or at the last commit). The
//! commit delta is the difference between the two.

use std::collections::{BTreeSet, HashSet};

use graphward_core::{Statement, Value};
use graphward_store::Delta;

#[derive(Debug, Default, Clone)]
pub struct WorkingGraph {
    current: BTreeSet<Statement>,
    base: BTreeSet<Statement>,
    imported: HashSet<String>,
}

impl WorkingGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hydrate with an entity's remote statements. Entities are imported
    /// once; returns the number of statements taken in.
    pub fn import(&mut self, entity: &str, statements: Vec<Statement>) -> usize {
        if !self.imported.insert(entity.to_string()) {
            return 0;
        }
        let count = statements.len();
        for st in statements {
            self.base.insert(st.clone());
            self.current.insert(st);
        }
        count
    }

    pub fn is_imported(&self, entity: &str) -> bool {
        self.imported.contains(entity)
    }

    pub fn insert(&mut self, statement: Statement) -> bool {
        self.current.insert(statement)
    }

    pub fn remove(&mut self, statement: &Statement) -> bool {
        self.current.remove(statement)
    }

    pub fn contains(&self, statement: &Statement) -> bool {
        self.current.contains(statement)
    }

    pub fn len(&self) -> usize {
        self.current.len()
    }

    pub fn is_empty(&self) -> bool {
        self.current.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Statement> {
        self.current.iter()
    }

    /// Statements matching the pattern. `None` is a wildcard.
    pub fn matching(
        &self,
        subject: &str,
        predicate: Option<&str>,
        object: Option<&Value>,
        graph: Option<&str>,
    ) -> Vec<Statement> {
        self.current
            .iter()
            .filter(|st| st.subject == subject)
            .filter(|st| predicate.map_or(true, |p| st.predicate == p))
            .filter(|st| object.map_or(true, |o| &st.object == o))
            .filter(|st| graph.map_or(true, |g| st.graph.as_deref() == Some(g)))
            .cloned()
            .collect()
    }

    /// Statements whose object is the entity `iri`.
    pub fn referencing(&self, iri: &str) -> Vec<Statement> {
        self.current
            .iter()
            .filter(|st| st.object.is_iri(iri))
            .cloned()
            .collect()
    }

    pub fn has_subject(&self, subject: &str) -> bool {
        self.current.iter().any(|st| st.subject == subject)
    }

    /// Pending changes against the base.
    pub fn delta(&self) -> Delta {
        Delta {
            removed: self.base.difference(&self.current).cloned().collect(),
            added: self.current.difference(&self.base).cloned().collect(),
        }
    }

    /// Treat the current contents as committed.
    pub fn rebase(&mut self) {
        self.base = self.current.clone();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn st(s: &str, p: &str, o: Value) -> Statement {
        Statement::new(s, p, o)
    }

    #[test]
    fn delta_tracks_changes_since_import() {
        let mut graph = WorkingGraph::new();
        let kept = st("https://ex.org/br/1", "https://ex.org/title", Value::literal("A"));
        let dropped = st("https://ex.org/br/1", "https://ex.org/title", Value::literal("B"));
        graph.import("https://ex.org/br/1", vec![kept.clone(), dropped.clone()]);
        assert!(graph.delta().is_empty());

        let added = st("https://ex.org/br/1", "https://ex.org/title", Value::literal("C"));
        graph.remove(&dropped);
        graph.insert(added.clone());

        let delta = graph.delta();
        assert_eq!(delta.removed, vec![dropped]);
        assert_eq!(delta.added, vec![added]);

        graph.rebase();
        assert!(graph.delta().is_empty());
        assert!(graph.contains(&kept));
    }

    #[test]
    fn import_happens_once() {
        let mut graph = WorkingGraph::new();
        let a = st("https://ex.org/br/1", "https://ex.org/p", Value::literal("x"));
        assert_eq!(graph.import("https://ex.org/br/1", vec![a.clone()]), 1);
        graph.remove(&a);
        assert_eq!(graph.import("https://ex.org/br/1", vec![a.clone()]), 0);
        assert!(!graph.contains(&a));
    }

    #[test]
    fn matching_honours_wildcards_and_graph() {
        let mut graph = WorkingGraph::new();
        let g1 = st("https://ex.org/br/1", "https://ex.org/p", Value::literal("x"))
            .in_graph(Some("https://ex.org/g1".into()));
        let g2 = st("https://ex.org/br/1", "https://ex.org/p", Value::literal("x"))
            .in_graph(Some("https://ex.org/g2".into()));
        graph.insert(g1.clone());
        graph.insert(g2);

        assert_eq!(graph.matching("https://ex.org/br/1", None, None, None).len(), 2);
        assert_eq!(
            graph.matching("https://ex.org/br/1", Some("https://ex.org/p"), None, Some("https://ex.org/g1")),
            vec![g1]
        );
        assert!(graph.matching("https://ex.org/br/2", None, None, None).is_empty());
    }
}
