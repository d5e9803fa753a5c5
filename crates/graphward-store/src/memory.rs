//! In-process dataset store.
//!
//! Holds statements in a set behind a lock. Used for local runs and as the
//! dataset fake in tests of the lock manager and the editor.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::RwLock;

use graphward_core::vocab::RDF_TYPE;
use graphward_core::{Statement, Term, Value};

use crate::client::StoreError;
use crate::mutations::Delta;
use crate::store::DatasetStore;

#[derive(Default)]
pub struct MemoryStore {
    statements: RwLock<BTreeSet<Statement>>,
    calls: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_statements(statements: impl IntoIterator<Item = Statement>) -> Self {
        let store = Self::new();
        store.statements.write().extend(statements);
        store
    }

    pub fn insert(&self, statement: Statement) {
        self.statements.write().insert(statement);
    }

    pub fn contains(&self, statement: &Statement) -> bool {
        self.statements.read().contains(statement)
    }

    pub fn statements(&self) -> Vec<Statement> {
        self.statements.read().iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.statements.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.statements.read().is_empty()
    }

    /// Number of trait calls served so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn touch(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }

    fn collect<T: Ord>(&self, f: impl Fn(&Statement) -> Option<T>) -> Vec<T> {
        self.touch();
        let distinct: BTreeSet<T> = self.statements.read().iter().filter_map(f).collect();
        distinct.into_iter().collect()
    }
}

#[async_trait]
impl DatasetStore for MemoryStore {
    async fn entity_statements(&self, iri: &str) -> Result<Vec<Statement>, StoreError> {
        Ok(self.collect(|st| (st.subject == iri).then(|| st.clone())))
    }

    async fn incoming(&self, iri: &str) -> Result<Vec<(String, String)>, StoreError> {
        Ok(self.collect(|st| {
            (st.object.is_iri(iri) && st.predicate != RDF_TYPE)
                .then(|| (st.subject.clone(), st.predicate.clone()))
        }))
    }

    async fn outgoing(&self, iri: &str) -> Result<Vec<(String, Term)>, StoreError> {
        let pairs = self.collect(|st| {
            (st.subject == iri && st.predicate != RDF_TYPE)
                .then(|| (st.predicate.clone(), st.object.clone()))
        });
        Ok(pairs
            .into_iter()
            .map(|(p, v)| {
                let term = match v {
                    Value::Iri { iri } => Term::Iri(iri),
                    Value::Literal(lit) => Term::Literal(lit),
                };
                (p, term)
            })
            .collect())
    }

    async fn linked_objects(&self, iri: &str) -> Result<Vec<String>, StoreError> {
        Ok(self.collect(|st| {
            (st.subject == iri)
                .then(|| st.object.as_iri().map(String::from))
                .flatten()
        }))
    }

    async fn linking_subjects(&self, iri: &str) -> Result<Vec<String>, StoreError> {
        Ok(self.collect(|st| st.object.is_iri(iri).then(|| st.subject.clone())))
    }

    async fn has_outgoing(&self, iri: &str) -> Result<bool, StoreError> {
        self.touch();
        Ok(self.statements.read().iter().any(|st| st.subject == iri))
    }

    async fn apply(&self, delta: &Delta) -> Result<(), StoreError> {
        self.touch();
        let mut statements = self.statements.write();
        for st in &delta.removed {
            statements.remove(st);
        }
        statements.extend(delta.added.iter().cloned());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> MemoryStore {
        MemoryStore::with_statements([
            Statement::new("a", RDF_TYPE, Value::iri("Book")),
            Statement::new("a", "author", Value::iri("b")),
            Statement::new("a", "title", Value::literal("T")),
            Statement::new("c", "cites", Value::iri("a")),
            Statement::new("c", RDF_TYPE, Value::iri("a")),
        ])
    }

    #[tokio::test]
    async fn merge_reads_exclude_type() {
        let store = sample();
        assert_eq!(
            store.incoming("a").await.unwrap(),
            vec![("c".to_string(), "cites".to_string())]
        );
        let outgoing = store.outgoing("a").await.unwrap();
        assert_eq!(outgoing.len(), 2);
        assert!(outgoing.iter().all(|(p, _)| p != RDF_TYPE));
    }

    #[tokio::test]
    async fn link_reads_are_distinct() {
        let store = sample();
        assert_eq!(store.linked_objects("a").await.unwrap(), vec!["Book", "b"]);
        assert_eq!(store.linking_subjects("a").await.unwrap(), vec!["c"]);
        assert!(store.has_outgoing("c").await.unwrap());
        assert!(!store.has_outgoing("b").await.unwrap());
    }

    #[tokio::test]
    async fn apply_removes_then_adds() {
        let store = sample();
        let title = Statement::new("a", "title", Value::literal("T"));
        let retitled = Statement::new("a", "title", Value::literal("U"));
        store
            .apply(&Delta {
                removed: vec![title.clone()],
                added: vec![retitled.clone()],
            })
            .await
            .unwrap();
        assert!(!store.contains(&title));
        assert!(store.contains(&retitled));
        assert_eq!(store.len(), 5);
    }
}
