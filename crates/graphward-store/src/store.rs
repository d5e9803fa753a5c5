//! The typed seam over the shared dataset.

use async_trait::async_trait;

use graphward_core::{Statement, Term};

use crate::client::StoreError;
use crate::mutations::Delta;

/// Read and write access to the shared dataset.
///
/// Implemented remotely by [`crate::SparqlStore`] and in process by
/// [`crate::MemoryStore`]. `rdf:type` is excluded from the merge discovery
/// reads (`incoming`, `outgoing`) but not from the link discovery reads.
#[async_trait]
pub trait DatasetStore: Send + Sync {
    /// Every statement with `iri` as subject.
    async fn entity_statements(&self, iri: &str) -> Result<Vec<Statement>, StoreError>;

    /// Distinct `(subject, predicate)` pairs pointing at `iri`, excluding `rdf:type`.
    async fn incoming(&self, iri: &str) -> Result<Vec<(String, String)>, StoreError>;

    /// Distinct `(predicate, object)` pairs emitted by `iri`, excluding `rdf:type`.
    async fn outgoing(&self, iri: &str) -> Result<Vec<(String, Term)>, StoreError>;

    /// Distinct entity identifiers `iri` references.
    async fn linked_objects(&self, iri: &str) -> Result<Vec<String>, StoreError>;

    /// Distinct subjects that reference `iri`.
    async fn linking_subjects(&self, iri: &str) -> Result<Vec<String>, StoreError>;

    /// Whether `iri` has at least one outgoing statement.
    async fn has_outgoing(&self, iri: &str) -> Result<bool, StoreError>;

    /// Persist a staged delta: removals first, then additions.
    async fn apply(&self, delta: &Delta) -> Result<(), StoreError>;
}
