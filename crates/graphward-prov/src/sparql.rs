//! Provenance kept in a remote quadstore, one named graph per entity.

use async_trait::async_trait;

use graphward_core::vocab::{PROV_GENERATED_AT_TIME, PROV_SPECIALIZATION_OF};
use graphward_store::mutations::check_iri;
use graphward_store::{DatasetStore, Delta, QueryResults, RetryingQueryClient, SparqlStore};

use crate::store::{ProvError, ProvenanceStore};
use crate::ProvenanceSnapshot;

pub struct SparqlProvenanceStore {
    store: SparqlStore,
}

impl SparqlProvenanceStore {
    pub fn new(client: RetryingQueryClient) -> Self {
        Self {
            store: SparqlStore::new(client, true),
        }
    }

    pub fn latest_snapshot_query(entity: &str) -> String {
        format!(
            "SELECT ?se WHERE {{ GRAPH <{entity}/prov/> {{ \
             ?se <{PROV_SPECIALIZATION_OF}> <{entity}> ; <{PROV_GENERATED_AT_TIME}> ?at . }} }} \
             ORDER BY DESC(?at) DESC(STRLEN(STR(?se))) DESC(STR(?se)) LIMIT 1"
        )
    }
}

#[async_trait]
impl ProvenanceStore for SparqlProvenanceStore {
    async fn latest_snapshot(&self, entity: &str) -> Result<Option<String>, ProvError> {
        check_iri(entity)?;
        let results = self
            .store
            .client()
            .query(&Self::latest_snapshot_query(entity))
            .await?;
        Ok(results
            .rows()
            .first()
            .and_then(|row| QueryResults::optional_iri(row, "se")))
    }

    async fn append(&self, snapshots: &[ProvenanceSnapshot]) -> Result<(), ProvError> {
        for snapshot in snapshots {
            snapshot.check()?;
        }
        let delta = Delta {
            removed: Vec::new(),
            added: snapshots.iter().flat_map(|s| s.statements()).collect(),
        };
        self.store.apply(&delta).await?;
        tracing::info!(snapshots = snapshots.len(), "Provenance recorded");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use graphward_store::{RetryPolicy, SparqlEndpoint, StoreError};
    use parking_lot::Mutex;

    use super::*;
    use crate::SnapshotBuilder;

    #[derive(Default)]
    struct Recording {
        updates: Mutex<Vec<String>>,
        answer: String,
    }

    #[async_trait]
    impl SparqlEndpoint for Recording {
        async fn query(&self, _sparql: &str) -> Result<QueryResults, StoreError> {
            QueryResults::parse(&self.answer)
        }
        async fn update(&self, sparql: &str) -> Result<(), StoreError> {
            self.updates.lock().push(sparql.to_string());
            Ok(())
        }
    }

    fn store(endpoint: Arc<Recording>) -> SparqlProvenanceStore {
        SparqlProvenanceStore::new(RetryingQueryClient::new(endpoint, RetryPolicy::none()))
    }

    #[tokio::test]
    async fn append_inserts_into_entity_graph() {
        let endpoint = Arc::new(Recording::default());
        let prov = store(endpoint.clone());
        let snapshot = SnapshotBuilder::new("https://ex.org/br/1", 1, "https://ex.org/agent").finish();

        prov.append(&[snapshot]).await.unwrap();

        let updates = endpoint.updates.lock();
        assert_eq!(updates.len(), 1);
        assert!(updates[0].contains("INSERT DATA"));
        assert!(updates[0].contains("GRAPH <https://ex.org/br/1/prov/>"));
        assert!(updates[0].contains("<https://ex.org/br/1/prov/se/1>"));
        assert!(!updates[0].contains("DELETE DATA"));
    }

    #[tokio::test]
    async fn self_derived_snapshot_is_never_sent() {
        let endpoint = Arc::new(Recording::default());
        let prov = store(endpoint.clone());
        let mut builder = SnapshotBuilder::new("https://ex.org/br/1", 1, "https://ex.org/agent");
        builder.derive_from(Some("https://ex.org/br/1/prov/se/1".into()));

        let err = prov.append(&[builder.finish()]).await.unwrap_err();
        assert!(matches!(err, ProvError::SelfDerived(_)));
        assert!(endpoint.updates.lock().is_empty());
    }

    #[tokio::test]
    async fn latest_reads_first_binding() {
        let endpoint = Arc::new(Recording {
            answer: r#"{"head":{"vars":["se"]},"results":{"bindings":[
                {"se":{"type":"uri","value":"https://ex.org/br/1/prov/se/3"}}]}}"#
                .into(),
            ..Default::default()
        });
        let prov = store(endpoint);
        assert_eq!(
            prov.latest_snapshot("https://ex.org/br/1").await.unwrap().as_deref(),
            Some("https://ex.org/br/1/prov/se/3")
        );
    }

    #[tokio::test]
    async fn latest_is_none_without_history() {
        let endpoint = Arc::new(Recording {
            answer: r#"{"head":{"vars":["se"]},"results":{"bindings":[]}}"#.into(),
            ..Default::default()
        });
        assert_eq!(store(endpoint).latest_snapshot("https://ex.org/br/9").await.unwrap(), None);
    }
}
