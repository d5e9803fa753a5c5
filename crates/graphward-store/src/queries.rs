//! Read operations and SPARQL query builders for the shared dataset.

use async_trait::async_trait;

use graphward_core::vocab::RDF_TYPE;
use graphward_core::{Statement, Term};

use crate::client::{RetryingQueryClient, StoreError};
use crate::mutations::{check_iri, Delta};
use crate::results::QueryResults;
use crate::store::DatasetStore;

/// A remote dataset reached through the retrying query client.
#[derive(Clone)]
pub struct SparqlStore {
    client: RetryingQueryClient,
    quadstore: bool,
}

impl SparqlStore {
    /// `quadstore` wraps every pattern in `GRAPH ?g { ... }`.
    pub fn new(client: RetryingQueryClient, quadstore: bool) -> Self {
        Self { client, quadstore }
    }

    pub fn client(&self) -> &RetryingQueryClient {
        &self.client
    }

    fn pattern(&self, triple: &str) -> String {
        if self.quadstore {
            format!("GRAPH ?g {{ {triple} }}")
        } else {
            triple.to_string()
        }
    }

    // ── Query Builders ───────────────────────────────────────────

    pub fn entity_statements_query(&self, iri: &str) -> String {
        let vars = if self.quadstore { "?p ?o ?g" } else { "?p ?o" };
        format!(
            "SELECT {vars} WHERE {{ {} }}",
            self.pattern(&format!("<{iri}> ?p ?o ."))
        )
    }

    pub fn incoming_query(&self, iri: &str) -> String {
        format!(
            "SELECT DISTINCT ?s ?p WHERE {{ {} FILTER(?p != <{RDF_TYPE}>) }}",
            self.pattern(&format!("?s ?p <{iri}> ."))
        )
    }

    pub fn outgoing_query(&self, iri: &str) -> String {
        format!(
            "SELECT DISTINCT ?p ?o WHERE {{ {} FILTER(?p != <{RDF_TYPE}>) }}",
            self.pattern(&format!("<{iri}> ?p ?o ."))
        )
    }

    pub fn linked_objects_query(&self, iri: &str) -> String {
        format!(
            "SELECT DISTINCT ?o WHERE {{ {} FILTER(isIRI(?o)) }}",
            self.pattern(&format!("<{iri}> ?p ?o ."))
        )
    }

    pub fn linking_subjects_query(&self, iri: &str) -> String {
        format!(
            "SELECT DISTINCT ?s WHERE {{ {} }}",
            self.pattern(&format!("?s ?p <{iri}> ."))
        )
    }

    pub fn has_outgoing_query(&self, iri: &str) -> String {
        format!("ASK {{ {} }}", self.pattern(&format!("<{iri}> ?p ?o .")))
    }
}

#[async_trait]
impl DatasetStore for SparqlStore {
    async fn entity_statements(&self, iri: &str) -> Result<Vec<Statement>, StoreError> {
        check_iri(iri)?;
        let results = self.client.query(&self.entity_statements_query(iri)).await?;

        let mut statements = Vec::with_capacity(results.rows().len());
        for row in results.rows() {
            let predicate = QueryResults::iri(row, "p")?;
            let Some(object) = QueryResults::term(row, "o")?.into_value() else {
                tracing::warn!(subject = %iri, predicate = %predicate, "Skipping blank node object");
                continue;
            };
            let graph = QueryResults::optional_iri(row, "g");
            statements.push(Statement::new(iri, predicate, object).in_graph(graph));
        }
        Ok(statements)
    }

    async fn incoming(&self, iri: &str) -> Result<Vec<(String, String)>, StoreError> {
        check_iri(iri)?;
        let results = self.client.query(&self.incoming_query(iri)).await?;
        let mut pairs = Vec::with_capacity(results.rows().len());
        for row in results.rows() {
            let Some(subject) = QueryResults::optional_iri(row, "s") else {
                tracing::warn!(object = %iri, "Skipping non-IRI referencing subject");
                continue;
            };
            pairs.push((subject, QueryResults::iri(row, "p")?));
        }
        Ok(pairs)
    }

    async fn outgoing(&self, iri: &str) -> Result<Vec<(String, Term)>, StoreError> {
        check_iri(iri)?;
        let results = self.client.query(&self.outgoing_query(iri)).await?;
        results
            .rows()
            .iter()
            .map(|row| Ok((QueryResults::iri(row, "p")?, QueryResults::term(row, "o")?)))
            .collect()
    }

    async fn linked_objects(&self, iri: &str) -> Result<Vec<String>, StoreError> {
        check_iri(iri)?;
        let results = self.client.query(&self.linked_objects_query(iri)).await?;
        Ok(results.iris("o"))
    }

    async fn linking_subjects(&self, iri: &str) -> Result<Vec<String>, StoreError> {
        check_iri(iri)?;
        let results = self.client.query(&self.linking_subjects_query(iri)).await?;
        Ok(results.iris("s"))
    }

    async fn has_outgoing(&self, iri: &str) -> Result<bool, StoreError> {
        check_iri(iri)?;
        let results = self.client.query(&self.has_outgoing_query(iri)).await?;
        Ok(results.ask())
    }

    async fn apply(&self, delta: &Delta) -> Result<(), StoreError> {
        self.apply_delta(delta).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use parking_lot::Mutex;

    use graphward_core::Value;

    use super::*;
    use crate::client::{RetryPolicy, SparqlEndpoint};

    /// Answers every query with a canned document and records the text.
    struct CannedEndpoint {
        body: String,
        seen: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl SparqlEndpoint for CannedEndpoint {
        async fn query(&self, sparql: &str) -> Result<QueryResults, StoreError> {
            self.seen.lock().push(sparql.to_string());
            QueryResults::parse(&self.body)
        }

        async fn update(&self, sparql: &str) -> Result<(), StoreError> {
            self.seen.lock().push(sparql.to_string());
            Ok(())
        }
    }

    fn store(body: &str, quadstore: bool) -> (SparqlStore, Arc<CannedEndpoint>) {
        let endpoint = Arc::new(CannedEndpoint {
            body: body.to_string(),
            seen: Mutex::new(Vec::new()),
        });
        let client = RetryingQueryClient::new(endpoint.clone(), RetryPolicy::none());
        (SparqlStore::new(client, quadstore), endpoint)
    }

    #[test]
    fn quadstore_patterns_use_graph_variable() {
        let (triples, _) = store("{}", false);
        let (quads, _) = store("{}", true);
        let iri = "https://ex.org/br/1";

        assert_eq!(
            triples.has_outgoing_query(iri),
            "ASK { <https://ex.org/br/1> ?p ?o . }"
        );
        assert!(quads.has_outgoing_query(iri).contains("GRAPH ?g {"));
        assert!(quads.entity_statements_query(iri).starts_with("SELECT ?p ?o ?g"));
        assert!(triples.incoming_query(iri).contains(RDF_TYPE));
    }

    #[tokio::test]
    async fn entity_statements_skip_blank_objects() {
        let body = r#"{"head": {"vars": ["p", "o", "g"]}, "results": {"bindings": [
            {"p": {"type": "uri", "value": "https://ex.org/title"},
             "o": {"type": "literal", "value": "T"},
             "g": {"type": "uri", "value": "https://ex.org/g"}},
            {"p": {"type": "uri", "value": "https://ex.org/nested"},
             "o": {"type": "bnode", "value": "b1"},
             "g": {"type": "uri", "value": "https://ex.org/g"}}
        ]}}"#;
        let (store, endpoint) = store(body, true);

        let statements = store.entity_statements("https://ex.org/br/1").await.unwrap();
        assert_eq!(statements.len(), 1);
        assert_eq!(statements[0].object, Value::literal("T"));
        assert_eq!(statements[0].graph.as_deref(), Some("https://ex.org/g"));
        assert_eq!(endpoint.seen.lock().len(), 1);
    }

    #[tokio::test]
    async fn invalid_iri_never_reaches_endpoint() {
        let (store, endpoint) = store("{}", false);
        let err = store.linked_objects("bad>iri").await.unwrap_err();
        assert!(matches!(err, StoreError::InvalidIri(_)));
        assert!(endpoint.seen.lock().is_empty());
    }

    #[tokio::test]
    async fn apply_skips_empty_delta() {
        let (store, endpoint) = store("{}", false);
        store.apply(&Delta::default()).await.unwrap();
        assert!(endpoint.seen.lock().is_empty());

        let delta = Delta {
            removed: vec![],
            added: vec![Statement::new("https://ex.org/a", "https://ex.org/p", Value::literal("x"))],
        };
        store.apply(&delta).await.unwrap();
        let seen = endpoint.seen.lock();
        assert_eq!(seen.len(), 1);
        assert!(seen[0].starts_with("INSERT DATA"));
    }
}
