//! Graphward Prov: append-only provenance for dataset entities.
//!
//! Every commit that touches an entity produces one snapshot: which entity
//! it specializes, who is responsible, when it was generated, which snapshot
//! it derives from, and (for deletions) when the entity was invalidated.
//! Snapshots are written into `<entity>/prov/` with the PROV-O vocabulary
//! and never modified afterwards.

pub mod builder;
pub mod sparql;
pub mod store;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use graphward_core::vocab::{
    DCTERMS_DESCRIPTION, OCO_HAS_UPDATE_QUERY, PROV_ENTITY, PROV_GENERATED_AT_TIME,
    PROV_HAD_PRIMARY_SOURCE, PROV_INVALIDATED_AT_TIME, PROV_SPECIALIZATION_OF,
    PROV_WAS_ATTRIBUTED_TO, PROV_WAS_DERIVED_FROM, RDF_TYPE, XSD_DATETIME, XSD_STRING,
};
use graphward_core::{Literal, Statement, Value};

pub use builder::SnapshotBuilder;
pub use sparql::SparqlProvenanceStore;
pub use store::{MemoryProvenanceStore, ProvError, ProvenanceStore};

// ── Core Types ───────────────────────────────────────────────────

/// What happened to the entity in the commit a snapshot records.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Created,
    Modified,
    Deleted,
    Restored,
}

impl ChangeKind {
    pub fn describe(&self, entity: &str) -> String {
        let verb = match self {
            Self::Created => "created",
            Self::Modified => "modified",
            Self::Deleted => "deleted",
            Self::Restored => "restored",
        };
        format!("The entity '{entity}' has been {verb}.")
    }
}

/// One state transition of one entity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProvenanceSnapshot {
    /// `<entity>/prov/se/<number>`.
    pub id: String,
    pub number: u64,
    /// The entity this snapshot specializes.
    pub specialization_of: String,
    /// Responsible agent.
    pub attributed_to: String,
    pub generated_at: DateTime<Utc>,
    /// The previous snapshot of the same entity.
    pub derived_from: Option<String>,
    /// Set when the snapshot records the entity's deletion.
    pub invalidated_at: Option<DateTime<Utc>>,
    pub primary_source: Option<String>,
    pub change: ChangeKind,
    pub description: String,
    /// The SPARQL update that produced this state, when there was one.
    pub update_query: Option<String>,
}

/// Identifier of snapshot `number` of `entity`.
pub fn snapshot_iri(entity: &str, number: u64) -> String {
    format!("{entity}/prov/se/{number}")
}

/// Snapshot number encoded in a snapshot identifier.
pub fn snapshot_number(id: &str) -> Option<u64> {
    let (_, n) = id.rsplit_once("/prov/se/")?;
    n.parse().ok()
}

/// Named graph holding every snapshot of `entity`.
pub fn provenance_graph(entity: &str) -> String {
    format!("{entity}/prov/")
}

fn xsd_datetime(at: &DateTime<Utc>) -> Value {
    Value::Literal(Literal::typed(
        at.to_rfc3339_opts(SecondsFormat::Secs, true),
        XSD_DATETIME,
    ))
}

impl ProvenanceSnapshot {
    pub fn is_invalidation(&self) -> bool {
        self.invalidated_at.is_some()
    }

    /// Reject snapshots that cannot sit in their entity's chain.
    pub fn check(&self) -> Result<(), ProvError> {
        if !self.id.starts_with(&self.specialization_of) {
            return Err(ProvError::Mismatch {
                id: self.id.clone(),
                entity: self.specialization_of.clone(),
            });
        }
        if self.derived_from.as_deref() == Some(self.id.as_str()) {
            return Err(ProvError::SelfDerived(self.id.clone()));
        }
        Ok(())
    }

    /// The statements recording this snapshot, in its provenance graph.
    pub fn statements(&self) -> Vec<Statement> {
        let graph = Some(provenance_graph(&self.specialization_of));
        let id = self.id.as_str();
        let mut out = vec![
            Statement::new(id, RDF_TYPE, Value::iri(PROV_ENTITY)),
            Statement::new(
                id,
                PROV_SPECIALIZATION_OF,
                Value::iri(&self.specialization_of),
            ),
            Statement::new(id, PROV_WAS_ATTRIBUTED_TO, Value::iri(&self.attributed_to)),
            Statement::new(id, PROV_GENERATED_AT_TIME, xsd_datetime(&self.generated_at)),
            Statement::new(
                id,
                DCTERMS_DESCRIPTION,
                Value::Literal(Literal::plain(&self.description)),
            ),
        ];
        if let Some(prev) = &self.derived_from {
            out.push(Statement::new(id, PROV_WAS_DERIVED_FROM, Value::iri(prev)));
        }
        if let Some(at) = &self.invalidated_at {
            out.push(Statement::new(id, PROV_INVALIDATED_AT_TIME, xsd_datetime(at)));
        }
        if let Some(source) = &self.primary_source {
            out.push(Statement::new(id, PROV_HAD_PRIMARY_SOURCE, Value::iri(source)));
        }
        if let Some(query) = &self.update_query {
            out.push(Statement::new(
                id,
                OCO_HAS_UPDATE_QUERY,
                Value::Literal(Literal::typed(query, XSD_STRING)),
            ));
        }
        out.into_iter().map(|st| st.in_graph(graph.clone())).collect()
    }
}
