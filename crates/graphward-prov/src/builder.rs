//! Builder-pattern recorder for a single provenance snapshot.
//!
//! Used by the editor at commit time:
//!
//! ```
//! # use graphward_prov::{ChangeKind, SnapshotBuilder};
//! let mut builder = SnapshotBuilder::new(
//!     "https://w3id.org/oc/meta/br/0601",
//!     2,
//!     "https://orcid.org/0000-0002-8420-0696",
//! );
//! builder.derive_from(Some("https://w3id.org/oc/meta/br/0601/prov/se/1".into()));
//! builder.set_change(ChangeKind::Modified);
//! let snapshot = builder.finish();
//! assert_eq!(snapshot.id, "https://w3id.org/oc/meta/br/0601/prov/se/2");
//! assert!(snapshot.invalidated_at.is_none());
//! ```

use chrono::Utc;

use crate::{snapshot_iri, ChangeKind, ProvenanceSnapshot};

pub struct SnapshotBuilder {
    snapshot: ProvenanceSnapshot,
}

impl SnapshotBuilder {
    /// Start snapshot `number` of `entity`, attributed to `agent`.
    pub fn new(entity: &str, number: u64, agent: &str) -> Self {
        let change = ChangeKind::Modified;
        Self {
            snapshot: ProvenanceSnapshot {
                id: snapshot_iri(entity, number),
                number,
                specialization_of: entity.to_string(),
                attributed_to: agent.to_string(),
                generated_at: Utc::now(),
                derived_from: None,
                invalidated_at: None,
                primary_source: None,
                change,
                description: change.describe(entity),
                update_query: None,
            },
        }
    }

    /// Chain to the entity's previous snapshot.
    pub fn derive_from(&mut self, previous: Option<String>) {
        self.snapshot.derived_from = previous;
    }

    /// Sets the change kind and its description. `Deleted` invalidates the entity.
    pub fn set_change(&mut self, change: ChangeKind) {
        self.snapshot.change = change;
        self.snapshot.description = change.describe(&self.snapshot.specialization_of);
    }

    pub fn set_primary_source(&mut self, source: Option<String>) {
        self.snapshot.primary_source = source;
    }

    pub fn set_update_query(&mut self, query: String) {
        if !query.is_empty() {
            self.snapshot.update_query = Some(query);
        }
    }

    /// Stamp the generation time (and invalidation time for deletions).
    pub fn finish(mut self) -> ProvenanceSnapshot {
        let now = Utc::now();
        self.snapshot.generated_at = now;
        if self.snapshot.change == ChangeKind::Deleted {
            self.snapshot.invalidated_at = Some(now);
        }
        self.snapshot
    }
}
