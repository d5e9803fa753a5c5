//! Provenance persistence seam and the in-process implementation.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;

use graphward_store::StoreError;

use crate::ProvenanceSnapshot;

#[derive(Debug, thiserror::Error)]
pub enum ProvError {
    #[error("provenance store error: {0}")]
    Store(#[from] StoreError),

    #[error("snapshot {id} does not belong to {entity}")]
    Mismatch { id: String, entity: String },

    #[error("snapshot {0} already recorded")]
    Duplicate(String),

    #[error("snapshot {0} derives from itself")]
    SelfDerived(String),
}

impl ProvError {
    /// Rejections of the batch itself, which retrying cannot cure.
    pub fn is_permanent(&self) -> bool {
        !matches!(self, Self::Store(_))
    }
}

/// Append-only store of provenance snapshots.
#[async_trait]
pub trait ProvenanceStore: Send + Sync {
    /// Identifier of the most recent snapshot of `entity`, if any.
    async fn latest_snapshot(&self, entity: &str) -> Result<Option<String>, ProvError>;

    /// Record a batch of snapshots. Either all are written or none.
    async fn append(&self, snapshots: &[ProvenanceSnapshot]) -> Result<(), ProvError>;
}

/// Snapshots kept per entity in commit order.
#[derive(Default)]
pub struct MemoryProvenanceStore {
    entities: RwLock<HashMap<String, Vec<ProvenanceSnapshot>>>,
}

impl MemoryProvenanceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every snapshot of `entity`, oldest first.
    pub fn history(&self, entity: &str) -> Vec<ProvenanceSnapshot> {
        self.entities.read().get(entity).cloned().unwrap_or_default()
    }

    pub fn snapshot_count(&self) -> usize {
        self.entities.read().values().map(Vec::len).sum()
    }
}

#[async_trait]
impl ProvenanceStore for MemoryProvenanceStore {
    async fn latest_snapshot(&self, entity: &str) -> Result<Option<String>, ProvError> {
        Ok(self
            .entities
            .read()
            .get(entity)
            .and_then(|history| history.last())
            .map(|snapshot| snapshot.id.clone()))
    }

    async fn append(&self, snapshots: &[ProvenanceSnapshot]) -> Result<(), ProvError> {
        let mut entities = self.entities.write();
        for snapshot in snapshots {
            snapshot.check()?;
            let recorded = entities
                .get(&snapshot.specialization_of)
                .is_some_and(|history| history.iter().any(|s| s.id == snapshot.id));
            if recorded {
                return Err(ProvError::Duplicate(snapshot.id.clone()));
            }
        }
        for snapshot in snapshots {
            entities
                .entry(snapshot.specialization_of.clone())
                .or_default()
                .push(snapshot.clone());
        }
        Ok(())
    }
}
