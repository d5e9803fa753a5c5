//! The graph editor: staged statement edits committed with provenance.

use std::sync::Arc;

use graphward_core::config::EditorSettings;
use graphward_core::{Statement, Value};
use graphward_prov::{
    snapshot_number, ChangeKind, ProvError, ProvenanceSnapshot, ProvenanceStore, SnapshotBuilder,
};
use graphward_store::DatasetStore;

use crate::counter::{CounterKey, IdentifierCounter};
use crate::error::{EditorError, Result};
use crate::index::{EntityIndex, EntityIndexEntry};
use crate::working::WorkingGraph;

// ── Configuration ────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct EditorConfig {
    /// Agent every change in this session is attributed to.
    pub resp_agent: String,
    pub primary_source: Option<String>,
    pub counter_namespace: String,
    pub supplier_prefix: String,
}

impl From<&EditorSettings> for EditorConfig {
    fn from(s: &EditorSettings) -> Self {
        Self {
            resp_agent: s.resp_agent.clone(),
            primary_source: s.primary_source.clone(),
            counter_namespace: s.counter_namespace.clone(),
            supplier_prefix: s.supplier_prefix.clone(),
        }
    }
}

impl EditorConfig {
    fn counter_key(&self, entity: &str) -> CounterKey {
        CounterKey::new(&self.counter_namespace, &self.supplier_prefix, entity)
    }
}

/// What a successful commit wrote.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommitSummary {
    pub removed: usize,
    pub added: usize,
    /// Identifiers of the snapshots recorded, in entity order.
    pub snapshots: Vec<String>,
}

impl CommitSummary {
    pub fn is_empty(&self) -> bool {
        self.removed == 0 && self.added == 0 && self.snapshots.is_empty()
    }
}

// ── Editor ───────────────────────────────────────────────────────

/// One editing session over the shared dataset.
pub struct GraphEditor {
    pub(crate) working: WorkingGraph,
    pub(crate) index: EntityIndex,
    pub(crate) dataset: Arc<dyn DatasetStore>,
    provenance: Arc<dyn ProvenanceStore>,
    counter: Arc<dyn IdentifierCounter>,
    config: EditorConfig,
    pending: Vec<ProvenanceSnapshot>,
}

impl GraphEditor {
    pub fn new(
        dataset: Arc<dyn DatasetStore>,
        provenance: Arc<dyn ProvenanceStore>,
        counter: Arc<dyn IdentifierCounter>,
        config: EditorConfig,
    ) -> Self {
        Self {
            working: WorkingGraph::new(),
            index: EntityIndex::new(),
            dataset,
            provenance,
            counter,
            config,
            pending: Vec::new(),
        }
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn working(&self) -> &WorkingGraph {
        &self.working
    }

    pub fn index(&self) -> &EntityIndex {
        &self.index
    }

    /// Snapshots whose upload failed after their dataset delta was committed.
    pub fn pending_provenance(&self) -> &[ProvenanceSnapshot] {
        &self.pending
    }

    pub(crate) fn touch(&mut self, entity: &str) -> &mut EntityIndexEntry {
        self.index.touch(
            entity,
            &self.config.resp_agent,
            self.config.primary_source.as_deref(),
        )
    }

    // ── Import ───────────────────────────────────────────────────

    /// Hydrate the working graph with an entity's remote statements.
    pub async fn import_entity(&mut self, iri: &str) -> Result<usize> {
        if self.working.is_imported(iri) {
            return Ok(0);
        }
        let statements = self.dataset.entity_statements(iri).await?;
        let count = self.working.import(iri, statements);
        tracing::debug!(entity = %iri, statements = count, "Entity imported");
        Ok(count)
    }

    pub async fn import_entities<I, S>(&mut self, iris: I) -> Result<usize>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut total = 0;
        for iri in iris {
            total += self.import_entity(iri.as_ref()).await?;
        }
        Ok(total)
    }

    // ── Statement edits ──────────────────────────────────────────

    pub fn create(&mut self, subject: &str, predicate: &str, value: Value, graph: Option<&str>) {
        let statement =
            Statement::new(subject, predicate, value).in_graph(graph.map(str::to_string));
        self.working.insert(statement);
        self.touch(subject);
    }

    /// Replace `(subject, predicate, old)` with `(subject, predicate, new)`.
    ///
    /// Without `graph`, every matching statement is replaced within its own
    /// graph.
    pub fn update(
        &mut self,
        subject: &str,
        predicate: &str,
        old: &Value,
        new: Value,
        graph: Option<&str>,
    ) -> Result<()> {
        let found = self
            .working
            .matching(subject, Some(predicate), Some(old), graph);
        if found.is_empty() {
            return Err(EditorError::StatementNotFound {
                subject: subject.to_string(),
                predicate: predicate.to_string(),
                value: old.to_string(),
            });
        }
        for statement in found {
            self.working.remove(&statement);
            let target = graph.map(str::to_string).or(statement.graph);
            self.working.insert(
                Statement::new(subject, predicate, new.clone()).in_graph(target),
            );
        }
        self.touch(subject);
        Ok(())
    }

    /// Remove statements.
    ///
    /// Without `predicate` the whole entity goes: every statement with
    /// `subject` as subject or object. With `predicate` and `value`, exactly
    /// that statement. With `predicate` only, every statement for that pair.
    /// An entity left with no statements in any graph is marked deleted.
    pub fn delete(
        &mut self,
        subject: &str,
        predicate: Option<&str>,
        value: Option<&Value>,
        graph: Option<&str>,
    ) -> Result<()> {
        match predicate {
            None => {
                let own = self.working.matching(subject, None, None, graph);
                let referencing: Vec<Statement> = self
                    .working
                    .referencing(subject)
                    .into_iter()
                    .filter(|st| graph.map_or(true, |g| st.graph.as_deref() == Some(g)))
                    .collect();
                if own.is_empty() && referencing.is_empty() {
                    return Err(EditorError::EntityNotFound(subject.to_string()));
                }
                for statement in &own {
                    self.working.remove(statement);
                }
                for statement in &referencing {
                    self.working.remove(statement);
                    self.touch(&statement.subject);
                }
                let emptied = !self.working.has_subject(subject);
                let entry = self.touch(subject);
                if emptied {
                    entry.to_be_deleted = true;
                }
                tracing::debug!(
                    entity = %subject,
                    removed = own.len() + referencing.len(),
                    "Entity deleted"
                );
            }
            Some(p) => {
                let found = self.working.matching(subject, Some(p), value, graph);
                if found.is_empty() {
                    return Err(EditorError::StatementNotFound {
                        subject: subject.to_string(),
                        predicate: p.to_string(),
                        value: value.map_or_else(|| "?".to_string(), Value::to_string),
                    });
                }
                for statement in &found {
                    self.working.remove(statement);
                }
                let emptied = !self.working.has_subject(subject);
                let entry = self.touch(subject);
                if emptied {
                    entry.to_be_deleted = true;
                }
            }
        }
        Ok(())
    }

    /// Mark a previously deleted entity as restored.
    pub fn restore(&mut self, iri: &str) {
        let entry = self.touch(iri);
        entry.to_be_deleted = false;
        entry.is_restored = true;
    }

    /// Mint `<base_iri>/<short_type>/<supplier_prefix><n>` from the type's counter.
    pub async fn mint_entity(&self, short_type: &str, base_iri: &str) -> Result<String> {
        let n = self
            .counter
            .increment(&self.config.counter_key(short_type))
            .await?;
        let base = base_iri.trim_end_matches('/');
        Ok(format!(
            "{base}/{short_type}/{}{n}",
            self.config.supplier_prefix
        ))
    }

    // ── Commit ───────────────────────────────────────────────────

    /// Commit the dataset delta, then one snapshot per touched entity.
    pub async fn save(&mut self) -> Result<CommitSummary> {
        self.flush_pending().await?;

        let delta = self.working.delta();
        if delta.is_empty() && self.index.is_empty() {
            return Ok(CommitSummary::default());
        }

        let mut snapshots = Vec::with_capacity(self.index.len());
        for (entity, entry) in self.index.iter() {
            let key = self.config.counter_key(entity);
            let previous = self.provenance.latest_snapshot(entity).await?;
            let recorded = previous.as_deref().and_then(snapshot_number).unwrap_or(0);
            let mut number = self.counter.increment(&key).await?;
            if number <= recorded {
                tracing::warn!(
                    entity = %entity,
                    counter = number,
                    recorded,
                    "Snapshot counter behind provenance, re-seeding"
                );
                number = recorded + 1;
                self.counter.set(number as i64, &key).await?;
            }
            let change = if entry.to_be_deleted {
                ChangeKind::Deleted
            } else if entry.is_restored {
                ChangeKind::Restored
            } else if previous.is_none() {
                ChangeKind::Created
            } else {
                ChangeKind::Modified
            };

            let mut builder = SnapshotBuilder::new(entity, number, &entry.resp_agent);
            builder.derive_from(previous);
            builder.set_change(change);
            builder.set_primary_source(entry.primary_source.clone());
            builder.set_update_query(delta.for_entity(entity).to_update());
            snapshots.push(builder.finish());
        }

        self.dataset.apply(&delta).await?;
        self.working.rebase();
        self.index.clear();

        let summary = CommitSummary {
            removed: delta.removed.len(),
            added: delta.added.len(),
            snapshots: snapshots.iter().map(|s| s.id.clone()).collect(),
        };

        if let Err(source) = self.provenance.append(&snapshots).await {
            if source.is_permanent() {
                return Err(Self::drop_rejected(&snapshots, source));
            }
            tracing::warn!(
                snapshots = snapshots.len(),
                error = %source,
                "Provenance upload failed after dataset commit"
            );
            let count = snapshots.len();
            self.pending = snapshots;
            return Err(EditorError::ProvenancePending {
                snapshots: count,
                source,
            });
        }

        tracing::info!(
            removed = summary.removed,
            added = summary.added,
            snapshots = summary.snapshots.len(),
            "Commit saved"
        );
        Ok(summary)
    }

    async fn flush_pending(&mut self) -> Result<()> {
        if self.pending.is_empty() {
            return Ok(());
        }
        match self.provenance.append(&self.pending).await {
            Ok(()) => {
                tracing::info!(snapshots = self.pending.len(), "Pending provenance recorded");
                self.pending.clear();
                Ok(())
            }
            Err(source) if source.is_permanent() => {
                let rejected = std::mem::take(&mut self.pending);
                Err(Self::drop_rejected(&rejected, source))
            }
            Err(source) => Err(EditorError::ProvenancePending {
                snapshots: self.pending.len(),
                source,
            }),
        }
    }

    /// A batch the provenance store refused outright is not retried.
    fn drop_rejected(snapshots: &[ProvenanceSnapshot], source: ProvError) -> EditorError {
        tracing::error!(
            snapshots = snapshots.len(),
            first = snapshots.first().map(|s| s.id.as_str()).unwrap_or(""),
            error = %source,
            "Provenance batch rejected, dropping it"
        );
        EditorError::Provenance(source)
    }
}
