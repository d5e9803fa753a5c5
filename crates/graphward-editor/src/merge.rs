//! Merging one entity into another.

use graphward_core::{Statement, Term, Value};

use crate::editor::{CommitSummary, GraphEditor};
use crate::error::{EditorError, Result};

impl GraphEditor {
    /// Fold `delete` into `keep` and commit.
    ///
    /// Every statement pointing at `delete` is repointed at `keep`, every
    /// statement `delete` emits (other than its types) moves to `keep`, and
    /// `delete` is then removed. Discovery and hydration failures abort
    /// before anything is written.
    pub async fn merge(&mut self, keep: &str, delete: &str) -> Result<CommitSummary> {
        if keep == delete {
            return Err(EditorError::SelfMerge(keep.to_string()));
        }

        let incoming = self.dataset.incoming(delete).await?;
        let outgoing = self.dataset.outgoing(delete).await?;

        let mut related = vec![keep.to_string(), delete.to_string()];
        related.extend(incoming.iter().map(|(subject, _)| subject.clone()));
        let mut moves = Vec::with_capacity(outgoing.len());
        for (predicate, term) in outgoing {
            match term {
                Term::Blank(id) => {
                    tracing::warn!(
                        entity = %delete,
                        predicate = %predicate,
                        blank = %id,
                        "Skipping unaddressable value"
                    );
                }
                term => {
                    if let Some(iri) = term.as_iri() {
                        related.push(iri.to_string());
                    }
                    if let Some(value) = term.into_value() {
                        moves.push((predicate, value));
                    }
                }
            }
        }
        self.import_entities(&related).await?;

        for (subject, predicate) in &incoming {
            let pointing_at = Value::iri(delete);
            match self.update(subject, predicate, &pointing_at, Value::iri(keep), None) {
                Ok(()) => {}
                Err(EditorError::StatementNotFound { .. }) => {
                    tracing::debug!(subject = %subject, predicate = %predicate, "Incoming link already repointed");
                }
                Err(e) => {
                    tracing::warn!(subject = %subject, predicate = %predicate, error = %e, "Skipping incoming link");
                }
            }
        }

        for (predicate, value) in &moves {
            self.move_statement(delete, keep, predicate, value);
        }

        match self.delete(delete, None, None, None) {
            Ok(()) | Err(EditorError::EntityNotFound(_)) => {}
            Err(e) => {
                tracing::warn!(entity = %delete, error = %e, "Failed to clear merged entity");
            }
        }
        self.touch(delete).to_be_deleted = true;
        self.touch(keep);

        tracing::info!(keep = %keep, deleted = %delete, "Entities merged");
        self.save().await
    }

    /// Move `(from, predicate, value)` to `to` within each graph it lives in.
    fn move_statement(&mut self, from: &str, to: &str, predicate: &str, value: &Value) {
        let found = self.working.matching(from, Some(predicate), Some(value), None);
        if found.is_empty() {
            tracing::debug!(entity = %from, predicate = %predicate, "Outgoing statement already moved");
            return;
        }
        for statement in found {
            self.working.remove(&statement);
            let moved = Statement::new(to, predicate, value.clone()).in_graph(statement.graph);
            if !self.working.insert(moved) {
                tracing::debug!(entity = %to, predicate = %predicate, "Duplicate statement dropped");
            }
        }
        self.touch(to);
        self.touch(from);
    }
}
