//! Write operations: staged deltas and their SPARQL update text.
//!
//! A delta is persisted as one update request, `DELETE DATA` before
//! `INSERT DATA`, with statements grouped by named graph.

use std::collections::BTreeMap;

use graphward_core::{Statement, Value};

use crate::client::StoreError;
use crate::queries::SparqlStore;

/// Statement-level changes staged against the dataset.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Delta {
    pub removed: Vec<Statement>,
    pub added: Vec<Statement>,
}

impl Delta {
    pub fn is_empty(&self) -> bool {
        self.removed.is_empty() && self.added.is_empty()
    }

    pub fn len(&self) -> usize {
        self.removed.len() + self.added.len()
    }

    /// The share of this delta whose subject is `iri`.
    pub fn for_entity(&self, iri: &str) -> Delta {
        let pick = |sts: &[Statement]| {
            sts.iter()
                .filter(|st| st.subject == iri)
                .cloned()
                .collect::<Vec<_>>()
        };
        Delta {
            removed: pick(&self.removed),
            added: pick(&self.added),
        }
    }

    /// Check every IRI in the delta can be embedded in update text.
    pub fn validate(&self) -> Result<(), StoreError> {
        for st in self.removed.iter().chain(&self.added) {
            check_iri(&st.subject)?;
            check_iri(&st.predicate)?;
            if let Value::Iri { iri } = &st.object {
                check_iri(iri)?;
            }
            if let Some(graph) = &st.graph {
                check_iri(graph)?;
            }
        }
        Ok(())
    }

    /// SPARQL update text for this delta. Empty when there is nothing to do.
    pub fn to_update(&self) -> String {
        let mut parts = Vec::with_capacity(2);
        if !self.removed.is_empty() {
            parts.push(format!("DELETE DATA {{\n{}}}", quad_data(&self.removed)));
        }
        if !self.added.is_empty() {
            parts.push(format!("INSERT DATA {{\n{}}}", quad_data(&self.added)));
        }
        parts.join(" ;\n")
    }
}

/// QuadData body: default-graph triples first, then one `GRAPH` block per graph.
fn quad_data(statements: &[Statement]) -> String {
    let mut by_graph: BTreeMap<Option<&str>, Vec<&Statement>> = BTreeMap::new();
    for st in statements {
        by_graph.entry(st.graph.as_deref()).or_default().push(st);
    }

    let mut out = String::new();
    for (graph, sts) in by_graph {
        match graph {
            None => {
                for st in sts {
                    out.push_str("  ");
                    out.push_str(&st.triple());
                    out.push('\n');
                }
            }
            Some(g) => {
                out.push_str(&format!("  GRAPH <{g}> {{\n"));
                for st in sts {
                    out.push_str("    ");
                    out.push_str(&st.triple());
                    out.push('\n');
                }
                out.push_str("  }\n");
            }
        }
    }
    out
}

/// Reject IRIs that would break out of `<...>` in query text.
pub fn check_iri(iri: &str) -> Result<(), StoreError> {
    let bad = iri.is_empty()
        || iri
            .chars()
            .any(|c| c.is_whitespace() || c.is_control() || "<>\"{}|^`\\".contains(c));
    if bad {
        Err(StoreError::InvalidIri(iri.to_string()))
    } else {
        Ok(())
    }
}

impl SparqlStore {
    /// Upload a delta as a single update request.
    pub(crate) async fn apply_delta(&self, delta: &Delta) -> Result<(), StoreError> {
        if delta.is_empty() {
            return Ok(());
        }
        delta.validate()?;
        self.client().update(&delta.to_update()).await?;
        tracing::debug!(
            removed = delta.removed.len(),
            added = delta.added.len(),
            "Delta applied"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn st(s: &str, p: &str, o: Value, g: Option<&str>) -> Statement {
        Statement::new(s, p, o).in_graph(g.map(String::from))
    }

    #[test]
    fn update_text_deletes_before_inserts_and_groups_graphs() {
        let delta = Delta {
            removed: vec![st("https://ex.org/a", "https://ex.org/p", Value::literal("old"), None)],
            added: vec![
                st(
                    "https://ex.org/a",
                    "https://ex.org/p",
                    Value::literal("new"),
                    Some("https://ex.org/g"),
                ),
                st(
                    "https://ex.org/a",
                    "https://ex.org/q",
                    Value::iri("https://ex.org/b"),
                    Some("https://ex.org/g"),
                ),
            ],
        };

        let text = delta.to_update();
        let delete_at = text.find("DELETE DATA").unwrap();
        let insert_at = text.find("INSERT DATA").unwrap();
        assert!(delete_at < insert_at);
        assert!(text.contains("<https://ex.org/a> <https://ex.org/p> \"old\" ."));
        assert_eq!(text.matches("GRAPH <https://ex.org/g>").count(), 1);
        assert!(text.contains("<https://ex.org/a> <https://ex.org/q> <https://ex.org/b> ."));
    }

    #[test]
    fn empty_delta_has_no_text() {
        assert!(Delta::default().is_empty());
        assert_eq!(Delta::default().to_update(), "");
    }

    #[test]
    fn for_entity_keeps_only_subject() {
        let delta = Delta {
            removed: vec![st("a", "p", Value::iri("b"), None)],
            added: vec![st("b", "p", Value::iri("a"), None), st("a", "q", Value::literal("x"), None)],
        };
        let share = delta.for_entity("a");
        assert_eq!(share.removed.len(), 1);
        assert_eq!(share.added.len(), 1);
        assert_eq!(share.added[0].predicate, "q");
    }

    #[test]
    fn rejects_unsafe_iris() {
        assert!(check_iri("https://ex.org/ok#frag").is_ok());
        assert!(check_iri("https://ex.org/> } DROP ALL {").is_err());
        assert!(check_iri("").is_err());

        let delta = Delta {
            removed: vec![],
            added: vec![st("https://ex.org/a", "https://ex.org/p", Value::iri("bad iri"), None)],
        };
        assert!(matches!(delta.validate(), Err(StoreError::InvalidIri(_))));
    }
}
