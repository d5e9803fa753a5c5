//! Decoding of SPARQL 1.1 JSON query results.

use std::collections::HashMap;

use serde::Deserialize;

use graphward_core::{Literal, Term};

use crate::client::StoreError;

/// A raw result cell as it appears on the wire.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct RawTerm {
    #[serde(rename = "type")]
    pub kind: String,
    pub value: String,
    #[serde(default)]
    pub datatype: Option<String>,
    #[serde(default, rename = "xml:lang")]
    pub lang: Option<String>,
}

impl RawTerm {
    pub fn to_term(&self) -> Result<Term, StoreError> {
        match self.kind.as_str() {
            "uri" => Ok(Term::Iri(self.value.clone())),
            "bnode" => Ok(Term::Blank(self.value.clone())),
            "literal" | "typed-literal" => Ok(Term::Literal(Literal {
                lexical: self.value.clone(),
                datatype: self.datatype.clone(),
                language: self.lang.clone(),
            })),
            other => Err(StoreError::Decode(format!("unknown term type '{other}'"))),
        }
    }
}

/// One solution: variable name to bound cell.
pub type Row = HashMap<String, RawTerm>;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Head {
    #[serde(default)]
    pub vars: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Bindings {
    #[serde(default)]
    pub bindings: Vec<Row>,
}

/// The result of a SELECT or ASK query.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct QueryResults {
    #[serde(default)]
    pub head: Head,
    #[serde(default)]
    pub results: Option<Bindings>,
    #[serde(default)]
    pub boolean: Option<bool>,
}

impl QueryResults {
    /// Parse a `application/sparql-results+json` document.
    pub fn parse(body: &str) -> Result<Self, StoreError> {
        serde_json::from_str(body).map_err(|e| StoreError::Decode(e.to_string()))
    }

    pub fn rows(&self) -> &[Row] {
        self.results
            .as_ref()
            .map(|b| b.bindings.as_slice())
            .unwrap_or_default()
    }

    /// The ASK answer. SELECT results answer `false`.
    pub fn ask(&self) -> bool {
        self.boolean.unwrap_or(false)
    }

    /// A bound variable of a row, decoded.
    pub fn term(row: &Row, var: &str) -> Result<Term, StoreError> {
        row.get(var)
            .ok_or_else(|| StoreError::Decode(format!("unbound variable ?{var}")))?
            .to_term()
    }

    /// A bound variable of a row that must be an IRI.
    pub fn iri(row: &Row, var: &str) -> Result<String, StoreError> {
        match Self::term(row, var)? {
            Term::Iri(iri) => Ok(iri),
            other => Err(StoreError::Decode(format!(
                "expected IRI for ?{var}, got {other:?}"
            ))),
        }
    }

    /// An optional IRI-valued variable; unbound or non-IRI cells give `None`.
    pub fn optional_iri(row: &Row, var: &str) -> Option<String> {
        row.get(var)
            .filter(|raw| raw.kind == "uri")
            .map(|raw| raw.value.clone())
    }

    /// Every IRI bound to `var`, skipping other kinds of cell.
    pub fn iris(&self, var: &str) -> Vec<String> {
        self.rows()
            .iter()
            .filter_map(|row| Self::optional_iri(row, var))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SELECT: &str = r#"{
        "head": {"vars": ["s", "o"]},
        "results": {"bindings": [
            {"s": {"type": "uri", "value": "https://example.org/ra/1"},
             "o": {"type": "literal", "value": "Ada", "xml:lang": "en"}},
            {"s": {"type": "bnode", "value": "b0"},
             "o": {"type": "typed-literal", "value": "3",
                   "datatype": "http://www.w3.org/2001/XMLSchema#integer"}}
        ]}
    }"#;

    #[test]
    fn parses_select_rows() {
        let results = QueryResults::parse(SELECT).unwrap();
        assert_eq!(results.head.vars, vec!["s", "o"]);
        assert_eq!(results.rows().len(), 2);

        let row = &results.rows()[0];
        assert_eq!(
            QueryResults::iri(row, "s").unwrap(),
            "https://example.org/ra/1"
        );
        assert_eq!(
            QueryResults::term(row, "o").unwrap(),
            Term::Literal(Literal::lang("Ada", "en"))
        );

        let row = &results.rows()[1];
        assert_eq!(
            QueryResults::term(row, "s").unwrap(),
            Term::Blank("b0".into())
        );
        assert!(QueryResults::iri(row, "s").is_err());
    }

    #[test]
    fn iris_skip_non_iri_cells() {
        let results = QueryResults::parse(SELECT).unwrap();
        assert_eq!(results.iris("s"), vec!["https://example.org/ra/1"]);
        assert!(results.iris("missing").is_empty());
    }

    #[test]
    fn parses_ask() {
        let results = QueryResults::parse(r#"{"head": {}, "boolean": true}"#).unwrap();
        assert!(results.ask());
        assert!(results.rows().is_empty());
    }

    #[test]
    fn rejects_garbage() {
        assert!(matches!(
            QueryResults::parse("<html>"),
            Err(StoreError::Decode(_))
        ));
    }
}
