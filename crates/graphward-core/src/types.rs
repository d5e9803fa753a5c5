//! Core domain types for the shared dataset.
//!
//! Statements are subject–predicate–object facts with an optional named
//! graph. Their `Display` output is N-Triples/SPARQL term syntax, so the
//! same text can be embedded in `INSERT DATA` / `DELETE DATA` requests.

use std::fmt;

use serde::{Deserialize, Serialize};

// ── Values ───────────────────────────────────────────────────────

/// A literal value with an optional datatype or language tag.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Literal {
    pub lexical: String,
    pub datatype: Option<String>,
    pub language: Option<String>,
}

impl Literal {
    /// A plain string literal.
    pub fn plain(lexical: impl Into<String>) -> Self {
        Self {
            lexical: lexical.into(),
            datatype: None,
            language: None,
        }
    }

    pub fn typed(lexical: impl Into<String>, datatype: impl Into<String>) -> Self {
        Self {
            lexical: lexical.into(),
            datatype: Some(datatype.into()),
            language: None,
        }
    }

    pub fn lang(lexical: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            lexical: lexical.into(),
            datatype: None,
            language: Some(language.into()),
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{}\"", escape_literal(&self.lexical))?;
        if let Some(lang) = &self.language {
            write!(f, "@{lang}")
        } else if let Some(dt) = &self.datatype {
            write!(f, "^^<{dt}>")
        } else {
            Ok(())
        }
    }
}

/// The object position of a statement: another entity or an opaque literal.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Value {
    Iri { iri: String },
    Literal(Literal),
}

impl Value {
    pub fn iri(iri: impl Into<String>) -> Self {
        Self::Iri { iri: iri.into() }
    }

    pub fn literal(lexical: impl Into<String>) -> Self {
        Self::Literal(Literal::plain(lexical))
    }

    /// The IRI if this value points at another entity.
    pub fn as_iri(&self) -> Option<&str> {
        match self {
            Self::Iri { iri } => Some(iri),
            Self::Literal(_) => None,
        }
    }

    pub fn is_iri(&self, candidate: &str) -> bool {
        self.as_iri() == Some(candidate)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Iri { iri } => write!(f, "<{iri}>"),
            Self::Literal(lit) => lit.fmt(f),
        }
    }
}

/// A cell of a remote query result.
///
/// Blank nodes are unaddressable from outside the store and never become
/// statement values.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Term {
    Iri(String),
    Literal(Literal),
    Blank(String),
}

impl Term {
    /// Convert into a statement value. `None` for blank nodes.
    pub fn into_value(self) -> Option<Value> {
        match self {
            Self::Iri(iri) => Some(Value::Iri { iri }),
            Self::Literal(lit) => Some(Value::Literal(lit)),
            Self::Blank(_) => None,
        }
    }

    pub fn as_iri(&self) -> Option<&str> {
        match self {
            Self::Iri(iri) => Some(iri),
            _ => None,
        }
    }
}

// ── Statements ───────────────────────────────────────────────────

/// A single (subject, predicate, value[, graph]) fact.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Statement {
    pub subject: String,
    pub predicate: String,
    pub object: Value,
    pub graph: Option<String>,
}

impl Statement {
    pub fn new(subject: impl Into<String>, predicate: impl Into<String>, object: Value) -> Self {
        Self {
            subject: subject.into(),
            predicate: predicate.into(),
            object,
            graph: None,
        }
    }

    pub fn in_graph(mut self, graph: Option<String>) -> Self {
        self.graph = graph;
        self
    }

    /// Triple pattern text (`<s> <p> o .`) without the graph.
    pub fn triple(&self) -> String {
        format!("<{}> <{}> {} .", self.subject, self.predicate, self.object)
    }

    /// Whether this statement mentions `iri` as subject or object.
    pub fn mentions(&self, iri: &str) -> bool {
        self.subject == iri || self.object.is_iri(iri)
    }
}

/// Escape a lexical form for a double-quoted SPARQL / N-Triples string.
pub fn escape_literal(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            _ => out.push(c),
        }
    }
    out
}
