//! graphward-core: Shared types, configuration, and error handling for Graphward.
//!
//! This crate provides the foundational types used across all Graphward components:
//! - Statements, values and result terms for the shared dataset
//! - Vocabulary constants (RDF, PROV-O)
//! - Configuration management
//! - Common error types

pub mod config;
pub mod error;
pub mod types;
pub mod vocab;

pub use config::Settings;
pub use error::GraphwardError;
pub use types::{Literal, Statement, Term, Value};
