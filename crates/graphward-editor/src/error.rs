//! Error types for the graphward-editor crate.

use thiserror::Error;

use graphward_prov::ProvError;
use graphward_store::StoreError;

#[derive(Error, Debug)]
pub enum EditorError {
    #[error("Statement not found: <{subject}> <{predicate}> {value}")]
    StatementNotFound {
        subject: String,
        predicate: String,
        value: String,
    },

    #[error("Entity not found: {0}")]
    EntityNotFound(String),

    #[error("Cannot merge {0} into itself")]
    SelfMerge(String),

    #[error("Dataset error: {0}")]
    Store(#[from] StoreError),

    #[error("Provenance error: {0}")]
    Provenance(#[from] ProvError),

    #[error("Counter error: {0}")]
    Counter(#[from] CounterError),

    /// The dataset delta was committed but its snapshots were not written.
    #[error("Dataset committed but {snapshots} provenance snapshot(s) are pending: {source}")]
    ProvenancePending {
        snapshots: usize,
        #[source]
        source: ProvError,
    },
}

#[derive(Error, Debug)]
pub enum CounterError {
    #[error("Counter value must be non-negative, got {value} for {key}")]
    Negative { key: String, value: i64 },

    #[error("Counter {key} holds a non-integer value: {raw}")]
    Corrupt { key: String, raw: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),
}

pub type Result<T> = std::result::Result<T, EditorError>;
