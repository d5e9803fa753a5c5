//! Error types for the graphward-lock crate.

use thiserror::Error;

/// Infrastructure failures behind the lock manager.
///
/// Never returned from the manager's public operations: they surface as
/// `LockStatus::Error` or a `Failed` outcome after being logged.
#[derive(Error, Debug)]
pub enum LockError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Lock backend error: {0}")]
    Backend(String),

    #[error("Link discovery failed: {0}")]
    Discovery(#[from] graphward_store::StoreError),

    #[error("Malformed lock record under {key}: {source}")]
    Record {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

pub type Result<T> = std::result::Result<T, LockError>;
