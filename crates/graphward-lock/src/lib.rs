//! graphward-lock: Advisory resource locks for Graphward editors.
//!
//! Lock records live in a backend shared by every process (Redis in
//! production, memory in tests), each under a lease that expires on its own.
//! The manager never raises: infrastructure failures are logged and reported
//! as `LockStatus::Error` or a `Failed` outcome.

pub mod backend;
pub mod error;
pub mod manager;
pub mod record;
pub mod redis_backend;
pub mod reverse;

pub use backend::{LockBackend, MemoryLockBackend};
pub use error::LockError;
pub use manager::{LockConfig, ResourceLockManager};
pub use record::{AcquireOutcome, Lock, LockHolder, LockStatus, ReleaseOutcome};
pub use redis_backend::RedisLockBackend;
pub use reverse::ReverseLinkCache;
