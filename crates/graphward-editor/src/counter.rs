//! Identifier counters, keyed `<namespace>:<supplier-prefix>:<entity>`.
//!
//! One counter per entity type mints identifiers; one per entity numbers its
//! provenance snapshots. Values never go below zero and `increment` is an
//! atomic read-modify-write on every backend.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use parking_lot::Mutex;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;

use crate::error::CounterError;

/// Address of a single counter.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CounterKey {
    pub namespace: String,
    pub supplier_prefix: String,
    /// Short entity type (`br`, `ra`) or a full entity identifier.
    pub entity: String,
}

impl CounterKey {
    pub fn new(
        namespace: impl Into<String>,
        supplier_prefix: impl Into<String>,
        entity: impl Into<String>,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            supplier_prefix: supplier_prefix.into(),
            entity: entity.into(),
        }
    }
}

impl fmt::Display for CounterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.namespace, self.supplier_prefix, self.entity)
    }
}

#[async_trait]
pub trait IdentifierCounter: Send + Sync {
    /// Overwrite the counter. Negative values are rejected.
    async fn set(&self, value: i64, key: &CounterKey) -> Result<(), CounterError>;

    /// Current value, 0 when the counter was never written.
    async fn read(&self, key: &CounterKey) -> Result<u64, CounterError>;

    /// Add one and return the new value.
    async fn increment(&self, key: &CounterKey) -> Result<u64, CounterError>;
}

fn non_negative(value: i64, key: &CounterKey) -> Result<u64, CounterError> {
    u64::try_from(value).map_err(|_| CounterError::Negative {
        key: key.to_string(),
        value,
    })
}

// ── Memory ───────────────────────────────────────────────────────

#[derive(Default)]
pub struct MemoryCounter {
    values: Mutex<BTreeMap<String, u64>>,
}

impl MemoryCounter {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl IdentifierCounter for MemoryCounter {
    async fn set(&self, value: i64, key: &CounterKey) -> Result<(), CounterError> {
        let value = non_negative(value, key)?;
        self.values.lock().insert(key.to_string(), value);
        Ok(())
    }

    async fn read(&self, key: &CounterKey) -> Result<u64, CounterError> {
        Ok(self.values.lock().get(&key.to_string()).copied().unwrap_or(0))
    }

    async fn increment(&self, key: &CounterKey) -> Result<u64, CounterError> {
        let mut values = self.values.lock();
        let slot = values.entry(key.to_string()).or_insert(0);
        *slot += 1;
        Ok(*slot)
    }
}

// ── File ─────────────────────────────────────────────────────────

/// Counters persisted as one JSON object on disk.
///
/// Every operation rereads the file under a process-local mutex, so writes
/// from one process are serialized. The file is replaced through a
/// temporary sibling and rename.
pub struct FileCounter {
    path: PathBuf,
    guard: Mutex<()>,
}

impl FileCounter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            guard: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<BTreeMap<String, u64>, CounterError> {
        match fs::read_to_string(&self.path) {
            Ok(raw) if raw.trim().is_empty() => Ok(BTreeMap::new()),
            Ok(raw) => Ok(serde_json::from_str(&raw)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn store(&self, values: &BTreeMap<String, u64>) -> Result<(), CounterError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_string_pretty(values)?)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

#[async_trait]
impl IdentifierCounter for FileCounter {
    async fn set(&self, value: i64, key: &CounterKey) -> Result<(), CounterError> {
        let value = non_negative(value, key)?;
        let _held = self.guard.lock();
        let mut values = self.load()?;
        values.insert(key.to_string(), value);
        self.store(&values)
    }

    async fn read(&self, key: &CounterKey) -> Result<u64, CounterError> {
        let _held = self.guard.lock();
        Ok(self.load()?.get(&key.to_string()).copied().unwrap_or(0))
    }

    async fn increment(&self, key: &CounterKey) -> Result<u64, CounterError> {
        let _held = self.guard.lock();
        let mut values = self.load()?;
        let slot = values.entry(key.to_string()).or_insert(0);
        *slot += 1;
        let next = *slot;
        self.store(&values)?;
        tracing::debug!(counter = %key, value = next, path = %self.path.display(), "Counter incremented");
        Ok(next)
    }
}

// ── Redis ────────────────────────────────────────────────────────

/// Counters shared by every process through Redis `INCR`.
#[derive(Clone)]
pub struct RedisCounter {
    conn: ConnectionManager,
}

impl RedisCounter {
    pub async fn connect(url: &str) -> Result<Self, CounterError> {
        let client = redis::Client::open(url)?;
        let conn = ConnectionManager::new(client).await?;
        tracing::info!(url = %url, "Connected to counter cache");
        Ok(Self { conn })
    }
}

#[async_trait]
impl IdentifierCounter for RedisCounter {
    async fn set(&self, value: i64, key: &CounterKey) -> Result<(), CounterError> {
        let value = non_negative(value, key)?;
        let mut conn = self.conn.clone();
        let _: () = conn.set(key.to_string(), value).await?;
        Ok(())
    }

    async fn read(&self, key: &CounterKey) -> Result<u64, CounterError> {
        let mut conn = self.conn.clone();
        let raw: Option<String> = conn.get(key.to_string()).await?;
        match raw {
            None => Ok(0),
            Some(raw) => raw.parse().map_err(|_| CounterError::Corrupt {
                key: key.to_string(),
                raw,
            }),
        }
    }

    async fn increment(&self, key: &CounterKey) -> Result<u64, CounterError> {
        let mut conn = self.conn.clone();
        let next: u64 = conn.incr(key.to_string(), 1u64).await?;
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(entity: &str) -> CounterKey {
        CounterKey::new("graphward", "060", entity)
    }

    #[test]
    fn key_renders_colon_separated() {
        assert_eq!(key("br").to_string(), "graphward:060:br");
        assert_eq!(CounterKey::new("ns", "", "ra").to_string(), "ns::ra");
    }

    #[tokio::test]
    async fn memory_counter_contract() {
        let counter = MemoryCounter::new();
        assert_eq!(counter.read(&key("br")).await.unwrap(), 0);
        assert_eq!(counter.increment(&key("br")).await.unwrap(), 1);
        assert_eq!(counter.increment(&key("br")).await.unwrap(), 2);
        assert_eq!(counter.read(&key("ra")).await.unwrap(), 0);

        counter.set(10, &key("br")).await.unwrap();
        assert_eq!(counter.increment(&key("br")).await.unwrap(), 11);

        let err = counter.set(-1, &key("br")).await.unwrap_err();
        assert!(matches!(err, CounterError::Negative { value: -1, .. }));
        assert_eq!(counter.read(&key("br")).await.unwrap(), 11);
    }

    #[tokio::test]
    async fn file_counter_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("counters.json");

        let counter = FileCounter::new(&path);
        assert_eq!(counter.read(&key("br")).await.unwrap(), 0);
        assert_eq!(counter.increment(&key("br")).await.unwrap(), 1);
        counter.set(41, &key("ra")).await.unwrap();
        drop(counter);

        let reopened = FileCounter::new(&path);
        assert_eq!(reopened.read(&key("br")).await.unwrap(), 1);
        assert_eq!(reopened.increment(&key("ra")).await.unwrap(), 42);

        let raw = std::fs::read_to_string(&path).unwrap();
        let saved: BTreeMap<String, u64> = serde_json::from_str(&raw).unwrap();
        assert_eq!(saved.get("graphward:060:ra"), Some(&42));
    }

    #[tokio::test]
    async fn file_counter_rejects_negative_without_writing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("counters.json");
        let counter = FileCounter::new(&path);

        assert!(counter.set(-5, &key("br")).await.is_err());
        assert!(!path.exists());
    }
}
