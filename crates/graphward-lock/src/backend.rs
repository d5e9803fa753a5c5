//! Lock backend: trait + in-process implementation.
//!
//! A backend is a key/value store with per-key expiry and string sets,
//! shaped after the subset of Redis the lock manager needs. Every call is an
//! independent round-trip; there are no cross-key transactions.

use std::collections::{BTreeSet, HashMap};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::time::Instant;

use crate::error::{LockError, Result};

/// Storage for lock records and reverse-link sets.
#[async_trait]
pub trait LockBackend: Send + Sync {
    /// Read a string value. Expired keys read as absent.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Write a string value with a fresh TTL, replacing any previous value.
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<()>;

    /// Write only if the key is absent or expired. Returns whether it was written.
    async fn set_if_absent(&self, key: &str, value: &str, ttl: Duration) -> Result<bool>;

    async fn delete(&self, key: &str) -> Result<()>;

    /// Add a member to a set and reset the set's TTL.
    async fn set_add(&self, key: &str, member: &str, ttl: Duration) -> Result<()>;

    async fn set_remove(&self, key: &str, member: &str) -> Result<()>;

    /// Members of a set; empty when absent or expired.
    async fn set_members(&self, key: &str) -> Result<Vec<String>>;
}

#[derive(Debug)]
enum Slot {
    Value(String),
    Set(BTreeSet<String>),
}

#[derive(Debug)]
struct Entry {
    slot: Slot,
    expires_at: Instant,
}

/// Process-local backend. Expiry follows the tokio clock and is applied
/// lazily whenever a key is touched.
#[derive(Default)]
pub struct MemoryLockBackend {
    entries: Mutex<HashMap<String, Entry>>,
}

impl MemoryLockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every expired key. Returns how many were evicted.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|_, e| e.expires_at > now);
        before - entries.len()
    }

    /// Number of live keys.
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.entries
            .lock()
            .values()
            .filter(|e| e.expires_at > now)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn evict_if_expired(entries: &mut HashMap<String, Entry>, key: &str) {
        if entries
            .get(key)
            .is_some_and(|e| e.expires_at <= Instant::now())
        {
            entries.remove(key);
        }
    }
}

fn wrong_type(key: &str) -> LockError {
    LockError::Backend(format!("wrong value type under {key}"))
}

#[async_trait]
impl LockBackend for MemoryLockBackend {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut entries = self.entries.lock();
        Self::evict_if_expired(&mut entries, key);
        match entries.get(key) {
            None => Ok(None),
            Some(Entry {
                slot: Slot::Value(v),
                ..
            }) => Ok(Some(v.clone())),
            Some(_) => Err(wrong_type(key)),
        }
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        self.entries.lock().insert(
            key.to_string(),
            Entry {
                slot: Slot::Value(value.to_string()),
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }

    async fn set_if_absent(&self, key: &str, value: &str, ttl: Duration) -> Result<bool> {
        let mut entries = self.entries.lock();
        Self::evict_if_expired(&mut entries, key);
        if entries.contains_key(key) {
            return Ok(false);
        }
        entries.insert(
            key.to_string(),
            Entry {
                slot: Slot::Value(value.to_string()),
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(true)
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.entries.lock().remove(key);
        Ok(())
    }

    async fn set_add(&self, key: &str, member: &str, ttl: Duration) -> Result<()> {
        let mut entries = self.entries.lock();
        Self::evict_if_expired(&mut entries, key);
        let entry = entries.entry(key.to_string()).or_insert_with(|| Entry {
            slot: Slot::Set(BTreeSet::new()),
            expires_at: Instant::now(),
        });
        match &mut entry.slot {
            Slot::Set(members) => {
                members.insert(member.to_string());
            }
            Slot::Value(_) => return Err(wrong_type(key)),
        }
        entry.expires_at = Instant::now() + ttl;
        Ok(())
    }

    async fn set_remove(&self, key: &str, member: &str) -> Result<()> {
        let mut entries = self.entries.lock();
        Self::evict_if_expired(&mut entries, key);
        let now_empty = match entries.get_mut(key) {
            None => return Ok(()),
            Some(Entry {
                slot: Slot::Set(members),
                ..
            }) => {
                members.remove(member);
                members.is_empty()
            }
            Some(_) => return Err(wrong_type(key)),
        };
        // Redis drops empty sets.
        if now_empty {
            entries.remove(key);
        }
        Ok(())
    }

    async fn set_members(&self, key: &str) -> Result<Vec<String>> {
        let mut entries = self.entries.lock();
        Self::evict_if_expired(&mut entries, key);
        match entries.get(key) {
            None => Ok(Vec::new()),
            Some(Entry {
                slot: Slot::Set(members),
                ..
            }) => Ok(members.iter().cloned().collect()),
            Some(_) => Err(wrong_type(key)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn values_expire_after_ttl() {
        let backend = MemoryLockBackend::new();
        backend.set("k", "v", Duration::from_secs(5)).await.unwrap();
        assert_eq!(backend.get("k").await.unwrap().as_deref(), Some("v"));

        tokio::time::advance(Duration::from_secs(5)).await;
        assert_eq!(backend.get("k").await.unwrap(), None);
        assert!(backend.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn set_if_absent_respects_live_and_expired_keys() {
        let backend = MemoryLockBackend::new();
        let ttl = Duration::from_secs(2);
        assert!(backend.set_if_absent("k", "first", ttl).await.unwrap());
        assert!(!backend.set_if_absent("k", "second", ttl).await.unwrap());
        assert_eq!(backend.get("k").await.unwrap().as_deref(), Some("first"));

        tokio::time::advance(Duration::from_secs(3)).await;
        assert!(backend.set_if_absent("k", "third", ttl).await.unwrap());
        assert_eq!(backend.get("k").await.unwrap().as_deref(), Some("third"));
    }

    #[tokio::test(start_paused = true)]
    async fn set_add_refreshes_ttl() {
        let backend = MemoryLockBackend::new();
        let ttl = Duration::from_secs(10);
        backend.set_add("s", "a", ttl).await.unwrap();
        tokio::time::advance(Duration::from_secs(8)).await;
        backend.set_add("s", "b", ttl).await.unwrap();
        tokio::time::advance(Duration::from_secs(8)).await;
        assert_eq!(backend.set_members("s").await.unwrap(), vec!["a", "b"]);

        tokio::time::advance(Duration::from_secs(3)).await;
        assert!(backend.set_members("s").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn removing_last_member_drops_set() {
        let backend = MemoryLockBackend::new();
        backend
            .set_add("s", "a", Duration::from_secs(60))
            .await
            .unwrap();
        backend.set_remove("s", "a").await.unwrap();
        assert!(backend.is_empty());
        backend.set_remove("missing", "a").await.unwrap();
    }

    #[tokio::test]
    async fn wrong_type_is_an_error() {
        let backend = MemoryLockBackend::new();
        backend.set("k", "v", Duration::from_secs(60)).await.unwrap();
        assert!(backend.set_members("k").await.is_err());
        assert!(backend
            .set_add("k", "m", Duration::from_secs(60))
            .await
            .is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn purge_counts_evictions() {
        let backend = MemoryLockBackend::new();
        backend.set("a", "1", Duration::from_secs(1)).await.unwrap();
        backend.set("b", "2", Duration::from_secs(10)).await.unwrap();
        tokio::time::advance(Duration::from_secs(2)).await;
        assert_eq!(backend.purge_expired(), 1);
        assert_eq!(backend.len(), 1);
    }
}
