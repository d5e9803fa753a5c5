//! Reverse-link cache: which resources are known to reference a resource.
//!
//! A derived, best-effort index filled in by link discovery and lock
//! acquisition. Entries share the lock lease and simply expire; nothing
//! treats them as authoritative.

use std::sync::Arc;
use std::time::Duration;

use crate::backend::LockBackend;
use crate::error::Result;

pub const REVERSE_PREFIX: &str = "reverse_links:";

pub fn reverse_key(target: &str) -> String {
    format!("{REVERSE_PREFIX}{target}")
}

#[derive(Clone)]
pub struct ReverseLinkCache {
    backend: Arc<dyn LockBackend>,
    ttl: Duration,
}

impl ReverseLinkCache {
    pub fn new(backend: Arc<dyn LockBackend>, ttl: Duration) -> Self {
        Self { backend, ttl }
    }

    /// Record that `referrer` links to `target`, refreshing the entry's TTL.
    pub async fn record(&self, target: &str, referrer: &str) -> Result<()> {
        self.backend
            .set_add(&reverse_key(target), referrer, self.ttl)
            .await
    }

    pub async fn forget(&self, target: &str, referrer: &str) -> Result<()> {
        self.backend.set_remove(&reverse_key(target), referrer).await
    }

    /// Resources known to reference `target`.
    pub async fn referrers(&self, target: &str) -> Result<Vec<String>> {
        self.backend.set_members(&reverse_key(target)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryLockBackend;

    #[tokio::test(start_paused = true)]
    async fn entries_expire_with_lease() {
        let cache = ReverseLinkCache::new(Arc::new(MemoryLockBackend::new()), Duration::from_secs(30));
        cache.record("target", "a").await.unwrap();
        cache.record("target", "b").await.unwrap();
        cache.forget("target", "a").await.unwrap();
        assert_eq!(cache.referrers("target").await.unwrap(), vec!["b"]);

        tokio::time::advance(Duration::from_secs(31)).await;
        assert!(cache.referrers("target").await.unwrap().is_empty());
    }
}
