//! The resource lock manager.
//!
//! Locks are advisory: they tell editors what someone else is working on,
//! including resources linked to it in either direction. A resource counts
//! as locked for a caller when any of these is held by someone else:
//! 1. the resource itself,
//! 2. a resource it references (discovered through the dataset),
//! 3. a resource known to reference it (reverse-link cache).

use std::sync::Arc;
use std::time::Duration;

use graphward_core::config::LockSettings;
use graphward_store::DatasetStore;

use crate::backend::LockBackend;
use crate::error::Result;
use crate::record::{lock_key, AcquireOutcome, Lock, LockHolder, LockStatus, ReleaseOutcome};
use crate::reverse::ReverseLinkCache;

/// Lease applied to lock records and reverse-link entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockConfig {
    pub lease: Duration,
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            lease: Duration::from_secs(300),
        }
    }
}

impl From<&LockSettings> for LockConfig {
    fn from(settings: &LockSettings) -> Self {
        Self {
            lease: Duration::from_secs(settings.lease_secs),
        }
    }
}

/// What a status evaluation found, plus any links discovered on the way.
struct Evaluation {
    status: LockStatus,
    lock: Option<Lock>,
    discovered: Option<Vec<String>>,
}

pub struct ResourceLockManager {
    backend: Arc<dyn LockBackend>,
    discovery: Option<Arc<dyn DatasetStore>>,
    reverse: ReverseLinkCache,
    config: LockConfig,
}

impl ResourceLockManager {
    /// A manager without link discovery: only direct locks and cached
    /// reverse links are considered.
    pub fn new(backend: Arc<dyn LockBackend>, config: LockConfig) -> Self {
        let reverse = ReverseLinkCache::new(backend.clone(), config.lease);
        Self {
            backend,
            discovery: None,
            reverse,
            config,
        }
    }

    /// Discover linked resources through the given dataset.
    pub fn with_discovery(mut self, store: Arc<dyn DatasetStore>) -> Self {
        self.discovery = Some(store);
        self
    }

    pub fn lease(&self) -> Duration {
        self.config.lease
    }

    pub fn reverse_links(&self) -> &ReverseLinkCache {
        &self.reverse
    }

    // ── Public Operations ────────────────────────────────────────

    /// The current lock on `resource`, if any. Absent once the lease expires.
    pub async fn get_lock_info(&self, resource: &str) -> Option<Lock> {
        match self.read_lock(resource).await {
            Ok(lock) => lock,
            Err(e) => {
                tracing::error!(resource = %resource, error = %e, "Failed to read lock");
                None
            }
        }
    }

    /// Whether `holder` may edit `resource`.
    ///
    /// `Error` means the check could not be completed and must be treated
    /// as locked.
    pub async fn check_lock_status(
        &self,
        holder: &LockHolder,
        resource: &str,
    ) -> (LockStatus, Option<Lock>) {
        match self.evaluate(holder, resource).await {
            Ok(eval) => (eval.status, eval.lock),
            Err(e) => {
                tracing::error!(resource = %resource, error = %e, "Lock status check failed");
                (LockStatus::Error, None)
            }
        }
    }

    /// Lock `resource` for `holder`, or refresh the lease if already held.
    ///
    /// `linked` defaults to the resources discovered through the dataset.
    pub async fn acquire_lock(
        &self,
        holder: &LockHolder,
        resource: &str,
        linked: Option<Vec<String>>,
    ) -> AcquireOutcome {
        match self.try_acquire(holder, resource, linked).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!(resource = %resource, error = %e, "Lock acquisition failed");
                AcquireOutcome::Failed(e)
            }
        }
    }

    /// Release a lock held by `holder`.
    pub async fn release_lock(&self, holder: &LockHolder, resource: &str) -> ReleaseOutcome {
        match self.try_release(holder, resource).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!(resource = %resource, error = %e, "Lock release failed");
                ReleaseOutcome::Failed(e)
            }
        }
    }

    /// Resources linked to `resource` in either direction that themselves
    /// have outgoing statements. Refreshes the reverse-link cache.
    pub async fn linked_resources(&self, resource: &str) -> Result<Vec<String>> {
        let Some(store) = &self.discovery else {
            return Ok(Vec::new());
        };

        let mut linked: Vec<String> = Vec::new();

        for target in store.linked_objects(resource).await? {
            if target == resource || linked.contains(&target) {
                continue;
            }
            if store.has_outgoing(&target).await? {
                self.reverse.record(&target, resource).await?;
                linked.push(target);
            }
        }

        for subject in store.linking_subjects(resource).await? {
            if subject == resource || linked.contains(&subject) {
                continue;
            }
            if store.has_outgoing(&subject).await? {
                self.reverse.record(resource, &subject).await?;
                linked.push(subject);
            }
        }

        tracing::debug!(resource = %resource, linked = linked.len(), "Linked resources discovered");
        Ok(linked)
    }

    // ── Internals ────────────────────────────────────────────────

    async fn read_lock(&self, resource: &str) -> Result<Option<Lock>> {
        let key = lock_key(resource);
        match self.backend.get(&key).await? {
            Some(raw) => Lock::from_json(&key, &raw).map(Some),
            None => Ok(None),
        }
    }

    /// A lock on `resource` held by someone other than `holder`.
    async fn foreign_lock(&self, holder: &LockHolder, resource: &str) -> Result<Option<Lock>> {
        Ok(self
            .read_lock(resource)
            .await?
            .filter(|lock| !lock.is_held_by(holder)))
    }

    async fn evaluate(&self, holder: &LockHolder, resource: &str) -> Result<Evaluation> {
        if let Some(lock) = self.read_lock(resource).await? {
            let status = if lock.is_held_by(holder) {
                LockStatus::Available
            } else {
                LockStatus::Locked
            };
            return Ok(Evaluation {
                status,
                lock: Some(lock),
                discovered: None,
            });
        }

        let linked = self.linked_resources(resource).await?;
        for other in &linked {
            if let Some(lock) = self.foreign_lock(holder, other).await? {
                tracing::debug!(resource = %resource, via = %other, "Locked through linked resource");
                return Ok(Evaluation {
                    status: LockStatus::Locked,
                    lock: Some(lock),
                    discovered: Some(linked),
                });
            }
        }

        for referrer in self.reverse.referrers(resource).await? {
            if let Some(lock) = self.foreign_lock(holder, &referrer).await? {
                tracing::debug!(resource = %resource, via = %referrer, "Locked through referencing resource");
                return Ok(Evaluation {
                    status: LockStatus::Locked,
                    lock: Some(lock),
                    discovered: Some(linked),
                });
            }
        }

        Ok(Evaluation {
            status: LockStatus::Available,
            lock: None,
            discovered: Some(linked),
        })
    }

    async fn try_acquire(
        &self,
        holder: &LockHolder,
        resource: &str,
        linked: Option<Vec<String>>,
    ) -> Result<AcquireOutcome> {
        let eval = self.evaluate(holder, resource).await?;
        if eval.status != LockStatus::Available {
            tracing::info!(
                resource = %resource,
                holder = %holder.id,
                blocked_by = eval.lock.as_ref().map(|l| l.user_id.as_str()).unwrap_or(""),
                "Lock denied"
            );
            return Ok(AcquireOutcome::Blocked(eval.lock));
        }

        let previous = eval.lock;
        let refreshing = previous.is_some();
        let linked = match linked.or(eval.discovered) {
            Some(linked) => linked,
            None => self.linked_resources(resource).await?,
        };

        let lock = Lock::new(holder, resource, linked);
        let key = lock_key(resource);
        let value = lock.to_json();

        if refreshing {
            self.backend.set(&key, &value, self.config.lease).await?;
        } else if !self
            .backend
            .set_if_absent(&key, &value, self.config.lease)
            .await?
        {
            // Lost the race against another editor between check and write.
            let winner = self.read_lock(resource).await?;
            tracing::info!(resource = %resource, holder = %holder.id, "Lock taken concurrently");
            return Ok(AcquireOutcome::Blocked(winner));
        }

        if let Some(previous) = &previous {
            for stale in previous
                .linked_resources
                .iter()
                .filter(|old| !lock.linked_resources.contains(*old))
            {
                self.reverse.forget(stale, resource).await?;
            }
        }
        for other in &lock.linked_resources {
            self.reverse.record(other, resource).await?;
        }

        tracing::info!(
            resource = %resource,
            holder = %holder.id,
            linked = lock.linked_resources.len(),
            refreshed = refreshing,
            "Lock acquired"
        );
        Ok(AcquireOutcome::Acquired(lock))
    }

    async fn try_release(&self, holder: &LockHolder, resource: &str) -> Result<ReleaseOutcome> {
        let Some(lock) = self.read_lock(resource).await? else {
            return Ok(ReleaseOutcome::NotLocked);
        };
        if !lock.is_held_by(holder) {
            return Ok(ReleaseOutcome::HeldByOther(lock));
        }

        self.backend.delete(&lock_key(resource)).await?;
        for other in &lock.linked_resources {
            self.reverse.forget(other, resource).await?;
        }

        tracing::info!(resource = %resource, holder = %holder.id, "Lock released");
        Ok(ReleaseOutcome::Released)
    }
}
