//! Lock records and the outcomes of lock operations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::LockError;

/// Key prefix of lock records.
pub const LOCK_PREFIX: &str = "resource_lock:";

/// Key under which the lock for `resource` is stored.
pub fn lock_key(resource: &str) -> String {
    format!("{LOCK_PREFIX}{resource}")
}

/// The caller of a lock operation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LockHolder {
    pub id: String,
    pub name: String,
}

impl LockHolder {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// An advisory lock on one resource, as stored under `resource_lock:<uri>`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Lock {
    pub user_id: String,
    pub user_name: String,
    /// When the lock was written, ISO-8601.
    pub timestamp: DateTime<Utc>,
    pub resource_uri: String,
    pub linked_resources: Vec<String>,
}

impl Lock {
    pub fn new(holder: &LockHolder, resource: &str, linked_resources: Vec<String>) -> Self {
        Self {
            user_id: holder.id.clone(),
            user_name: holder.name.clone(),
            timestamp: Utc::now(),
            resource_uri: resource.to_string(),
            linked_resources,
        }
    }

    pub fn is_held_by(&self, holder: &LockHolder) -> bool {
        self.user_id == holder.id
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }

    pub fn from_json(key: &str, raw: &str) -> Result<Self, LockError> {
        serde_json::from_str(raw).map_err(|source| LockError::Record {
            key: key.to_string(),
            source,
        })
    }
}

/// Result of a lock status check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockStatus {
    /// Free for the caller, including locks the caller already holds.
    Available,
    /// Held by someone else, directly or through a linked resource.
    Locked,
    /// The check could not be completed. Treat as locked.
    Error,
}

/// Result of `acquire_lock`.
#[derive(Debug)]
pub enum AcquireOutcome {
    Acquired(Lock),
    /// Someone else holds this resource or a linked one.
    Blocked(Option<Lock>),
    /// Infrastructure failure; nothing is known about the lock.
    Failed(LockError),
}

impl AcquireOutcome {
    pub fn is_acquired(&self) -> bool {
        matches!(self, Self::Acquired(_))
    }

    pub fn lock(&self) -> Option<&Lock> {
        match self {
            Self::Acquired(lock) | Self::Blocked(Some(lock)) => Some(lock),
            _ => None,
        }
    }
}

/// Result of `release_lock`.
#[derive(Debug)]
pub enum ReleaseOutcome {
    Released,
    /// No lock is recorded for the resource.
    NotLocked,
    HeldByOther(Lock),
    Failed(LockError),
}

impl ReleaseOutcome {
    pub fn is_released(&self) -> bool {
        matches!(self, Self::Released)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lock_record_wire_format() {
        let holder = LockHolder::new("0000-0001", "Ada");
        let lock = Lock::new(&holder, "https://example/42", vec!["https://example/7".into()]);

        let value: serde_json::Value = serde_json::from_str(&lock.to_json()).unwrap();
        assert_eq!(value["user_id"], "0000-0001");
        assert_eq!(value["user_name"], "Ada");
        assert_eq!(value["resource_uri"], "https://example/42");
        assert_eq!(value["linked_resources"][0], "https://example/7");
        assert!(value["timestamp"].as_str().unwrap().contains('T'));

        let back = Lock::from_json("k", &lock.to_json()).unwrap();
        assert_eq!(back, lock);
        assert!(back.is_held_by(&holder));
        assert!(!back.is_held_by(&LockHolder::new("other", "Ada")));
    }

    #[test]
    fn malformed_record_names_key() {
        let err = Lock::from_json("resource_lock:x", "{").unwrap_err();
        assert!(err.to_string().contains("resource_lock:x"));
    }

    #[test]
    fn keys_use_prefix() {
        assert_eq!(lock_key("https://example/42"), "resource_lock:https://example/42");
    }
}
