//! store.rs: Instance state store
//!
//! Each record holds one live component instance between requests:
//! - Identity (kind + opaque id)
//! - Lifecycle phase and the serialized component state
//! - The mount parameters it was created from
//! - The feedback messages of its latest Handle
//!
//! The default backend is in-memory. Records are serde-serializable so a
//! shared cache can be plugged in behind the same trait.

use async_trait::async_trait;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use crate::component::{Feedback, Identity, MountParams};
use crate::error::StoreError;

const ID_BYTES: usize = 16;

/// Generate an instance id: 16 random bytes, base64url without padding.
pub fn generate_id() -> String {
    let mut bytes = [0u8; ID_BYTES];
    rand::thread_rng().fill(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Lifecycle phase of an instance. `Gone` is the absence of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    New,
    Ready,
}

// ── Record ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub identity: Identity,
    pub phase: Phase,
    /// Component snapshot; `Null` until the first save after Mount.
    pub state: serde_json::Value,
    pub mount_params: MountParams,
    pub feedback: Feedback,
}

impl Record {
    pub fn new(identity: Identity) -> Self {
        Self {
            identity,
            phase: Phase::New,
            state: serde_json::Value::Null,
            mount_params: MountParams::new(),
            feedback: Feedback::default(),
        }
    }
}

// ── Store trait ─────────────────────────────────────────────────────

#[async_trait]
pub trait StateStore: Send + Sync + 'static {
    /// Allocate a fresh id for `kind` and store the zero record.
    async fn create(&self, kind: &str) -> Result<Record, StoreError>;

    /// Fetch a record, refreshing its idle timer. `None` once expired or purged.
    async fn get(&self, identity: &Identity) -> Result<Option<Record>, StoreError>;

    async fn save(&self, record: &Record) -> Result<(), StoreError>;

    /// Remove records idle for at least `ttl`. Returns how many were removed.
    async fn expire(&self, ttl: Duration) -> Result<usize, StoreError>;

    /// Explicit removal. Returns whether a record existed.
    async fn purge(&self, identity: &Identity) -> Result<bool, StoreError>;

    async fn len(&self) -> Result<usize, StoreError>;
}

// ── In-memory backend ───────────────────────────────────────────────

struct Entry {
    record: Record,
    touched_at: Instant,
}

/// Process-local store. The map lock is only held for map operations.
#[derive(Default)]
pub struct MemoryStore {
    records: Mutex<HashMap<Identity, Entry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn records(&self) -> std::sync::MutexGuard<'_, HashMap<Identity, Entry>> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl StateStore for MemoryStore {
    async fn create(&self, kind: &str) -> Result<Record, StoreError> {
        let mut records = self.records();
        let identity = loop {
            let candidate = Identity::new(kind, generate_id());
            if !records.contains_key(&candidate) {
                break candidate;
            }
        };
        let record = Record::new(identity.clone());
        records.insert(
            identity,
            Entry {
                record: record.clone(),
                touched_at: Instant::now(),
            },
        );
        Ok(record)
    }

    async fn get(&self, identity: &Identity) -> Result<Option<Record>, StoreError> {
        let mut records = self.records();
        Ok(records.get_mut(identity).map(|entry| {
            entry.touched_at = Instant::now();
            entry.record.clone()
        }))
    }

    async fn save(&self, record: &Record) -> Result<(), StoreError> {
        self.records().insert(
            record.identity.clone(),
            Entry {
                record: record.clone(),
                touched_at: Instant::now(),
            },
        );
        Ok(())
    }

    async fn expire(&self, ttl: Duration) -> Result<usize, StoreError> {
        let mut records = self.records();
        let before = records.len();
        records.retain(|_, entry| entry.touched_at.elapsed() < ttl);
        Ok(before - records.len())
    }

    async fn purge(&self, identity: &Identity) -> Result<bool, StoreError> {
        Ok(self.records().remove(identity).is_some())
    }

    async fn len(&self) -> Result<usize, StoreError> {
        Ok(self.records().len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_id_is_url_safe() {
        let id = generate_id();
        assert_eq!(id.len(), 22);
        assert!(id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
        assert_ne!(id, generate_id());
    }

    #[tokio::test]
    async fn test_create_then_get_returns_same_instance() {
        let store = MemoryStore::new();
        let created = store.create("counter").await.unwrap();
        assert_eq!(created.phase, Phase::New);

        let fetched = store.get(&created.identity).await.unwrap().unwrap();
        assert_eq!(fetched, created);
    }

    #[tokio::test]
    async fn test_save_overwrites_state() {
        let store = MemoryStore::new();
        let mut record = store.create("counter").await.unwrap();
        record.phase = Phase::Ready;
        record.state = serde_json::json!({ "count": 3 });
        store.save(&record).await.unwrap();

        let fetched = store.get(&record.identity).await.unwrap().unwrap();
        assert_eq!(fetched.phase, Phase::Ready);
        assert_eq!(fetched.state["count"], 3);
    }

    #[tokio::test]
    async fn test_purge() {
        let store = MemoryStore::new();
        let record = store.create("counter").await.unwrap();
        assert!(store.purge(&record.identity).await.unwrap());
        assert!(!store.purge(&record.identity).await.unwrap());
        assert!(store.get(&record.identity).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_expire_only_idle_records() {
        let store = MemoryStore::new();
        let old = store.create("counter").await.unwrap();
        tokio::time::sleep(Duration::from_millis(300)).await;
        let fresh = store.create("counter").await.unwrap();

        let removed = store.expire(Duration::from_millis(150)).await.unwrap();
        assert_eq!(removed, 1);
        assert!(store.get(&old.identity).await.unwrap().is_none());
        assert!(store.get(&fresh.identity).await.unwrap().is_some());
        assert_eq!(store.len().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_record_serializes_for_shared_backends() {
        let store = MemoryStore::new();
        let record = store.create("counter").await.unwrap();
        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("\"phase\":\"new\""));
        let back: Record = serde_json::from_str(&json).unwrap();
        assert_eq!(back, record);
    }
}
