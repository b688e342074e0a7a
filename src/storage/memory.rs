//! In-memory key/value store

use crate::storage::{KvStore, StorageError};
use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

/// Expired entries are swept on every `SWEEP_INTERVAL`th write
const SWEEP_INTERVAL: usize = 256;

#[derive(Debug, Clone)]
struct Entry {
    value: Value,
    expires_at: Instant,
}

/// Process-local store. Last write wins per key.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, Entry>>,
    writes: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live (unexpired) entries
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.entries
            .read()
            .values()
            .filter(|e| e.expires_at > now)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop expired entries
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|_, e| e.expires_at > now);
        before - entries.len()
    }
}

#[async_trait]
impl KvStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, StorageError> {
        let now = Instant::now();
        let entries = self.entries.read();

        Ok(entries
            .get(key)
            .filter(|e| e.expires_at > now)
            .map(|e| e.value.clone()))
    }

    async fn set(&self, key: &str, value: &Value, ttl_minutes: u32) -> Result<(), StorageError> {
        let ttl = Duration::from_secs(u64::from(ttl_minutes) * 60);
        let entry = Entry {
            value: value.clone(),
            expires_at: Instant::now() + ttl,
        };

        let mut entries = self.entries.write();
        if self.writes.fetch_add(1, Ordering::Relaxed) % SWEEP_INTERVAL == SWEEP_INTERVAL - 1 {
            let now = Instant::now();
            entries.retain(|_, e| e.expires_at > now);
        }
        entries.insert(key.to_string(), entry);
        Ok(())
    }
}
