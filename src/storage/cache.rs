//! Time-boxed dataset cache.
//!
//! Entries are `{ "timestamp": <epoch ms>, "data": [Record, ...] }`. An entry
//! is served only while younger than the TTL; expired or unreadable entries
//! are removed when they are read. Nothing is purged proactively.
//!
//! Caching is best-effort: backend failures are logged and otherwise behave
//! like a miss (reads) or a no-op (writes).

use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use crate::models::Record;
use crate::storage::KeyValueStore;

/// Stored snapshot of the dataset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Write time in epoch milliseconds
    pub timestamp: i64,
    pub data: Vec<Record>,
}

impl CacheEntry {
    pub fn new(data: Vec<Record>, now: DateTime<Utc>) -> Self {
        Self {
            timestamp: now.timestamp_millis(),
            data,
        }
    }

    /// Age of the entry at `now`.
    pub fn age(&self, now: DateTime<Utc>) -> TimeDelta {
        TimeDelta::milliseconds(now.timestamp_millis() - self.timestamp)
    }

    /// Valid iff stamped and `now - timestamp < ttl`.
    pub fn is_fresh(&self, now: DateTime<Utc>, ttl: TimeDelta) -> bool {
        self.timestamp > 0 && self.age(now) < ttl
    }
}

/// Read-through/write-through cache of whole datasets.
#[derive(Clone)]
pub struct CacheStore {
    backend: Arc<dyn KeyValueStore>,
    ttl: TimeDelta,
}

impl CacheStore {
    pub fn new(backend: Arc<dyn KeyValueStore>, ttl_hours: u64) -> Self {
        Self {
            backend,
            ttl: TimeDelta::hours(ttl_hours as i64),
        }
    }

    pub fn ttl(&self) -> TimeDelta {
        self.ttl
    }

    /// Cached records for `key`, if present and fresh.
    pub async fn get(&self, key: &str) -> Option<Vec<Record>> {
        self.get_at(key, Utc::now()).await
    }

    /// Like [`get`](Self::get) with an explicit clock.
    pub async fn get_at(&self, key: &str, now: DateTime<Utc>) -> Option<Vec<Record>> {
        let raw = match self.backend.get(key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                log::info!("No cached dataset found under {}", key);
                return None;
            }
            Err(e) => {
                log::warn!("Could not read cached dataset {}: {}", key, e);
                return None;
            }
        };

        match serde_json::from_str::<CacheEntry>(&raw) {
            Ok(entry) if entry.is_fresh(now, self.ttl) => {
                log::info!(
                    "Loaded valid dataset from cache ({} records)",
                    entry.data.len()
                );
                Some(entry.data)
            }
            Ok(_) => {
                log::warn!("Cached dataset {} has expired. Removing.", key);
                self.evict(key).await;
                None
            }
            Err(e) => {
                log::warn!("Cached dataset {} is corrupted ({}). Removing.", key, e);
                self.evict(key).await;
                None
            }
        }
    }

    /// Read an entry without validating or evicting it.
    pub async fn peek(&self, key: &str) -> Option<CacheEntry> {
        let raw = self.backend.get(key).await.ok()??;
        serde_json::from_str(&raw).ok()
    }

    /// Persist `records` under `key`, stamped with the current time.
    pub async fn put(&self, key: &str, records: &[Record]) {
        self.put_at(key, records, Utc::now()).await
    }

    /// Like [`put`](Self::put) with an explicit clock.
    pub async fn put_at(&self, key: &str, records: &[Record], now: DateTime<Utc>) {
        let entry = CacheEntry::new(records.to_vec(), now);
        let raw = match serde_json::to_string(&entry) {
            Ok(raw) => raw,
            Err(e) => {
                log::warn!("Could not serialize dataset for cache: {}", e);
                return;
            }
        };

        match self.backend.set(key, &raw).await {
            Ok(()) => log::info!("Dataset saved to cache ({} records)", records.len()),
            Err(e) => log::warn!("Could not save dataset to cache: {}", e),
        }
    }

    /// Remove `key`, ignoring backend failures.
    pub async fn evict(&self, key: &str) {
        if let Err(e) = self.backend.remove(key).await {
            log::warn!("Could not remove cache entry {}: {}", key, e);
        }
    }

    /// Remove every key in `keys` except `keep`.
    pub async fn evict_legacy(&self, keys: &[String], keep: &str) {
        for key in keys.iter().filter(|k| k.as_str() != keep) {
            log::debug!("Evicting legacy cache key {}", key);
            self.evict(key).await;
        }
    }
}
