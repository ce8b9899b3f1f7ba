//! Storage abstractions for the dataset cache.
//!
//! The cache sits on a plain key-value string store, the same contract a
//! browser's local storage offers: get, set and remove by key, with writes
//! bounded by a quota.
//!
//! ## Layers
//!
//! ```text
//! CacheStore          timestamped snapshots, 24h validity, evict-on-read
//!   └── KeyValueStore
//!         ├── LocalStorage   {root}/{key}.json on disk
//!         └── MemoryStore    in-process map (tests, ephemeral sessions)
//! ```

pub mod cache;
pub mod local;
pub mod memory;

use async_trait::async_trait;

use crate::error::Result;

// Re-export for convenience
pub use cache::{CacheEntry, CacheStore};
pub use local::LocalStorage;
pub use memory::MemoryStore;

/// String key-value backend.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read a value, `None` if the key is absent.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Write a value, replacing any previous one.
    ///
    /// Fails with `AppError::Storage` when the value exceeds the quota.
    async fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Remove a key. Removing an absent key is not an error.
    async fn remove(&self, key: &str) -> Result<()>;
}

/// Reject a write that would not fit in `quota` bytes.
pub(crate) fn check_quota(quota: Option<usize>, key: &str, value: &str) -> Result<()> {
    match quota {
        Some(limit) if value.len() > limit => Err(crate::error::AppError::storage(format!(
            "quota exceeded writing '{}' ({} > {} bytes)",
            key,
            value.len(),
            limit
        ))),
        _ => Ok(()),
    }
}
