//! Frequency-tiered cache.
//!
//! Every payload is written through to a [`CacheStore`]. A tracking table
//! counts lookups per key; once a key has been looked up `threshold` times its
//! payload is also kept resident in memory and served without touching the
//! store.
//!
//! # Entry Lifecycle
//!
//! ```text
//!              set (new key, frequency = 1)
//!                          │
//!                          ▼
//!   ┌──────────────────────────────────────┐
//!   │ Cold: frequency < threshold          │  get ──► store.read
//!   │       payload only in the store      │
//!   └──────────────────┬───────────────────┘
//!                      │ get / set at frequency >= threshold
//!                      ▼
//!   ┌──────────────────────────────────────┐
//!   │ Hot: payload resident                │  get ──► memory
//!   └──────────────────────────────────────┘
//! ```
//!
//! Demotion clears the resident payload but keeps the tracking row, so the
//! access count survives and the entry can be promoted again without starting
//! from zero. Rows are only dropped by [`TieredCache::clear`] or
//! [`TieredCache::sweep_stale`]; nothing is evicted for size.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::key::CacheKey;
use crate::error::StoreError;
use crate::store::CacheStore;

/// Default number of lookups before a payload becomes resident.
pub const DEFAULT_FREQUENCY_THRESHOLD: u64 = 3;

// =============================================================================
// Cache Entry
// =============================================================================

/// Tracking row for one key.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    frequency: u64,
    payload: Option<Bytes>,
    created_at: Instant,
    last_access: Instant,
}

impl CacheEntry {
    fn new(now: Instant) -> Self {
        Self {
            frequency: 1,
            payload: None,
            created_at: now,
            last_access: now,
        }
    }

    /// Lookups recorded for this key, including the one that created it.
    pub fn frequency(&self) -> u64 {
        self.frequency
    }

    pub fn is_resident(&self) -> bool {
        self.payload.is_some()
    }

    pub fn created_at(&self) -> Instant {
        self.created_at
    }

    pub fn last_access(&self) -> Instant {
        self.last_access
    }

    fn record_access(&mut self, now: Instant) -> u64 {
        self.frequency += 1;
        self.last_access = now;
        self.frequency
    }

    /// Keep `payload` resident if the entry is hot, otherwise demote it.
    fn place(&mut self, payload: Bytes, threshold: u64) {
        if self.frequency >= threshold {
            self.payload = Some(payload);
        } else {
            self.payload = None;
        }
    }
}

/// Snapshot of the tracking table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Keys in the tracking table
    pub tracked: usize,
    /// Entries with a resident payload
    pub resident: usize,
    /// Total size of resident payloads
    pub resident_bytes: usize,
}

// =============================================================================
// Tiered Cache
// =============================================================================

/// Hash-keyed cache with hot entries in memory and cold entries in a store.
///
/// All read-modify-write updates of an entry happen under one lock; the lock
/// is never held while the backing store is accessed.
pub struct TieredCache {
    store: Arc<dyn CacheStore>,
    threshold: u64,
    table: Mutex<HashMap<CacheKey, CacheEntry>>,
}

impl TieredCache {
    /// Create a cache over `store` with the default threshold.
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self::with_threshold(store, DEFAULT_FREQUENCY_THRESHOLD)
    }

    /// Create a cache promoting entries after `threshold` lookups.
    ///
    /// A threshold of 0 is treated as 1.
    pub fn with_threshold(store: Arc<dyn CacheStore>, threshold: u64) -> Self {
        Self {
            store,
            threshold: threshold.max(1),
            table: Mutex::new(HashMap::new()),
        }
    }

    pub fn threshold(&self) -> u64 {
        self.threshold
    }

    /// The backing store.
    pub fn store(&self) -> &Arc<dyn CacheStore> {
        &self.store
    }

    /// Look up `key`, recording the access.
    ///
    /// Untracked keys return `None` without touching the store. Hot entries
    /// are served from memory, loading and pinning the payload on first use;
    /// cold entries are read from the store each time.
    pub async fn get(&self, key: &CacheKey) -> Result<Option<Bytes>, StoreError> {
        let (frequency, resident) = {
            let mut table = self.table.lock().await;
            let Some(entry) = table.get_mut(key) else {
                return Ok(None);
            };
            let frequency = entry.record_access(Instant::now());
            (frequency, entry.payload.clone())
        };

        if frequency < self.threshold {
            debug!("Cache {} cold (frequency {}), reading store", key, frequency);
            return self.store.read(key.as_str()).await;
        }

        if let Some(payload) = resident {
            debug!("Cache {} hot (frequency {})", key, frequency);
            return Ok(Some(payload));
        }

        let payload = self.store.read(key.as_str()).await?;
        if let Some(ref data) = payload {
            let mut table = self.table.lock().await;
            if let Some(entry) = table.get_mut(key) {
                entry.place(data.clone(), self.threshold);
                debug!("Cache {} promoted (frequency {})", key, entry.frequency);
            }
        }
        Ok(payload)
    }

    /// Store `payload` under `key`.
    ///
    /// The payload is always written to the backing store first. A new key is
    /// tracked with frequency 1; an existing key keeps its frequency and is
    /// promoted or demoted according to it.
    pub async fn set(&self, key: &CacheKey, payload: Bytes) -> Result<(), StoreError> {
        self.store.write(key.as_str(), payload.clone()).await?;

        let mut table = self.table.lock().await;
        let entry = table
            .entry(key.clone())
            .or_insert_with(|| CacheEntry::new(Instant::now()));
        entry.place(payload, self.threshold);
        Ok(())
    }

    /// Drop every entry.
    ///
    /// Entries without a resident payload are removed from the backing store
    /// first. All removals are attempted; the first failure is returned after
    /// the table has been cleared.
    pub async fn clear(&self) -> Result<(), StoreError> {
        let store_only: Vec<CacheKey> = {
            let mut table = self.table.lock().await;
            table
                .drain()
                .filter(|(_, entry)| !entry.is_resident())
                .map(|(key, _)| key)
                .collect()
        };

        self.remove_from_store(&store_only).await
    }

    /// Drop entries not accessed within `max_age`, removing their payloads
    /// from the backing store. Returns the number of entries dropped.
    pub async fn sweep_stale(&self, max_age: Duration) -> Result<usize, StoreError> {
        let stale: Vec<CacheKey> = {
            let mut table = self.table.lock().await;
            let now = Instant::now();
            let stale: Vec<CacheKey> = table
                .iter()
                .filter(|(_, entry)| now.duration_since(entry.last_access) >= max_age)
                .map(|(key, _)| key.clone())
                .collect();
            for key in &stale {
                table.remove(key);
            }
            stale
        };

        if !stale.is_empty() {
            debug!("Sweeping {} stale cache entries", stale.len());
        }
        self.remove_from_store(&stale).await?;
        Ok(stale.len())
    }

    async fn remove_from_store(&self, keys: &[CacheKey]) -> Result<(), StoreError> {
        let mut first_error = None;
        for key in keys {
            if let Err(e) = self.store.remove(key.as_str()).await {
                warn!("Failed to remove cache entry {}: {}", key, e);
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Tracking row for `key`, if any.
    pub async fn entry(&self, key: &CacheKey) -> Option<CacheEntry> {
        self.table.lock().await.get(key).cloned()
    }

    pub async fn stats(&self) -> CacheStats {
        let table = self.table.lock().await;
        table.values().fold(
            CacheStats {
                tracked: table.len(),
                ..Default::default()
            },
            |mut stats, entry| {
                if let Some(ref payload) = entry.payload {
                    stats.resident += 1;
                    stats.resident_bytes += payload.len();
                }
                stats
            },
        )
    }
}

// =============================================================================
// Tests
// =============================================================================
