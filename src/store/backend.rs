use async_trait::async_trait;
use bytes::Bytes;

use crate::error::StoreError;

/// Persistence for cache payloads that are not kept in memory.
///
/// The tiered cache only ever talks to its backing store through this trait,
/// so the choice of backend changes where demoted payloads live and nothing
/// else. Implementations must be thread-safe. An external key-value service
/// is supported by implementing this trait for its client.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Read the payload stored under `key`.
    ///
    /// Returns `Ok(None)` if nothing is stored under the key.
    async fn read(&self, key: &str) -> Result<Option<Bytes>, StoreError>;

    /// Store `value` under `key`, replacing any previous payload.
    async fn write(&self, key: &str, value: Bytes) -> Result<(), StoreError>;

    /// Remove the payload stored under `key`. Removing a missing key succeeds.
    async fn remove(&self, key: &str) -> Result<(), StoreError>;

    /// Remove every payload held by this store, including those written by
    /// earlier processes. Returns the number of payloads removed.
    async fn purge(&self) -> Result<usize, StoreError>;

    /// Short backend name for logging.
    fn name(&self) -> &'static str;
}
