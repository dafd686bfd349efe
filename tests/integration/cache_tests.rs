//! Tiered cache integration tests over real store backends.
//!
//! Tests verify:
//! - Tiering over four get/set cycles with the default threshold
//! - Write-through to file and SQLite stores
//! - Clearing removes only the payloads not held in memory

use std::sync::Arc;

use bytes::Bytes;

use imagify::cache::{CacheKey, RenderSalt, TieredCache, DEFAULT_FREQUENCY_THRESHOLD};
use imagify::store::{CacheStore, FileStore, SqliteStore};

use super::test_utils::CountingStore;

fn salt() -> RenderSalt {
    RenderSalt {
        style: String::new(),
        background: None,
        blur: 10,
        max_length: 648,
        max_line_count: 20,
        template: "{element}".to_string(),
        quality: 80,
    }
}

fn key(content: &str) -> CacheKey {
    CacheKey::derive(content, &salt())
}

#[tokio::test]
async fn test_four_cycles_with_default_threshold() {
    let store = Arc::new(CountingStore::new());
    let cache = TieredCache::new(store.clone());
    assert_eq!(cache.threshold(), DEFAULT_FREQUENCY_THRESHOLD);

    let k = key("<p>hello</p>");
    let payload = Bytes::from_static(b"image");
    let mut reads_after_get = Vec::new();

    for _ in 0..4 {
        let hit = cache.get(&k).await.unwrap();
        reads_after_get.push(store.reads());
        if hit.is_none() {
            cache.set(&k, payload.clone()).await.unwrap();
        }
    }

    // Miss without a read, two store reads, then served from memory
    assert_eq!(reads_after_get, [0, 1, 2, 2]);
    assert_eq!(store.writes(), 1);
    assert!(cache.entry(&k).await.unwrap().is_resident());
}

#[tokio::test]
async fn test_write_through_to_file_store() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(FileStore::new(dir.path()));
    let cache = TieredCache::new(store.clone());

    let k = key("<p>file</p>");
    cache.set(&k, Bytes::from_static(b"jpeg")).await.unwrap();

    assert!(store.path_for(k.as_str()).exists());
    assert_eq!(
        store.read(k.as_str()).await.unwrap(),
        Some(Bytes::from_static(b"jpeg"))
    );
}

#[tokio::test]
async fn test_sqlite_store_survives_new_cache() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cache.db");
    let k = key("<p>sqlite</p>");

    {
        let store = Arc::new(SqliteStore::open(&path).unwrap());
        let cache = TieredCache::new(store);
        cache.set(&k, Bytes::from_static(b"png")).await.unwrap();
    }

    let store = Arc::new(SqliteStore::open(&path).unwrap());
    let cache = TieredCache::new(store.clone());

    // A fresh cache does not know the key, even though the store does
    assert!(cache.get(&k).await.unwrap().is_none());
    assert_eq!(
        store.read(k.as_str()).await.unwrap(),
        Some(Bytes::from_static(b"png"))
    );
}

#[tokio::test]
async fn test_clear_keeps_resident_payloads_in_store() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(FileStore::new(dir.path()));
    let cache = TieredCache::with_threshold(store.clone(), 2);

    let hot = key("hot");
    let cold = key("cold");
    cache.set(&hot, Bytes::from_static(b"h")).await.unwrap();
    cache.get(&hot).await.unwrap();
    cache.set(&cold, Bytes::from_static(b"c")).await.unwrap();

    let stats = cache.stats().await;
    assert_eq!(stats.tracked, 2);
    assert_eq!(stats.resident, 1);

    cache.clear().await.unwrap();

    assert!(store.path_for(hot.as_str()).exists());
    assert!(!store.path_for(cold.as_str()).exists());
    assert_eq!(cache.stats().await.tracked, 0);
}
