//! Store backend contract tests.
//!
//! Every backend must read back what was written, overwrite on a second
//! write, report missing keys as `None`, accept removal of missing keys, and
//! purge every payload on request.

use bytes::Bytes;

use imagify::store::{CacheStore, FileStore, MemoryStore, SqliteStore};

async fn check_contract(store: &dyn CacheStore) {
    assert_eq!(store.read("missing").await.unwrap(), None);

    store.write("k", Bytes::from_static(b"first")).await.unwrap();
    assert_eq!(
        store.read("k").await.unwrap(),
        Some(Bytes::from_static(b"first"))
    );

    store.write("k", Bytes::from_static(b"second")).await.unwrap();
    assert_eq!(
        store.read("k").await.unwrap(),
        Some(Bytes::from_static(b"second"))
    );

    store.remove("k").await.unwrap();
    assert_eq!(store.read("k").await.unwrap(), None);
    store.remove("k").await.unwrap();

    store.write("a", Bytes::from_static(b"1")).await.unwrap();
    store.write("b", Bytes::from_static(b"2")).await.unwrap();
    assert_eq!(store.purge().await.unwrap(), 2);
    assert_eq!(store.read("a").await.unwrap(), None);
    assert_eq!(store.read("b").await.unwrap(), None);
    assert_eq!(store.purge().await.unwrap(), 0);
}

#[tokio::test]
async fn test_memory_store_contract() {
    check_contract(&MemoryStore::new()).await;
}

#[tokio::test]
async fn test_file_store_contract() {
    let dir = tempfile::tempdir().unwrap();
    check_contract(&FileStore::new(dir.path().join("nested"))).await;
}

#[tokio::test]
async fn test_sqlite_store_contract() {
    check_contract(&SqliteStore::open_in_memory().unwrap()).await;

    let dir = tempfile::tempdir().unwrap();
    check_contract(&SqliteStore::open(&dir.path().join("db").join("cache.db")).unwrap()).await;
}

#[tokio::test]
async fn test_binary_payloads() {
    let payload = Bytes::from((0..=255u8).collect::<Vec<_>>());
    let dir = tempfile::tempdir().unwrap();

    let stores: Vec<Box<dyn CacheStore>> = vec![
        Box::new(MemoryStore::new()),
        Box::new(FileStore::new(dir.path())),
        Box::new(SqliteStore::open_in_memory().unwrap()),
    ];
    for store in stores {
        store.write("bin", payload.clone()).await.unwrap();
        assert_eq!(
            store.read("bin").await.unwrap(),
            Some(payload.clone()),
            "{} store",
            store.name()
        );
    }
}
