//! End-to-end tests of the before-send hook.
//!
//! Tests verify:
//! - Long messages are converted, short ones are not
//! - Append-type elements survive conversion
//! - Repeated messages are served from the cache
//! - Render and cache failures degrade without corrupting the message
//! - Shutdown clears the cache and closes every session
//! - Start purges payloads left by earlier runs

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use bytes::Bytes;

use imagify::config::CacheBackendKind;
use imagify::error::{ConfigError, PoolError, RenderError};
use imagify::store::CacheStore;
use imagify::{HookOutcome, Imagify, ImagifyError, OutboundMessage};

use super::test_utils::{
    bare, is_valid_jpeg, long_message, short_message, test_config, CountingStore,
    MockRenderBackend,
};

async fn start(backend: &Arc<MockRenderBackend>) -> Imagify<MockRenderBackend> {
    Imagify::start(&test_config(), Arc::clone(backend))
        .await
        .unwrap()
}

async fn start_counting(
    backend: &Arc<MockRenderBackend>,
    store: &Arc<CountingStore>,
) -> Imagify<MockRenderBackend> {
    let store: Arc<dyn CacheStore> = store.clone();
    Imagify::start_with_store(&test_config(), Arc::clone(backend), Some(store))
        .await
        .unwrap()
}

fn decoded_image(message: &OutboundMessage) -> Vec<u8> {
    let src = message.elements[0].image_src().unwrap();
    let payload = src.strip_prefix("data:image/jpeg;base64,").unwrap();
    STANDARD.decode(payload).unwrap()
}

// =============================================================================
// Conversion
// =============================================================================

#[tokio::test]
async fn test_long_message_is_converted() {
    let backend = Arc::new(MockRenderBackend::new());
    let imagify = start(&backend).await;

    let mut message = long_message("discord");
    let outcome = imagify.before_send(&mut message).await;

    assert!(matches!(outcome, HookOutcome::Converted { cache_hit: false }));
    assert_eq!(message.elements.len(), 1);
    assert_eq!(message.elements[0].kind(), "image");
    assert!(is_valid_jpeg(&decoded_image(&message)));
    assert_eq!(backend.render_count(), 1);
}

#[tokio::test]
async fn test_short_message_is_unchanged() {
    let backend = Arc::new(MockRenderBackend::new());
    let imagify = start(&backend).await;

    let mut message = short_message("discord");
    let original = message.clone();
    let outcome = imagify.before_send(&mut message).await;

    assert!(matches!(outcome, HookOutcome::NotTriggered));
    assert_eq!(message, original);
    assert_eq!(backend.render_count(), 0);
}

#[tokio::test]
async fn test_append_elements_survive_conversion() {
    let backend = Arc::new(MockRenderBackend::new());
    let imagify = start(&backend).await;

    let mut message = long_message("discord");
    message.elements.extend([bare("at"), bare("button"), bare("quote"), bare("sharp")]);

    let outcome = imagify.before_send(&mut message).await;
    assert!(outcome.is_converted());

    let kinds: Vec<&str> = message.elements.iter().map(|e| e.kind()).collect();
    assert_eq!(kinds, ["image", "at", "button", "quote"]);
}

#[tokio::test]
async fn test_platform_elements_prevent_conversion() {
    let backend = Arc::new(MockRenderBackend::new());
    let imagify = start(&backend).await;

    let mut message = long_message("qq");
    message.elements.push(bare("qq:face"));

    let outcome = imagify.before_send(&mut message).await;
    assert!(matches!(outcome, HookOutcome::NotTriggered));
}

#[tokio::test]
async fn test_advanced_mode_uses_rules() {
    let mut rules = tempfile::NamedTempFile::new().unwrap();
    write!(
        rules,
        r#"[[{{"field": "platform", "operator": "EQUAL", "comparand": "qq"}},
             {{"field": "length", "operator": "MATH", "comparand": "GE:5"}}]]"#
    )
    .unwrap();

    let mut config = test_config();
    config.rules_file = Some(rules.path().to_path_buf());

    let backend = Arc::new(MockRenderBackend::new());
    let imagify = Imagify::start(&config, Arc::clone(&backend)).await.unwrap();
    assert_eq!(imagify.trigger().mode(), "advanced");

    // Short, but matches the rules
    let mut message = short_message("qq");
    assert!(imagify.before_send(&mut message).await.is_converted());

    // Long, but on another platform
    let mut message = long_message("discord");
    assert!(matches!(
        imagify.before_send(&mut message).await,
        HookOutcome::NotTriggered
    ));
}

#[tokio::test]
async fn test_sessions_open_with_full_page() {
    let mut config = test_config();
    config.background = Some("https://example.com/bg.png".to_string());

    let backend = Arc::new(MockRenderBackend::new());
    let imagify = Imagify::start(&config, Arc::clone(&backend)).await.unwrap();

    assert_eq!(imagify.pool().size(), 2);
    let pages = backend.initial_pages();
    assert_eq!(pages.len(), 2);
    for page in pages {
        assert!(page.contains("url('https://example.com/bg.png')"));
        assert!(page.contains("._card"));
        assert!(!page.contains("{element}"));
    }
}

// =============================================================================
// Caching
// =============================================================================

#[tokio::test]
async fn test_repeated_message_served_from_cache() {
    let backend = Arc::new(MockRenderBackend::new());
    let store = Arc::new(CountingStore::new());
    let imagify = start_counting(&backend, &store).await;

    let mut hits = Vec::new();
    for _ in 0..4 {
        let mut message = long_message("discord");
        match imagify.before_send(&mut message).await {
            HookOutcome::Converted { cache_hit } => hits.push(cache_hit),
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    assert_eq!(hits, [false, true, true, true]);
    assert_eq!(backend.render_count(), 1);
    assert_eq!(store.writes(), 1);
    // Third lookup promotes, the fourth is served from memory
    assert_eq!(store.reads(), 2);
}

#[tokio::test]
async fn test_cache_disabled_always_renders() {
    let mut config = test_config();
    config.cache_enabled = false;

    let backend = Arc::new(MockRenderBackend::new());
    let imagify = Imagify::start(&config, Arc::clone(&backend)).await.unwrap();
    assert!(imagify.cache().is_none());

    for _ in 0..2 {
        let mut message = long_message("discord");
        assert!(matches!(
            imagify.before_send(&mut message).await,
            HookOutcome::Converted { cache_hit: false }
        ));
    }
    assert_eq!(backend.render_count(), 2);
}

#[tokio::test]
async fn test_sweep_cache_removes_idle_entries() {
    let mut config = test_config();
    config.cache_stale_secs = 0;

    let backend = Arc::new(MockRenderBackend::new());
    let store = Arc::new(CountingStore::new());
    let dyn_store: Arc<dyn CacheStore> = store.clone();
    let imagify = Imagify::start_with_store(&config, Arc::clone(&backend), Some(dyn_store))
        .await
        .unwrap();

    let mut message = long_message("discord");
    imagify.before_send(&mut message).await;
    assert_eq!(store.stored().await, 1);

    assert_eq!(imagify.sweep_cache().await.unwrap(), 1);
    assert_eq!(store.stored().await, 0);
}

// =============================================================================
// Degradation
// =============================================================================

#[tokio::test]
async fn test_render_failure_leaves_message_unchanged() {
    let backend = Arc::new(MockRenderBackend::new());
    let imagify = start(&backend).await;
    backend.set_fail_render(true);

    let mut message = long_message("discord");
    let original = message.clone();
    let outcome = imagify.before_send(&mut message).await;

    assert!(matches!(
        outcome,
        HookOutcome::Failed(ImagifyError::Pool(PoolError::Render(RenderError::Render(_))))
    ));
    assert_eq!(message, original);
    assert_eq!(imagify.pool().idle_count(), 2);
}

#[tokio::test]
async fn test_cache_read_failure_falls_back_to_rendering() {
    let backend = Arc::new(MockRenderBackend::new());
    let store = Arc::new(CountingStore::new());
    let imagify = start_counting(&backend, &store).await;
    store.set_fail_reads(true);

    for _ in 0..2 {
        let mut message = long_message("discord");
        assert!(matches!(
            imagify.before_send(&mut message).await,
            HookOutcome::Converted { cache_hit: false }
        ));
    }
    assert_eq!(backend.render_count(), 2);
    assert_eq!(store.reads(), 1);
}

#[tokio::test]
async fn test_cache_write_failure_still_converts() {
    let backend = Arc::new(MockRenderBackend::new());
    let store = Arc::new(CountingStore::new());
    let imagify = start_counting(&backend, &store).await;
    store.set_fail_writes(true);

    let mut message = long_message("discord");
    let outcome = imagify.before_send(&mut message).await;

    assert!(matches!(outcome, HookOutcome::Converted { cache_hit: false }));
    assert_eq!(message.elements[0].kind(), "image");
    assert_eq!(store.stored().await, 0);
}

// =============================================================================
// Lifecycle
// =============================================================================

#[tokio::test]
async fn test_invalid_config_fails_start() {
    let mut config = test_config();
    config.quality = 5;

    let backend = Arc::new(MockRenderBackend::new());
    let result = Imagify::start(&config, Arc::clone(&backend)).await;

    assert!(matches!(
        result,
        Err(ImagifyError::Config(ConfigError::InvalidValue {
            name: "quality",
            ..
        }))
    ));
    assert_eq!(backend.sessions_opened(), 0);
}

#[tokio::test]
async fn test_shutdown_clears_cache_and_closes_pool() {
    let backend = Arc::new(MockRenderBackend::new());
    let store = Arc::new(CountingStore::new());
    let imagify = start_counting(&backend, &store).await;

    let mut message = long_message("discord");
    imagify.before_send(&mut message).await;
    assert_eq!(store.stored().await, 1);

    imagify.shutdown().await.unwrap();
    assert_eq!(store.stored().await, 0);
    assert_eq!(backend.sessions_closed(), 2);

    let mut message = long_message("discord");
    assert!(matches!(
        imagify.before_send(&mut message).await,
        HookOutcome::Failed(ImagifyError::Pool(PoolError::Closed))
    ));
}

fn payload_files(dir: &std::path::Path) -> usize {
    match std::fs::read_dir(dir) {
        Ok(entries) => entries
            .filter(|entry| {
                let name = entry.as_ref().unwrap().file_name();
                name.to_string_lossy().ends_with(".temp")
            })
            .count(),
        Err(_) => 0,
    }
}

#[tokio::test]
async fn test_restart_purges_payloads_of_earlier_runs() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config();
    config.cache_backend = CacheBackendKind::File;
    config.cache_dir = dir.path().join("cache");
    config.cache_threshold = 2;

    for _ in 0..3 {
        let backend = Arc::new(MockRenderBackend::new());
        let imagify = Imagify::start(&config, Arc::clone(&backend)).await.unwrap();
        assert_eq!(payload_files(&config.cache_dir), 0);

        // The entry turns resident, so clear keeps its payload on disk
        for _ in 0..3 {
            let mut message = long_message("discord");
            assert!(imagify.before_send(&mut message).await.is_converted());
        }
        assert_eq!(backend.render_count(), 1);

        imagify.shutdown().await.unwrap();
        assert_eq!(payload_files(&config.cache_dir), 1);
    }

    let imagify = Imagify::start(&config, Arc::new(MockRenderBackend::new()))
        .await
        .unwrap();
    assert_eq!(payload_files(&config.cache_dir), 0);
    imagify.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_start_purges_existing_store() {
    let store = Arc::new(CountingStore::new());
    store.write("left-over", Bytes::from_static(b"old")).await.unwrap();

    let backend = Arc::new(MockRenderBackend::new());
    let _imagify = start_counting(&backend, &store).await;

    assert_eq!(store.purges(), 1);
    assert_eq!(store.stored().await, 0);
}

#[tokio::test]
async fn test_concurrent_messages_share_the_pool() {
    let backend = Arc::new(MockRenderBackend::new().with_delay(Duration::from_millis(20)));
    let mut config = test_config();
    config.cache_enabled = false;
    let imagify = Arc::new(Imagify::start(&config, Arc::clone(&backend)).await.unwrap());

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let imagify = Arc::clone(&imagify);
            tokio::spawn(async move {
                let mut message = long_message("discord");
                imagify.before_send(&mut message).await.is_converted()
            })
        })
        .collect();

    for handle in handles {
        assert!(handle.await.unwrap());
    }
    assert_eq!(backend.render_count(), 8);
    assert!(backend.max_active() <= 2);
}
