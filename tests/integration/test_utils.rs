//! Test utilities for integration tests.
//!
//! This module provides a mock render backend that produces real JPEG
//! captures, a cache store wrapper that counts and can fail operations, and
//! helpers for building messages and configurations.

use async_trait::async_trait;
use bytes::Bytes;
use image::codecs::jpeg::JpegEncoder;
use image::{Rgb, RgbImage};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use imagify::config::CacheBackendKind;
use imagify::element::{Attributes, Element, UniversalTag};
use imagify::error::{RenderError, StoreError};
use imagify::render::{CaptureRegion, Dimensions, RenderBackend};
use imagify::store::{CacheStore, MemoryStore};
use imagify::{ImagifyConfig, MessageSession, OutboundMessage};

// =============================================================================
// Mock Render Backend
// =============================================================================

/// An open page of the mock backend.
#[derive(Debug)]
pub struct MockSession {
    pub page: String,
    pub markup: String,
    pub jobs: usize,
}

/// A render backend that lays out nothing and captures a solid JPEG.
///
/// Tracks sessions, jobs and the peak number of concurrent jobs.
#[derive(Default)]
pub struct MockRenderBackend {
    delay: Option<Duration>,
    fail_render: AtomicBool,
    sessions_opened: AtomicUsize,
    sessions_closed: AtomicUsize,
    renders: AtomicUsize,
    active: AtomicUsize,
    max_active: AtomicUsize,
    initial_pages: Mutex<Vec<String>>,
}

impl MockRenderBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every render take `delay`.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn set_fail_render(&self, fail: bool) {
        self.fail_render.store(fail, Ordering::SeqCst);
    }

    pub fn sessions_opened(&self) -> usize {
        self.sessions_opened.load(Ordering::SeqCst)
    }

    pub fn sessions_closed(&self) -> usize {
        self.sessions_closed.load(Ordering::SeqCst)
    }

    pub fn render_count(&self) -> usize {
        self.renders.load(Ordering::SeqCst)
    }

    /// Highest number of jobs that ran at the same time.
    pub fn max_active(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }

    pub fn initial_pages(&self) -> Vec<String> {
        self.initial_pages.lock().unwrap().clone()
    }
}

#[async_trait]
impl RenderBackend for MockRenderBackend {
    type Session = MockSession;

    async fn create_session(&self, initial_markup: &str) -> Result<MockSession, RenderError> {
        self.sessions_opened.fetch_add(1, Ordering::SeqCst);
        self.initial_pages
            .lock()
            .unwrap()
            .push(initial_markup.to_string());
        Ok(MockSession {
            page: initial_markup.to_string(),
            markup: String::new(),
            jobs: 0,
        })
    }

    async fn render(
        &self,
        session: &mut MockSession,
        markup: &str,
    ) -> Result<Dimensions, RenderError> {
        let active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(active, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.active.fetch_sub(1, Ordering::SeqCst);

        if self.fail_render.load(Ordering::SeqCst) {
            return Err(RenderError::Render("mock page crashed".to_string()));
        }

        self.renders.fetch_add(1, Ordering::SeqCst);
        session.markup = markup.to_string();
        session.jobs += 1;
        Ok(Dimensions {
            width: 32,
            height: 16,
        })
    }

    async fn capture(
        &self,
        _session: &mut MockSession,
        region: CaptureRegion,
        quality: u8,
    ) -> Result<Bytes, RenderError> {
        Ok(Bytes::from(create_jpeg(region.width, region.height, quality)))
    }

    async fn close(&self, _session: MockSession) -> Result<(), RenderError> {
        self.sessions_closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Encode a solid-colour JPEG.
pub fn create_jpeg(width: u32, height: u32, quality: u8) -> Vec<u8> {
    let img = RgbImage::from_pixel(width.max(1), height.max(1), Rgb([240, 240, 240]));
    let mut buf = Vec::new();
    JpegEncoder::new_with_quality(&mut buf, quality)
        .encode_image(&img)
        .unwrap();
    buf
}

// =============================================================================
// Counting Store
// =============================================================================

/// An in-memory store that counts operations and can be told to fail.
#[derive(Default)]
pub struct CountingStore {
    inner: MemoryStore,
    reads: AtomicUsize,
    writes: AtomicUsize,
    removes: AtomicUsize,
    purges: AtomicUsize,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
}

impl CountingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn removes(&self) -> usize {
        self.removes.load(Ordering::SeqCst)
    }

    pub fn purges(&self) -> usize {
        self.purges.load(Ordering::SeqCst)
    }

    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub async fn stored(&self) -> usize {
        self.inner.len().await
    }
}

#[async_trait]
impl CacheStore for CountingStore {
    async fn read(&self, key: &str) -> Result<Option<Bytes>, StoreError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Database("read refused".to_string()));
        }
        self.inner.read(key).await
    }

    async fn write(&self, key: &str, value: Bytes) -> Result<(), StoreError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Database("write refused".to_string()));
        }
        self.inner.write(key, value).await
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.removes.fetch_add(1, Ordering::SeqCst);
        self.inner.remove(key).await
    }

    async fn purge(&self) -> Result<usize, StoreError> {
        self.purges.fetch_add(1, Ordering::SeqCst);
        self.inner.purge().await
    }

    fn name(&self) -> &'static str {
        "counting"
    }
}

// =============================================================================
// Messages and Configuration
// =============================================================================

/// Configuration with an in-memory cache and a small pool.
pub fn test_config() -> ImagifyConfig {
    ImagifyConfig {
        cache_backend: CacheBackendKind::Memory,
        pool_size: 2,
        acquire_timeout_ms: 2_000,
        ..Default::default()
    }
}

pub fn session(platform: &str) -> MessageSession {
    MessageSession {
        platform: Some(platform.to_string()),
        self_id: Some("bot-1".to_string()),
        user_id: Some("user-1".to_string()),
        channel_id: Some("channel-1".to_string()),
        ..Default::default()
    }
}

/// A message well above the default length threshold.
pub fn long_message(platform: &str) -> OutboundMessage {
    let text = "The quick brown fox jumps over the lazy dog. ".repeat(20);
    OutboundMessage::new(
        session(platform),
        vec![Element::universal(
            UniversalTag::Paragraph,
            vec![Element::text(text)],
        )],
    )
}

/// A message well below both default thresholds.
pub fn short_message(platform: &str) -> OutboundMessage {
    OutboundMessage::new(session(platform), vec![Element::text("hello")])
}

/// An element of an arbitrary kind without attributes.
pub fn bare(kind: &str) -> Element {
    Element::other(kind, Attributes::new(), Vec::new())
}

/// Whether `data` starts with the JPEG SOI marker.
pub fn is_valid_jpeg(data: &[u8]) -> bool {
    data.len() >= 2 && data[0] == 0xFF && data[1] == 0xD8
}
