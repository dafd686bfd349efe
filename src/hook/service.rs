//! The before-send hook that turns long messages into images.

use std::sync::Arc;
use std::time::Duration;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use bytes::Bytes;
use tracing::{debug, error, info, warn};

use super::message::OutboundMessage;
use super::trigger::Trigger;
use crate::cache::{CacheKey, RenderSalt, TieredCache};
use crate::config::ImagifyConfig;
use crate::element::{serialize, Element};
use crate::error::{ImagifyError, StoreError};
use crate::render::{PageValues, RenderBackend, WorkerPool};
use crate::store::CacheStore;

/// MIME type used when the captured bytes are not a recognised image.
const FALLBACK_MIME: &str = "image/jpeg";

/// What [`Imagify::before_send`] did with a message.
#[derive(Debug, Clone)]
pub enum HookOutcome {
    /// The trigger did not fire; the message is unchanged.
    NotTriggered,

    /// The message now starts with the rendered image.
    Converted { cache_hit: bool },

    /// Rendering failed; the message is unchanged.
    Failed(ImagifyError),
}

impl HookOutcome {
    pub fn is_converted(&self) -> bool {
        matches!(self, HookOutcome::Converted { .. })
    }
}

/// Renders qualifying outbound messages into a single image.
///
/// Owns the render pool and the image cache; there is no global state.
pub struct Imagify<B: RenderBackend> {
    trigger: Trigger,
    salt: RenderSalt,
    quality: u8,
    stale_after: Duration,
    cache: Option<TieredCache>,
    pool: WorkerPool<B>,
}

impl<B: RenderBackend> Imagify<B> {
    /// Validate `config`, open the configured cache store and start the
    /// render pool.
    pub async fn start(config: &ImagifyConfig, backend: Arc<B>) -> Result<Self, ImagifyError> {
        config.validate()?;
        let store = config.build_store()?;
        Self::start_with_store(config, backend, store).await
    }

    /// Like [`start`](Self::start), with an explicit cache store (`None`
    /// disables caching). Payloads already in the store are purged.
    pub async fn start_with_store(
        config: &ImagifyConfig,
        backend: Arc<B>,
        store: Option<Arc<dyn CacheStore>>,
    ) -> Result<Self, ImagifyError> {
        config.validate()?;

        let trigger = config.trigger()?;
        let style = config.load_style()?;
        let template = config.load_template()?;
        let salt = config.render_salt(&style, &template);

        let page = template.render(&PageValues {
            style: &style,
            background: config.background.as_deref(),
            blur: config.blur,
            element: "",
        });
        let pool =
            WorkerPool::start(backend, config.pool_size, &page, config.acquire_timeout()).await?;

        // Payloads left by earlier processes are never tracked again
        if let Some(ref store) = store {
            match store.purge().await {
                Ok(0) => {}
                Ok(removed) => info!(
                    "Purged {} stale payload(s) from {} store",
                    removed,
                    store.name()
                ),
                Err(e) => warn!("Failed to purge {} store on start: {}", store.name(), e),
            }
        }
        let cache = store.map(|store| TieredCache::with_threshold(store, config.cache_threshold));

        info!(
            "imagify started: {} trigger, {} render worker(s), cache {}",
            trigger.mode(),
            pool.size(),
            cache
                .as_ref()
                .map(|c| c.store().name())
                .unwrap_or("disabled")
        );

        Ok(Self {
            trigger,
            salt,
            quality: config.quality,
            stale_after: config.cache_stale_after(),
            cache,
            pool,
        })
    }

    /// Convert `message` to an image if the trigger fires.
    ///
    /// On conversion the elements become the image followed by the original
    /// `at`, `button` and `quote` elements. On failure the message is left
    /// untouched.
    pub async fn before_send(&self, message: &mut OutboundMessage) -> HookOutcome {
        if !self.trigger.fires(message) {
            debug!("Trigger did not fire");
            return HookOutcome::NotTriggered;
        }

        let markup = serialize(&message.elements);
        let key = CacheKey::derive(&markup, &self.salt);

        let (image, cache_hit) = match self.cached(&key).await {
            Some(image) => (image, true),
            None => match self.pool.render_image(&markup, self.quality).await {
                Ok(image) => {
                    self.store(&key, image.clone()).await;
                    (image, false)
                }
                Err(e) => {
                    error!("Failed to render message: {}", e);
                    return HookOutcome::Failed(e.into());
                }
            },
        };

        debug!(
            "Converted message to image {} ({} bytes, cache hit: {})",
            key,
            image.len(),
            cache_hit
        );

        let preserved = std::mem::take(&mut message.elements)
            .into_iter()
            .filter(Element::is_append_type);
        message.elements = std::iter::once(image_element(&image))
            .chain(preserved)
            .collect();

        HookOutcome::Converted { cache_hit }
    }

    async fn cached(&self, key: &CacheKey) -> Option<Bytes> {
        let cache = self.cache.as_ref()?;
        match cache.get(key).await {
            Ok(image) => image,
            Err(e) => {
                warn!("Cache read for {} failed, rendering instead: {}", key, e);
                None
            }
        }
    }

    async fn store(&self, key: &CacheKey, image: Bytes) {
        if let Some(ref cache) = self.cache {
            if let Err(e) = cache.set(key, image).await {
                warn!("Failed to cache image {}: {}", key, e);
            }
        }
    }

    /// Drop cache entries not looked up within the configured stale age.
    pub async fn sweep_cache(&self) -> Result<usize, StoreError> {
        match self.cache {
            Some(ref cache) => cache.sweep_stale(self.stale_after).await,
            None => Ok(0),
        }
    }

    /// Clear the cache and close every render session.
    ///
    /// Both steps are attempted; the first error is returned.
    pub async fn shutdown(&self) -> Result<(), ImagifyError> {
        let cleared = match self.cache {
            Some(ref cache) => cache.clear().await.map_err(ImagifyError::from),
            None => Ok(()),
        };
        if let Err(ref e) = cleared {
            warn!("Failed to clear cache on shutdown: {}", e);
        }

        let closed = self.pool.close().await.map_err(ImagifyError::from);
        info!("imagify stopped");
        cleared.and(closed)
    }

    pub fn trigger(&self) -> &Trigger {
        &self.trigger
    }

    pub fn salt(&self) -> &RenderSalt {
        &self.salt
    }

    pub fn cache(&self) -> Option<&TieredCache> {
        self.cache.as_ref()
    }

    pub fn pool(&self) -> &WorkerPool<B> {
        &self.pool
    }
}

/// `data:` URL for an image, with the MIME type sniffed from its bytes.
pub fn data_url(bytes: &[u8]) -> String {
    let mime = image::guess_format(bytes)
        .map(|format| format.to_mime_type())
        .unwrap_or(FALLBACK_MIME);
    format!("data:{};base64,{}", mime, STANDARD.encode(bytes))
}

/// Image element showing the encoded image `bytes`.
pub fn image_element(bytes: &[u8]) -> Element {
    Element::image(data_url(bytes))
}
