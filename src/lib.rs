//! # imagify
//!
//! Renders long or rule-matched chat messages as a single image before they
//! are sent.
//!
//! A host calls [`Imagify::before_send`] for every outgoing message. When the
//! trigger fires, the message's rich-content elements are serialized to
//! markup, rendered on a pool of reusable render sessions, and replaced by the
//! image. Rendered images are cached by a content hash.
//!
//! ## Features
//!
//! - **Two trigger modes**: length and line-count thresholds, or a rule set
//!   over the message's session (platform, user, group, content, ...)
//! - **Worker pool**: a fixed set of render sessions with async acquisition
//!   and a deadline
//! - **Tiered cache**: frequently requested images stay in memory, everything
//!   is written through to a file, SQLite or in-memory store
//!
//! ## Architecture
//!
//! - [`element`] - Message elements, markup serialization, text metrics
//! - [`rule`] - Rule sets and their evaluation
//! - [`render`] - Render backend trait, worker pool and page template
//! - [`cache`] - Cache keys and the tiered cache
//! - [`store`] - Cache persistence backends
//! - [`hook`] - The before-send hook tying it all together
//! - [`config`] - CLI and configuration types
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use imagify::{Imagify, ImagifyConfig, OutboundMessage, RenderBackend};
//!
//! async fn run<B: RenderBackend>(backend: B, mut message: OutboundMessage) {
//!     let config = ImagifyConfig::default();
//!     let imagify = Imagify::start(&config, Arc::new(backend)).await.unwrap();
//!
//!     let outcome = imagify.before_send(&mut message).await;
//!     println!("{:?}", outcome);
//!
//!     imagify.shutdown().await.unwrap();
//! }
//! ```

pub mod cache;
pub mod config;
pub mod element;
pub mod error;
pub mod hook;
pub mod render;
pub mod rule;
pub mod store;

// Re-export commonly used types
pub use cache::{CacheKey, RenderSalt, TieredCache};
pub use config::{CacheBackendKind, Cli, Command, ImagifyConfig};
pub use element::{serialize, serialize_with, Element, UniversalTag};
pub use error::{ConfigError, ImagifyError, PoolError, RenderError, RuleError, StoreError};
pub use hook::{HookOutcome, Imagify, MessageSession, OutboundMessage, Trigger};
pub use render::{CaptureRegion, Dimensions, PageTemplate, RenderBackend, WorkerPool};
pub use rule::{Rule, RuleEvaluator, RuleField, RuleOperator, RuleSet, SessionContext};
pub use store::{CacheStore, FileStore, MemoryStore, SqliteStore};
