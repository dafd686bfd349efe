//! Rendered image cache.
//!
//! - [`CacheKey`]: SHA-256 of the element markup plus a [`RenderSalt`] of every
//!   output-affecting setting
//! - [`TieredCache`]: counts lookups per key and keeps payloads resident once
//!   a key is hot, with all payloads written through to a
//!   [`CacheStore`](crate::store::CacheStore)
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use bytes::Bytes;
//! use imagify::cache::{CacheKey, TieredCache};
//! use imagify::store::MemoryStore;
//!
//! #[tokio::main]
//! async fn main() {
//!     let cache = TieredCache::with_threshold(Arc::new(MemoryStore::new()), 2);
//!     let key = CacheKey::derive_raw("<p>hello</p>", "{}");
//!
//!     // Unknown keys miss without touching the store
//!     assert!(cache.get(&key).await.unwrap().is_none());
//!
//!     cache.set(&key, Bytes::from_static(b"jpeg bytes")).await.unwrap();
//!     assert!(cache.get(&key).await.unwrap().is_some());
//! }
//! ```

mod key;
mod tiered;

pub use key::{CacheKey, RenderSalt};
pub use tiered::{CacheEntry, CacheStats, TieredCache, DEFAULT_FREQUENCY_THRESHOLD};
