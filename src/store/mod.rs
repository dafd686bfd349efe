//! Backing stores for the tiered cache.
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │              TieredCache                │
//! └────────────────────┬────────────────────┘
//!                      │ read / write / remove
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │           CacheStore Trait              │
//! └────────────────────┬────────────────────┘
//!          ┌───────────┼───────────┐
//!          ▼           ▼           ▼
//!     FileStore   MemoryStore  SqliteStore
//! ```

mod backend;
mod file;
mod memory;
mod sqlite;

pub use backend::CacheStore;
pub use file::FileStore;
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
