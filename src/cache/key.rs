//! Cache key derivation.
//!
//! A key is the SHA-256 of the rendered content together with every setting
//! that affects the produced image. Changing any of those settings therefore
//! changes every key, and old entries are simply never hit again.

use std::fmt;

use serde::Serialize;
use sha2::{Digest, Sha256};

/// Settings that change the rendered image.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderSalt {
    pub style: String,
    pub background: Option<String>,
    pub blur: u32,
    pub max_length: usize,
    pub max_line_count: usize,
    pub template: String,
    pub quality: u8,
}

/// Hex-encoded SHA-256 cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    /// Derive the key for `content` rendered under `salt`.
    ///
    /// The content is length-prefixed before hashing, so distinct
    /// `(content, salt)` pairs never produce the same input bytes.
    pub fn derive(content: &str, salt: &RenderSalt) -> Self {
        // Serializing a struct of strings and integers cannot fail.
        let salt = serde_json::to_string(salt).unwrap_or_default();
        Self::derive_raw(content, &salt)
    }

    /// Derive a key from content and an already serialized salt.
    pub fn derive_raw(content: &str, salt: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update((content.len() as u64).to_le_bytes());
        hasher.update(content.as_bytes());
        hasher.update(salt.as_bytes());
        Self(hex::encode(hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
