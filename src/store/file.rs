use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use tracing::debug;

use super::CacheStore;
use crate::error::StoreError;

/// File extension of stored payloads.
const PAYLOAD_EXTENSION: &str = "temp";

/// Suffix of payloads still being written.
const PARTIAL_SUFFIX: &str = "partial";

/// Stores each payload as `<dir>/<key>.temp`.
///
/// The directory is created on first write. Payloads are written to
/// `<key>.temp.partial` and renamed into place, so readers never see a
/// truncated payload.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// The directory payloads are written to.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the payload file for `key`.
    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.{}", key, PAYLOAD_EXTENSION))
    }

    fn partial_path_for(&self, key: &str) -> PathBuf {
        self.dir
            .join(format!("{}.{}.{}", key, PAYLOAD_EXTENSION, PARTIAL_SUFFIX))
    }
}

/// Whether `path` is a payload or partial payload written by a [`FileStore`].
fn is_payload_file(path: &Path) -> bool {
    match path.file_name().and_then(|name| name.to_str()) {
        Some(name) => {
            name.ends_with(&format!(".{}", PAYLOAD_EXTENSION))
                || name.ends_with(&format!(".{}.{}", PAYLOAD_EXTENSION, PARTIAL_SUFFIX))
        }
        None => false,
    }
}

fn io_error(key: &str, err: std::io::Error) -> StoreError {
    StoreError::Io {
        key: key.to_string(),
        message: err.to_string(),
    }
}

#[async_trait]
impl CacheStore for FileStore {
    async fn read(&self, key: &str) -> Result<Option<Bytes>, StoreError> {
        match tokio::fs::read(self.path_for(key)).await {
            Ok(data) => Ok(Some(Bytes::from(data))),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(io_error(key, e)),
        }
    }

    async fn write(&self, key: &str, value: Bytes) -> Result<(), StoreError> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| io_error(key, e))?;
        let partial = self.partial_path_for(key);
        tokio::fs::write(&partial, &value)
            .await
            .map_err(|e| io_error(key, e))?;
        tokio::fs::rename(&partial, self.path_for(key))
            .await
            .map_err(|e| io_error(key, e))?;
        debug!("Wrote {} bytes to {}", value.len(), self.path_for(key).display());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        match tokio::fs::remove_file(self.path_for(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(io_error(key, e)),
        }
    }

    async fn purge(&self) -> Result<usize, StoreError> {
        let dir_key = self.dir.display().to_string();
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(io_error(&dir_key, e)),
        };

        let mut removed = 0;
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| io_error(&dir_key, e))?
        {
            let path = entry.path();
            if !is_payload_file(&path) {
                continue;
            }
            match tokio::fs::remove_file(&path).await {
                Ok(()) => removed += 1,
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(io_error(&path.display().to_string(), e)),
            }
        }
        debug!("Purged {} payload(s) from {}", removed, self.dir.display());
        Ok(removed)
    }

    fn name(&self) -> &'static str {
        "file"
    }
}
