use std::collections::HashMap;

use bytes::Bytes;
use camino::{Utf8Path, Utf8PathBuf};
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::driver::{check_path, Driver, Metadata};
use crate::error::StorageError;

#[derive(Debug)]
struct MemoryFileItem {
    modified: DateTime<Utc>,
    data: Bytes,
}

impl From<Bytes> for MemoryFileItem {
    fn from(data: Bytes) -> Self {
        Self {
            modified: Utc::now(),
            data,
        }
    }
}

impl From<&MemoryFileItem> for Metadata {
    fn from(value: &MemoryFileItem) -> Self {
        Self {
            modified: value.modified,
            size: value.data.len() as u64,
        }
    }
}

/// Storage driver that keeps objects in memory.
///
/// Useful as a stub backend: nothing outlives the driver value.
#[derive(Debug, Default)]
pub struct MemoryDriver {
    files: RwLock<HashMap<Utf8PathBuf, MemoryFileItem>>,
}

impl MemoryDriver {
    /// Create a new, empty `MemoryDriver`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of objects currently stored.
    pub async fn len(&self) -> usize {
        self.files.read().await.len()
    }

    /// Whether the driver holds no objects.
    pub async fn is_empty(&self) -> bool {
        self.files.read().await.is_empty()
    }
}

#[async_trait::async_trait]
impl Driver for MemoryDriver {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn get_content(&self, path: &Utf8Path) -> Result<Bytes, StorageError> {
        check_path(self.name(), path)?;
        let files = self.files.read().await;
        files
            .get(path)
            .map(|item| item.data.clone())
            .ok_or_else(|| StorageError::not_found(self.name(), path.as_str()))
    }

    async fn put_content(&self, path: &Utf8Path, content: Bytes) -> Result<(), StorageError> {
        check_path(self.name(), path)?;
        tracing::trace!(%path, size = content.len(), "put memory object");
        let mut files = self.files.write().await;
        files.insert(path.to_owned(), content.into());
        Ok(())
    }

    async fn stat(&self, path: &Utf8Path) -> Result<Metadata, StorageError> {
        check_path(self.name(), path)?;
        let files = self.files.read().await;
        files
            .get(path)
            .map(Metadata::from)
            .ok_or_else(|| StorageError::not_found(self.name(), path.as_str()))
    }

    async fn list(&self, prefix: &Utf8Path) -> Result<Vec<Utf8PathBuf>, StorageError> {
        tracing::trace!(%prefix, "list memory objects");

        let files = self.files.read().await;
        let mut paths: Vec<_> = files
            .keys()
            .filter(|path| path.starts_with(prefix))
            .cloned()
            .collect();
        paths.sort();
        Ok(paths)
    }

    async fn delete(&self, path: &Utf8Path) -> Result<(), StorageError> {
        check_path(self.name(), path)?;
        let mut files = self.files.write().await;
        files
            .remove(path)
            .map(|_| ())
            .ok_or_else(|| StorageError::not_found(self.name(), path.as_str()))
    }
}
