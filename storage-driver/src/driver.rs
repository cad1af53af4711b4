use std::{fmt, ops::Deref, sync::Arc};

use bytes::Bytes;
use camino::{Utf8Path, Utf8PathBuf};
use chrono::{DateTime, Utc};

use crate::error::{StorageError, StorageErrorKind};

/// File object metadata, which will be generically provided by the driver.
///
/// This struct only provides common metadata fields, and drivers may provide more specific
/// metadata fields directly.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Metadata {
    /// The size of the object in bytes.
    pub size: u64,

    /// When the object was last written.
    pub modified: DateTime<Utc>,
}

/// A storage driver, which provides path-keyed access to a storage backend.
///
/// Paths are relative, `/`-separated, and never contain `..` components.
/// The registry core only hands drivers around; concrete drivers live
/// outside of it and are passed to the manifest-service factories.
#[async_trait::async_trait]
pub trait Driver: fmt::Debug + Send + Sync {
    /// The name of the driver.
    fn name(&self) -> &'static str;

    /// Read the full contents stored at `path`.
    async fn get_content(&self, path: &Utf8Path) -> Result<Bytes, StorageError>;

    /// Store `content` at `path`, replacing anything already there.
    async fn put_content(&self, path: &Utf8Path, content: Bytes) -> Result<(), StorageError>;

    /// Get the metadata for an object, by path.
    async fn stat(&self, path: &Utf8Path) -> Result<Metadata, StorageError>;

    /// List every object path below `prefix`, recursively.
    async fn list(&self, prefix: &Utf8Path) -> Result<Vec<Utf8PathBuf>, StorageError>;

    /// Delete the object at `path`.
    async fn delete(&self, path: &Utf8Path) -> Result<(), StorageError>;

    /// Check whether an object exists at `path`.
    async fn exists(&self, path: &Utf8Path) -> Result<bool, StorageError> {
        match self.stat(path).await {
            Ok(_) => Ok(true),
            Err(error) if error.is_not_found() => Ok(false),
            Err(error) => Err(error),
        }
    }
}

/// Reject paths a driver must never see.
pub fn check_path(driver: &'static str, path: &Utf8Path) -> Result<(), StorageError> {
    let invalid = path.as_str().is_empty()
        || path.is_absolute()
        || path
            .components()
            .any(|component| matches!(component, camino::Utf8Component::ParentDir));

    if invalid {
        return Err(StorageError::builder(
            driver,
            StorageErrorKind::InvalidPath,
            format!("invalid storage path: {path:?}"),
        )
        .path(path.as_str())
        .build());
    }
    Ok(())
}

#[async_trait::async_trait]
impl<D> Driver for Arc<D>
where
    D: ?Sized + Driver + 'static,
{
    fn name(&self) -> &'static str {
        self.deref().name()
    }

    async fn get_content(&self, path: &Utf8Path) -> Result<Bytes, StorageError> {
        self.deref().get_content(path).await
    }

    async fn put_content(&self, path: &Utf8Path, content: Bytes) -> Result<(), StorageError> {
        self.deref().put_content(path, content).await
    }

    async fn stat(&self, path: &Utf8Path) -> Result<Metadata, StorageError> {
        self.deref().stat(path).await
    }

    async fn list(&self, prefix: &Utf8Path) -> Result<Vec<Utf8PathBuf>, StorageError> {
        self.deref().list(prefix).await
    }

    async fn delete(&self, path: &Utf8Path) -> Result<(), StorageError> {
        self.deref().delete(path).await
    }

    async fn exists(&self, path: &Utf8Path) -> Result<bool, StorageError> {
        self.deref().exists(path).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    static_assertions::assert_obj_safe!(Driver);

    #[test]
    fn paths_are_checked() {
        assert!(check_path("test", Utf8Path::new("repositories/library/ubuntu")).is_ok());

        for bad in ["", "/repositories", "repositories/../secrets"] {
            let error = check_path("test", Utf8Path::new(bad)).unwrap_err();
            assert_eq!(error.kind(), StorageErrorKind::InvalidPath, "{bad:?}");
        }
    }
}
