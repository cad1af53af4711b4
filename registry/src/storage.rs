//! Storage layer for the registry
//!
//! The built-in manifest handler keeps manifests in a storage driver with
//! the following layout, below an optional root:
//!
//! ```text
//! repositories/<name>/_manifests/revisions/<algorithm>/<encoded>/data
//! repositories/<name>/_manifests/tags/<tag>/current/link
//! ```
//!
//! Revisions hold the manifest payload, tag links hold a digest string.

use std::sync::Arc;

use bytes::Bytes;
use camino::Utf8PathBuf;
use storage_driver::{Driver, StorageError};

use crate::config::HandlerConfig;
use crate::digest::Digest;
use crate::error::{RegistryError, RegistryResult};
use crate::extension::BoxError;
use crate::handlers::{
    Extensions, ManifestServiceArgs, ManifestServiceCreator, RepositoryMiddlewareArgs,
};
use crate::manifest::SignedManifest;
use crate::names::{RepositoryName, validate_tag};
use crate::service::{ManifestService, Registry, Repository};

/// Name under which [`Extensions::with_defaults`] registers the
/// driver-backed manifest handler.
pub const STORAGE_HANDLER: &str = "storage";

/// Option naming a path prefix for everything the handler stores.
pub const ROOT_OPTION: &str = "root";

/// Factory for [`StorageManifestService`].
///
/// Accepts a single optional string option, `root`.
pub fn storage_manifest_service(
    args: ManifestServiceArgs,
) -> Result<Arc<dyn ManifestService>, BoxError> {
    let root = match args.options.get(ROOT_OPTION) {
        None => Utf8PathBuf::new(),
        Some(serde_json::Value::String(root)) => Utf8PathBuf::from(root.trim_matches('/')),
        Some(other) => {
            return Err(format!("option {ROOT_OPTION:?} must be a string, got {other}").into());
        }
    };

    Ok(Arc::new(StorageManifestService::new(args.name, args.driver, root)))
}

/// Manifest service backed by a storage driver.
#[derive(Debug, Clone)]
pub struct StorageManifestService {
    name: RepositoryName,
    driver: Arc<dyn Driver>,
    root: Utf8PathBuf,
}

impl StorageManifestService {
    /// Create a manifest service for `name`, storing below `root`.
    pub fn new(name: RepositoryName, driver: Arc<dyn Driver>, root: Utf8PathBuf) -> Self {
        Self { name, driver, root }
    }

    fn manifests_path(&self) -> Utf8PathBuf {
        self.root.join(format!("repositories/{}/_manifests", self.name))
    }

    /// Get the path for a manifest revision
    fn revision_path(&self, digest: &Digest) -> Utf8PathBuf {
        self.manifests_path().join(format!(
            "revisions/{}/{}/data",
            digest.algorithm(),
            digest.encoded()
        ))
    }

    fn tags_path(&self) -> Utf8PathBuf {
        self.manifests_path().join("tags")
    }

    /// Get the path for a tag link
    fn tag_path(&self, tag: &str) -> Utf8PathBuf {
        self.tags_path().join(format!("{tag}/current/link"))
    }

    fn unknown(&self, reference: impl Into<String>) -> RegistryError {
        RegistryError::ManifestUnknown {
            name: self.name.to_string(),
            reference: reference.into(),
        }
    }

    /// Read a tag link, `None` when the tag does not exist
    async fn read_tag(&self, tag: &str) -> RegistryResult<Option<Digest>> {
        validate_tag(tag)?;
        match self.driver.get_content(&self.tag_path(tag)).await {
            Ok(link) => {
                let link = String::from_utf8_lossy(&link);
                Ok(Some(Digest::parse(link.trim())?))
            }
            Err(error) if error.is_not_found() => Ok(None),
            Err(error) => Err(error.into()),
        }
    }

    async fn tag_names(&self) -> Result<Vec<String>, StorageError> {
        let prefix = self.tags_path();
        let files = self.driver.list(&prefix).await?;

        let mut tags: Vec<String> = files
            .iter()
            .filter_map(|path| {
                path.strip_prefix(&prefix)
                    .ok()
                    .and_then(|p| p.components().next())
                    .map(|c| c.as_str().to_owned())
            })
            .collect();
        tags.sort();
        tags.dedup();
        Ok(tags)
    }
}

#[async_trait::async_trait]
impl ManifestService for StorageManifestService {
    #[tracing::instrument(skip(self), fields(repository = %self.name))]
    async fn exists(&self, tag: &str) -> RegistryResult<bool> {
        validate_tag(tag)?;
        Ok(self.driver.exists(&self.tag_path(tag)).await?)
    }

    #[tracing::instrument(skip(self), fields(repository = %self.name))]
    async fn get(&self, tag: &str) -> RegistryResult<SignedManifest> {
        let digest = self.read_tag(tag).await?.ok_or_else(|| self.unknown(tag))?;
        self.get_by_digest(&digest).await
    }

    #[tracing::instrument(skip(self), fields(repository = %self.name))]
    async fn get_by_digest(&self, digest: &Digest) -> RegistryResult<SignedManifest> {
        let path = self.revision_path(digest);
        tracing::trace!(%path, "reading manifest revision");

        let payload = match self.driver.get_content(&path).await {
            Ok(payload) => payload,
            Err(error) if error.is_not_found() => return Err(self.unknown(digest.as_str())),
            Err(error) => return Err(error.into()),
        };

        let manifest = SignedManifest::from_bytes(payload)?;
        let actual = manifest.digest()?;
        if actual != *digest {
            return Err(RegistryError::DigestMismatch {
                expected: digest.clone(),
                actual,
            });
        }
        Ok(manifest)
    }

    #[tracing::instrument(
        skip(self, manifest),
        fields(repository = %self.name, tag = %manifest.tag)
    )]
    async fn put(&self, manifest: &SignedManifest) -> RegistryResult<Digest> {
        manifest.validate().map_err(crate::manifest::ManifestError::from)?;
        if self.name != manifest.name.as_str() {
            return Err(RegistryError::NameMismatch {
                expected: self.name.to_string(),
                actual: manifest.name.clone(),
            });
        }

        let digest = manifest.digest()?;
        let payload = manifest.to_bytes()?;

        self.driver
            .put_content(&self.revision_path(&digest), payload)
            .await?;
        self.driver
            .put_content(&self.tag_path(&manifest.tag), Bytes::from(digest.to_string()))
            .await?;

        tracing::debug!(%digest, "stored manifest");
        Ok(digest)
    }

    #[tracing::instrument(skip(self), fields(repository = %self.name))]
    async fn delete(&self, digest: &Digest) -> RegistryResult<()> {
        let path = self.revision_path(digest);
        if !self.driver.exists(&path).await? {
            return Err(self.unknown(digest.as_str()));
        }

        for tag in self.tag_names().await? {
            if self.read_tag(&tag).await?.as_ref() == Some(digest) {
                tracing::debug!(%tag, "removing tag of deleted manifest");
                self.driver.delete(&self.tag_path(&tag)).await?;
            }
        }

        self.driver.delete(&path).await?;
        Ok(())
    }

    #[tracing::instrument(skip(self), fields(repository = %self.name))]
    async fn tags(&self) -> RegistryResult<Vec<String>> {
        Ok(self.tag_names().await?)
    }
}

/// Repository handing out a manifest service from the configured handler.
#[derive(Debug, Clone)]
pub struct StorageRepository {
    name: RepositoryName,
    manifests: Arc<dyn ManifestService>,
}

impl StorageRepository {
    /// Create a repository around an already-constructed manifest service.
    pub fn new(name: RepositoryName, manifests: Arc<dyn ManifestService>) -> Self {
        Self { name, manifests }
    }
}

impl Repository for StorageRepository {
    fn name(&self) -> &RepositoryName {
        &self.name
    }

    fn manifests(&self) -> Arc<dyn ManifestService> {
        self.manifests.clone()
    }
}

/// The base registry: opens [`StorageRepository`] values and applies the
/// configured repository middleware to each of them, in order.
#[derive(Debug)]
pub struct StorageRegistry {
    manifests: ManifestServiceCreator,
    extensions: Arc<Extensions>,
    repository_middleware: Vec<HandlerConfig>,
}

impl StorageRegistry {
    /// Create a registry from a bound manifest handler.
    pub fn new(
        manifests: ManifestServiceCreator,
        extensions: Arc<Extensions>,
        repository_middleware: Vec<HandlerConfig>,
    ) -> Self {
        Self {
            manifests,
            extensions,
            repository_middleware,
        }
    }
}

impl Registry for StorageRegistry {
    #[tracing::instrument(skip(self))]
    fn repository(&self, name: &RepositoryName) -> RegistryResult<Arc<dyn Repository>> {
        let manifests = self.manifests.create_manifest_service(name)?;
        let base: Arc<dyn Repository> = Arc::new(StorageRepository::new(name.clone(), manifests));

        self.repository_middleware
            .iter()
            .try_fold(base, |repository, middleware| {
                tracing::trace!(middleware = %middleware.name, "applying repository middleware");
                let wrapped = self.extensions.repository.lookup(
                    &middleware.name,
                    RepositoryMiddlewareArgs {
                        repository,
                        options: middleware.options.clone(),
                    },
                )?;
                Ok(wrapped)
            })
    }
}

#[cfg(test)]
mod tests {
    use camino::Utf8Path;
    use serde_json::json;
    use storage_driver::MemoryDriver;

    use super::*;
    use crate::handlers::Options;
    use crate::manifest::tests::sample;

    fn service(driver: Arc<MemoryDriver>) -> StorageManifestService {
        StorageManifestService::new(
            RepositoryName::new("library/ubuntu").unwrap(),
            driver,
            Utf8PathBuf::new(),
        )
    }

    #[tokio::test]
    async fn put_then_get_by_tag_and_digest() {
        let driver = Arc::new(MemoryDriver::new());
        let manifests = service(driver.clone());
        let manifest = SignedManifest::new(sample("library/ubuntu", "latest"));

        let digest = manifests.put(&manifest).await.unwrap();
        assert_eq!(digest, manifest.digest().unwrap());

        assert!(manifests.exists("latest").await.unwrap());
        assert!(!manifests.exists("stable").await.unwrap());

        let by_tag = manifests.get("latest").await.unwrap();
        assert_eq!(by_tag.manifest(), manifest.manifest());
        let by_digest = manifests.get_by_digest(&digest).await.unwrap();
        assert_eq!(by_digest, by_tag);
    }

    #[tokio::test]
    async fn stored_payload_is_the_raw_bytes() {
        let driver = Arc::new(MemoryDriver::new());
        let manifests = service(driver.clone());

        let mut pretty = serde_json::to_string_pretty(&sample("library/ubuntu", "latest")).unwrap();
        pretty.push('\n');
        let manifest = SignedManifest::from_slice(pretty.as_bytes()).unwrap();

        let digest = manifests.put(&manifest).await.unwrap();
        let stored = driver
            .get_content(&manifests.revision_path(&digest))
            .await
            .unwrap();
        assert_eq!(stored, pretty.as_bytes());

        let fetched = manifests.get("latest").await.unwrap();
        assert_eq!(fetched.to_bytes().unwrap(), pretty.as_bytes());
    }

    #[tokio::test]
    async fn layout() {
        let manifests = service(Arc::new(MemoryDriver::new()));
        let digest = Digest::sha256(b"manifest");
        assert_eq!(
            manifests.revision_path(&digest).as_str(),
            format!(
                "repositories/library/ubuntu/_manifests/revisions/sha256/{}/data",
                digest.encoded()
            )
        );
        assert_eq!(
            manifests.tag_path("latest").as_str(),
            "repositories/library/ubuntu/_manifests/tags/latest/current/link"
        );
    }

    #[tokio::test]
    async fn missing_manifests_are_unknown() {
        let manifests = service(Arc::new(MemoryDriver::new()));

        let error = manifests.get("latest").await.unwrap_err();
        assert_eq!(error.error_code(), "MANIFEST_UNKNOWN");

        let error = manifests
            .get_by_digest(&Digest::sha256(b"nothing"))
            .await
            .unwrap_err();
        assert_eq!(error.error_code(), "MANIFEST_UNKNOWN");

        let error = manifests.delete(&Digest::sha256(b"nothing")).await.unwrap_err();
        assert_eq!(error.error_code(), "MANIFEST_UNKNOWN");
    }

    #[tokio::test]
    async fn put_rejects_foreign_and_invalid_manifests() {
        let manifests = service(Arc::new(MemoryDriver::new()));

        let foreign = SignedManifest::new(sample("library/debian", "latest"));
        let error = manifests.put(&foreign).await.unwrap_err();
        assert!(matches!(error, RegistryError::NameMismatch { .. }));

        let bad_tag = SignedManifest::new(sample("library/ubuntu", ".bad"));
        let error = manifests.put(&bad_tag).await.unwrap_err();
        assert_eq!(error.error_code(), "TAG_INVALID");

        let mut future = sample("library/ubuntu", "latest");
        future.schema_version = 3;
        let error = manifests
            .put(&SignedManifest::new(future))
            .await
            .unwrap_err();
        assert_eq!(error.error_code(), "UNKNOWN");
    }

    #[tokio::test]
    async fn tampered_revision_is_detected() {
        let driver = Arc::new(MemoryDriver::new());
        let manifests = service(driver.clone());
        let digest = manifests
            .put(&SignedManifest::new(sample("library/ubuntu", "latest")))
            .await
            .unwrap();

        let tampered = serde_json::to_vec(&sample("library/ubuntu", "other")).unwrap();
        driver
            .put_content(&manifests.revision_path(&digest), tampered.into())
            .await
            .unwrap();

        let error = manifests.get("latest").await.unwrap_err();
        assert!(matches!(error, RegistryError::DigestMismatch { .. }));
    }

    #[tokio::test]
    async fn tags_and_delete() {
        let manifests = service(Arc::new(MemoryDriver::new()));

        let latest = manifests
            .put(&SignedManifest::new(sample("library/ubuntu", "latest")))
            .await
            .unwrap();
        manifests
            .put(&SignedManifest::new(sample("library/ubuntu", "v1.0")))
            .await
            .unwrap();
        manifests
            .put(&SignedManifest::new(sample("library/ubuntu", "v1.1")))
            .await
            .unwrap();

        assert_eq!(manifests.tags().await.unwrap(), ["latest", "v1.0", "v1.1"]);

        manifests.delete(&latest).await.unwrap();
        assert_eq!(manifests.tags().await.unwrap(), ["v1.0", "v1.1"]);
        assert!(manifests.get_by_digest(&latest).await.is_err());
    }

    #[tokio::test]
    async fn root_option_prefixes_paths() {
        let driver = Arc::new(MemoryDriver::new());
        let mut options = Options::new();
        options.insert(ROOT_OPTION.into(), json!("/registry/v2/"));

        let manifests = storage_manifest_service(ManifestServiceArgs {
            name: RepositoryName::new("library/ubuntu").unwrap(),
            options,
            driver: driver.clone(),
        })
        .unwrap();
        manifests
            .put(&SignedManifest::new(sample("library/ubuntu", "latest")))
            .await
            .unwrap();

        let stored = driver
            .list(Utf8Path::new("registry/v2/repositories/library/ubuntu"))
            .await
            .unwrap();
        assert_eq!(stored.len(), 2);
    }

    #[test]
    fn root_option_must_be_a_string() {
        let mut options = Options::new();
        options.insert(ROOT_OPTION.into(), json!(42));

        let error = storage_manifest_service(ManifestServiceArgs {
            name: RepositoryName::new("library/ubuntu").unwrap(),
            options,
            driver: Arc::new(MemoryDriver::new()),
        })
        .unwrap_err();
        assert_eq!(error.to_string(), "option \"root\" must be a string, got 42");
    }
}
