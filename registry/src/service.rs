//! Contracts for the services produced by the extension points.

use std::fmt;
use std::sync::Arc;

use crate::digest::Digest;
use crate::error::RegistryResult;
use crate::manifest::SignedManifest;
use crate::names::RepositoryName;

/// Stores and retrieves the manifests of one repository.
#[async_trait::async_trait]
pub trait ManifestService: fmt::Debug + Send + Sync {
    /// Whether `tag` currently points at a manifest.
    async fn exists(&self, tag: &str) -> RegistryResult<bool>;

    /// Fetch the manifest `tag` points at.
    async fn get(&self, tag: &str) -> RegistryResult<SignedManifest>;

    /// Fetch a manifest by its content address.
    async fn get_by_digest(&self, digest: &Digest) -> RegistryResult<SignedManifest>;

    /// Store a manifest and point its tag at it, returning its digest.
    async fn put(&self, manifest: &SignedManifest) -> RegistryResult<Digest>;

    /// Delete a manifest and every tag pointing at it.
    async fn delete(&self, digest: &Digest) -> RegistryResult<()>;

    /// Tags currently present in the repository, sorted.
    async fn tags(&self) -> RegistryResult<Vec<String>>;
}

/// A single named repository.
pub trait Repository: fmt::Debug + Send + Sync {
    /// The repository's name.
    fn name(&self) -> &RepositoryName;

    /// The manifest service bound to this repository.
    fn manifests(&self) -> Arc<dyn ManifestService>;
}

/// Entry point to the repositories of a registry.
pub trait Registry: fmt::Debug + Send + Sync {
    /// Open the repository called `name`.
    fn repository(&self, name: &RepositoryName) -> RegistryResult<Arc<dyn Repository>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    static_assertions::assert_obj_safe!(ManifestService, Repository, Registry);
}
