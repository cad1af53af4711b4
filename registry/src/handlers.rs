//! The registry's three extension points.
//!
//! * manifest handlers build a [`ManifestService`] for a repository from a
//!   storage driver,
//! * registry middleware wraps a [`Registry`],
//! * repository middleware wraps a [`Repository`].
//!
//! All three are [`ExtensionRegistry`] instances, bundled into
//! [`Extensions`] so the storage layer receives them explicitly.

use std::sync::Arc;

use storage_driver::Driver;

use crate::extension::{ExtensionError, ExtensionRegistry, Factory};
use crate::names::RepositoryName;
use crate::service::{ManifestService, Registry, Repository};

/// Backend-specific configuration options.
pub type Options = serde_json::Map<String, serde_json::Value>;

/// Arguments to a manifest handler factory.
#[derive(Debug, Clone)]
pub struct ManifestServiceArgs {
    /// Repository the service is bound to.
    pub name: RepositoryName,
    /// Handler options from configuration.
    pub options: Options,
    /// Storage driver the service may use.
    pub driver: Arc<dyn Driver>,
}

/// Arguments to a registry middleware factory.
#[derive(Debug, Clone)]
pub struct RegistryMiddlewareArgs {
    /// The registry being wrapped.
    pub registry: Arc<dyn Registry>,
    /// Middleware options from configuration.
    pub options: Options,
}

/// Arguments to a repository middleware factory.
#[derive(Debug, Clone)]
pub struct RepositoryMiddlewareArgs {
    /// The repository being wrapped.
    pub repository: Arc<dyn Repository>,
    /// Middleware options from configuration.
    pub options: Options,
}

/// Manifest handler factories, keyed by backend name.
pub type ManifestHandlers = ExtensionRegistry<ManifestServiceArgs, Arc<dyn ManifestService>>;

/// Registry middleware factories, keyed by name.
pub type RegistryMiddleware = ExtensionRegistry<RegistryMiddlewareArgs, Arc<dyn Registry>>;

/// Repository middleware factories, keyed by name.
pub type RepositoryMiddleware = ExtensionRegistry<RepositoryMiddlewareArgs, Arc<dyn Repository>>;

impl ExtensionRegistry<ManifestServiceArgs, Arc<dyn ManifestService>> {
    /// Resolve the handler `name` and bind it to `options` and `driver`.
    ///
    /// Fails early with `UnknownBackend`, before any repository is opened.
    pub fn creator(
        &self,
        name: &str,
        options: Options,
        driver: Arc<dyn Driver>,
    ) -> Result<ManifestServiceCreator, ExtensionError> {
        let factory = self.get(name)?;
        Ok(ManifestServiceCreator {
            kind: self.kind(),
            handler: name.to_owned(),
            options,
            driver,
            factory,
        })
    }
}

/// A manifest handler bound to its options and storage driver, ready to
/// construct one service per repository.
#[derive(Clone)]
pub struct ManifestServiceCreator {
    kind: &'static str,
    handler: String,
    options: Options,
    driver: Arc<dyn Driver>,
    factory: Arc<Factory<ManifestServiceArgs, Arc<dyn ManifestService>>>,
}

impl std::fmt::Debug for ManifestServiceCreator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManifestServiceCreator")
            .field("handler", &self.handler)
            .field("options", &self.options)
            .field("driver", &self.driver.name())
            .finish()
    }
}

impl ManifestServiceCreator {
    /// Name of the bound handler.
    pub fn handler(&self) -> &str {
        &self.handler
    }

    /// Construct a manifest service for the repository `name`.
    pub fn create_manifest_service(
        &self,
        name: &RepositoryName,
    ) -> Result<Arc<dyn ManifestService>, ExtensionError> {
        (self.factory)(ManifestServiceArgs {
            name: name.clone(),
            options: self.options.clone(),
            driver: self.driver.clone(),
        })
        .map_err(|source| ExtensionError::Initialization {
            kind: self.kind,
            name: self.handler.clone(),
            source,
        })
    }
}

/// Every extension point of the registry.
///
/// Backends register into this before the registry is built; the
/// [`RegistryBuilder`](crate::RegistryBuilder) resolves names against it.
#[derive(Debug)]
pub struct Extensions {
    /// Manifest handlers.
    pub manifests: ManifestHandlers,
    /// Registry middleware.
    pub registry: RegistryMiddleware,
    /// Repository middleware.
    pub repository: RepositoryMiddleware,
}

impl Default for Extensions {
    fn default() -> Self {
        Self::new()
    }
}

impl Extensions {
    /// Empty extension points.
    pub fn new() -> Self {
        Self {
            manifests: ExtensionRegistry::new("manifest"),
            registry: ExtensionRegistry::new("registry"),
            repository: ExtensionRegistry::new("repository"),
        }
    }

    /// Extension points with the built-in driver-backed manifest handler
    /// registered under [`STORAGE_HANDLER`](crate::storage::STORAGE_HANDLER).
    pub fn with_defaults() -> Self {
        let extensions = Self::new();
        extensions
            .manifests
            .register(
                crate::storage::STORAGE_HANDLER,
                crate::storage::storage_manifest_service,
            )
            .expect("fresh manifest handler table has no entries");
        extensions
    }
}
