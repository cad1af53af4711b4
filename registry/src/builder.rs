//! Registry builder

use std::sync::Arc;

use storage_driver::Driver;

use crate::config::{ConfigError, RegistryConfig};
use crate::error::RegistryResult;
use crate::handlers::{Extensions, RegistryMiddlewareArgs};
use crate::service::Registry;
use crate::storage::StorageRegistry;

/// Registry builder for wiring a storage driver, the extension points and
/// configuration into a [`Registry`].
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    driver: Option<Arc<dyn Driver>>,
    extensions: Option<Arc<Extensions>>,
    config: RegistryConfig,
}

impl RegistryBuilder {
    /// Create a new registry builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the storage driver handed to the manifest handler
    pub fn driver<D>(mut self, driver: D) -> Self
    where
        D: Driver + 'static,
    {
        self.driver = Some(Arc::new(driver));
        self
    }

    /// Set the extension points to resolve handler names against
    ///
    /// Defaults to [`Extensions::with_defaults`].
    pub fn extensions(mut self, extensions: Arc<Extensions>) -> Self {
        self.extensions = Some(extensions);
        self
    }

    /// Set the configuration
    pub fn config(mut self, config: RegistryConfig) -> Self {
        self.config = config;
        self
    }

    /// Build the registry
    ///
    /// Resolves the manifest handler, then wraps the base registry with each
    /// configured registry middleware in order. Unknown handler names fail
    /// here rather than on first use.
    #[tracing::instrument(skip(self), fields(manifests = %self.config.manifests.name))]
    pub fn build(self) -> RegistryResult<Arc<dyn Registry>> {
        let driver = self.driver.ok_or(ConfigError::MissingDriver)?;
        let extensions = self
            .extensions
            .unwrap_or_else(|| Arc::new(Extensions::with_defaults()));
        let config = self.config;

        for middleware in &config.middleware.repository {
            extensions.repository.get(&middleware.name)?;
        }

        let manifests = extensions.manifests.creator(
            &config.manifests.name,
            config.manifests.options.clone(),
            driver,
        )?;

        let base: Arc<dyn Registry> = Arc::new(StorageRegistry::new(
            manifests,
            extensions.clone(),
            config.middleware.repository.clone(),
        ));

        let registry = config
            .middleware
            .registry
            .iter()
            .try_fold(base, |registry, middleware| {
                tracing::debug!(middleware = %middleware.name, "applying registry middleware");
                extensions.registry.lookup(
                    &middleware.name,
                    RegistryMiddlewareArgs {
                        registry,
                        options: middleware.options.clone(),
                    },
                )
            })?;

        tracing::info!(
            registry_middleware = config.middleware.registry.len(),
            repository_middleware = config.middleware.repository.len(),
            "registry ready"
        );
        Ok(registry)
    }
}

#[cfg(test)]
mod tests {
    use storage_driver::MemoryDriver;

    use super::*;
    use crate::config::HandlerConfig;
    use crate::error::RegistryError;
    use crate::extension::ExtensionError;
    use crate::names::RepositoryName;

    #[test]
    fn test_builder() {
        let registry = RegistryBuilder::new()
            .driver(MemoryDriver::new())
            .build()
            .unwrap();

        let name = RepositoryName::new("library/ubuntu").unwrap();
        let repository = registry.repository(&name).unwrap();
        assert_eq!(repository.name(), &name);
    }

    #[test]
    fn missing_driver() {
        let error = RegistryBuilder::new().build().unwrap_err();
        assert!(matches!(
            error,
            RegistryError::Config(ConfigError::MissingDriver)
        ));
    }

    #[test]
    fn unknown_handlers_fail_the_build() {
        let mut config = RegistryConfig::default();
        config.manifests = HandlerConfig::new("s3");
        let error = RegistryBuilder::new()
            .driver(MemoryDriver::new())
            .config(config)
            .build()
            .unwrap_err();
        assert!(matches!(
            error,
            RegistryError::Extension(ExtensionError::UnknownBackend { kind: "manifest", .. })
        ));

        let mut config = RegistryConfig::default();
        config.middleware.repository.push(HandlerConfig::new("readonly"));
        let error = RegistryBuilder::new()
            .driver(MemoryDriver::new())
            .config(config)
            .build()
            .unwrap_err();
        assert!(matches!(
            error,
            RegistryError::Extension(ExtensionError::UnknownBackend { kind: "repository", .. })
        ));

        let mut config = RegistryConfig::default();
        config.middleware.registry.push(HandlerConfig::new("audit"));
        let error = RegistryBuilder::new()
            .driver(MemoryDriver::new())
            .config(config)
            .build()
            .unwrap_err();
        assert!(matches!(
            error,
            RegistryError::Extension(ExtensionError::UnknownBackend { kind: "registry", .. })
        ));
    }
}
