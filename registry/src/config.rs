//! Registry configuration.
//!
//! ```toml
//! [manifests]
//! name = "storage"
//! options = { root = "registry/v2" }
//!
//! [[middleware.registry]]
//! name = "audit"
//!
//! [[middleware.repository]]
//! name = "readonly"
//! options = { message = "maintenance" }
//! ```

use serde::{Deserialize, Serialize};

use crate::handlers::Options;
use crate::storage::STORAGE_HANDLER;

/// Errors from loading or applying configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The configuration text is not valid TOML for [`RegistryConfig`].
    #[error("parsing registry configuration: {0}")]
    Parse(#[from] toml::de::Error),

    /// The registry was built without a storage driver.
    #[error("registry requires a storage driver")]
    MissingDriver,
}

/// Selects an extension by name and passes it options.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct HandlerConfig {
    /// Registered name of the extension.
    pub name: String,

    /// Extension-specific options.
    #[serde(default)]
    pub options: Options,
}

impl HandlerConfig {
    /// Select `name` with no options.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            options: Options::new(),
        }
    }

    /// Add an option.
    pub fn option(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }
}

impl Default for HandlerConfig {
    fn default() -> Self {
        Self::new(STORAGE_HANDLER)
    }
}

/// Middleware chains, applied in the listed order.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct MiddlewareConfig {
    /// Wrappers around the registry.
    #[serde(default)]
    pub registry: Vec<HandlerConfig>,

    /// Wrappers around each repository.
    #[serde(default)]
    pub repository: Vec<HandlerConfig>,
}

/// Configuration of the registry's storage core.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct RegistryConfig {
    /// Manifest handler; defaults to the driver-backed handler.
    #[serde(default)]
    pub manifests: HandlerConfig,

    /// Middleware chains.
    #[serde(default)]
    pub middleware: MiddlewareConfig,
}

impl RegistryConfig {
    /// Parse configuration from TOML text.
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn empty_config_uses_defaults() {
        let config = RegistryConfig::from_toml("").unwrap();
        assert_eq!(config, RegistryConfig::default());
        assert_eq!(config.manifests.name, "storage");
        assert!(config.middleware.registry.is_empty());
    }

    #[test]
    fn full_config() {
        let config = RegistryConfig::from_toml(
            r#"
            [manifests]
            name = "inmemory"
            options = { root = "registry/v2", shards = 4 }

            [[middleware.registry]]
            name = "audit"

            [[middleware.repository]]
            name = "readonly"
            options = { message = "maintenance" }

            [[middleware.repository]]
            name = "mirror"
            "#,
        )
        .unwrap();

        assert_eq!(
            config.manifests,
            HandlerConfig::new("inmemory")
                .option("root", "registry/v2")
                .option("shards", 4)
        );
        assert_eq!(config.middleware.registry, [HandlerConfig::new("audit")]);
        assert_eq!(
            config.middleware.repository,
            [
                HandlerConfig::new("readonly").option("message", json!("maintenance")),
                HandlerConfig::new("mirror"),
            ]
        );
    }

    #[test]
    fn middleware_requires_a_name() {
        let error = RegistryConfig::from_toml(
            r#"
            [[middleware.registry]]
            options = {}
            "#,
        )
        .unwrap_err();
        assert!(matches!(error, ConfigError::Parse(_)));
    }
}
