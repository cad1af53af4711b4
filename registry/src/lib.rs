//! # Registry storage core
//!
//! The parts of a container registry that every storage backend relies on:
//!
//! - [`names`]: the repository naming grammar
//! - [`manifest`]: image manifests, their signed envelope, and their
//!   canonical content address
//! - [`extension`]: named-factory tables, instantiated in [`handlers`] for
//!   manifest services, registry middleware and repository middleware
//! - [`RegistryBuilder`]: wires a storage driver, the extension points and
//!   [`RegistryConfig`] into a [`Registry`]
//!
//! ## Example
//!
//! ```
//! use registry_core::{RegistryBuilder, RepositoryName, SignedManifest};
//! use storage_driver::MemoryDriver;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let registry = RegistryBuilder::new().driver(MemoryDriver::new()).build()?;
//!
//! let name: RepositoryName = "library/ubuntu".parse()?;
//! let repository = registry.repository(&name)?;
//!
//! let payload = br#"{"schemaVersion": 1, "name": "library/ubuntu", "tag": "latest",
//!     "architecture": "amd64", "fsLayers": [], "history": []}"#;
//! let manifest = SignedManifest::from_slice(payload)?;
//! let digest = repository.manifests().put(&manifest).await?;
//! assert_eq!(digest, manifest.digest()?);
//! # Ok(())
//! # }
//! ```

mod builder;
pub mod config;
pub mod digest;
mod error;
pub mod extension;
pub mod handlers;
pub mod manifest;
pub mod names;
pub mod routes;
mod service;
pub mod storage;

pub use builder::RegistryBuilder;
pub use config::RegistryConfig;
pub use digest::Digest;
pub use error::{RegistryError, RegistryResult};
pub use extension::{ExtensionError, ExtensionRegistry};
pub use handlers::{Extensions, Options};
pub use manifest::{Manifest, SignedManifest};
pub use names::{RepositoryName, validate_repository_name};
pub use service::{ManifestService, Registry, Repository};
