//! Error types for the registry

use crate::config::ConfigError;
use crate::digest::{Digest, DigestError};
use crate::extension::ExtensionError;
use crate::manifest::ManifestError;
use crate::names::NameError;

/// Result type for registry operations
pub type RegistryResult<T> = Result<T, RegistryError>;

/// Error types for registry operations
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// Repository name or tag violates the naming grammar
    #[error("invalid name: {0}")]
    Name(#[from] NameError),

    /// Manifest could not be decoded, validated or digested
    #[error(transparent)]
    Manifest(#[from] ManifestError),

    /// Invalid digest format
    #[error("invalid digest: {0}")]
    Digest(#[from] DigestError),

    /// Registering or resolving a backend failed
    #[error(transparent)]
    Extension(#[from] ExtensionError),

    /// Registry configuration is unusable
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Storage error
    #[error("storage error: {0}")]
    Storage(#[from] storage_driver::StorageError),

    /// Manifest not found
    #[error("manifest unknown: {name}@{reference}")]
    ManifestUnknown {
        /// Repository name
        name: String,
        /// Tag or digest which was requested
        reference: String,
    },

    /// Manifest names a different repository than the one it is pushed to
    #[error("manifest name {actual} does not match repository {expected}")]
    NameMismatch {
        /// Repository the manifest was pushed to
        expected: String,
        /// Name carried by the manifest
        actual: String,
    },

    /// Stored content does not hash to its address
    #[error("digest mismatch: expected {expected}, got {actual}")]
    DigestMismatch {
        /// Expected digest
        expected: Digest,
        /// Actual digest
        actual: Digest,
    },

    /// The operation is not supported by this backend
    #[error("unsupported operation: {0}")]
    Unsupported(String),
}

impl RegistryError {
    /// Get the distribution error code for this error
    pub fn error_code(&self) -> &'static str {
        match self {
            RegistryError::Name(NameError::TagInvalid) => "TAG_INVALID",
            RegistryError::Name(_) => "NAME_INVALID",
            RegistryError::Manifest(ManifestError::Invalid(NameError::TagInvalid)) => {
                "TAG_INVALID"
            }
            RegistryError::Manifest(ManifestError::Invalid(_)) => "NAME_INVALID",
            RegistryError::Manifest(ManifestError::Malformed(_))
            | RegistryError::NameMismatch { .. } => "MANIFEST_INVALID",
            RegistryError::Digest(_) | RegistryError::DigestMismatch { .. } => "DIGEST_INVALID",
            RegistryError::ManifestUnknown { .. } => "MANIFEST_UNKNOWN",
            RegistryError::Unsupported(_) => "UNSUPPORTED",
            RegistryError::Manifest(ManifestError::Encode(_) | ManifestError::Digest(_))
            | RegistryError::Extension(_)
            | RegistryError::Config(_)
            | RegistryError::Storage(_) => "UNKNOWN",
        }
    }

    /// Whether the caller can fix this error by changing its input
    pub fn is_client_fault(&self) -> bool {
        match self {
            RegistryError::Name(_)
            | RegistryError::Digest(_)
            | RegistryError::ManifestUnknown { .. }
            | RegistryError::NameMismatch { .. }
            | RegistryError::Unsupported(_)
            | RegistryError::Manifest(ManifestError::Malformed(_) | ManifestError::Invalid(_)) => {
                true
            }
            RegistryError::Storage(error) => error.kind().is_client_fault(),
            RegistryError::Manifest(ManifestError::Encode(_) | ManifestError::Digest(_))
            | RegistryError::Extension(_)
            | RegistryError::Config(_)
            | RegistryError::DigestMismatch { .. } => false,
        }
    }
}
