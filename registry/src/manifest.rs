//! Image manifests and their content addresses.
//!
//! A [`SignedManifest`] keeps the exact bytes it was parsed from: those bytes
//! carry the signature, so they are what gets written back out. The
//! structured [`Manifest`] is a parsed view used for validation and for
//! computing the manifest's [`Digest`].
//!
//! The digest is computed over a canonical encoding of the manifest's
//! fields, declared per schema version, and not over the raw bytes. Two
//! payloads that differ only in key order or whitespace share a digest.

use bytes::Bytes;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Value, json};

use crate::digest::Digest;
use crate::names::{NameError, validate_repository_name, validate_tag};

/// The only schema version with a declared canonical form.
pub const SCHEMA_V1: i64 = 1;

/// Errors from decoding, encoding or digesting a manifest.
#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    /// The payload could not be decoded into a manifest.
    #[error("malformed manifest: {0}")]
    Malformed(#[source] serde_json::Error),

    /// The structured fields could not be encoded.
    #[error("manifest could not be encoded: {0}")]
    Encode(#[source] serde_json::Error),

    /// The manifest could not be reduced to its canonical form.
    #[error("computing manifest digest: {0}")]
    Digest(#[from] DigestComputationError),

    /// The manifest's name or tag violates the naming grammar.
    #[error("invalid manifest: {0}")]
    Invalid(#[from] NameError),
}

/// Reasons a manifest has no canonical form to hash.
#[derive(Debug, thiserror::Error)]
pub enum DigestComputationError {
    /// No canonical encoding is declared for this schema version.
    #[error("schema version {0} has no canonical form")]
    UnsupportedSchema(i64),

    /// The canonical value could not be serialized.
    #[error("canonical encoding failed: {0}")]
    Encode(#[source] serde_json::Error),
}

/// Just the schema version of a manifest.
///
/// Untrusted content can be decoded against this first to find out which
/// manifest shape to expect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Versioned {
    /// The image manifest schema this payload follows.
    #[serde(rename = "schemaVersion")]
    pub schema_version: i64,
}

impl Versioned {
    /// Decode only the schema version from `bytes`.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, ManifestError> {
        serde_json::from_slice(bytes).map_err(ManifestError::Malformed)
    }
}

/// Reference to a filesystem layer blob.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FsLayer {
    /// Digest of the referenced layer.
    #[serde(rename = "blobSum")]
    pub blob_sum: Digest,
}

/// Unstructured v1 compatibility information.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct History {
    /// The raw v1 compatibility string.
    #[serde(rename = "v1Compatibility")]
    pub v1_compatibility: String,
}

/// The structured fields of an image manifest.
///
/// `fs_layers` and `history` are ordered outermost to innermost, and that
/// order is part of the manifest's identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    /// Schema version discriminator.
    #[serde(rename = "schemaVersion", default)]
    pub schema_version: i64,

    /// Repository name, validated separately by [`Manifest::validate`].
    #[serde(default)]
    pub name: String,

    /// Tag of the image.
    #[serde(default)]
    pub tag: String,

    /// Host architecture the image is intended to run on.
    #[serde(default)]
    pub architecture: String,

    /// Filesystem layers making up the image.
    #[serde(rename = "fsLayers", default, deserialize_with = "null_as_empty")]
    pub fs_layers: Vec<FsLayer>,

    /// v1 compatibility history, one entry per layer.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub history: Vec<History>,
}

// Unsigned manifests written by other registries encode empty lists as `null`.
fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

impl Manifest {
    /// Check the name and tag against the naming grammar.
    pub fn validate(&self) -> Result<(), NameError> {
        validate_repository_name(&self.name)?;
        validate_tag(&self.tag)
    }

    /// The canonical byte encoding that the digest is computed over.
    pub fn canonical_bytes(&self) -> Result<Vec<u8>, DigestComputationError> {
        let canonical = match self.schema_version {
            SCHEMA_V1 => self.canonical_v1(),
            other => return Err(DigestComputationError::UnsupportedSchema(other)),
        };
        serde_json::to_vec(&canonical).map_err(DigestComputationError::Encode)
    }

    /// Compute the content address of this manifest.
    pub fn digest(&self) -> Result<Digest, ManifestError> {
        Ok(Digest::sha256(&self.canonical_bytes()?))
    }

    // Keys are listed in sorted order, so the encoding is the same whether or
    // not serde_json preserves insertion order.
    fn canonical_v1(&self) -> Value {
        let fs_layers: Vec<Value> = self
            .fs_layers
            .iter()
            .map(|layer| json!({ "blobSum": layer.blob_sum.as_str() }))
            .collect();

        let history: Vec<Value> = self
            .history
            .iter()
            .map(|entry| json!({ "v1Compatibility": entry.v1_compatibility }))
            .collect();

        json!({
            "architecture": self.architecture,
            "fsLayers": fs_layers,
            "history": history,
            "name": self.name,
            "schemaVersion": self.schema_version,
            "tag": self.tag,
        })
    }
}

/// A manifest together with the exact bytes it was parsed from.
///
/// When raw bytes are present they are authoritative: [`SignedManifest::to_bytes`]
/// returns them verbatim. Editing the structured fields through
/// [`SignedManifest::manifest_mut`] discards them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedManifest {
    manifest: Manifest,
    raw: Option<Bytes>,
}

impl SignedManifest {
    /// Wrap a programmatically built manifest. It has no raw bytes.
    pub fn new(manifest: Manifest) -> Self {
        Self {
            manifest,
            raw: None,
        }
    }

    /// Parse a manifest, keeping a copy of `bytes` as the raw payload.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, ManifestError> {
        Self::from_bytes(Bytes::copy_from_slice(bytes))
    }

    /// Parse a manifest, keeping `bytes` as the raw payload.
    pub fn from_bytes(bytes: Bytes) -> Result<Self, ManifestError> {
        let manifest = serde_json::from_slice(&bytes).map_err(ManifestError::Malformed)?;
        Ok(Self {
            manifest,
            raw: Some(bytes),
        })
    }

    /// The structured view of the manifest.
    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    /// Mutable access to the structured fields.
    ///
    /// The raw payload no longer matches once the fields change, so it is
    /// dropped; the manifest will be re-encoded from its fields.
    pub fn manifest_mut(&mut self) -> &mut Manifest {
        self.raw = None;
        &mut self.manifest
    }

    /// Unwrap the structured view.
    pub fn into_manifest(self) -> Manifest {
        self.manifest
    }

    /// The raw payload, if this manifest was parsed from bytes.
    pub fn raw(&self) -> Option<&Bytes> {
        self.raw.as_ref().filter(|raw| !raw.is_empty())
    }

    /// Serialize the manifest.
    ///
    /// Returns the raw payload verbatim when present, otherwise the JSON
    /// encoding of the structured fields.
    pub fn to_bytes(&self) -> Result<Bytes, ManifestError> {
        match self.raw() {
            Some(raw) => Ok(raw.clone()),
            None => serde_json::to_vec(&self.manifest)
                .map(Bytes::from)
                .map_err(ManifestError::Encode),
        }
    }

    /// The content address of the structured fields.
    pub fn digest(&self) -> Result<Digest, ManifestError> {
        self.manifest.digest()
    }
}

impl From<Manifest> for SignedManifest {
    fn from(manifest: Manifest) -> Self {
        SignedManifest::new(manifest)
    }
}

impl std::ops::Deref for SignedManifest {
    type Target = Manifest;

    fn deref(&self) -> &Self::Target {
        &self.manifest
    }
}
