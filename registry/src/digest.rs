//! Content addresses.

use std::{fmt, str::FromStr, sync::LazyLock};

use regex::Regex;
use serde::{Deserialize, Serialize};
use sha2::{Digest as _, Sha256};

/// The canonical digest algorithm.
pub const SHA256: &str = "sha256";

static DIGEST: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new("^[a-z0-9]+(?:[.+_-][a-z0-9]+)*:[a-zA-Z0-9=_-]+$")
        .expect("digest grammar is a valid regex")
});

/// Errors from parsing or checking a digest string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DigestError {
    /// The string is not of the form `algorithm:encoded`.
    #[error("invalid digest format: {0:?}")]
    Format(String),

    /// A `sha256` digest whose encoded part is not 64 lowercase hex characters.
    #[error("invalid sha256 digest: {0:?}")]
    Sha256(String),

    /// The digest uses an algorithm that cannot be recomputed here.
    #[error("unsupported digest algorithm: {0}")]
    UnsupportedAlgorithm(String),
}

/// An algorithm-qualified content hash, e.g. `sha256:<hex>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Digest(String);

impl Digest {
    /// Compute the `sha256` digest of `data`.
    pub fn sha256(data: &[u8]) -> Self {
        Digest(format!("{SHA256}:{}", hex::encode(Sha256::digest(data))))
    }

    /// Parse and validate a digest string.
    pub fn parse(value: impl Into<String>) -> Result<Self, DigestError> {
        let value = value.into();
        if !DIGEST.is_match(&value) {
            return Err(DigestError::Format(value));
        }

        let digest = Digest(value);
        if digest.algorithm() == SHA256 {
            let encoded = digest.encoded();
            let is_hex = encoded
                .bytes()
                .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b));
            if encoded.len() != 64 || !is_hex {
                return Err(DigestError::Sha256(digest.0));
            }
        }

        Ok(digest)
    }

    /// The algorithm part, e.g. `sha256`.
    pub fn algorithm(&self) -> &str {
        self.split().0
    }

    /// The encoded hash part, after the `:`.
    pub fn encoded(&self) -> &str {
        self.split().1
    }

    /// The full digest string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Check that `data` hashes to this digest.
    pub fn verify(&self, data: &[u8]) -> Result<bool, DigestError> {
        match self.algorithm() {
            SHA256 => Ok(*self == Digest::sha256(data)),
            other => Err(DigestError::UnsupportedAlgorithm(other.to_owned())),
        }
    }

    fn split(&self) -> (&str, &str) {
        // Validated on construction, so the separator is always present.
        self.0.split_once(':').unwrap_or((&self.0, ""))
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Digest {
    type Err = DigestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Digest::parse(s)
    }
}

impl TryFrom<String> for Digest {
    type Error = DigestError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Digest::parse(value)
    }
}

impl From<Digest> for String {
    fn from(value: Digest) -> Self {
        value.0
    }
}
