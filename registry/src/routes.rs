//! Names of the v2 API routes.
//!
//! The routing layer registers its paths under these names; the storage
//! core only needs to agree on them.

use std::{fmt, str::FromStr};

/// A named v2 API route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RouteName {
    /// `/v2/`, the API version check.
    Base,
    /// Manifests addressed by tag.
    Manifest,
    /// Manifests addressed by digest.
    ManifestDigest,
    /// Tag listing of a repository.
    Tags,
    /// A single blob.
    Blob,
    /// Starting a blob upload.
    BlobUpload,
    /// A chunk of an in-progress blob upload.
    BlobUploadChunk,
}

/// A string did not name a known route.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown route name: {0}")]
pub struct UnknownRoute(pub String);

impl RouteName {
    /// Every route except [`RouteName::Base`].
    pub const ENDPOINTS: [RouteName; 6] = [
        RouteName::Manifest,
        RouteName::ManifestDigest,
        RouteName::Tags,
        RouteName::Blob,
        RouteName::BlobUpload,
        RouteName::BlobUploadChunk,
    ];

    /// The registered name of this route.
    pub fn as_str(&self) -> &'static str {
        match self {
            RouteName::Base => "base",
            RouteName::Manifest => "manifest",
            RouteName::ManifestDigest => "manifest-digest",
            RouteName::Tags => "tags",
            RouteName::Blob => "blob",
            RouteName::BlobUpload => "blob-upload",
            RouteName::BlobUploadChunk => "blob-upload-chunk",
        }
    }
}

impl fmt::Display for RouteName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RouteName {
    type Err = UnknownRoute;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        std::iter::once(RouteName::Base)
            .chain(RouteName::ENDPOINTS)
            .find(|route| route.as_str() == s)
            .ok_or_else(|| UnknownRoute(s.to_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_parse_back() {
        for route in std::iter::once(RouteName::Base).chain(RouteName::ENDPOINTS) {
            assert_eq!(route.to_string().parse::<RouteName>(), Ok(route));
        }
        assert_eq!(
            "catalog".parse::<RouteName>(),
            Err(UnknownRoute("catalog".into()))
        );
    }

    #[test]
    fn endpoints_exclude_base() {
        assert!(!RouteName::ENDPOINTS.contains(&RouteName::Base));
        assert_eq!(RouteName::BlobUploadChunk.as_str(), "blob-upload-chunk");
    }
}
