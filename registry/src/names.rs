//! Repository and tag naming rules.
//!
//! A repository name is a namespace of one to five `/`-separated
//! components:
//!
//! ```text
//! alpha-numeric := /[a-z0-9]+/
//! separator     := /[._-]/
//! component     := alpha-numeric [separator alpha-numeric]*
//! namespace     := component ['/' component]*
//! ```
//!
//! Every component is at least two characters long, and the whole name is
//! at most 255 characters.

use std::{fmt, str::FromStr, sync::LazyLock};

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Minimum number of characters in a single component.
pub const COMPONENT_MIN_LENGTH: usize = 2;

/// Minimum number of components in a repository name.
pub const MIN_COMPONENTS: usize = 1;

/// Maximum number of components in a repository name.
pub const MAX_COMPONENTS: usize = 5;

/// Maximum total length of a repository name.
pub const TOTAL_LENGTH_MAX: usize = 255;

/// Unanchored grammar for a single repository name component.
pub const COMPONENT_PATTERN: &str = "[a-z0-9]+(?:[._-][a-z0-9]+)*";

static COMPONENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!("^{COMPONENT_PATTERN}$")).expect("component grammar is a valid regex")
});

static TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new("^[A-Za-z0-9_][A-Za-z0-9_.-]{0,127}$").expect("tag grammar is a valid regex")
});

/// Ways a repository name or tag can violate the naming grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum NameError {
    /// The name is longer than [`TOTAL_LENGTH_MAX`].
    #[error("repository name must not be more than 255 characters")]
    TooLong,

    /// The name has fewer than [`MIN_COMPONENTS`] components.
    #[error("repository name must have at least 1 components")]
    MissingComponents,

    /// The name has more than [`MAX_COMPONENTS`] components.
    #[error("repository name must have 5 or less components")]
    TooManyComponents,

    /// A component is shorter than [`COMPONENT_MIN_LENGTH`].
    #[error("repository name component must be 2 or more characters")]
    ComponentShort,

    /// A component does not match [`COMPONENT_PATTERN`].
    #[error("repository name component must match \"[a-z0-9]+(?:[._-][a-z0-9]+)*\"")]
    ComponentInvalid,

    /// A tag does not match the tag grammar.
    #[error("tag must match \"[\\w][\\w.-]{{0,127}}\"")]
    TagInvalid,
}

/// Check `name` against the repository naming grammar.
///
/// Checks run in a fixed order and stop at the first failure: total length,
/// component count, then each component's length and shape.
pub fn validate_repository_name(name: &str) -> Result<(), NameError> {
    if name.len() > TOTAL_LENGTH_MAX {
        return Err(NameError::TooLong);
    }

    let components: Vec<&str> = name.split('/').collect();

    if components.len() < MIN_COMPONENTS {
        return Err(NameError::MissingComponents);
    }

    if components.len() > MAX_COMPONENTS {
        return Err(NameError::TooManyComponents);
    }

    for component in components {
        if component.len() < COMPONENT_MIN_LENGTH {
            return Err(NameError::ComponentShort);
        }

        if !COMPONENT.is_match(component) {
            return Err(NameError::ComponentInvalid);
        }
    }

    Ok(())
}

/// Check `tag` against the tag grammar `[\w][\w.-]{0,127}`.
pub fn validate_tag(tag: &str) -> Result<(), NameError> {
    if TAG.is_match(tag) {
        Ok(())
    } else {
        Err(NameError::TagInvalid)
    }
}

/// A repository name which has passed [`validate_repository_name`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RepositoryName(String);

impl RepositoryName {
    /// Validate and wrap a repository name.
    pub fn new(name: impl Into<String>) -> Result<Self, NameError> {
        let name = name.into();
        validate_repository_name(&name)?;
        Ok(Self(name))
    }

    /// The name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The `/`-separated components of the name.
    pub fn components(&self) -> impl Iterator<Item = &str> + '_ {
        self.0.split('/')
    }
}

impl fmt::Display for RepositoryName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for RepositoryName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for RepositoryName {
    type Err = NameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for RepositoryName {
    type Error = NameError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<RepositoryName> for String {
    fn from(value: RepositoryName) -> Self {
        value.0
    }
}

impl PartialEq<str> for RepositoryName {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for RepositoryName {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_names() {
        for name in [
            "library/ubuntu",
            "ubuntu",
            "foo.bar/baz_qux",
            "a0/b1/c2/d3/e4",
            "registry-1/team/image",
            "00",
        ] {
            assert_eq!(validate_repository_name(name), Ok(()), "{name}");
        }
    }

    #[test]
    fn too_long() {
        let name = "a".repeat(TOTAL_LENGTH_MAX + 1);
        assert_eq!(validate_repository_name(&name), Err(NameError::TooLong));

        let name = "a".repeat(TOTAL_LENGTH_MAX);
        assert_eq!(validate_repository_name(&name), Ok(()));
    }

    #[test]
    fn too_many_components() {
        assert_eq!(
            validate_repository_name("a/b/c/d/e/f"),
            Err(NameError::TooManyComponents)
        );
        assert_eq!(
            validate_repository_name("aa/bb/cc/dd/ee/ff"),
            Err(NameError::TooManyComponents)
        );
    }

    #[test]
    fn short_components() {
        assert_eq!(validate_repository_name("a"), Err(NameError::ComponentShort));
        assert_eq!(validate_repository_name(""), Err(NameError::ComponentShort));
        assert_eq!(
            validate_repository_name("library/"),
            Err(NameError::ComponentShort)
        );
        assert_eq!(
            validate_repository_name("library//ubuntu"),
            Err(NameError::ComponentShort)
        );
    }

    #[test]
    fn invalid_components() {
        for name in [
            "UP/ubuntu",
            "library/Ubuntu",
            "foo..bar",
            "foo__bar",
            "-foo",
            "foo-",
            "foo.-bar",
            "foo bar",
            "ubuntu:latest",
        ] {
            assert_eq!(
                validate_repository_name(name),
                Err(NameError::ComponentInvalid),
                "{name}"
            );
        }
    }

    #[test]
    fn length_is_checked_before_components() {
        let name = format!("{}/a", "A".repeat(TOTAL_LENGTH_MAX));
        assert_eq!(validate_repository_name(&name), Err(NameError::TooLong));
    }

    #[test]
    fn tags() {
        for tag in ["latest", "v1.0", "1.2.3-rc_1", "_private"] {
            assert_eq!(validate_tag(tag), Ok(()), "{tag}");
        }

        let longest = "a".repeat(128);
        assert_eq!(validate_tag(&longest), Ok(()));

        let too_long = "a".repeat(129);
        for tag in ["", ".hidden", "-dash", "a/b", "ünicode", too_long.as_str()] {
            assert_eq!(validate_tag(tag), Err(NameError::TagInvalid), "{tag}");
        }
    }

    #[test]
    fn repository_name_type() {
        let name: RepositoryName = "library/ubuntu".parse().unwrap();
        assert_eq!(name, "library/ubuntu");
        assert_eq!(name.components().collect::<Vec<_>>(), ["library", "ubuntu"]);

        assert_eq!(
            "UP/ubuntu".parse::<RepositoryName>(),
            Err(NameError::ComponentInvalid)
        );
    }

    #[test]
    fn repository_name_serde() {
        let name: RepositoryName = serde_json::from_str("\"library/ubuntu\"").unwrap();
        assert_eq!(serde_json::to_string(&name).unwrap(), "\"library/ubuntu\"");

        assert!(serde_json::from_str::<RepositoryName>("\"a\"").is_err());
    }
}
