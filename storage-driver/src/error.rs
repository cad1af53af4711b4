use std::backtrace::Backtrace;
use std::error::Error as StdError;
use std::fmt;

use tracing_error::SpanTrace;

type Source = Box<dyn StdError + Send + Sync + 'static>;

/// What went wrong in a driver, independent of which driver it was.
///
/// The registry maps `NotFound` onto "manifest unknown"; everything else
/// surfaces as an internal failure unless it is the caller's fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageErrorKind {
    /// Nothing is stored at the path.
    NotFound,

    /// The driver refused the path: empty, absolute, or escaping with `..`.
    InvalidPath,

    /// The backing medium failed.
    Io,

    /// Anything else.
    Other,
}

impl StorageErrorKind {
    /// Whether the caller, rather than the driver, is at fault.
    pub fn is_client_fault(&self) -> bool {
        *self == StorageErrorKind::InvalidPath
    }

    fn as_str(&self) -> &'static str {
        match self {
            StorageErrorKind::NotFound => "not found",
            StorageErrorKind::InvalidPath => "invalid path",
            StorageErrorKind::Io => "I/O failure",
            StorageErrorKind::Other => "unclassified failure",
        }
    }
}

impl fmt::Display for StorageErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug)]
struct Traces {
    backtrace: Backtrace,
    spans: SpanTrace,
}

/// An error reported by a storage driver.
///
/// ```rust
/// use storage_driver::{StorageError, StorageErrorKind};
///
/// let error = StorageError::builder("memory", StorageErrorKind::Io, "medium unavailable")
///     .path("repositories/library/ubuntu")
///     .context("put_content")
///     .build();
///
/// assert_eq!(error.kind(), StorageErrorKind::Io);
/// assert_eq!(error.path(), Some("repositories/library/ubuntu"));
/// ```
#[derive(Debug)]
pub struct StorageError {
    kind: StorageErrorKind,
    driver: &'static str,
    path: Option<String>,
    context: Option<String>,
    source: Source,
    traces: Box<Traces>,
}

impl StorageError {
    /// An error with no path or context attached.
    #[track_caller]
    pub fn new(driver: &'static str, kind: StorageErrorKind, error: impl Into<Source>) -> Self {
        Self::builder(driver, kind, error).build()
    }

    /// Start an error that will carry a path or context.
    pub fn builder(
        driver: &'static str,
        kind: StorageErrorKind,
        error: impl Into<Source>,
    ) -> StorageErrorBuilder {
        StorageErrorBuilder {
            inner: Partial {
                kind,
                driver,
                source: error.into(),
            },
            path: None,
            context: None,
        }
    }

    /// `NotFound` for `path`.
    #[track_caller]
    pub fn not_found(driver: &'static str, path: impl Into<String>) -> Self {
        let path = path.into();
        Self::builder(driver, StorageErrorKind::NotFound, format!("nothing stored at {path}"))
            .path(path)
            .build()
    }

    /// The error kind.
    pub fn kind(&self) -> StorageErrorKind {
        self.kind
    }

    /// Whether nothing was stored at the path.
    pub fn is_not_found(&self) -> bool {
        self.kind == StorageErrorKind::NotFound
    }

    /// Name of the driver that failed.
    pub fn driver(&self) -> &'static str {
        self.driver
    }

    /// The path involved.
    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    /// What the driver was doing.
    pub fn context(&self) -> Option<&str> {
        self.context.as_deref()
    }

    /// Backtrace captured when the error was built, subject to `RUST_BACKTRACE`.
    pub fn backtrace(&self) -> &Backtrace {
        &self.traces.backtrace
    }

    /// Active tracing spans when the error was built.
    pub fn span_trace(&self) -> &SpanTrace {
        &self.traces.spans
    }
}

impl StdError for StorageError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        Some(self.source.as_ref())
    }
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} driver: {}", self.driver, self.kind)?;
        match (&self.context, &self.path) {
            (Some(context), Some(path)) => write!(f, " during {context} on {path}")?,
            (Some(context), None) => write!(f, " during {context}")?,
            (None, Some(path)) => write!(f, " on {path}")?,
            (None, None) => {}
        }
        write!(f, ": {}", self.source)
    }
}

#[derive(Debug)]
struct Partial {
    kind: StorageErrorKind,
    driver: &'static str,
    source: Source,
}

/// Attaches a path and context to a [`StorageError`].
#[derive(Debug)]
pub struct StorageErrorBuilder {
    inner: Partial,
    path: Option<String>,
    context: Option<String>,
}

impl StorageErrorBuilder {
    /// The path involved.
    pub fn path(self, path: impl Into<String>) -> Self {
        Self {
            path: Some(path.into()),
            ..self
        }
    }

    /// What the driver was doing, usually the operation name.
    pub fn context(self, context: impl Into<String>) -> Self {
        Self {
            context: Some(context.into()),
            ..self
        }
    }

    /// Capture traces and finish the error.
    #[track_caller]
    pub fn build(self) -> StorageError {
        let Partial {
            kind,
            driver,
            source,
        } = self.inner;
        StorageError {
            kind,
            driver,
            path: self.path,
            context: self.context,
            source,
            traces: Box::new(Traces {
                backtrace: Backtrace::capture(),
                spans: SpanTrace::capture(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    static_assertions::assert_impl_all!(StorageError: Send, Sync);

    #[test]
    fn display_includes_path_and_context() {
        let error = StorageError::builder("memory", StorageErrorKind::Io, "medium unavailable")
            .path("a/b")
            .context("put_content")
            .build();

        assert_eq!(
            error.to_string(),
            "memory driver: I/O failure during put_content on a/b: medium unavailable"
        );
        assert_eq!(error.context(), Some("put_content"));
        assert_eq!(error.driver(), "memory");
    }

    #[test]
    fn not_found_shorthand() {
        let error = StorageError::not_found("memory", "a/b");
        assert!(error.is_not_found());
        assert_eq!(error.path(), Some("a/b"));
        assert!(!error.kind().is_client_fault());
        assert_eq!(
            error.to_string(),
            "memory driver: not found on a/b: nothing stored at a/b"
        );
    }

    #[test]
    fn source_is_preserved() {
        let io = std::io::Error::other("medium unavailable");
        let error = StorageError::new("memory", StorageErrorKind::Other, io);
        assert_eq!(error.source().unwrap().to_string(), "medium unavailable");
        assert!(error.path().is_none());
    }
}
