//! Named-factory tables for pluggable backends.
//!
//! Backends register a factory under a name before requests are served;
//! the storage layer later looks the name up from configuration and asks
//! the factory for a fresh service. One generic [`ExtensionRegistry`] backs
//! every extension point, parameterized over the construction arguments
//! and the service it produces.

use std::collections::hash_map::{Entry, HashMap};
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

/// Error type factories may fail with.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// A factory producing an `S` from construction arguments `A`.
pub type Factory<A, S> = dyn Fn(A) -> Result<S, BoxError> + Send + Sync;

/// Errors from registering or resolving an extension.
#[derive(Debug, thiserror::Error)]
pub enum ExtensionError {
    /// A factory is already registered under this name.
    #[error("{kind} handler name already registered: {name}")]
    DuplicateRegistration {
        /// Which extension point.
        kind: &'static str,
        /// The contested name.
        name: String,
    },

    /// No factory is registered under this name.
    #[error("no {kind} handler registered with name: {name}")]
    UnknownBackend {
        /// Which extension point.
        kind: &'static str,
        /// The requested name.
        name: String,
    },

    /// The factory was found, but failed to construct its service.
    #[error("{kind} handler {name} failed to initialize: {source}")]
    Initialization {
        /// Which extension point.
        kind: &'static str,
        /// The handler name.
        name: String,
        /// The factory's error.
        #[source]
        source: BoxError,
    },
}

/// A process-wide table of named factories.
///
/// Registration and lookup may race: the table sits behind a read-write
/// lock, and factories are invoked after the lock is released so a factory
/// may itself register or look up extensions.
pub struct ExtensionRegistry<A, S> {
    kind: &'static str,
    factories: RwLock<HashMap<String, Arc<Factory<A, S>>>>,
}

impl<A, S> fmt::Debug for ExtensionRegistry<A, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtensionRegistry")
            .field("kind", &self.kind)
            .field("names", &self.names())
            .finish()
    }
}

impl<A, S> ExtensionRegistry<A, S> {
    /// Create an empty registry for the extension point `kind`.
    pub fn new(kind: &'static str) -> Self {
        Self {
            kind,
            factories: RwLock::new(HashMap::new()),
        }
    }

    /// The extension point this registry serves, used in errors and logs.
    pub fn kind(&self) -> &'static str {
        self.kind
    }

    /// Register `factory` under `name`.
    ///
    /// Fails if the name is taken; the existing factory is kept.
    pub fn register<F>(&self, name: impl Into<String>, factory: F) -> Result<(), ExtensionError>
    where
        F: Fn(A) -> Result<S, BoxError> + Send + Sync + 'static,
    {
        let name = name.into();
        let mut factories = self.factories.write();
        match factories.entry(name) {
            Entry::Occupied(entry) => {
                tracing::warn!(
                    kind = self.kind,
                    name = %entry.key(),
                    "duplicate handler registration"
                );
                Err(ExtensionError::DuplicateRegistration {
                    kind: self.kind,
                    name: entry.key().clone(),
                })
            }
            Entry::Vacant(entry) => {
                tracing::debug!(kind = self.kind, name = %entry.key(), "registered handler");
                entry.insert(Arc::new(factory));
                Ok(())
            }
        }
    }

    /// Get the factory registered under `name`.
    pub fn get(&self, name: &str) -> Result<Arc<Factory<A, S>>, ExtensionError> {
        self.factories
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| ExtensionError::UnknownBackend {
                kind: self.kind,
                name: name.to_owned(),
            })
    }

    /// Construct a fresh service from the factory registered under `name`.
    pub fn lookup(&self, name: &str, args: A) -> Result<S, ExtensionError> {
        let factory = self.get(name)?;
        tracing::trace!(kind = self.kind, %name, "constructing handler");
        factory(args).map_err(|source| ExtensionError::Initialization {
            kind: self.kind,
            name: name.to_owned(),
            source,
        })
    }

    /// Whether a factory is registered under `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.factories.read().contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.factories.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Number of registered factories.
    pub fn len(&self) -> usize {
        self.factories.read().len()
    }

    /// Whether no factories are registered.
    pub fn is_empty(&self) -> bool {
        self.factories.read().is_empty()
    }
}
