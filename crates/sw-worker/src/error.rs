//! Error types for the asset worker.

use sw_cache::CacheError;
use sw_core::{ConfigError, LifecycleError, ScopeError};
use sw_fetch::FetchError;

/// Errors that can occur while handling worker events.
#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    /// Invalid configuration.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A manifest entry could not be turned into an absolute URL.
    #[error("invalid manifest entry {entry}: {message}")]
    Manifest { entry: String, message: String },

    /// Precaching failed; this worker version cannot install.
    #[error("install of {cache} failed: {source}")]
    InstallFailed {
        cache: String,
        #[source]
        source: CacheError,
    },

    /// Cache storage failure outside of install.
    #[error("cache error: {0}")]
    Cache(#[from] CacheError),

    /// Network failure surfaced to the requester.
    #[error("network error: {0}")]
    Network(#[from] FetchError),

    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    #[error(transparent)]
    Scope(#[from] ScopeError),

    /// `respond_with` was called more than once for one fetch event.
    #[error("fetch event for {url} already has a response")]
    AlreadyResponded { url: String },
}

impl WorkerError {
    /// Whether this error reached the requester as a network error.
    pub fn is_network(&self) -> bool {
        matches!(self, Self::Network(_))
    }
}
