//! Cache error types.

use sw_fetch::FetchError;

/// Result type for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;

/// Errors that can occur when using the cache.
#[derive(Debug, Clone, thiserror::Error)]
pub enum CacheError {
    /// Backend storage error.
    #[error("storage error: {0}")]
    Storage(String),

    /// A precache fetch failed at the transport level.
    #[error("precache fetch failed: {0}")]
    Fetch(#[from] FetchError),

    /// A precache fetch returned a non-success status.
    #[error("precache of {url} returned status {status}")]
    BadStatus { url: String, status: u16 },

    /// Partial-content responses cannot be stored.
    #[error("refusing to store partial response for {url}")]
    PartialResponse { url: String },

    /// The same request appeared twice in one bulk add.
    #[error("duplicate request in bulk add: {url}")]
    DuplicateRequest { url: String },
}
