//! Cache storage primitive.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sw_core::{FetchRequest, RequestKey, Response};
use sw_fetch::Fetcher;
use url::Url;

use crate::error::{CacheError, CacheResult};

/// Status of a cache lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheStatus {
    /// Served from cache.
    Hit,
    /// Not in cache, served from network.
    Miss,
    /// Not handled by the cache at all.
    Bypass,
}

impl std::fmt::Display for CacheStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Hit => write!(f, "HIT"),
            Self::Miss => write!(f, "MISS"),
            Self::Bypass => write!(f, "BYPASS"),
        }
    }
}

/// A single named cache mapping request URLs to responses.
///
/// Writes are atomic per key; a lookup and a later write for the same key
/// are not linked, so concurrent writers race and the last write wins.
#[async_trait]
pub trait Cache: Send + Sync {
    /// Name this cache was opened under.
    fn name(&self) -> &str;

    /// Look up the stored response for a request.
    async fn match_request(&self, request: &FetchRequest) -> CacheResult<Option<Response>>;

    /// Store a response, replacing any entry for the same request.
    async fn put(&self, request: &FetchRequest, response: Response) -> CacheResult<()>;

    /// Store several responses at once; either all are stored or none.
    async fn put_all(&self, entries: Vec<(FetchRequest, Response)>) -> CacheResult<()>;

    /// Keys of every stored entry.
    async fn keys(&self) -> CacheResult<Vec<RequestKey>>;

    /// Fetch every URL and store the responses.
    ///
    /// Fails without storing anything if any fetch fails or returns a
    /// non-success status.
    async fn add_all(&self, fetcher: &dyn Fetcher, urls: &[Url]) -> CacheResult<usize> {
        let mut seen = HashSet::new();
        for url in urls {
            if !seen.insert(RequestKey::from_url(url)) {
                return Err(CacheError::DuplicateRequest {
                    url: url.to_string(),
                });
            }
        }

        let fetches = urls.iter().map(|url| async move {
            let request = FetchRequest::get(url.clone());
            let response = fetcher.fetch(&request).await?;
            if !response.is_ok() {
                return Err(CacheError::BadStatus {
                    url: url.to_string(),
                    status: response.status.as_u16(),
                });
            }
            Ok::<_, CacheError>((request, response))
        });

        let entries = futures::future::try_join_all(fetches).await?;
        let count = entries.len();
        self.put_all(entries).await?;
        Ok(count)
    }
}

/// Registry of named caches.
#[async_trait]
pub trait CacheStorage: Send + Sync {
    /// Open a cache, creating it if absent.
    async fn open(&self, name: &str) -> CacheResult<Arc<dyn Cache>>;

    /// Check whether a cache exists.
    async fn has(&self, name: &str) -> CacheResult<bool>;

    /// Names of every existing cache.
    async fn keys(&self) -> CacheResult<Vec<String>>;

    /// Delete a cache. Returns whether it existed.
    async fn delete(&self, name: &str) -> CacheResult<bool>;
}
