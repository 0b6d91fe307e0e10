//! In-memory cache storage.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use sw_core::{FetchRequest, RequestKey, Response};

use crate::error::{CacheError, CacheResult};
use crate::storage::{Cache, CacheStorage};

#[derive(Debug, Clone)]
struct StoredEntry {
    response: Response,
    stored_at: DateTime<Utc>,
}

/// A cache held in process memory.
#[derive(Debug)]
pub struct MemoryCache {
    name: String,
    entries: RwLock<HashMap<RequestKey, StoredEntry>>,
}

impl MemoryCache {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether the cache has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Stored response for a URL, bypassing request construction.
    pub fn get(&self, url: &str) -> Option<Response> {
        let key = parse_key(url)?;
        self.entries.read().get(&key).map(|e| e.response.clone())
    }

    /// When the entry for a URL was last written.
    pub fn stored_at(&self, url: &str) -> Option<DateTime<Utc>> {
        let key = parse_key(url)?;
        self.entries.read().get(&key).map(|e| e.stored_at)
    }

    fn check_storable(request: &FetchRequest, response: &Response) -> CacheResult<()> {
        if response.is_partial() {
            return Err(CacheError::PartialResponse {
                url: request.url.to_string(),
            });
        }
        Ok(())
    }
}

fn parse_key(url: &str) -> Option<RequestKey> {
    url::Url::parse(url).ok().map(|u| RequestKey::from_url(&u))
}

#[async_trait]
impl Cache for MemoryCache {
    fn name(&self) -> &str {
        &self.name
    }

    async fn match_request(&self, request: &FetchRequest) -> CacheResult<Option<Response>> {
        let entries = self.entries.read();
        Ok(entries
            .get(&request.cache_key())
            .map(|entry| entry.response.clone()))
    }

    async fn put(&self, request: &FetchRequest, response: Response) -> CacheResult<()> {
        Self::check_storable(request, &response)?;
        let entry = StoredEntry {
            response,
            stored_at: Utc::now(),
        };
        self.entries.write().insert(request.cache_key(), entry);
        Ok(())
    }

    async fn put_all(&self, entries: Vec<(FetchRequest, Response)>) -> CacheResult<()> {
        for (request, response) in &entries {
            Self::check_storable(request, response)?;
        }

        let now = Utc::now();
        let mut stored = self.entries.write();
        for (request, response) in entries {
            stored.insert(
                request.cache_key(),
                StoredEntry {
                    response,
                    stored_at: now,
                },
            );
        }
        Ok(())
    }

    async fn keys(&self) -> CacheResult<Vec<RequestKey>> {
        let mut keys: Vec<RequestKey> = self.entries.read().keys().cloned().collect();
        keys.sort();
        Ok(keys)
    }
}

/// In-memory registry of named caches (for embedding and tests).
#[derive(Debug, Default)]
pub struct MemoryCacheStorage {
    // Creation order, as the platform reports it.
    caches: RwLock<Vec<Arc<MemoryCache>>>,
}

impl MemoryCacheStorage {
    /// Create an empty storage.
    pub fn new() -> Self {
        Self::default()
    }

    /// Concrete handle to a cache, if it exists.
    pub fn cache(&self, name: &str) -> Option<Arc<MemoryCache>> {
        self.caches.read().iter().find(|c| c.name == name).cloned()
    }

    /// Names of every cache, in creation order.
    pub fn names(&self) -> Vec<String> {
        self.caches.read().iter().map(|c| c.name.clone()).collect()
    }
}

#[async_trait]
impl CacheStorage for MemoryCacheStorage {
    async fn open(&self, name: &str) -> CacheResult<Arc<dyn Cache>> {
        if let Some(existing) = self.cache(name) {
            return Ok(existing);
        }

        let mut caches = self.caches.write();
        // Another opener may have created it between the read and the write.
        if let Some(existing) = caches.iter().find(|c| c.name == name) {
            return Ok(existing.clone());
        }
        let cache = Arc::new(MemoryCache::new(name));
        caches.push(cache.clone());
        tracing::debug!(cache = name, "created cache");
        Ok(cache)
    }

    async fn has(&self, name: &str) -> CacheResult<bool> {
        Ok(self.cache(name).is_some())
    }

    async fn keys(&self) -> CacheResult<Vec<String>> {
        Ok(self.names())
    }

    async fn delete(&self, name: &str) -> CacheResult<bool> {
        let mut caches = self.caches.write();
        let before = caches.len();
        caches.retain(|c| c.name != name);
        Ok(caches.len() != before)
    }
}
