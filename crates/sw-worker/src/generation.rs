//! Versioned cache generations: install and stale-cache cleanup.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::Serialize;
use sw_cache::{Cache, CacheError, CacheName, CacheStorage};
use sw_fetch::Fetcher;
use sw_observability::WorkerMetrics;

use crate::error::WorkerError;
use crate::manifest::Manifest;

/// Outcome of precaching a manifest.
#[derive(Debug, Clone, Serialize)]
pub struct InstallReport {
    pub cache_name: String,
    pub entries: usize,
    pub completed_at: DateTime<Utc>,
}

/// A stale cache that could not be deleted.
#[derive(Debug, Clone, Serialize)]
pub struct StaleCacheFailure {
    pub name: String,
    pub error: String,
}

/// Outcome of deleting every cache but the current one.
#[derive(Debug, Clone, Default, Serialize)]
pub struct StaleCleanup {
    pub deleted: Vec<String>,
    pub failed: Vec<StaleCacheFailure>,
}

/// Outcome of activation.
#[derive(Debug, Clone, Serialize)]
pub struct ActivationReport {
    pub cache_name: String,
    pub deleted: Vec<String>,
    pub failed: Vec<StaleCacheFailure>,
    pub clients_claimed: usize,
    pub completed_at: DateTime<Utc>,
}

impl ActivationReport {
    pub fn new(cache_name: &CacheName, cleanup: StaleCleanup, clients_claimed: usize) -> Self {
        Self {
            cache_name: cache_name.to_string(),
            deleted: cleanup.deleted,
            failed: cleanup.failed,
            clients_claimed,
            completed_at: Utc::now(),
        }
    }
}

/// The cache owned by one build version.
#[derive(Clone)]
pub struct CacheGeneration {
    name: CacheName,
    storage: Arc<dyn CacheStorage>,
    fetcher: Arc<dyn Fetcher>,
    metrics: Arc<WorkerMetrics>,
}

impl CacheGeneration {
    pub fn new(
        version: &str,
        storage: Arc<dyn CacheStorage>,
        fetcher: Arc<dyn Fetcher>,
        metrics: Arc<WorkerMetrics>,
    ) -> Self {
        Self {
            name: CacheName::for_version(version),
            storage,
            fetcher,
            metrics,
        }
    }

    pub fn name(&self) -> &CacheName {
        &self.name
    }

    /// Open (or create) this generation's cache.
    pub async fn open(&self) -> Result<Arc<dyn Cache>, CacheError> {
        self.storage.open(self.name.as_str()).await
    }

    /// Fetch and store every manifest entry.
    ///
    /// All-or-nothing: one failed or non-success fetch fails the install and
    /// leaves the cache without any new entry.
    pub async fn install(&self, manifest: &Manifest) -> Result<InstallReport, WorkerError> {
        tracing::info!(
            cache = %self.name,
            entries = manifest.len(),
            "precaching static assets"
        );

        let cache = self.open().await?;
        let entries = cache
            .add_all(self.fetcher.as_ref(), &manifest.urls())
            .await
            .map_err(|source| WorkerError::InstallFailed {
                cache: self.name.to_string(),
                source,
            })?;

        self.metrics.record_precached(entries);
        Ok(InstallReport {
            cache_name: self.name.to_string(),
            entries,
            completed_at: Utc::now(),
        })
    }

    /// Delete every cache whose name differs from this generation's.
    ///
    /// Deletions run concurrently; a failed deletion is logged and reported
    /// without stopping the others. Only listing the caches can fail.
    pub async fn retire_stale(&self) -> Result<StaleCleanup, WorkerError> {
        let names = self.storage.keys().await?;
        let stale: Vec<String> = names
            .into_iter()
            .filter(|name| self.name.is_stale(name))
            .collect();

        let deletions = stale.into_iter().map(|name| async move {
            tracing::info!(cache = %name, "deleting old cache");
            let result = self.storage.delete(&name).await;
            (name, result)
        });

        let mut cleanup = StaleCleanup::default();
        for (name, result) in join_all(deletions).await {
            match result {
                Ok(_) => {
                    self.metrics.record_stale_deleted();
                    cleanup.deleted.push(name);
                }
                Err(e) => {
                    tracing::warn!(cache = %name, error = %e, "failed to delete old cache");
                    self.metrics.record_stale_delete_failure();
                    cleanup.failed.push(StaleCacheFailure {
                        name,
                        error: e.to_string(),
                    });
                }
            }
        }
        Ok(cleanup)
    }
}

impl std::fmt::Debug for CacheGeneration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheGeneration")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}
