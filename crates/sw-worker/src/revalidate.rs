//! Stale-while-revalidate response policy.

use std::sync::Arc;

use futures::FutureExt;
use sw_cache::{Cache, CacheStatus};
use sw_core::{FetchRequest, Response};
use sw_fetch::{FetchError, Fetcher};
use sw_observability::WorkerMetrics;

use crate::error::WorkerError;
use crate::event::{CompletionGate, ResponseFuture};
use crate::generation::CacheGeneration;

/// Answer from cache when possible, refresh the cache from the network
/// every time.
///
/// Exactly one network fetch is issued per handled request. On a miss the
/// caller waits for it. On a hit the cached response is returned right away
/// and the refresh is only registered on the event's completion gate: the
/// fetch starts when the gate is driven, so embedders must settle the gate
/// promptly after taking the response (as [`crate::WorkerHost`] does).
#[derive(Clone)]
pub struct StaleWhileRevalidate {
    generation: CacheGeneration,
    fetcher: Arc<dyn Fetcher>,
    metrics: Arc<WorkerMetrics>,
}

impl StaleWhileRevalidate {
    pub fn new(
        generation: CacheGeneration,
        fetcher: Arc<dyn Fetcher>,
        metrics: Arc<WorkerMetrics>,
    ) -> Self {
        Self {
            generation,
            fetcher,
            metrics,
        }
    }

    /// Build the response future for a request.
    pub fn respond(&self, request: FetchRequest, gate: CompletionGate) -> ResponseFuture {
        let policy = self.clone();
        async move { policy.serve(request, gate).await }.boxed()
    }

    pub async fn serve(
        &self,
        request: FetchRequest,
        gate: CompletionGate,
    ) -> Result<Response, WorkerError> {
        let cache = self.generation.open().await?;
        let cached = cache.match_request(&request).await?;

        let refresh = revalidate(
            cache,
            self.fetcher.clone(),
            request.clone(),
            self.metrics.clone(),
        )
        .boxed()
        .shared();

        match cached {
            Some(response) => {
                tracing::debug!(url = %request.url, cache_status = %CacheStatus::Hit, "serving from cache");
                self.metrics.record_hit();
                // Failures were already logged; the cached answer stands.
                gate.wait_until(refresh.map(|_| Ok::<(), WorkerError>(())));
                Ok(response)
            }
            None => {
                tracing::debug!(url = %request.url, cache_status = %CacheStatus::Miss, "serving from network");
                self.metrics.record_miss();
                gate.wait_until(refresh.clone().map(|_| Ok::<(), WorkerError>(())));
                Ok(refresh.await?)
            }
        }
    }
}

impl std::fmt::Debug for StaleWhileRevalidate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaleWhileRevalidate")
            .field("cache", &self.generation.name())
            .finish_non_exhaustive()
    }
}

/// Fetch the request and store a copy of the response.
///
/// A failed store is logged; the network response is still returned.
async fn revalidate(
    cache: Arc<dyn Cache>,
    fetcher: Arc<dyn Fetcher>,
    request: FetchRequest,
    metrics: Arc<WorkerMetrics>,
) -> Result<Response, FetchError> {
    let response = match fetcher.fetch(&request).await {
        Ok(response) => response,
        Err(e) => {
            tracing::debug!(url = %request.url, error = %e, "revalidation fetch failed");
            metrics.record_revalidation_failure();
            return Err(e);
        }
    };

    match cache.put(&request, response.clone()).await {
        Ok(()) => {
            tracing::trace!(url = %request.url, status = %response.status, "cache refreshed");
            metrics.record_revalidated();
        }
        Err(e) => {
            tracing::warn!(url = %request.url, error = %e, "failed to store revalidated response");
            metrics.record_revalidation_failure();
        }
    }
    Ok(response)
}
