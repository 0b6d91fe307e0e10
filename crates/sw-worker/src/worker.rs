//! The asset worker: install, activate and fetch handlers.

use std::sync::Arc;

use parking_lot::Mutex;
use sw_cache::{CacheName, CacheStorage};
use sw_core::{Lifecycle, LifecycleObserver, ScopeControl, WorkerConfig, WorkerState};
use sw_fetch::Fetcher;
use sw_observability::WorkerMetrics;
use url::Url;

use crate::error::WorkerError;
use crate::event::{ExtendableEvent, FetchEvent};
use crate::generation::{ActivationReport, CacheGeneration, InstallReport};
use crate::interceptor::{Interception, RequestInterceptor};
use crate::manifest::Manifest;
use crate::revalidate::StaleWhileRevalidate;

/// Platform primitives a worker runs against.
#[derive(Clone)]
pub struct PlatformServices {
    pub storage: Arc<dyn CacheStorage>,
    pub fetcher: Arc<dyn Fetcher>,
    pub scope: Arc<dyn ScopeControl>,
}

/// One version of the asset worker.
///
/// Everything derived from configuration (manifest, cache name, static
/// asset set) is computed once at construction and shared by all events.
pub struct AssetWorker {
    version: String,
    manifest: Arc<Manifest>,
    generation: CacheGeneration,
    interceptor: RequestInterceptor,
    policy: StaleWhileRevalidate,
    scope: Arc<dyn ScopeControl>,
    lifecycle: Arc<Mutex<Lifecycle>>,
    metrics: Arc<WorkerMetrics>,
    install_report: Arc<Mutex<Option<InstallReport>>>,
    activation_report: Arc<Mutex<Option<ActivationReport>>>,
}

impl AssetWorker {
    /// Create the worker served from `location`.
    pub fn new(
        config: &WorkerConfig,
        location: Url,
        platform: PlatformServices,
    ) -> Result<Self, WorkerError> {
        config.validate()?;
        let manifest = Arc::new(Manifest::build(config, &location)?);
        let metrics = Arc::new(WorkerMetrics::new());
        let generation = CacheGeneration::new(
            &config.build.version,
            platform.storage,
            platform.fetcher.clone(),
            metrics.clone(),
        );
        let policy =
            StaleWhileRevalidate::new(generation.clone(), platform.fetcher, metrics.clone());

        tracing::info!(
            version = %config.build.version,
            cache = %generation.name(),
            location = %location,
            precache_entries = manifest.len(),
            "worker created"
        );

        Ok(Self {
            version: config.build.version.clone(),
            interceptor: RequestInterceptor::new(location, manifest.clone()),
            manifest,
            generation,
            policy,
            scope: platform.scope,
            lifecycle: Arc::new(Mutex::new(Lifecycle::new())),
            metrics,
            install_report: Arc::new(Mutex::new(None)),
            activation_report: Arc::new(Mutex::new(None)),
        })
    }

    /// Watch lifecycle transitions.
    pub fn with_observer(self, observer: Arc<dyn LifecycleObserver>) -> Self {
        self.lifecycle.lock().observe(observer);
        self
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn cache_name(&self) -> &CacheName {
        self.generation.name()
    }

    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    pub fn state(&self) -> WorkerState {
        self.lifecycle.lock().state()
    }

    pub fn metrics(&self) -> &Arc<WorkerMetrics> {
        &self.metrics
    }

    /// Report of the last successful install.
    pub fn install_report(&self) -> Option<InstallReport> {
        self.install_report.lock().clone()
    }

    /// Report of the last successful activation.
    pub fn activation_report(&self) -> Option<ActivationReport> {
        self.activation_report.lock().clone()
    }

    /// Mark this version as replaced.
    pub fn retire(&self) -> Result<(), WorkerError> {
        self.lifecycle.lock().transition(WorkerState::Redundant)?;
        Ok(())
    }

    /// Install handler: precache the manifest, then ask to skip waiting.
    ///
    /// The event fails, and the worker becomes redundant, if any manifest
    /// entry cannot be cached.
    pub fn on_install(&self, event: &ExtendableEvent) -> Result<(), WorkerError> {
        self.lifecycle.lock().transition(WorkerState::Installing)?;

        let generation = self.generation.clone();
        let manifest = self.manifest.clone();
        let scope = self.scope.clone();
        let lifecycle = self.lifecycle.clone();
        let slot = self.install_report.clone();

        event.wait_until(async move {
            let outcome = async {
                let report = generation.install(&manifest).await?;
                scope.skip_waiting().await?;
                Ok::<_, WorkerError>(report)
            }
            .await;

            match outcome {
                Ok(report) => {
                    tracing::info!(
                        cache = %report.cache_name,
                        entries = report.entries,
                        "install complete"
                    );
                    lifecycle.lock().transition(WorkerState::Installed)?;
                    *slot.lock() = Some(report);
                    Ok(())
                }
                Err(e) => {
                    tracing::error!(cache = %generation.name(), error = %e, "install failed");
                    mark_redundant(&lifecycle);
                    Err(e)
                }
            }
        });
        Ok(())
    }

    /// Activate handler: claim open clients and delete stale caches.
    pub fn on_activate(&self, event: &ExtendableEvent) -> Result<(), WorkerError> {
        self.lifecycle.lock().transition(WorkerState::Activating)?;

        let generation = self.generation.clone();
        let scope = self.scope.clone();
        let lifecycle = self.lifecycle.clone();
        let slot = self.activation_report.clone();

        event.wait_until(async move {
            let claim = async { scope.claim_clients().await.map_err(WorkerError::from) };
            let outcome = futures::try_join!(claim, generation.retire_stale());

            match outcome {
                Ok((clients_claimed, cleanup)) => {
                    let report = ActivationReport::new(generation.name(), cleanup, clients_claimed);
                    tracing::info!(
                        cache = %report.cache_name,
                        clients_claimed,
                        deleted = report.deleted.len(),
                        failed = report.failed.len(),
                        "activation complete"
                    );
                    lifecycle.lock().transition(WorkerState::Active)?;
                    *slot.lock() = Some(report);
                    Ok(())
                }
                Err(e) => {
                    tracing::error!(cache = %generation.name(), error = %e, "activation failed");
                    mark_redundant(&lifecycle);
                    Err(e)
                }
            }
        });
        Ok(())
    }

    /// Fetch handler: answer eligible requests with stale-while-revalidate.
    ///
    /// Requests left unanswered fall through to the platform's default
    /// handling.
    pub fn on_fetch(&self, event: &mut FetchEvent) -> Result<Interception, WorkerError> {
        let decision = self.interceptor.inspect(event.request());
        match decision {
            Interception::Handle => {
                let response = self.policy.respond(event.request().clone(), event.gate());
                event.respond_with(response)?;
            }
            Interception::Pass(reason) => {
                tracing::trace!(url = %event.request().url, %reason, "passing request through");
                self.metrics.record_passthrough(reason.as_str());
            }
        }
        Ok(decision)
    }
}

fn mark_redundant(lifecycle: &Mutex<Lifecycle>) {
    if let Err(e) = lifecycle.lock().transition(WorkerState::Redundant) {
        tracing::warn!(error = %e, "could not mark worker redundant");
    }
}

impl std::fmt::Debug for AssetWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssetWorker")
            .field("version", &self.version)
            .field("cache", &self.generation.name())
            .field("state", &self.state())
            .field("precache_entries", &self.manifest.len())
            .finish()
    }
}
