//! Minimal worker host: dispatches lifecycle and fetch events.

use std::sync::Arc;

use parking_lot::RwLock;
use sw_cache::CacheStorage;
use sw_core::{ClientList, FetchRequest, RequestCacheMode, Response};
use sw_fetch::{FetchError, Fetcher};

use crate::error::WorkerError;
use crate::event::{ExtendableEvent, FetchEvent};
use crate::interceptor::Interception;
use crate::worker::{AssetWorker, PlatformServices};

/// Where a registered worker ended up.
#[derive(Debug, Clone)]
pub enum Registration {
    /// Installed and now controlling the scope.
    Activated(Arc<AssetWorker>),
    /// Installed, waiting for the active version to be released.
    Waiting(Arc<AssetWorker>),
}

impl Registration {
    pub fn worker(&self) -> &Arc<AssetWorker> {
        match self {
            Self::Activated(worker) | Self::Waiting(worker) => worker,
        }
    }
}

/// Response to a dispatched fetch, with how it was produced.
#[derive(Debug, Clone)]
pub struct FetchOutcome {
    pub response: Response,
    /// `None` when no worker was active.
    pub interception: Option<Interception>,
}

/// Hosts successive worker versions for one scope.
///
/// A new version installs alongside the active one; a failed install leaves
/// the active version untouched.
pub struct WorkerHost {
    storage: Arc<dyn CacheStorage>,
    fetcher: Arc<dyn Fetcher>,
    clients: Arc<ClientList>,
    active: RwLock<Option<Arc<AssetWorker>>>,
    waiting: RwLock<Option<Arc<AssetWorker>>>,
}

impl WorkerHost {
    pub fn new(storage: Arc<dyn CacheStorage>, fetcher: Arc<dyn Fetcher>) -> Self {
        Self {
            storage,
            fetcher,
            clients: Arc::new(ClientList::new()),
            active: RwLock::new(None),
            waiting: RwLock::new(None),
        }
    }

    /// Primitives to build workers for this host with.
    pub fn services(&self) -> PlatformServices {
        PlatformServices {
            storage: self.storage.clone(),
            fetcher: self.fetcher.clone(),
            scope: self.clients.clone(),
        }
    }

    /// Pages within the scope.
    pub fn clients(&self) -> &Arc<ClientList> {
        &self.clients
    }

    pub fn active(&self) -> Option<Arc<AssetWorker>> {
        self.active.read().clone()
    }

    pub fn waiting(&self) -> Option<Arc<AssetWorker>> {
        self.waiting.read().clone()
    }

    /// Install a worker version and activate it when allowed.
    ///
    /// The worker activates right away if it asked to skip waiting or if no
    /// version is active; otherwise it waits for [`WorkerHost::promote_waiting`].
    pub async fn register(&self, worker: AssetWorker) -> Result<Registration, WorkerError> {
        let worker = Arc::new(worker);
        tracing::info!(version = worker.version(), "installing worker");

        let install = ExtendableEvent::new();
        worker.on_install(&install)?;
        install.settled().await?;

        let skip_waiting = self.clients.take_skip_waiting();
        if skip_waiting || self.active().is_none() {
            self.activate(worker.clone()).await?;
            Ok(Registration::Activated(worker))
        } else {
            tracing::info!(version = worker.version(), "worker installed, waiting");
            if let Some(previous) = self.waiting.write().replace(worker.clone()) {
                retire(&previous);
            }
            Ok(Registration::Waiting(worker))
        }
    }

    /// Activate the waiting worker, if any.
    pub async fn promote_waiting(&self) -> Result<Option<Arc<AssetWorker>>, WorkerError> {
        let waiting = self.waiting.write().take();
        match waiting {
            Some(worker) => {
                self.activate(worker.clone()).await?;
                Ok(Some(worker))
            }
            None => Ok(None),
        }
    }

    async fn activate(&self, worker: Arc<AssetWorker>) -> Result<(), WorkerError> {
        if self.active().is_some() {
            self.clients.release_all();
        }
        let event = ExtendableEvent::new();
        worker.on_activate(&event)?;
        event.settled().await?;

        let previous = self.active.write().replace(worker.clone());
        if let Some(previous) = previous {
            retire(&previous);
        }
        tracing::info!(version = worker.version(), "worker activated");
        Ok(())
    }

    /// Dispatch a request and return the response.
    pub async fn fetch(&self, request: FetchRequest) -> Result<Response, WorkerError> {
        Ok(self.dispatch(request).await?.response)
    }

    /// Dispatch a request through the active worker.
    ///
    /// The returned response is produced first; the event's completion gate
    /// is then driven to the end before returning, so background cache
    /// updates have landed once this resolves.
    pub async fn dispatch(&self, request: FetchRequest) -> Result<FetchOutcome, WorkerError> {
        let Some(worker) = self.active() else {
            let response = self.default_fetch(&request).await?;
            return Ok(FetchOutcome {
                response,
                interception: None,
            });
        };

        let mut event = FetchEvent::new(request.clone());
        let interception = worker.on_fetch(&mut event)?;
        let (response, gate) = event.into_parts();

        let response = match response {
            Some(response) => response.await,
            None => self.default_fetch(&request).await,
        };
        if let Err(e) = gate.settled().await {
            tracing::warn!(url = %request.url, error = %e, "fetch event extension failed");
        }

        Ok(FetchOutcome {
            response: response?,
            interception: Some(interception),
        })
    }

    async fn default_fetch(&self, request: &FetchRequest) -> Result<Response, WorkerError> {
        if request.cache == RequestCacheMode::OnlyIfCached {
            return Err(WorkerError::Network(FetchError::Request {
                url: request.url.to_string(),
                message: "only-if-cached request has no cached response".to_string(),
            }));
        }
        Ok(self.fetcher.fetch(request).await?)
    }
}

fn retire(worker: &AssetWorker) {
    if let Err(e) = worker.retire() {
        tracing::warn!(version = worker.version(), error = %e, "could not retire worker");
    }
}

impl std::fmt::Debug for WorkerHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerHost")
            .field("active", &self.active())
            .field("waiting", &self.waiting())
            .finish_non_exhaustive()
    }
}
