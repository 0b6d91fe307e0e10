//! Lifecycle and fetch events with completion tracking.

use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use futures::future::{join_all, BoxFuture};
use futures::FutureExt;
use parking_lot::Mutex;
use sw_core::{FetchRequest, Response};

use crate::error::WorkerError;

/// Future resolving to the response a fetch event was answered with.
pub type ResponseFuture = BoxFuture<'static, Result<Response, WorkerError>>;

type Pending = BoxFuture<'static, Result<(), WorkerError>>;

/// Tracks the asynchronous work an event handler started.
///
/// Work registered while the gate is settling is picked up as well; the
/// gate settles only when nothing is left pending.
#[derive(Clone, Default)]
pub struct CompletionGate {
    pending: Arc<Mutex<Vec<Pending>>>,
    registered: Arc<AtomicUsize>,
}

impl CompletionGate {
    /// Create an empty gate.
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep the event alive until `future` completes.
    pub fn wait_until<F>(&self, future: F)
    where
        F: Future<Output = Result<(), WorkerError>> + Send + 'static,
    {
        self.pending.lock().push(future.boxed());
        self.registered.fetch_add(1, Ordering::SeqCst);
    }

    /// Number of futures waiting to be driven.
    pub fn pending(&self) -> usize {
        self.pending.lock().len()
    }

    /// Number of futures ever registered.
    pub fn registered(&self) -> usize {
        self.registered.load(Ordering::SeqCst)
    }

    /// Drive every registered future to completion.
    ///
    /// All futures run to the end even if one fails; the first failure is
    /// returned.
    pub async fn settled(&self) -> Result<(), WorkerError> {
        let mut first_error = None;
        loop {
            let batch = std::mem::take(&mut *self.pending.lock());
            if batch.is_empty() {
                break;
            }
            for result in join_all(batch).await {
                if let Err(e) = result {
                    first_error.get_or_insert(e);
                }
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

impl fmt::Debug for CompletionGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompletionGate")
            .field("pending", &self.pending())
            .field("registered", &self.registered())
            .finish()
    }
}

/// Install or activate event.
#[derive(Debug, Clone, Default)]
pub struct ExtendableEvent {
    gate: CompletionGate,
}

impl ExtendableEvent {
    pub fn new() -> Self {
        Self::default()
    }

    /// Extend the event until `future` completes.
    pub fn wait_until<F>(&self, future: F)
    where
        F: Future<Output = Result<(), WorkerError>> + Send + 'static,
    {
        self.gate.wait_until(future);
    }

    pub fn gate(&self) -> &CompletionGate {
        &self.gate
    }

    /// Wait for every extension; an error means the event failed.
    pub async fn settled(&self) -> Result<(), WorkerError> {
        self.gate.settled().await
    }
}

/// An intercepted request awaiting an optional response.
pub struct FetchEvent {
    request: FetchRequest,
    gate: CompletionGate,
    response: Option<ResponseFuture>,
}

impl FetchEvent {
    pub fn new(request: FetchRequest) -> Self {
        Self {
            request,
            gate: CompletionGate::new(),
            response: None,
        }
    }

    pub fn request(&self) -> &FetchRequest {
        &self.request
    }

    /// Handle to the event's completion gate.
    pub fn gate(&self) -> CompletionGate {
        self.gate.clone()
    }

    /// Extend the event until `future` completes.
    pub fn wait_until<F>(&self, future: F)
    where
        F: Future<Output = Result<(), WorkerError>> + Send + 'static,
    {
        self.gate.wait_until(future);
    }

    /// Answer the request. Only the first call is accepted.
    pub fn respond_with(&mut self, response: ResponseFuture) -> Result<(), WorkerError> {
        if self.response.is_some() {
            return Err(WorkerError::AlreadyResponded {
                url: self.request.url.to_string(),
            });
        }
        self.response = Some(response);
        Ok(())
    }

    /// Whether a handler answered the request.
    pub fn has_response(&self) -> bool {
        self.response.is_some()
    }

    /// Split into the response (if any) and the completion gate.
    pub fn into_parts(self) -> (Option<ResponseFuture>, CompletionGate) {
        (self.response, self.gate)
    }
}

impl fmt::Debug for FetchEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FetchEvent")
            .field("url", &self.request.url.as_str())
            .field("responded", &self.has_response())
            .field("gate", &self.gate)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicBool;
    use sw_fetch::FetchError;

    fn offline(url: &str) -> WorkerError {
        WorkerError::Network(FetchError::Offline {
            url: url.to_string(),
        })
    }

    #[tokio::test]
    async fn test_empty_gate_settles() {
        let gate = CompletionGate::new();
        assert!(gate.settled().await.is_ok());
        assert_eq!(gate.registered(), 0);
    }

    #[tokio::test]
    async fn test_gate_drives_registered_work() {
        let gate = CompletionGate::new();
        let ran = Arc::new(AtomicBool::new(false));
        let flag = ran.clone();
        gate.wait_until(async move {
            flag.store(true, Ordering::SeqCst);
            Ok(())
        });

        assert_eq!(gate.pending(), 1);
        assert!(!ran.load(Ordering::SeqCst));
        gate.settled().await.unwrap();
        assert!(ran.load(Ordering::SeqCst));
        assert_eq!(gate.pending(), 0);
    }

    #[tokio::test]
    async fn test_gate_picks_up_nested_registration() {
        let gate = CompletionGate::new();
        let ran = Arc::new(AtomicBool::new(false));
        let inner_gate = gate.clone();
        let flag = ran.clone();
        gate.wait_until(async move {
            inner_gate.wait_until(async move {
                flag.store(true, Ordering::SeqCst);
                Ok(())
            });
            Ok(())
        });

        gate.settled().await.unwrap();
        assert!(ran.load(Ordering::SeqCst));
        assert_eq!(gate.registered(), 2);
    }

    #[tokio::test]
    async fn test_gate_runs_all_and_reports_failure() {
        let gate = CompletionGate::new();
        let ran = Arc::new(AtomicBool::new(false));
        let flag = ran.clone();
        gate.wait_until(async { Err(offline("https://app.example.com/a")) });
        gate.wait_until(async move {
            flag.store(true, Ordering::SeqCst);
            Ok(())
        });

        let result = gate.settled().await;
        assert!(matches!(result, Err(WorkerError::Network(_))));
        assert!(ran.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_respond_with_twice_is_rejected() {
        let request = FetchRequest::parse_get("https://app.example.com/app.js").unwrap();
        let mut event = FetchEvent::new(request);
        assert!(!event.has_response());

        event
            .respond_with(async { Ok(Response::ok("first")) }.boxed())
            .unwrap();
        let second = event.respond_with(async { Ok(Response::ok("second")) }.boxed());
        assert!(matches!(second, Err(WorkerError::AlreadyResponded { .. })));

        let (response, _gate) = event.into_parts();
        let response = response.unwrap().await.unwrap();
        assert_eq!(response.text(), Some("first"));
    }
}
