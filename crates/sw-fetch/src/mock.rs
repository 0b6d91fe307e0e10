//! Scripted network for development and tests.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use sw_core::{FetchRequest, RequestKey, Response};

use crate::client::{FetchError, Fetcher};

type Reply = Result<Response, FetchError>;

/// In-memory network with scripted replies per URL.
///
/// Replies queued for a URL are served in order; the last one keeps being
/// served once the queue is down to a single entry. Unscripted URLs fail as
/// if the network were unreachable.
#[derive(Debug, Default)]
pub struct MockNetwork {
    routes: Mutex<HashMap<RequestKey, VecDeque<Reply>>>,
    calls: Mutex<Vec<RequestKey>>,
    offline: AtomicBool,
}

impl MockNetwork {
    /// Create an empty network.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a response for a URL.
    pub fn respond(&self, url: &str, response: Response) -> &Self {
        self.push(url, Ok(response));
        self
    }

    /// Queue a transport failure for a URL.
    pub fn fail(&self, url: &str) -> &Self {
        let error = FetchError::Offline {
            url: url.to_string(),
        };
        self.push(url, Err(error));
        self
    }

    /// Drop every scripted reply for a URL.
    pub fn forget(&self, url: &str) {
        if let Some(key) = parse_key(url) {
            self.routes.lock().remove(&key);
        }
    }

    /// Simulate losing (or regaining) connectivity.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Number of fetches issued for a URL.
    pub fn calls(&self, url: &str) -> usize {
        let Some(key) = parse_key(url) else {
            return 0;
        };
        self.calls.lock().iter().filter(|k| **k == key).count()
    }

    /// Number of fetches issued in total.
    pub fn total_calls(&self) -> usize {
        self.calls.lock().len()
    }

    fn push(&self, url: &str, reply: Reply) {
        match parse_key(url) {
            Some(key) => self.routes.lock().entry(key).or_default().push_back(reply),
            None => tracing::warn!(url, "ignoring scripted reply for unparsable URL"),
        }
    }
}

fn parse_key(url: &str) -> Option<RequestKey> {
    url::Url::parse(url).ok().map(|u| RequestKey::from_url(&u))
}

#[async_trait]
impl Fetcher for MockNetwork {
    async fn fetch(&self, request: &FetchRequest) -> Result<Response, FetchError> {
        let key = request.cache_key();
        self.calls.lock().push(key.clone());

        if self.offline.load(Ordering::SeqCst) {
            return Err(FetchError::Offline {
                url: request.url.to_string(),
            });
        }

        let mut routes = self.routes.lock();
        let reply = match routes.get_mut(&key) {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap_or_else(|| {
                Err(FetchError::Offline {
                    url: request.url.to_string(),
                })
            }),
            Some(queue) => queue.front().cloned().unwrap_or_else(|| {
                Err(FetchError::Offline {
                    url: request.url.to_string(),
                })
            }),
            None => Err(FetchError::Offline {
                url: request.url.to_string(),
            }),
        };
        reply.map(|response| response.with_url(request.url.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::StatusCode;

    const APP_JS: &str = "https://app.example.com/app.js";

    #[tokio::test]
    async fn test_unscripted_url_is_offline() {
        let network = MockNetwork::new();
        let request = FetchRequest::parse_get(APP_JS).unwrap();
        let err = network.fetch(&request).await.unwrap_err();
        assert!(matches!(err, FetchError::Offline { .. }));
        assert_eq!(network.calls(APP_JS), 1);
    }

    #[tokio::test]
    async fn test_replies_served_in_order_last_sticks() {
        let network = MockNetwork::new();
        network
            .respond(APP_JS, Response::ok("v1"))
            .respond(APP_JS, Response::ok("v2"));

        let request = FetchRequest::parse_get(APP_JS).unwrap();
        assert_eq!(network.fetch(&request).await.unwrap().text(), Some("v1"));
        assert_eq!(network.fetch(&request).await.unwrap().text(), Some("v2"));
        assert_eq!(network.fetch(&request).await.unwrap().text(), Some("v2"));
        assert_eq!(network.calls(APP_JS), 3);
        assert_eq!(network.total_calls(), 3);
    }

    #[tokio::test]
    async fn test_scripted_failure_then_recovery() {
        let network = MockNetwork::new();
        network
            .fail(APP_JS)
            .respond(APP_JS, Response::new(StatusCode::NOT_FOUND, ""));

        let request = FetchRequest::parse_get(APP_JS).unwrap();
        assert!(network.fetch(&request).await.is_err());
        assert_eq!(
            network.fetch(&request).await.unwrap().status,
            StatusCode::NOT_FOUND
        );
    }

    #[tokio::test]
    async fn test_offline_overrides_script() {
        let network = MockNetwork::new();
        network.respond(APP_JS, Response::ok("v1"));
        network.set_offline(true);

        let request = FetchRequest::parse_get(APP_JS).unwrap();
        assert!(network.fetch(&request).await.is_err());

        network.set_offline(false);
        assert!(network.fetch(&request).await.is_ok());
    }

    #[tokio::test]
    async fn test_forget_removes_script() {
        let network = MockNetwork::new();
        network.respond(APP_JS, Response::ok("v1"));
        network.forget(APP_JS);

        let request = FetchRequest::parse_get(APP_JS).unwrap();
        assert!(network.fetch(&request).await.is_err());
    }
}
