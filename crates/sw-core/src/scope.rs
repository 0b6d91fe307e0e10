//! Worker scope control: skipping the waiting phase and claiming clients.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;

/// Errors reported by the scope primitive.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ScopeError {
    #[error("failed to claim clients: {0}")]
    Claim(String),

    #[error("failed to skip waiting: {0}")]
    SkipWaiting(String),
}

/// Platform primitive for taking control of pages.
#[async_trait]
pub trait ScopeControl: Send + Sync {
    /// Ask the platform to activate this worker without waiting for old clients to close.
    async fn skip_waiting(&self) -> Result<(), ScopeError>;

    /// Take control of every open client page. Returns the number claimed.
    async fn claim_clients(&self) -> Result<usize, ScopeError>;
}

/// An open page within the worker's scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Client {
    /// Client identifier.
    pub id: String,
    /// Page URL.
    pub url: String,
    /// Whether the current worker controls this client.
    pub controlled: bool,
}

/// In-process client registry.
#[derive(Debug, Default)]
pub struct ClientList {
    clients: Mutex<BTreeMap<String, Client>>,
    skip_waiting: AtomicBool,
}

impl ClientList {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a page. New pages are uncontrolled until claimed.
    pub fn open(&self, id: impl Into<String>, url: impl Into<String>) {
        let id = id.into();
        self.clients.lock().insert(
            id.clone(),
            Client {
                id,
                url: url.into(),
                controlled: false,
            },
        );
    }

    /// Close a page.
    pub fn close(&self, id: &str) -> bool {
        self.clients.lock().remove(id).is_some()
    }

    /// Release control of every client (a new worker version is taking over).
    pub fn release_all(&self) {
        for client in self.clients.lock().values_mut() {
            client.controlled = false;
        }
    }

    /// Snapshot of all clients.
    pub fn clients(&self) -> Vec<Client> {
        self.clients.lock().values().cloned().collect()
    }

    /// Number of controlled clients.
    pub fn controlled_count(&self) -> usize {
        self.clients.lock().values().filter(|c| c.controlled).count()
    }

    /// Consume the skip-waiting request, if one was made.
    pub fn take_skip_waiting(&self) -> bool {
        self.skip_waiting.swap(false, Ordering::SeqCst)
    }
}

#[async_trait]
impl ScopeControl for ClientList {
    async fn skip_waiting(&self) -> Result<(), ScopeError> {
        self.skip_waiting.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn claim_clients(&self) -> Result<usize, ScopeError> {
        let mut clients = self.clients.lock();
        for client in clients.values_mut() {
            client.controlled = true;
        }
        Ok(clients.len())
    }
}
