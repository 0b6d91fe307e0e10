//! Worker lifecycle tracking.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;

/// Lifecycle states of a worker version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkerState {
    /// Script evaluated, no lifecycle event dispatched yet.
    Parsed,
    /// Install event in flight.
    Installing,
    /// Precache populated, waiting to activate.
    Installed,
    /// Activate event in flight.
    Activating,
    /// Controlling clients and intercepting requests.
    Active,
    /// Failed, or replaced by a newer version; never controls clients again.
    Redundant,
}

impl WorkerState {
    /// Check whether moving to `next` is a legal transition.
    pub fn can_transition_to(&self, next: WorkerState) -> bool {
        use WorkerState::*;
        matches!(
            (self, next),
            (Parsed, Installing)
                | (Installing, Installed)
                | (Installed, Activating)
                | (Activating, Active)
                | (Installing | Installed | Activating | Active, Redundant)
        )
    }

    /// Get the state name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Parsed => "parsed",
            Self::Installing => "installing",
            Self::Installed => "installed",
            Self::Activating => "activating",
            Self::Active => "active",
            Self::Redundant => "redundant",
        }
    }
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error for an illegal lifecycle transition.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("illegal lifecycle transition from {from} to {to}")]
pub struct LifecycleError {
    pub from: WorkerState,
    pub to: WorkerState,
}

/// Observer trait for lifecycle transitions.
pub trait LifecycleObserver: Send + Sync {
    /// Called after a transition has been applied.
    fn on_transition(&self, from: WorkerState, to: WorkerState);
}

/// Lifecycle state machine for one worker version.
pub struct Lifecycle {
    state: WorkerState,
    observers: Vec<Arc<dyn LifecycleObserver>>,
}

impl Lifecycle {
    /// Create a lifecycle in the `Parsed` state.
    pub fn new() -> Self {
        Self {
            state: WorkerState::Parsed,
            observers: Vec::new(),
        }
    }

    /// Register an observer.
    pub fn observe(&mut self, observer: Arc<dyn LifecycleObserver>) {
        self.observers.push(observer);
    }

    /// Current state.
    pub fn state(&self) -> WorkerState {
        self.state
    }

    /// Move to `next`, notifying observers.
    pub fn transition(&mut self, next: WorkerState) -> Result<(), LifecycleError> {
        let from = self.state;
        if !from.can_transition_to(next) {
            return Err(LifecycleError { from, to: next });
        }
        self.state = next;
        tracing::debug!(%from, to = %next, "worker lifecycle transition");
        for observer in &self.observers {
            observer.on_transition(from, next);
        }
        Ok(())
    }
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Lifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lifecycle")
            .field("state", &self.state)
            .field("observers", &self.observers.len())
            .finish()
    }
}
