//! Timeout configuration for network fetches.

use std::time::Duration;

/// Timeouts applied by the network layer.
///
/// The caching policy never times out a fetch itself; these limits belong to
/// the client that talks to the network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeoutConfig {
    /// Connection timeout.
    pub connect: Duration,
    /// Total operation timeout, if any.
    pub total: Option<Duration>,
}

impl TimeoutConfig {
    /// Create a new timeout configuration.
    pub fn new(connect: Duration, total: Option<Duration>) -> Self {
        Self { connect, total }
    }

    /// Create from a single total timeout.
    pub fn from_total(total: Duration) -> Self {
        Self {
            connect: std::cmp::min(total / 4, Duration::from_secs(10)),
            total: Some(total),
        }
    }

    /// No total limit, only a connection timeout.
    pub fn unbounded() -> Self {
        Self {
            connect: Duration::from_secs(10),
            total: None,
        }
    }
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect: Duration::from_secs(10),
            total: Some(Duration::from_secs(30)),
        }
    }
}
