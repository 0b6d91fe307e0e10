//! Worker-level cache metrics.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// Counters shared by every handler of one worker.
#[derive(Debug, Default)]
pub struct WorkerMetrics {
    precached: AtomicU64,
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
    revalidated: AtomicU64,
    revalidation_failures: AtomicU64,
    stale_caches_deleted: AtomicU64,
    stale_cache_delete_failures: AtomicU64,
    passthrough: Mutex<BTreeMap<String, u64>>,
}

impl WorkerMetrics {
    /// Create zeroed metrics.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record entries stored during install.
    pub fn record_precached(&self, entries: usize) {
        self.precached.fetch_add(entries as u64, Ordering::Relaxed);
    }

    /// Record a lookup answered from cache.
    pub fn record_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a lookup that fell through to the network.
    pub fn record_miss(&self) {
        self.cache_misses.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a network response written back to the cache.
    pub fn record_revalidated(&self) {
        self.revalidated.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a revalidation that did not reach the cache.
    pub fn record_revalidation_failure(&self) {
        self.revalidation_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a stale cache removed during activation.
    pub fn record_stale_deleted(&self) {
        self.stale_caches_deleted.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a stale cache that could not be removed.
    pub fn record_stale_delete_failure(&self) {
        self.stale_cache_delete_failures
            .fetch_add(1, Ordering::Relaxed);
    }

    /// Record a request left to default handling.
    pub fn record_passthrough(&self, reason: &str) {
        *self
            .passthrough
            .lock()
            .entry(reason.to_string())
            .or_insert(0) += 1;
    }

    /// Capture the current values.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            captured_at: Utc::now(),
            precached: self.precached.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            cache_misses: self.cache_misses.load(Ordering::Relaxed),
            revalidated: self.revalidated.load(Ordering::Relaxed),
            revalidation_failures: self.revalidation_failures.load(Ordering::Relaxed),
            stale_caches_deleted: self.stale_caches_deleted.load(Ordering::Relaxed),
            stale_cache_delete_failures: self.stale_cache_delete_failures.load(Ordering::Relaxed),
            passthrough: self.passthrough.lock().clone(),
        }
    }
}

/// Point-in-time copy of [`WorkerMetrics`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    /// When the snapshot was taken.
    pub captured_at: DateTime<Utc>,
    /// Entries stored during install.
    pub precached: u64,
    /// Responses served from cache.
    pub cache_hits: u64,
    /// Responses served from network after a miss.
    pub cache_misses: u64,
    /// Network responses written back to cache.
    pub revalidated: u64,
    /// Revalidations that failed.
    pub revalidation_failures: u64,
    /// Stale caches deleted during activation.
    pub stale_caches_deleted: u64,
    /// Stale caches that could not be deleted.
    pub stale_cache_delete_failures: u64,
    /// Requests left to default handling, by reason.
    pub passthrough: BTreeMap<String, u64>,
}

impl MetricsSnapshot {
    /// Total requests answered by the worker.
    pub fn handled(&self) -> u64 {
        self.cache_hits + self.cache_misses
    }

    /// Total requests left to default handling.
    pub fn passed_through(&self) -> u64 {
        self.passthrough.values().sum()
    }

    /// Share of handled requests answered from cache.
    pub fn hit_ratio(&self) -> Option<f64> {
        let handled = self.handled();
        if handled == 0 {
            None
        } else {
            Some(self.cache_hits as f64 / handled as f64)
        }
    }

    /// Format as JSON.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }

    /// Format as human-readable summary.
    pub fn to_summary(&self) -> String {
        let mut lines = vec![
            format!("Precached: {}", self.precached),
            format!(
                "Handled: {} ({} hit, {} miss)",
                self.handled(),
                self.cache_hits,
                self.cache_misses
            ),
            format!(
                "Revalidated: {} ({} failed)",
                self.revalidated, self.revalidation_failures
            ),
            format!(
                "Stale caches deleted: {} ({} failed)",
                self.stale_caches_deleted, self.stale_cache_delete_failures
            ),
        ];

        if !self.passthrough.is_empty() {
            lines.push("Passed through:".to_string());
            for (reason, count) in &self.passthrough {
                lines.push(format!("  {}: {}", reason, count));
            }
        }

        lines.join("\n")
    }
}
