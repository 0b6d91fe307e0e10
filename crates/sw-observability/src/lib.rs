//! Observability infrastructure for the asset-caching worker.
//!
//! This crate provides:
//! - `init_logging` - Global `tracing` subscriber (JSON or human output)
//! - `WorkerMetrics` - Cache hit/miss, revalidation and lifecycle counters

mod logging;
mod metrics;

pub use logging::*;
pub use metrics::*;
