//! Precaching, stale-while-revalidate asset worker.
//!
//! This crate provides:
//! - `Manifest` - Deduplicated set of URLs to precache
//! - `CacheGeneration` - Per-version cache install and stale-cache cleanup
//! - `RequestInterceptor` - Decides which fetches the worker answers
//! - `StaleWhileRevalidate` - Cached-first response with background refresh
//! - `AssetWorker` - Install/activate/fetch handlers tying the above together
//! - `WorkerHost` - Minimal hosting runtime for native embedding and tests
//!
//! Every handler registers the asynchronous work it starts on the event's
//! [`CompletionGate`]; the event is complete only once the gate settles.

mod error;
mod event;
mod generation;
mod interceptor;
mod manifest;
mod revalidate;
mod runtime;
mod worker;

pub use error::*;
pub use event::*;
pub use generation::*;
pub use interceptor::*;
pub use manifest::*;
pub use revalidate::*;
pub use runtime::*;
pub use worker::*;
