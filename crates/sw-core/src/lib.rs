//! Core abstractions for the asset-caching worker.
//!
//! This crate provides the fundamental types and traits:
//! - `FetchRequest` / `Response` - Intercepted request and cached payload
//! - `Lifecycle` - Worker lifecycle state machine
//! - `ScopeControl` - Skip-waiting and client-claim primitive
//! - `WorkerConfig` - Build manifest and precache configuration

mod config;
mod lifecycle;
mod request;
mod response;
mod scope;

pub use config::*;
pub use lifecycle::*;
pub use request::*;
pub use response::*;
pub use scope::*;
