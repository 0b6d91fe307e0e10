//! Network access for the asset-caching worker.
//!
//! This crate provides:
//! - `Fetcher` - The network fetch primitive the worker consumes
//! - `HttpFetcher` - reqwest-backed implementation with network-layer timeouts
//! - `MockNetwork` - Scripted network for development and tests
//! - `TimeoutConfig` - Connection and total timeouts

mod client;
mod mock;
mod timeout;

pub use client::*;
pub use mock::*;
pub use timeout::*;
