//! Public SDK for the asset-caching worker.
//!
//! This crate re-exports all worker functionality:
//!
//! ```ignore
//! use sw_sdk::prelude::*;
//!
//! init_logging(&LogConfig::default())?;
//!
//! let config = WorkerConfig::load("worker.toml")?;
//! let host = WorkerHost::new(
//!     Arc::new(MemoryCacheStorage::new()),
//!     Arc::new(HttpFetcher::new(TimeoutConfig::default())?),
//! );
//! let location = Url::parse("https://app.example.com/service-worker.js")?;
//! host.register(AssetWorker::new(&config, location, host.services())?).await?;
//!
//! let response = host.fetch(FetchRequest::parse_get("https://app.example.com/")?).await?;
//! ```

pub use sw_cache;
pub use sw_core;
pub use sw_fetch;
pub use sw_observability;
pub use sw_worker;

/// Prelude for convenient imports.
pub mod prelude {
    pub use sw_cache::*;
    pub use sw_core::*;
    pub use sw_fetch::*;
    pub use sw_observability::*;
    pub use sw_worker::*;
}
