//! Named, persistent request/response cache storage.
//!
//! This crate provides:
//! - `CacheStorage` / `Cache` - The platform cache primitive
//! - `CacheName` - Cache naming per build version
//! - `CacheStatus` - Outcome of a cache lookup
//! - `MemoryCacheStorage` - In-process implementation
//!
//! # Example
//!
//! ```ignore
//! use sw_cache::{CacheName, CacheStorage, MemoryCacheStorage};
//!
//! let storage = MemoryCacheStorage::new();
//! let name = CacheName::for_version("1700000000");
//! let cache = storage.open(name.as_str()).await?;
//! cache.add_all(&fetcher, &urls).await?;
//! ```

mod error;
mod memory;
mod name;
mod storage;

pub use error::*;
pub use memory::*;
pub use name::*;
pub use storage::*;
