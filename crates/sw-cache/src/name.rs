//! Cache naming per build version.

use serde::{Deserialize, Serialize};

const CACHE_NAME_PREFIX: &str = "cache";

/// Name of the cache holding one build version's assets.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheName(String);

impl CacheName {
    /// Derive the cache name for a build version.
    pub fn for_version(version: &str) -> Self {
        Self(format!("{CACHE_NAME_PREFIX}{version}"))
    }

    /// Get the name string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Check whether an existing cache name belongs to a different generation.
    pub fn is_stale(&self, other: &str) -> bool {
        other != self.0
    }
}

impl std::fmt::Display for CacheName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CacheName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_is_prefix_plus_version() {
        assert_eq!(CacheName::for_version("V1").as_str(), "cacheV1");
        assert_eq!(CacheName::for_version("1700000000").to_string(), "cache1700000000");
    }

    #[test]
    fn test_distinct_versions_distinct_names() {
        assert_ne!(CacheName::for_version("V1"), CacheName::for_version("V2"));
    }

    #[test]
    fn test_is_stale() {
        let current = CacheName::for_version("V1");
        assert!(!current.is_stale("cacheV1"));
        assert!(current.is_stale("cacheV0"));
        assert!(current.is_stale("some-other-cache"));
    }
}
