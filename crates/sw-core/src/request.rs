//! Intercepted request model.

use std::fmt;
use std::str::FromStr;

use http::header::{HeaderName, HeaderValue, RANGE};
use http::{HeaderMap, Method};
use serde::{Deserialize, Serialize};
use url::Url;

/// Cache mode carried by a request (`Request.cache` on the platform).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RequestCacheMode {
    #[default]
    Default,
    NoStore,
    Reload,
    NoCache,
    ForceCache,
    /// Only answer from a cache; never touch the network.
    OnlyIfCached,
}

impl RequestCacheMode {
    /// Get the directive string for this mode.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::NoStore => "no-store",
            Self::Reload => "reload",
            Self::NoCache => "no-cache",
            Self::ForceCache => "force-cache",
            Self::OnlyIfCached => "only-if-cached",
        }
    }
}

impl fmt::Display for RequestCacheMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown cache mode.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown request cache mode: {0}")]
pub struct UnknownCacheMode(pub String);

impl FromStr for RequestCacheMode {
    type Err = UnknownCacheMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "default" => Ok(Self::Default),
            "no-store" => Ok(Self::NoStore),
            "reload" => Ok(Self::Reload),
            "no-cache" => Ok(Self::NoCache),
            "force-cache" => Ok(Self::ForceCache),
            "only-if-cached" => Ok(Self::OnlyIfCached),
            other => Err(UnknownCacheMode(other.to_string())),
        }
    }
}

/// A request seen by the worker's fetch handler.
#[derive(Debug, Clone)]
pub struct FetchRequest {
    /// HTTP method.
    pub method: Method,
    /// Absolute request URL.
    pub url: Url,
    /// Request headers.
    pub headers: HeaderMap,
    /// Cache mode requested by the page.
    pub cache: RequestCacheMode,
}

impl FetchRequest {
    /// Create a request with an explicit method.
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: HeaderMap::new(),
            cache: RequestCacheMode::Default,
        }
    }

    /// Create a plain GET request.
    pub fn get(url: Url) -> Self {
        Self::new(Method::GET, url)
    }

    /// Parse the URL and create a GET request.
    pub fn parse_get(url: &str) -> Result<Self, url::ParseError> {
        Ok(Self::get(Url::parse(url)?))
    }

    /// Add a header.
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.append(name, value);
        self
    }

    /// Set the cache mode.
    pub fn with_cache_mode(mut self, mode: RequestCacheMode) -> Self {
        self.cache = mode;
        self
    }

    /// Whether the request asks for a byte range.
    pub fn has_range(&self) -> bool {
        self.headers.contains_key(RANGE)
    }

    /// Key under which responses to this request are cached.
    pub fn cache_key(&self) -> RequestKey {
        RequestKey::from_url(&self.url)
    }
}

/// Cache key derived from a request URL (fragment removed).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RequestKey(String);

impl RequestKey {
    /// Build the key for a URL.
    pub fn from_url(url: &Url) -> Self {
        let mut url = url.clone();
        url.set_fragment(None);
        Self(url.into())
    }

    /// Get the key string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RequestKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
