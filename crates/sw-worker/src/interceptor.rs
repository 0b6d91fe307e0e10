//! Decides which fetches the worker answers.

use std::sync::Arc;

use http::Method;
use sw_core::{FetchRequest, RequestCacheMode};
use url::Url;

use crate::manifest::Manifest;

/// Why a request was left to default handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PassReason {
    NonGetMethod,
    RangeRequest,
    NonHttpScheme,
    /// Same host as the worker on a different port (a local dev server).
    DevServer,
    /// `only-if-cached` request for something that is not precached.
    UncachedProbe,
}

impl PassReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NonGetMethod => "non-get",
            Self::RangeRequest => "range",
            Self::NonHttpScheme => "non-http",
            Self::DevServer => "dev-server",
            Self::UncachedProbe => "only-if-cached",
        }
    }
}

impl std::fmt::Display for PassReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of inspecting a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interception {
    /// The worker answers with the caching policy.
    Handle,
    /// The platform's default handling applies.
    Pass(PassReason),
}

impl Interception {
    pub fn is_handled(&self) -> bool {
        matches!(self, Self::Handle)
    }
}

/// Request predicates, evaluated in order.
#[derive(Debug, Clone)]
pub struct RequestInterceptor {
    location: Url,
    static_assets: Arc<Manifest>,
}

impl RequestInterceptor {
    pub fn new(location: Url, static_assets: Arc<Manifest>) -> Self {
        Self {
            location,
            static_assets,
        }
    }

    /// Same host as the worker but a different port.
    pub fn is_dev_server_request(&self, url: &Url) -> bool {
        url.host_str() == self.location.host_str() && url.port() != self.location.port()
    }

    pub fn is_static_asset(&self, url: &Url) -> bool {
        self.static_assets.contains(url)
    }

    pub fn inspect(&self, request: &FetchRequest) -> Interception {
        if request.method != Method::GET {
            return Interception::Pass(PassReason::NonGetMethod);
        }
        if request.has_range() {
            return Interception::Pass(PassReason::RangeRequest);
        }

        let url = &request.url;
        let is_http = url.scheme().starts_with("http");
        let is_dev_server_request = self.is_dev_server_request(url);
        let is_static_asset = self.is_static_asset(url);
        let skip_because_uncached =
            request.cache == RequestCacheMode::OnlyIfCached && !is_static_asset;

        tracing::debug!(
            url = %url,
            is_http,
            is_dev_server_request,
            is_static_asset,
            skip_because_uncached,
            "inspecting request"
        );

        if !is_http {
            Interception::Pass(PassReason::NonHttpScheme)
        } else if is_dev_server_request {
            Interception::Pass(PassReason::DevServer)
        } else if skip_because_uncached {
            Interception::Pass(PassReason::UncachedProbe)
        } else {
            Interception::Handle
        }
    }
}
