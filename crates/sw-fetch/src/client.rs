//! Network fetch primitive.

use async_trait::async_trait;
use sw_core::{FetchRequest, Response};

use crate::timeout::TimeoutConfig;

/// Error type for fetch operations.
///
/// Cloneable so that one network result can be handed to several waiters.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    #[error("connection error for {url}: {message}")]
    Connection { url: String, message: String },

    #[error("timeout fetching {url}")]
    Timeout { url: String },

    #[error("failed to read body of {url}: {message}")]
    Body { url: String, message: String },

    #[error("request error for {url}: {message}")]
    Request { url: String, message: String },

    #[error("network unavailable for {url}")]
    Offline { url: String },
}

impl FetchError {
    /// URL of the request that failed.
    pub fn url(&self) -> &str {
        match self {
            Self::Connection { url, .. }
            | Self::Timeout { url }
            | Self::Body { url, .. }
            | Self::Request { url, .. }
            | Self::Offline { url } => url,
        }
    }

    fn from_reqwest(url: &str, err: reqwest::Error) -> Self {
        let url = url.to_string();
        if err.is_timeout() {
            Self::Timeout { url }
        } else if err.is_connect() {
            Self::Connection {
                url,
                message: err.to_string(),
            }
        } else if err.is_body() || err.is_decode() {
            Self::Body {
                url,
                message: err.to_string(),
            }
        } else {
            Self::Request {
                url,
                message: err.to_string(),
            }
        }
    }
}

/// The network as seen by the worker.
///
/// A non-success HTTP status is still a successful fetch; only transport
/// failures are errors.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Send the request and read the full response.
    async fn fetch(&self, request: &FetchRequest) -> Result<Response, FetchError>;
}

/// reqwest-backed fetcher.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    timeout: TimeoutConfig,
}

impl HttpFetcher {
    /// Create a fetcher with the given timeouts.
    pub fn new(timeout: TimeoutConfig) -> Result<Self, FetchError> {
        let mut builder = reqwest::Client::builder().connect_timeout(timeout.connect);
        if let Some(total) = timeout.total {
            builder = builder.timeout(total);
        }
        let client = builder.build().map_err(|e| FetchError::Request {
            url: String::new(),
            message: e.to_string(),
        })?;
        Ok(Self { client, timeout })
    }

    /// Wrap an existing reqwest client.
    pub fn with_client(client: reqwest::Client) -> Self {
        Self {
            client,
            timeout: TimeoutConfig::unbounded(),
        }
    }

    /// Configured timeouts.
    pub fn timeout(&self) -> &TimeoutConfig {
        &self.timeout
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, request: &FetchRequest) -> Result<Response, FetchError> {
        let url = request.url.as_str();

        let resp = self
            .client
            .request(request.method.clone(), request.url.clone())
            .headers(request.headers.clone())
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(url, e))?;

        let status = resp.status();
        let headers = resp.headers().clone();
        let final_url = resp.url().clone();
        let body = resp
            .bytes()
            .await
            .map_err(|e| FetchError::from_reqwest(url, e))?;

        tracing::trace!(url, status = status.as_u16(), bytes = body.len(), "network fetch");

        Ok(Response {
            status,
            headers,
            body,
            url: Some(final_url),
        })
    }
}
