//! HTTP transport
//!
//! This module handles all HTTP requests for the crawler:
//! - The `Transport` seam the pipeline fetches through
//! - A reqwest-backed implementation with user agent and timeouts
//! - Error classification (timeout vs. connection failure vs. status)

use crate::config::{CrawlerConfig, UserAgentConfig};
use async_trait::async_trait;
use reqwest::Client;
use thiserror::Error;

/// Response of a completed HTTP exchange, whatever its status
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResponse {
    /// HTTP status code
    pub status: u16,
    /// Response body decoded as text
    pub body: String,
}

impl FetchResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Per-request transport failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("request timed out")]
    Timeout,

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("HTTP status {0}")]
    Status(u16),

    #[error("failed to read response body: {0}")]
    Body(String),

    #[error("request failed: {0}")]
    Other(String),
}

impl TransportError {
    fn from_reqwest(e: &reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout
        } else if e.is_connect() {
            Self::Connect(e.to_string())
        } else if e.is_body() || e.is_decode() {
            Self::Body(e.to_string())
        } else {
            Self::Other(e.to_string())
        }
    }
}

/// Issues GET requests on behalf of the pipeline
///
/// Implementations must be safe to share between concurrently running tasks.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Fetches a URL, returning the status and body of any completed exchange
    async fn fetch(&self, url: &str) -> Result<FetchResponse, TransportError>;
}

/// Fetches a URL and returns its body, treating any non-2xx status as an error
pub async fn fetch_document(transport: &dyn Transport, url: &str) -> Result<String, TransportError> {
    let response = transport.fetch(url).await?;
    if !response.is_success() {
        return Err(TransportError::Status(response.status));
    }
    Ok(response.body)
}

/// Builds an HTTP client with the configured user agent and timeouts
pub fn build_http_client(
    crawler: &CrawlerConfig,
    user_agent: &UserAgentConfig,
) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(user_agent.header_value())
        .timeout(crawler.request_timeout())
        .connect_timeout(crawler.connect_timeout())
        .gzip(true)
        .brotli(true)
        .build()
}

/// Transport backed by a shared reqwest client
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new(crawler: &CrawlerConfig, user_agent: &UserAgentConfig) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: build_http_client(crawler, user_agent)?,
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn fetch(&self, url: &str) -> Result<FetchResponse, TransportError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| TransportError::from_reqwest(&e))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| TransportError::from_reqwest(&e))?;

        tracing::trace!(url, status, bytes = body.len(), "fetched");

        Ok(FetchResponse { status, body })
    }
}
