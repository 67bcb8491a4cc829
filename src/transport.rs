//! Pluggable HTTPS transport.
//!
//! The pipeline hands a fully signed request to a [`Transport`] and gets back
//! the raw status, headers, and body. Connection pooling, TLS, and HTTP/2
//! multiplexing are the transport's concern; the default implementation wraps
//! a shared `reqwest::Client`.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

/// A single outbound exchange, already signed.
#[derive(Debug, Clone)]
pub struct TransportRequest {
    /// Upper-case HTTP method token (`GET` or `POST`).
    pub method: String,
    /// Full URL including scheme and host.
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
    /// Per-request deadline; implementations must enforce it.
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: u16,
    /// Header names as received; lookups are case-insensitive downstream.
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("request timed out")]
    Timeout,

    #[error("request canceled")]
    Canceled,

    #[error("{0}")]
    Failed(#[source] Box<dyn std::error::Error + Send + Sync>),
}

#[async_trait]
pub trait Transport: Send + Sync {
    async fn exchange(&self, req: TransportRequest) -> Result<TransportResponse, TransportError>;
}

/// Default transport backed by a shared `reqwest::Client`.
pub struct ReqwestTransport {
    http: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::new(),
        }
    }

    /// Wrap an existing client (custom pool sizing, proxies, ...).
    pub fn with_client(http: reqwest::Client) -> Self {
        Self { http }
    }
}

impl Default for ReqwestTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn exchange(&self, req: TransportRequest) -> Result<TransportResponse, TransportError> {
        let method: reqwest::Method = req
            .method
            .parse()
            .map_err(|e| TransportError::Failed(Box::new(e)))?;

        let mut builder = self.http.request(method, &req.url).timeout(req.timeout);
        for (name, value) in &req.headers {
            builder = builder.header(name, value);
        }
        if !req.body.is_empty() {
            builder = builder.body(req.body);
        }

        let resp = builder.send().await.map_err(map_reqwest_error)?;

        let status = resp.status().as_u16();
        let headers = resp
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = resp.bytes().await.map_err(map_reqwest_error)?.to_vec();

        Ok(TransportResponse {
            status,
            headers,
            body,
        })
    }
}

fn map_reqwest_error(err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout
    } else {
        TransportError::Failed(Box::new(err))
    }
}
