//! HTTP transport for webhook delivery.
//!
//! The dispatcher talks to an [`HttpClient`] rather than reqwest directly so
//! the retry loop can be driven by a scripted client in tests.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Method;
use reqwest::header::HeaderMap;
use url::Url;

/// A fully composed webhook request. Cloning is cheap; the body is shared.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// Status and body of a completed HTTP exchange.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[async_trait]
pub trait HttpClient: Send + Sync {
    /// Perform a single request. `Err` means no response was received
    /// (connection refused, DNS failure, timeout, ...).
    async fn execute(&self, request: &HttpRequest, timeout: Duration) -> anyhow::Result<HttpResponse>;
}

/// [`HttpClient`] backed by a shared reqwest connection pool.
#[derive(Debug, Clone, Default)]
pub struct ReqwestHttpClient {
    client: reqwest::Client,
}

impl ReqwestHttpClient {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HttpClient for ReqwestHttpClient {
    async fn execute(&self, request: &HttpRequest, timeout: Duration) -> anyhow::Result<HttpResponse> {
        let response = self
            .client
            .request(request.method.clone(), request.url.clone())
            .timeout(timeout)
            .headers(request.headers.clone())
            .body(request.body.clone())
            .send()
            .await?;

        let status = response.status().as_u16();
        // The body is only used for logging failed attempts
        let body = response.text().await.unwrap_or_default();

        Ok(HttpResponse { status, body })
    }
}
