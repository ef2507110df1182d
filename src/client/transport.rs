//! The wire seam of the client: one decorated request in, one buffered response out.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::HeaderMap;
use reqwest::Method;
use serde_json::Value;
use tracing::debug;

use crate::config::HttpConfig;
use crate::models::ApiResponse;

/// A request after decoration, ready to go on the wire.
#[derive(Debug, Clone)]
pub struct OutgoingRequest {
    pub method: Method,
    pub url: String,
    pub query: Vec<(String, String)>,
    pub headers: HeaderMap,
    pub body: Option<Value>,
}

/// Sends requests to the backend. Any HTTP status is a successful send;
/// only failures to get a response at all are errors.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: OutgoingRequest) -> Result<ApiResponse, String>;
}

/// `reqwest`-backed transport. Its cookie store carries the HTTP-only refresh
/// cookie set by login/signup back to the refresh endpoint.
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(config: &HttpConfig) -> Result<Self, String> {
        let client = reqwest::Client::builder()
            .cookie_store(true)
            .user_agent(config.user_agent.as_str())
            .timeout(Duration::from_millis(config.request_timeout_in_ms))
            .build()
            .map_err(|e| format!("Failed to build HTTP client: {}", e))?;
        Ok(ReqwestTransport { client })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: OutgoingRequest) -> Result<ApiResponse, String> {
        let mut builder = self
            .client
            .request(request.method.clone(), &request.url)
            .headers(request.headers);
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| format!("Failed to call {} {}: {}", request.method, request.url, e))?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response
            .bytes()
            .await
            .map_err(|e| format!("Failed to read response body: {}", e))?
            .to_vec();

        debug!(
            "{} {} -> {} ({} bytes)",
            request.method,
            request.url,
            status,
            body.len()
        );
        Ok(ApiResponse::new(status, headers, body))
    }
}
