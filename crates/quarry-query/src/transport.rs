// SPDX-FileCopyrightText: 2026 Quarry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! One-shot HTTP exchange with the query service.
//!
//! The transport sends a single request and reports the raw status and body;
//! classification and retries live in [`crate::client`].

use std::time::Duration;

use async_trait::async_trait;
use quarry_core::QuarryError;
use secrecy::{ExposeSecret, SecretString};
use tracing::debug;

use crate::error::QueryError;
use crate::types::RemoteQueryRequest;

/// Header carrying the API key.
const API_KEY_HEADER: &str = "X-API-Key";

/// Raw status and body of one exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

/// Sends one request. Connection and timeout failures are reported as
/// [`QueryError::Transport`].
#[async_trait]
pub trait QueryTransport: Send + Sync {
    async fn send(&self, request: &RemoteQueryRequest) -> Result<TransportResponse, QueryError>;
}

/// reqwest-backed transport: `GET {base_url}{endpoint}` with the request as query parameters.
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
    api_key: SecretString,
}

impl HttpTransport {
    /// Builds a TLS 1.2+ client with the given per-request timeout.
    pub fn new(
        base_url: &str,
        api_key: SecretString,
        timeout: Duration,
    ) -> Result<Self, QuarryError> {
        let client = quarry_security::build_secure_client(timeout)?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    fn url_for(&self, request: &RemoteQueryRequest) -> Result<reqwest::Url, QueryError> {
        let endpoint = format!("{}{}", self.base_url, request.endpoint.path());
        reqwest::Url::parse_with_params(&endpoint, request.query_pairs())
            .map_err(|e| QueryError::InvalidRequest(format!("bad query service URL: {e}")))
    }
}

impl std::fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTransport")
            .field("base_url", &self.base_url)
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}

#[async_trait]
impl QueryTransport for HttpTransport {
    async fn send(&self, request: &RemoteQueryRequest) -> Result<TransportResponse, QueryError> {
        let url = self.url_for(request)?;

        let response = self
            .client
            .get(url)
            .header(API_KEY_HEADER, self.api_key.expose_secret())
            .send()
            .await
            .map_err(|e| QueryError::Transport {
                message: format!("request to {} failed: {e}", request.endpoint),
                source: Some(Box::new(e)),
            })?;

        let status = response.status().as_u16();
        let body = response.text().await.map_err(|e| QueryError::Transport {
            message: format!("failed to read {} response body: {e}", request.endpoint),
            source: Some(Box::new(e)),
        })?;
        debug!(endpoint = %request.endpoint, status, "query service responded");

        Ok(TransportResponse { status, body })
    }
}
