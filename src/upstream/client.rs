//! Outbound HTTP client for upstream services.
//!
//! Wraps a shared `reqwest::Client` with a bounded per-call timeout so an
//! unresponsive upstream cannot starve the request that is waiting on it.

use std::time::Duration;

use reqwest::header::{HeaderMap, ACCEPT, AUTHORIZATION};
use reqwest::Client as HttpClient;
use serde::Serialize;

use super::errors::UpstreamError;

// ─── Constants ───────────────────────────────────────────────────────────────

/// Default total timeout for a single upstream call.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// TCP connection timeout (never longer than the total timeout).
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

// ─── Types ───────────────────────────────────────────────────────────────────

/// A proxied response, returned verbatim regardless of status.
#[derive(Debug, Clone, Serialize)]
pub struct ProxiedResponse {
    pub url: String,
    pub status_code: u16,
    pub headers: serde_json::Map<String, serde_json::Value>,
    pub text: String,
}

// ─── UpstreamClient ──────────────────────────────────────────────────────────

/// Cheaply cloneable upstream client; clones share one connection pool.
#[derive(Debug, Clone)]
pub struct UpstreamClient {
    http: HttpClient,
    timeout: Duration,
}

impl UpstreamClient {
    /// Build a client whose calls are bounded by `timeout`.
    pub fn new(timeout: Duration) -> Result<Self, UpstreamError> {
        let http = HttpClient::builder()
            .connect_timeout(CONNECT_TIMEOUT.min(timeout))
            .timeout(timeout)
            .build()
            .map_err(|e| UpstreamError::ClientBuild {
                reason: e.to_string(),
            })?;

        Ok(Self { http, timeout })
    }

    /// The per-call timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// `GET url` and parse the body as JSON.
    ///
    /// Non-2xx statuses are errors. `query` pairs are appended to the URL and
    /// `bearer`, when present, is sent as an `Authorization: Bearer` header.
    pub async fn get_json(
        &self,
        url: &str,
        query: &[(&str, String)],
        bearer: Option<&str>,
    ) -> Result<serde_json::Value, UpstreamError> {
        let mut request = self.http.get(url).header(ACCEPT, "*/*");
        if !query.is_empty() {
            request = request.query(query);
        }
        if let Some(token) = bearer {
            request = request.header(AUTHORIZATION, format!("Bearer {token}"));
        }

        let timeout_secs = self.timeout.as_secs();
        let response = request
            .send()
            .await
            .map_err(|e| UpstreamError::from_reqwest(url, timeout_secs, e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| UpstreamError::from_reqwest(url, timeout_secs, e))?;

        if !status.is_success() {
            tracing::warn!(url, status = status.as_u16(), "upstream returned error status");
            return Err(UpstreamError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
                body,
            });
        }

        serde_json::from_str(&body).map_err(|e| UpstreamError::Decode {
            url: url.to_string(),
            reason: e.to_string(),
        })
    }

    /// `GET url` and return status, headers and body text without judging the status.
    pub async fn fetch(&self, url: &str) -> Result<ProxiedResponse, UpstreamError> {
        let timeout_secs = self.timeout.as_secs();
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| UpstreamError::from_reqwest(url, timeout_secs, e))?;

        let status_code = response.status().as_u16();
        let headers = headers_to_json(response.headers());
        let text = response
            .text()
            .await
            .map_err(|e| UpstreamError::from_reqwest(url, timeout_secs, e))?;

        Ok(ProxiedResponse {
            url: url.to_string(),
            status_code,
            headers,
            text,
        })
    }
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

/// Join a base URL and a path with exactly one `/` between them.
pub fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// Header values that are not visible ASCII are dropped.
fn headers_to_json(headers: &HeaderMap) -> serde_json::Map<String, serde_json::Value> {
    headers
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_string(), serde_json::Value::from(v)))
        })
        .collect()
}

// ─── Tests ───────────────────────────────────────────────────────────────────
