//! Upstream client error types.
//!
//! All errors implement `std::error::Error` via `thiserror`. Structured logging
//! is the caller's responsibility; these types carry the URL and status needed
//! to build meaningful log entries and HTTP error bodies.

use thiserror::Error;

/// Errors that can occur while calling an upstream HTTP service.
#[derive(Debug, Error)]
pub enum UpstreamError {
    /// The HTTP client could not be constructed.
    #[error("failed to build HTTP client: {reason}")]
    ClientBuild { reason: String },

    /// TCP/HTTP connection to the upstream failed (refused, DNS, TLS).
    #[error("connection failed to {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    /// The upstream did not respond within the configured timeout.
    #[error("request to {url} timed out after {timeout_secs}s")]
    Timeout { url: String, timeout_secs: u64 },

    /// Non-2xx HTTP response from the upstream.
    #[error("HTTP {status} from {url}: {body}")]
    HttpStatus {
        url: String,
        status: u16,
        body: String,
    },

    /// The response body was not valid JSON.
    #[error("invalid JSON from {url}: {reason}")]
    Decode { url: String, reason: String },
}

impl UpstreamError {
    /// Classify a `reqwest` error raised while sending a request to `url`.
    pub fn from_reqwest(url: &str, timeout_secs: u64, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            return UpstreamError::Timeout {
                url: url.to_string(),
                timeout_secs,
            };
        }
        if err.is_decode() {
            return UpstreamError::Decode {
                url: url.to_string(),
                reason: err.to_string(),
            };
        }
        UpstreamError::ConnectionFailed {
            url: url.to_string(),
            reason: err.to_string(),
        }
    }

    /// The HTTP status code, if the upstream answered with a non-2xx status.
    pub fn status(&self) -> Option<u16> {
        match self {
            UpstreamError::HttpStatus { status, .. } => Some(*status),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_only_for_http_errors() {
        let err = UpstreamError::HttpStatus {
            url: "http://x/api".into(),
            status: 404,
            body: "not found".into(),
        };
        assert_eq!(err.status(), Some(404));

        let err = UpstreamError::Timeout {
            url: "http://x/api".into(),
            timeout_secs: 10,
        };
        assert!(err.status().is_none());
    }

    #[test]
    fn test_display_includes_url() {
        let err = UpstreamError::ConnectionFailed {
            url: "http://127.0.0.1:1/x".into(),
            reason: "connection refused".into(),
        };
        let text = err.to_string();
        assert!(text.contains("http://127.0.0.1:1/x"));
        assert!(text.contains("connection refused"));
    }
}
