//! Invocation client error types.

use thiserror::Error;

use crate::tool_registry::ToolError;

/// Errors returned by the invocation client.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The endpoint could not be reached or refused the handshake. Retryable.
    #[error("failed to connect to {endpoint}: {reason}")]
    Connect { endpoint: String, reason: String },

    /// A connected session broke mid-request.
    #[error("transport error for {endpoint}: {reason}")]
    Transport { endpoint: String, reason: String },

    /// The server answered with a JSON-RPC error.
    #[error("server error [{code}]: {message}")]
    Rpc {
        code: i32,
        message: String,
        data: Option<serde_json::Value>,
    },

    /// An in-process tool call was rejected or failed.
    #[error(transparent)]
    Tool(#[from] ToolError),

    /// Every connection attempt failed; `last_cause` is the final one.
    #[error("gave up on {endpoint} after {attempts} attempts: {last_cause}")]
    Exhausted {
        endpoint: String,
        attempts: u32,
        #[source]
        last_cause: Box<ClientError>,
    },
}

impl ClientError {
    /// Only connection failures are retried.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ClientError::Connect { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_connect_is_retryable() {
        let connect = ClientError::Connect {
            endpoint: "x".into(),
            reason: "refused".into(),
        };
        assert!(connect.is_retryable());
        assert!(!ClientError::Tool(ToolError::UnknownTool { name: "t".into() }).is_retryable());
        assert!(!ClientError::Rpc {
            code: -32601,
            message: "nope".into(),
            data: None,
        }
        .is_retryable());
    }

    #[test]
    fn test_exhausted_exposes_last_cause() {
        let err = ClientError::Exhausted {
            endpoint: "http://localhost:1/mcp".into(),
            attempts: 10,
            last_cause: Box::new(ClientError::Connect {
                endpoint: "http://localhost:1/mcp".into(),
                reason: "connection refused".into(),
            }),
        };
        let source = std::error::Error::source(&err).unwrap();
        assert!(source.to_string().contains("connection refused"));
        assert!(err.to_string().contains("after 10 attempts"));
    }
}
