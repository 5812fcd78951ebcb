//! Client-side connections to a tool registry.
//!
//! A [`Connector`] opens a [`ToolSession`]. Failing to open one is a
//! `ClientError::Connect`, the only error the invocation client retries.
//! Two connectors exist: HTTP JSON-RPC against a gateway's `/mcp` endpoint,
//! and in-process against an [`McpService`] in the same process.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::mcp::types::{
    extract_result, CallToolResult, JsonRpcRequest, JsonRpcResponse, ListToolsResult,
    PROTOCOL_VERSION, SESSION_HEADER,
};
use crate::mcp::{McpService, McpToolDefinition};
use crate::tool_registry::{ToolArguments, ToolError, ToolResult};

use super::errors::ClientError;

static NEXT_REQUEST_ID: AtomicU64 = AtomicU64::new(1);

/// Generate a unique request ID.
pub fn next_request_id() -> u64 {
    NEXT_REQUEST_ID.fetch_add(1, Ordering::Relaxed)
}

// ─── Traits ──────────────────────────────────────────────────────────────────

/// Opens sessions against one endpoint.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Human-readable endpoint, used in logs and errors.
    fn endpoint(&self) -> &str;

    async fn connect(&self) -> Result<Box<dyn ToolSession>, ClientError>;
}

/// An open session that can list and call tools.
#[async_trait]
pub trait ToolSession: Send {
    async fn list_tools(&mut self) -> Result<Vec<McpToolDefinition>, ClientError>;

    async fn call_tool(
        &mut self,
        name: &str,
        arguments: Option<ToolArguments>,
    ) -> Result<ToolResult, ClientError>;
}

// ─── In-Process ──────────────────────────────────────────────────────────────

/// Connects to an [`McpService`] living in the same process.
///
/// Connecting fails until the service's lifespan has started it.
#[derive(Debug, Clone)]
pub struct InProcessConnector {
    service: Arc<McpService>,
}

impl InProcessConnector {
    pub fn new(service: Arc<McpService>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl Connector for InProcessConnector {
    fn endpoint(&self) -> &str {
        "in-process"
    }

    async fn connect(&self) -> Result<Box<dyn ToolSession>, ClientError> {
        if !self.service.is_ready() {
            return Err(ClientError::Connect {
                endpoint: self.endpoint().to_string(),
                reason: "mcp sub-service is not running".to_string(),
            });
        }
        Ok(Box::new(InProcessSession {
            service: Arc::clone(&self.service),
        }))
    }
}

struct InProcessSession {
    service: Arc<McpService>,
}

#[async_trait]
impl ToolSession for InProcessSession {
    async fn list_tools(&mut self) -> Result<Vec<McpToolDefinition>, ClientError> {
        Ok(self.service.list_tools())
    }

    async fn call_tool(
        &mut self,
        name: &str,
        arguments: Option<ToolArguments>,
    ) -> Result<ToolResult, ClientError> {
        // Same contract as the wire: handler failures come back as error results.
        match self.service.call_tool(name, arguments).await {
            Ok(result) => Ok(result),
            Err(err @ ToolError::Execution { .. }) => Ok(ToolResult::Error(err.to_string())),
            Err(err) => Err(ClientError::Tool(err)),
        }
    }
}

// ─── HTTP JSON-RPC ───────────────────────────────────────────────────────────

/// Connects to a gateway's `/mcp` endpoint over HTTP.
///
/// The `initialize` handshake is part of connecting, so an endpoint that is
/// down or not yet started fails with a retryable `Connect` error.
#[derive(Debug, Clone)]
pub struct HttpConnector {
    http: reqwest::Client,
    endpoint: String,
}

impl HttpConnector {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, ClientError> {
        let endpoint = endpoint.into();
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ClientError::Transport {
                endpoint: endpoint.clone(),
                reason: e.to_string(),
            })?;
        Ok(Self { http, endpoint })
    }
}

#[async_trait]
impl Connector for HttpConnector {
    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn connect(&self) -> Result<Box<dyn ToolSession>, ClientError> {
        let mut session = HttpSession {
            http: self.http.clone(),
            endpoint: self.endpoint.clone(),
            session_id: None,
        };
        session
            .initialize()
            .await
            .map_err(|reason| ClientError::Connect {
                endpoint: self.endpoint.clone(),
                reason,
            })?;
        Ok(Box::new(session))
    }
}

struct HttpSession {
    http: reqwest::Client,
    endpoint: String,
    session_id: Option<String>,
}

impl HttpSession {
    async fn post(&self, message: &JsonRpcRequest) -> Result<reqwest::Response, reqwest::Error> {
        let mut request = self.http.post(&self.endpoint).json(message);
        if let Some(id) = &self.session_id {
            request = request.header(SESSION_HEADER, id);
        }
        request.send().await
    }

    /// Run the handshake. Any failure is reported as a plain reason string.
    async fn initialize(&mut self) -> Result<(), String> {
        let params = serde_json::json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": {},
            "clientInfo": {
                "name": "newsroom-gateway-client",
                "version": env!("CARGO_PKG_VERSION"),
            },
        });
        let request = JsonRpcRequest::new(next_request_id(), "initialize", Some(params));

        let response = self.post(&request).await.map_err(|e| e.to_string())?;
        let status = response.status();
        if !status.is_success() {
            return Err(format!("initialize returned HTTP {}", status.as_u16()));
        }
        self.session_id = response
            .headers()
            .get(SESSION_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let rpc: JsonRpcResponse = response.json().await.map_err(|e| e.to_string())?;
        extract_result(rpc).map_err(|e| format!("initialize rejected [{}]: {}", e.code, e.message))?;

        // Best-effort; the session is usable either way.
        let note = JsonRpcRequest::notification("notifications/initialized", None);
        if let Err(e) = self.post(&note).await {
            tracing::debug!(endpoint = %self.endpoint, error = %e, "initialized notification failed");
        }

        tracing::debug!(endpoint = %self.endpoint, session_id = ?self.session_id, "session initialized");
        Ok(())
    }

    async fn request(&self, method: &str, params: Option<Value>) -> Result<Value, ClientError> {
        let transport = |reason: String| ClientError::Transport {
            endpoint: self.endpoint.clone(),
            reason,
        };

        let request = JsonRpcRequest::new(next_request_id(), method, params);
        let response = self
            .post(&request)
            .await
            .map_err(|e| transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(transport(format!("HTTP {}: {body}", status.as_u16())));
        }

        let rpc: JsonRpcResponse = response
            .json()
            .await
            .map_err(|e| transport(format!("invalid JSON-RPC response: {e}")))?;

        extract_result(rpc).map_err(|e| ClientError::Rpc {
            code: e.code,
            message: e.message,
            data: e.data,
        })
    }
}

#[async_trait]
impl ToolSession for HttpSession {
    async fn list_tools(&mut self) -> Result<Vec<McpToolDefinition>, ClientError> {
        let result = self.request("tools/list", None).await?;
        let listed: ListToolsResult =
            serde_json::from_value(result).map_err(|e| ClientError::Transport {
                endpoint: self.endpoint.clone(),
                reason: format!("invalid tools/list result: {e}"),
            })?;
        Ok(listed.tools)
    }

    async fn call_tool(
        &mut self,
        name: &str,
        arguments: Option<ToolArguments>,
    ) -> Result<ToolResult, ClientError> {
        let params = serde_json::json!({ "name": name, "arguments": arguments });
        let result = self.request("tools/call", Some(params)).await?;
        let wire: CallToolResult =
            serde_json::from_value(result).map_err(|e| ClientError::Transport {
                endpoint: self.endpoint.clone(),
                reason: format!("invalid tools/call result: {e}"),
            })?;
        Ok(ToolResult::from(wire))
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
