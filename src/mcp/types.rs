//! Wire types for the structured tool-calling protocol.
//!
//! JSON-RPC 2.0 message types and the MCP structures exchanged on `/mcp`,
//! shared by the sub-service and the HTTP invocation client.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::tool_registry::{ContentBlock, ToolDefinition, ToolResult};

/// Protocol revision announced by `initialize`.
pub const PROTOCOL_VERSION: &str = "2025-06-18";

/// Header carrying the session id assigned by `initialize`.
pub const SESSION_HEADER: &str = "mcp-session-id";

// ─── JSON-RPC 2.0 ───────────────────────────────────────────────────────────

/// JSON-RPC 2.0 request or notification (no `id`).
///
/// A present `"id": null` is a request with a null id, not a notification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    #[serde(
        default,
        deserialize_with = "present_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<Value>,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl JsonRpcRequest {
    /// Create a new JSON-RPC request.
    pub fn new(id: u64, method: &str, params: Option<Value>) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id: Some(Value::from(id)),
            method: method.to_string(),
            params,
        }
    }

    /// Create a notification (no response expected).
    pub fn notification(method: &str, params: Option<Value>) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id: None,
            method: method.to_string(),
            params,
        }
    }

    pub fn is_notification(&self) -> bool {
        self.id.is_none()
    }
}

/// Only called when the `id` key exists, so `null` maps to `Some(Value::Null)`.
fn present_id<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

/// JSON-RPC 2.0 response message (success or error).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    pub id: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

impl JsonRpcResponse {
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn failure(id: Value, error: JsonRpcError) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: None,
            error: Some(error),
        }
    }
}

/// JSON-RPC 2.0 error object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }
}

/// Extract the result from a JSON-RPC response, surfacing the error object otherwise.
pub fn extract_result(response: JsonRpcResponse) -> Result<Value, JsonRpcError> {
    if let Some(err) = response.error {
        return Err(err);
    }

    response.result.ok_or_else(|| {
        JsonRpcError::new(
            error_codes::INTERNAL_ERROR,
            "response missing both result and error",
        )
    })
}

// ─── MCP Protocol Types ──────────────────────────────────────────────────────

/// Tool entry in a `tools/list` response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct McpToolDefinition {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "inputSchema", default)]
    pub input_schema: Value,
}

impl From<&ToolDefinition> for McpToolDefinition {
    fn from(def: &ToolDefinition) -> Self {
        Self {
            name: def.name.clone(),
            description: def.description.clone(),
            input_schema: def.input_schema(),
        }
    }
}

/// `tools/list` result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListToolsResult {
    pub tools: Vec<McpToolDefinition>,
}

/// `tools/call` params.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallToolParams {
    pub name: String,
    #[serde(default)]
    pub arguments: Option<Value>,
}

/// `tools/call` result as carried on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallToolResult {
    #[serde(default)]
    pub content: Vec<ContentBlock>,
    #[serde(
        rename = "structuredContent",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub structured_content: Option<serde_json::Map<String, Value>>,
    #[serde(rename = "isError", default)]
    pub is_error: bool,
}

impl From<ToolResult> for CallToolResult {
    fn from(result: ToolResult) -> Self {
        match result {
            ToolResult::Structured(map) => {
                let text = serde_json::to_string_pretty(&map).unwrap_or_default();
                Self {
                    content: vec![ContentBlock::text(text)],
                    structured_content: Some(map),
                    is_error: false,
                }
            }
            ToolResult::RawContent(content) => Self {
                content,
                structured_content: None,
                is_error: false,
            },
            ToolResult::Error(message) => Self {
                content: vec![ContentBlock::text(message)],
                structured_content: None,
                is_error: true,
            },
        }
    }
}

impl From<CallToolResult> for ToolResult {
    fn from(wire: CallToolResult) -> Self {
        if wire.is_error {
            let message = wire
                .content
                .iter()
                .find_map(ContentBlock::as_text)
                .unwrap_or("tool reported an error")
                .to_string();
            return ToolResult::Error(message);
        }
        match wire.structured_content {
            Some(map) => ToolResult::Structured(map),
            None => ToolResult::RawContent(wire.content),
        }
    }
}

/// Server info returned in the initialize response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerInfo {
    pub name: String,
    pub version: String,
}

/// MCP initialize response payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitializeResult {
    #[serde(rename = "protocolVersion")]
    pub protocol_version: String,
    #[serde(default)]
    pub capabilities: Value,
    #[serde(rename = "serverInfo")]
    pub server_info: ServerInfo,
}

// ─── Standard Error Codes ────────────────────────────────────────────────────

/// Well-known JSON-RPC error codes.
pub mod error_codes {
    /// Invalid JSON was received.
    pub const PARSE_ERROR: i32 = -32700;
    /// The JSON sent is not a valid Request object.
    pub const INVALID_REQUEST: i32 = -32600;
    /// The method does not exist or is not available.
    pub const METHOD_NOT_FOUND: i32 = -32601;
    /// Invalid method parameters (also: unknown tool, bad tool arguments).
    pub const INVALID_PARAMS: i32 = -32602;
    /// Internal JSON-RPC error.
    pub const INTERNAL_ERROR: i32 = -32603;
}

// ─── Tests ───────────────────────────────────────────────────────────────────
