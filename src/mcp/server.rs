//! MCP sub-service: the registry exposed over JSON-RPC at `/mcp`.
//!
//! Handles `initialize`, `ping`, `tools/list` and `tools/call` on a single
//! `POST /` route (nested under `/mcp` by the gateway router). The service
//! shares the gateway's `Arc<ToolRegistry>`; it keeps no tool state of its
//! own, only a readiness flag driven by the combined lifespan. Session ids
//! are issued on `initialize` but never stored or checked.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use serde_json::Value;
use uuid::Uuid;

use crate::server::lifespan::LifecycleHook;
use crate::tool_registry::{
    arguments_from_value, ToolArguments, ToolError, ToolRegistry, ToolResult,
};

use super::types::{
    error_codes, CallToolParams, CallToolResult, InitializeResult, JsonRpcError, JsonRpcRequest,
    JsonRpcResponse, ListToolsResult, McpToolDefinition, ServerInfo, PROTOCOL_VERSION,
    SESSION_HEADER,
};

// ─── McpService ──────────────────────────────────────────────────────────────

/// The structured tool-calling sub-service.
pub struct McpService {
    registry: Arc<ToolRegistry>,
    server_info: ServerInfo,
    ready: AtomicBool,
}

impl std::fmt::Debug for McpService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("McpService")
            .field("server_info", &self.server_info)
            .field("ready", &self.is_ready())
            .finish()
    }
}

/// Outcome of dispatching one JSON-RPC message.
#[derive(Debug)]
pub enum Dispatch {
    /// A response to send back (success or JSON-RPC error).
    Reply(JsonRpcResponse),
    /// `initialize` succeeded; the new session id goes in the response header.
    Initialized {
        response: JsonRpcResponse,
        session_id: String,
    },
    /// The message was a notification; nothing to send.
    Accepted,
}

impl McpService {
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self {
            registry,
            server_info: ServerInfo {
                name: "newsroom-gateway".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
            ready: AtomicBool::new(false),
        }
    }

    pub fn registry(&self) -> &Arc<ToolRegistry> {
        &self.registry
    }

    /// Whether the lifespan has started this service.
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    /// Every registered tool, in registration order.
    pub fn list_tools(&self) -> Vec<McpToolDefinition> {
        self.registry
            .definitions()
            .into_iter()
            .map(McpToolDefinition::from)
            .collect()
    }

    /// Invoke a tool through the shared registry.
    pub async fn call_tool(
        &self,
        name: &str,
        arguments: Option<ToolArguments>,
    ) -> Result<ToolResult, ToolError> {
        self.registry.invoke(name, arguments).await
    }

    /// Dispatch one JSON-RPC message.
    pub async fn dispatch(&self, request: JsonRpcRequest) -> Dispatch {
        if request.is_notification() {
            tracing::debug!(method = %request.method, "mcp notification");
            return Dispatch::Accepted;
        }
        let id = request.id.clone().unwrap_or(Value::Null);

        tracing::debug!(method = %request.method, id = %id, "mcp request");

        let outcome = match request.method.as_str() {
            "initialize" => return self.initialize(id),
            "ping" => Ok(serde_json::json!({})),
            "tools/list" => {
                let result = ListToolsResult {
                    tools: self.list_tools(),
                };
                to_value(result)
            }
            "tools/call" => self.handle_call(request.params).await,
            other => Err(JsonRpcError::new(
                error_codes::METHOD_NOT_FOUND,
                format!("Method not found: {other}"),
            )),
        };

        Dispatch::Reply(match outcome {
            Ok(result) => JsonRpcResponse::success(id, result),
            Err(error) => JsonRpcResponse::failure(id, error),
        })
    }

    fn initialize(&self, id: Value) -> Dispatch {
        let session_id = Uuid::new_v4().to_string();

        let result = InitializeResult {
            protocol_version: PROTOCOL_VERSION.to_string(),
            capabilities: serde_json::json!({ "tools": { "listChanged": false } }),
            server_info: self.server_info.clone(),
        };

        tracing::info!(session_id = %session_id, "mcp session initialized");

        match to_value(result) {
            Ok(result) => Dispatch::Initialized {
                response: JsonRpcResponse::success(id, result),
                session_id,
            },
            Err(error) => Dispatch::Reply(JsonRpcResponse::failure(id, error)),
        }
    }

    async fn handle_call(&self, params: Option<Value>) -> Result<Value, JsonRpcError> {
        let params: CallToolParams =
            serde_json::from_value(params.unwrap_or(Value::Null)).map_err(|e| {
                JsonRpcError::new(
                    error_codes::INVALID_PARAMS,
                    format!("invalid tools/call params: {e}"),
                )
            })?;

        let arguments = arguments_from_value(&params.name, params.arguments.unwrap_or(Value::Null))
            .map_err(tool_error_to_rpc)?;

        match self.call_tool(&params.name, arguments).await {
            Ok(result) => to_value(CallToolResult::from(result)),
            // Handler failures are results with `isError`, not protocol errors.
            Err(err @ ToolError::Execution { .. }) => {
                tracing::warn!(tool = %params.name, error = %err, "mcp tool call failed");
                to_value(CallToolResult::from(ToolResult::Error(err.to_string())))
            }
            Err(err) => Err(tool_error_to_rpc(err)),
        }
    }
}

fn tool_error_to_rpc(err: ToolError) -> JsonRpcError {
    let kind = match &err {
        ToolError::UnknownTool { .. } => "unknown_tool",
        ToolError::InvalidArgument { .. } => "invalid_argument",
        ToolError::DuplicateName { .. } | ToolError::Execution { .. } => {
            return JsonRpcError::new(error_codes::INTERNAL_ERROR, err.to_string());
        }
    };
    JsonRpcError::new(error_codes::INVALID_PARAMS, err.to_string())
        .with_data(serde_json::json!({ "kind": kind }))
}

fn to_value<T: serde::Serialize>(value: T) -> Result<Value, JsonRpcError> {
    serde_json::to_value(value)
        .map_err(|e| JsonRpcError::new(error_codes::INTERNAL_ERROR, e.to_string()))
}

// ─── Lifecycle ───────────────────────────────────────────────────────────────

#[async_trait]
impl LifecycleHook for McpService {
    fn name(&self) -> &str {
        "mcp"
    }

    async fn startup(&self) -> anyhow::Result<()> {
        if self.ready.swap(true, Ordering::AcqRel) {
            anyhow::bail!("mcp sub-service is already running");
        }
        tracing::info!(tools = self.registry.len(), "mcp sub-service started");
        Ok(())
    }

    async fn shutdown(&self) {
        self.ready.store(false, Ordering::Release);
        tracing::info!("mcp sub-service stopped");
    }
}

// ─── HTTP Binding ────────────────────────────────────────────────────────────

/// Router serving the sub-service; mount it with `.nest("/mcp", ...)`.
pub fn router(service: Arc<McpService>) -> Router {
    Router::new()
        .route("/", post(handle_post))
        .with_state(service)
}

async fn handle_post(State(service): State<Arc<McpService>>, body: Bytes) -> Response {
    if !service.is_ready() {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(serde_json::json!({ "error": "mcp sub-service is not running" })),
        )
            .into_response();
    }

    let request: JsonRpcRequest = match serde_json::from_slice::<Value>(&body) {
        Err(e) => {
            return rpc_error_response(
                StatusCode::BAD_REQUEST,
                JsonRpcError::new(error_codes::PARSE_ERROR, format!("Parse error: {e}")),
            )
        }
        Ok(Value::Array(_)) => {
            return rpc_error_response(
                StatusCode::BAD_REQUEST,
                JsonRpcError::new(error_codes::INVALID_REQUEST, "batch requests are not supported"),
            )
        }
        Ok(value) => match serde_json::from_value(value) {
            Ok(request) => request,
            Err(e) => {
                return rpc_error_response(
                    StatusCode::BAD_REQUEST,
                    JsonRpcError::new(error_codes::INVALID_REQUEST, format!("Invalid request: {e}")),
                )
            }
        },
    };

    match service.dispatch(request).await {
        Dispatch::Accepted => StatusCode::ACCEPTED.into_response(),
        Dispatch::Reply(response) => Json(response).into_response(),
        Dispatch::Initialized {
            response,
            session_id,
        } => {
            let mut http = Json(response).into_response();
            if let Ok(value) = HeaderValue::from_str(&session_id) {
                http.headers_mut().insert(SESSION_HEADER, value);
            }
            http
        }
    }
}

fn rpc_error_response(status: StatusCode, error: JsonRpcError) -> Response {
    (status, Json(JsonRpcResponse::failure(Value::Null, error))).into_response()
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tool_registry::{handler_fn, ParamType, ToolDefinition};
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    fn registry() -> Arc<ToolRegistry> {
        let mut registry = ToolRegistry::new();
        registry
            .register(
                ToolDefinition::new("echo", "Echo the arguments back.").optional(
                    "word",
                    ParamType::String,
                    "Word to echo",
                ),
                handler_fn(|args| async move {
                    Ok(ToolResult::Structured(args))
                }),
            )
            .unwrap();
        registry
            .register(
                ToolDefinition::new("explode", "Always fails."),
                handler_fn(|_| async { Err(anyhow::anyhow!("kaboom")) }),
            )
            .unwrap();
        Arc::new(registry)
    }

    async fn started() -> Arc<McpService> {
        let service = Arc::new(McpService::new(registry()));
        service.startup().await.unwrap();
        service
    }

    async fn post_rpc(service: Arc<McpService>, body: Value) -> (StatusCode, Option<String>, Value) {
        let response = router(service)
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/")
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let session = response
            .headers()
            .get(SESSION_HEADER)
            .map(|v| v.to_str().unwrap().to_string());
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, session, json)
    }

    #[tokio::test]
    async fn test_not_ready_returns_503() {
        let service = Arc::new(McpService::new(registry()));
        let (status, _, body) = post_rpc(
            service,
            serde_json::json!({"jsonrpc": "2.0", "id": 1, "method": "ping"}),
        )
        .await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn test_initialize_issues_session_id() {
        let service = started().await;
        let (status, session, body) = post_rpc(
            service.clone(),
            serde_json::json!({"jsonrpc": "2.0", "id": 1, "method": "initialize", "params": {}}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(session.is_some());
        assert_eq!(body["result"]["protocolVersion"], PROTOCOL_VERSION);
        assert_eq!(body["result"]["serverInfo"]["name"], "newsroom-gateway");
    }

    #[tokio::test]
    async fn test_repeated_initialize_issues_fresh_ids() {
        let service = started().await;
        let mut seen = std::collections::HashSet::new();
        for id in 0..500u64 {
            match service.initialize(Value::from(id)) {
                Dispatch::Initialized { session_id, .. } => assert!(seen.insert(session_id)),
                other => panic!("expected Initialized, got {other:?}"),
            }
        }
        assert_eq!(seen.len(), 500);

        // Requests without a session header are still served.
        let (status, session, body) = post_rpc(
            service,
            serde_json::json!({"jsonrpc": "2.0", "id": 9, "method": "ping"}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(session.is_none());
        assert_eq!(body["result"], serde_json::json!({}));
    }

    #[tokio::test]
    async fn test_tools_list_matches_registry() {
        let service = started().await;
        let (_, _, body) = post_rpc(
            service,
            serde_json::json!({"jsonrpc": "2.0", "id": 2, "method": "tools/list"}),
        )
        .await;
        let names: Vec<&str> = body["result"]["tools"]
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["echo", "explode"]);
        assert_eq!(
            body["result"]["tools"][0]["inputSchema"]["properties"]["word"]["type"],
            "string"
        );
    }

    #[tokio::test]
    async fn test_tools_call_structured() {
        let service = started().await;
        let (_, _, body) = post_rpc(
            service,
            serde_json::json!({
                "jsonrpc": "2.0", "id": "a", "method": "tools/call",
                "params": {"name": "echo", "arguments": {"word": "hi"}}
            }),
        )
        .await;
        assert_eq!(body["id"], "a");
        assert_eq!(body["result"]["structuredContent"], serde_json::json!({"word": "hi"}));
        assert_eq!(body["result"]["isError"], false);
    }

    #[tokio::test]
    async fn test_tools_call_unknown_tool_is_invalid_params() {
        let service = started().await;
        let (_, _, body) = post_rpc(
            service,
            serde_json::json!({
                "jsonrpc": "2.0", "id": 3, "method": "tools/call",
                "params": {"name": "nope"}
            }),
        )
        .await;
        assert_eq!(body["error"]["code"], error_codes::INVALID_PARAMS);
        assert_eq!(body["error"]["data"]["kind"], "unknown_tool");
    }

    #[tokio::test]
    async fn test_tools_call_bad_arguments_is_invalid_params() {
        let service = started().await;
        let (_, _, body) = post_rpc(
            service,
            serde_json::json!({
                "jsonrpc": "2.0", "id": 4, "method": "tools/call",
                "params": {"name": "echo", "arguments": {"word": 5}}
            }),
        )
        .await;
        assert_eq!(body["error"]["code"], error_codes::INVALID_PARAMS);
        assert_eq!(body["error"]["data"]["kind"], "invalid_argument");
    }

    #[tokio::test]
    async fn test_tools_call_failure_is_error_result() {
        let service = started().await;
        let (_, _, body) = post_rpc(
            service,
            serde_json::json!({
                "jsonrpc": "2.0", "id": 5, "method": "tools/call",
                "params": {"name": "explode"}
            }),
        )
        .await;
        assert!(body.get("error").is_none());
        assert_eq!(body["result"]["isError"], true);
        assert!(body["result"]["content"][0]["text"]
            .as_str()
            .unwrap()
            .contains("kaboom"));
    }

    #[tokio::test]
    async fn test_unknown_method_and_notification() {
        let service = started().await;
        let (_, _, body) = post_rpc(
            service.clone(),
            serde_json::json!({"jsonrpc": "2.0", "id": 6, "method": "resources/list"}),
        )
        .await;
        assert_eq!(body["error"]["code"], error_codes::METHOD_NOT_FOUND);

        let (status, _, _) = post_rpc(
            service,
            serde_json::json!({"jsonrpc": "2.0", "method": "notifications/initialized"}),
        )
        .await;
        assert_eq!(status, StatusCode::ACCEPTED);
    }

    #[tokio::test]
    async fn test_null_id_gets_a_reply() {
        let service = started().await;
        let (status, _, body) = post_rpc(
            service,
            serde_json::json!({"jsonrpc": "2.0", "id": null, "method": "ping"}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.get("id").is_some_and(Value::is_null));
        assert_eq!(body["result"], serde_json::json!({}));
    }

    #[tokio::test]
    async fn test_malformed_body_is_parse_error() {
        let service = started().await;
        let response = router(service)
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/")
                    .body(Body::from("{not json"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"]["code"], error_codes::PARSE_ERROR);
    }

    #[tokio::test]
    async fn test_double_start_fails_and_restart_after_shutdown() {
        let service = started().await;
        assert!(service.startup().await.is_err());

        service.shutdown().await;
        assert!(!service.is_ready());
        service.startup().await.unwrap();
        assert!(service.is_ready());
    }
}
