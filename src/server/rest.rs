//! REST facade: health, upstream proxy, newsroom data and tool routes.
//!
//! Tool routes go through the shared registry and return the normalized
//! JSON form of the result. Every failure renders as `{"error": ...}`.

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::Value;

use crate::mcp::McpToolDefinition;
use crate::tool_registry::{arguments_from_value, normalize, ToolInvocationRequest};
use crate::upstream::join_url;

use super::errors::ApiError;
use super::{unix_time, AppState};

type ApiResult = Result<Json<Value>, ApiError>;
type QueryPairs = Query<Vec<(String, String)>>;

/// Routes served by the REST facade.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/status", get(status))
        .route("/call", axum::routing::post(call_proxy))
        .route("/external/demo", get(external_demo))
        .route("/newsroom/business-units", get(newsroom_business_units))
        .route("/newsroom/users", get(newsroom_users))
        .route("/tools", get(list_tools))
        .route(
            "/tools/newsroom/list-business-units",
            get(tool_list_business_units),
        )
        .route("/tools/newsroom/list-users", get(tool_list_users))
        .route("/tools/{name}", get(invoke_tool_get).post(invoke_tool_post))
}

// ─── Health & Proxy ──────────────────────────────────────────────────────────

async fn status() -> Json<Value> {
    Json(serde_json::json!({ "status": "ok", "time": unix_time() }))
}

async fn external_demo() -> Json<Value> {
    Json(serde_json::json!({
        "service": "external-demo",
        "message": "hello from external demo",
        "time": unix_time(),
    }))
}

/// `POST /call {"base": ..., "path": ...}`: GET `base + path` and echo the response.
async fn call_proxy(State(state): State<AppState>, body: Bytes) -> ApiResult {
    let payload: Value = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| ApiError::bad_request(format!("request body must be JSON: {e}")))?
    };

    let base = payload
        .get("base")
        .and_then(Value::as_str)
        .filter(|b| !b.is_empty())
        .ok_or_else(|| ApiError::bad_request("base required"))?;
    let path = payload.get("path").and_then(Value::as_str).unwrap_or("");
    let url = join_url(base, path);

    tracing::info!(url = %url, "proxying call");

    let proxied = state
        .upstream
        .fetch(&url)
        .await
        .map_err(|e| ApiError::internal(e.to_string()))?;

    let value =
        serde_json::to_value(proxied).map_err(|e| ApiError::internal(e.to_string()))?;
    Ok(Json(value))
}

// ─── Newsroom Data ───────────────────────────────────────────────────────────

async fn newsroom_business_units(State(state): State<AppState>) -> Json<Value> {
    Json(state.data.business_units_payload())
}

async fn newsroom_users(State(state): State<AppState>, Query(pairs): QueryPairs) -> ApiResult {
    let business_unit_id = match pairs.iter().find(|(k, _)| k == "business_unit_id") {
        None => None,
        Some((_, raw)) => Some(raw.trim().parse::<i64>().map_err(|_| {
            ApiError::bad_request(format!("business_unit_id must be an integer, got '{raw}'"))
        })?),
    };
    Ok(Json(state.data.users_payload(business_unit_id)))
}

// ─── Tool Routes ─────────────────────────────────────────────────────────────

async fn list_tools(State(state): State<AppState>) -> Json<Value> {
    let tools: Vec<McpToolDefinition> = state
        .registry
        .definitions()
        .into_iter()
        .map(McpToolDefinition::from)
        .collect();
    Json(serde_json::json!({ "tools": tools }))
}

async fn tool_list_business_units(
    State(state): State<AppState>,
    Query(pairs): QueryPairs,
) -> ApiResult {
    invoke_with_query(&state, "list_business_units", pairs, false).await
}

async fn tool_list_users(State(state): State<AppState>, Query(pairs): QueryPairs) -> ApiResult {
    invoke_with_query(&state, "list_users", pairs, false).await
}

async fn invoke_tool_get(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(pairs): QueryPairs,
) -> ApiResult {
    invoke_with_query(&state, &name, pairs, true).await
}

async fn invoke_tool_post(
    State(state): State<AppState>,
    Path(name): Path<String>,
    body: Bytes,
) -> ApiResult {
    let value: Value = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| ApiError::bad_request(format!("request body must be JSON: {e}")))?
    };
    let arguments = arguments_from_value(&name, value)?;
    let result = state
        .registry
        .invoke_request(ToolInvocationRequest::new(&name, arguments))
        .await?;
    Ok(Json(normalize(result)))
}

/// Coerce query pairs to the tool's parameter types and invoke it.
///
/// With `strict` off, keys the tool does not declare are ignored instead of rejected.
async fn invoke_with_query(
    state: &AppState,
    tool: &str,
    pairs: Vec<(String, String)>,
    strict: bool,
) -> ApiResult {
    let pairs: Vec<(String, String)> = match state.registry.get_tool(tool) {
        Some(def) if !strict => pairs
            .into_iter()
            .filter(|(k, _)| def.param(k).is_some())
            .collect(),
        _ => pairs,
    };
    let arguments = state.registry.coerce_query(tool, &pairs)?;
    let result = state.registry.invoke(tool, Some(arguments)).await?;
    Ok(Json(normalize(result)))
}
