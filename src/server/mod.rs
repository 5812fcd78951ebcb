//! Gateway HTTP server: REST facade, `/ws` channel and the `/mcp` mount.
//!
//! One [`Gateway`] owns the shared registry and data; the REST facade and
//! the MCP sub-service both read from the same `Arc<ToolRegistry>`, and
//! their startup/shutdown runs through a single combined [`Lifespan`].

pub mod errors;
pub mod lifespan;
pub mod rest;
pub mod ws;

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::routing::get;
use axum::Router;
use serde_json::Value;
use tokio::net::TcpListener;
use tower::ServiceExt;
use tower_http::trace::TraceLayer;

use crate::config::GatewayConfig;
use crate::mcp::{self, McpService};
use crate::newsroom::{build_registry, NewsroomData};
use crate::tool_registry::ToolRegistry;
use crate::upstream::UpstreamClient;

pub use errors::{ApiError, GatewayError};
pub use lifespan::{LifecycleHook, Lifespan, RunningLifespan};

/// Tools the fixed REST routes depend on.
const REST_TOOLS: [&str; 2] = ["list_business_units", "list_users"];

/// Current time as fractional Unix seconds.
pub fn unix_time() -> f64 {
    chrono::Utc::now().timestamp_micros() as f64 / 1_000_000.0
}

// ─── Shared State ────────────────────────────────────────────────────────────

/// Handler state shared by every REST route.
#[derive(Debug, Clone)]
pub struct AppState {
    pub registry: Arc<ToolRegistry>,
    pub mcp: Arc<McpService>,
    pub data: Arc<NewsroomData>,
    pub upstream: UpstreamClient,
}

/// Build the combined router: REST facade, `/ws`, and the MCP sub-service at `/mcp`.
pub fn build_router(state: AppState) -> Router {
    let mcp_service = Arc::clone(&state.mcp);
    Router::new()
        .merge(rest::routes())
        .route("/ws", get(ws::ws_handler))
        .with_state(state)
        .nest("/mcp", mcp::router(mcp_service))
        .layer(TraceLayer::new_for_http())
}

// ─── REST Lifecycle ──────────────────────────────────────────────────────────

/// Lifecycle hook for the REST facade.
///
/// Startup fails if a tool that a fixed route invokes is not registered.
pub struct RestFacade {
    registry: Arc<ToolRegistry>,
}

impl RestFacade {
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self { registry }
    }
}

#[async_trait]
impl LifecycleHook for RestFacade {
    fn name(&self) -> &str {
        "rest"
    }

    async fn startup(&self) -> anyhow::Result<()> {
        for tool in REST_TOOLS {
            if self.registry.get_tool(tool).is_none() {
                anyhow::bail!("REST route depends on unregistered tool '{tool}'");
            }
        }
        tracing::info!(tools = self.registry.len(), "rest facade started");
        Ok(())
    }

    async fn shutdown(&self) {
        tracing::info!("rest facade stopped");
    }
}

// ─── Gateway ─────────────────────────────────────────────────────────────────

/// The assembled gateway: configuration plus shared state.
pub struct Gateway {
    config: GatewayConfig,
    state: AppState,
}

impl Gateway {
    /// Build the registry, the MCP sub-service and the shared state from config.
    pub fn build(config: GatewayConfig) -> Result<Self, GatewayError> {
        let upstream = UpstreamClient::new(config.upstream_timeout)?;
        Self::with_data(config, Arc::new(NewsroomData::seed()), upstream)
    }

    /// Build with an explicit data set and upstream client.
    pub fn with_data(
        config: GatewayConfig,
        data: Arc<NewsroomData>,
        upstream: UpstreamClient,
    ) -> Result<Self, GatewayError> {
        let registry = Arc::new(build_registry(&config, Arc::clone(&data), upstream.clone())?);
        let mcp = Arc::new(McpService::new(Arc::clone(&registry)));
        Ok(Self {
            config,
            state: AppState {
                registry,
                mcp,
                data,
                upstream,
            },
        })
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn router(&self) -> Router {
        build_router(self.state.clone())
    }

    /// REST facade first, then the MCP sub-service.
    pub fn lifespan(&self) -> Lifespan {
        Lifespan::new()
            .with(Arc::new(RestFacade::new(Arc::clone(&self.state.registry))))
            .with(Arc::clone(&self.state.mcp) as Arc<dyn LifecycleHook>)
    }

    /// Start the lifespan, serve on `listener` until `shutdown` resolves, then tear down.
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> Result<(), GatewayError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = listener
            .local_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| "unknown".to_string());

        let running = self.lifespan().start().await?;

        tracing::info!(
            version = env!("CARGO_PKG_VERSION"),
            addr = %addr,
            tools = ?self.state.registry.list(),
            pid = std::process::id(),
            "=== newsroom-gateway listening ==="
        );

        let served = axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown)
            .await;

        running.shutdown().await;
        tracing::info!(addr = %addr, "gateway stopped");

        served.map_err(|e| GatewayError::Serve {
            reason: e.to_string(),
        })
    }
}

// ─── In-Process Requests ─────────────────────────────────────────────────────

/// Send one request through `router` without a socket; returns status and JSON body.
///
/// Non-JSON bodies come back as a JSON string, empty bodies as `null`.
pub async fn call_in_process(
    router: &Router,
    method: Method,
    uri: &str,
    body: Option<Value>,
) -> Result<(StatusCode, Value), GatewayError> {
    let in_process = |e: &dyn std::fmt::Display| GatewayError::InProcess {
        reason: e.to_string(),
    };

    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(json) => {
            builder = builder.header("content-type", "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };
    let request = builder.body(body).map_err(|e| in_process(&e))?;

    let response = router
        .clone()
        .oneshot(request)
        .await
        .map_err(|e| in_process(&e))?;
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .map_err(|e| in_process(&e))?;

    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
    };
    Ok((status, value))
}

// ─── Tests ───────────────────────────────────────────────────────────────────
