pub mod client;
pub mod config;
pub mod mcp;
pub mod newsroom;
pub mod server;
pub mod tool_registry;
pub mod upstream;

use axum::http::{Method, StatusCode};
use serde_json::Value;
use tokio::net::TcpListener;

pub use config::GatewayConfig;
pub use server::{Gateway, GatewayError};

/// Log filter used when `RUST_LOG` is unset.
const DEFAULT_LOG_FILTER: &str = "newsroom_gateway=info,tower_http=info,warn";

/// Requests the `demo` command sends through the in-process router.
pub const DEMO_REQUESTS: [&str; 3] = [
    "/status",
    "/tools/newsroom/list-business-units",
    "/tools/newsroom/list-users?business_unit_id=2",
];

/// Initialize the tracing subscriber on stderr.
///
/// `RUST_LOG` overrides the default filter; `GATEWAY_LOG_FORMAT=json` switches
/// to one JSON object per line. Calling this twice is harmless.
pub fn init_tracing() {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    let json = std::env::var("GATEWAY_LOG_FORMAT")
        .map(|v| v.trim().eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let builder = fmt::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(false);

    // Already initialized (tests, embedding): keep the existing subscriber.
    let _ = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
}

/// Bind `config.bind_addr` and serve the gateway until Ctrl-C.
pub async fn run_server(config: GatewayConfig) -> Result<(), GatewayError> {
    let addr = config.bind_addr;
    let gateway = Gateway::build(config)?;
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| GatewayError::Bind {
            addr: addr.to_string(),
            reason: e.to_string(),
        })?;
    gateway.serve(listener, shutdown_signal()).await
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("shutdown signal received"),
        Err(e) => {
            tracing::error!(error = %e, "failed to listen for Ctrl-C; serving until killed");
            std::future::pending::<()>().await;
        }
    }
}

/// Start the gateway's lifespan in-process, send [`DEMO_REQUESTS`], and tear down.
pub async fn run_demo(gateway: &Gateway) -> Result<Vec<(String, StatusCode, Value)>, GatewayError> {
    let running = gateway.lifespan().start().await?;
    let router = gateway.router();

    let mut exchanges = Vec::with_capacity(DEMO_REQUESTS.len());
    let mut failure = None;
    for uri in DEMO_REQUESTS {
        match server::call_in_process(&router, Method::GET, uri, None).await {
            Ok((status, body)) => {
                tracing::info!(uri, status = status.as_u16(), "demo request");
                exchanges.push((uri.to_string(), status, body));
            }
            Err(e) => {
                failure = Some(e);
                break;
            }
        }
    }

    running.shutdown().await;
    match failure {
        Some(e) => Err(e),
        None => Ok(exchanges),
    }
}
