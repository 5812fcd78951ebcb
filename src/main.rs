//! `newsroom-gateway` command line.
//!
//! - serve: run the gateway (default)
//! - call: connect to a registry with retries and invoke one tool
//! - demo: exercise the REST facade in-process, without a socket

use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};

use newsroom_gateway::client::{Connector, HttpConnector, InProcessConnector, InvocationClient, RetryPolicy};
use newsroom_gateway::tool_registry::{arguments_from_value, normalize};
use newsroom_gateway::{init_tracing, run_demo, run_server, Gateway, GatewayConfig};

/// Newsroom tool gateway: one registry over REST, MCP and WebSocket
#[derive(Parser, Debug)]
#[command(name = "newsroom-gateway")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Serve the REST facade, /ws and /mcp on GATEWAY_ADDR
    Serve,

    /// Invoke one tool and print its normalized result
    Call {
        /// Tool name, e.g. list_users
        tool: String,

        /// Tool arguments as a JSON object
        #[arg(short, long)]
        args: Option<String>,

        /// `/mcp` URL of a running gateway, or `in-process`
        #[arg(short, long, default_value = "in-process")]
        endpoint: String,
    },

    /// Run a few REST requests against an in-process gateway
    Demo,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let config = GatewayConfig::from_env().context("loading configuration")?;

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => run_server(config).await?,
        Commands::Call {
            tool,
            args,
            endpoint,
        } => call(config, &tool, args.as_deref(), &endpoint).await?,
        Commands::Demo => {
            let gateway = Gateway::build(config)?;
            for (uri, status, body) in run_demo(&gateway).await? {
                println!("GET {uri} -> {}", status.as_u16());
                println!("{}", serde_json::to_string_pretty(&body)?);
            }
        }
    }
    Ok(())
}

async fn call(
    config: GatewayConfig,
    tool: &str,
    args: Option<&str>,
    endpoint: &str,
) -> anyhow::Result<()> {
    let arguments = match args {
        Some(raw) => {
            let value: serde_json::Value =
                serde_json::from_str(raw).context("--args must be a JSON object")?;
            arguments_from_value(tool, value)?
        }
        None => None,
    };
    let policy = RetryPolicy::from_config(&config);

    // Held so the in-process sub-service stays started for the call.
    let mut running = None;
    let connector: Arc<dyn Connector> = if endpoint == "in-process" {
        let gateway = Gateway::build(config.clone())?;
        running = Some(gateway.lifespan().start().await?);
        Arc::new(InProcessConnector::new(Arc::clone(&gateway.state().mcp)))
    } else {
        Arc::new(HttpConnector::new(endpoint, config.upstream_timeout)?)
    };

    let outcome = InvocationClient::new(connector, policy)
        .call(tool, arguments)
        .await;

    if let Some(running) = running {
        running.shutdown().await;
    }
    let outcome = outcome?;

    eprintln!("tools: {}", outcome.tools.join(", "));
    println!("{}", serde_json::to_string_pretty(&normalize(outcome.result))?);
    Ok(())
}
