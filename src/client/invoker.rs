//! Invocation client: connect with bounded retries, list tools, call one.
//!
//! Only connection failures are retried, with a fixed backoff between
//! attempts. Once a session is open, errors from listing or calling are
//! returned as-is.

use std::sync::Arc;
use std::time::Duration;

use crate::config::GatewayConfig;
use crate::tool_registry::{ToolArguments, ToolResult};

use super::errors::ClientError;
use super::transport::Connector;

/// Default number of connection attempts.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 10;

/// Default fixed delay between connection attempts.
pub const DEFAULT_BACKOFF: Duration = Duration::from_secs(1);

/// Connection retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    backoff: Duration,
}

impl RetryPolicy {
    /// `max_attempts` is clamped to at least one.
    pub fn new(max_attempts: u32, backoff: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }

    pub fn from_config(config: &GatewayConfig) -> Self {
        Self::new(config.client_max_attempts, config.client_backoff)
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn backoff(&self) -> Duration {
        self.backoff
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS, DEFAULT_BACKOFF)
    }
}

/// A completed invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct CallOutcome {
    /// Tool names the session listed, in server order.
    pub tools: Vec<String>,
    pub result: ToolResult,
    /// Connection attempts used, including the successful one.
    pub attempts: u32,
}

/// Calls tools on a registry reached through a [`Connector`].
#[derive(Clone)]
pub struct InvocationClient {
    connector: Arc<dyn Connector>,
    policy: RetryPolicy,
}

impl InvocationClient {
    pub fn new(connector: Arc<dyn Connector>, policy: RetryPolicy) -> Self {
        Self { connector, policy }
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Connect (retrying), list the available tools, then call `tool` once.
    pub async fn call(
        &self,
        tool: &str,
        arguments: Option<ToolArguments>,
    ) -> Result<CallOutcome, ClientError> {
        let endpoint = self.connector.endpoint().to_string();
        let max_attempts = self.policy.max_attempts;
        let mut arguments = arguments;
        let mut last_cause: Option<ClientError> = None;

        for attempt in 1..=max_attempts {
            if attempt > 1 {
                tokio::time::sleep(self.policy.backoff).await;
            }

            let mut session = match self.connector.connect().await {
                Ok(session) => session,
                Err(e) if e.is_retryable() => {
                    tracing::warn!(
                        endpoint = %endpoint,
                        attempt,
                        max_attempts,
                        error = %e,
                        "connection attempt failed"
                    );
                    last_cause = Some(e);
                    continue;
                }
                Err(e) => return Err(e),
            };

            let tools: Vec<String> = session
                .list_tools()
                .await?
                .into_iter()
                .map(|t| t.name)
                .collect();
            tracing::info!(endpoint = %endpoint, attempt, tools = ?tools, "connected");

            let result = session.call_tool(tool, arguments.take()).await?;
            tracing::info!(
                endpoint = %endpoint,
                tool,
                is_error = result.is_error(),
                "tool call completed"
            );

            return Ok(CallOutcome {
                tools,
                result,
                attempts: attempt,
            });
        }

        let last_cause = last_cause.unwrap_or_else(|| ClientError::Connect {
            endpoint: endpoint.clone(),
            reason: "no connection attempt was made".to_string(),
        });
        tracing::error!(endpoint = %endpoint, attempts = max_attempts, error = %last_cause, "giving up");
        Err(ClientError::Exhausted {
            endpoint,
            attempts: max_attempts,
            last_cause: Box::new(last_cause),
        })
    }
}

/// Connect with retries and invoke `tool` once, returning its result.
pub async fn connect_and_call(
    connector: Arc<dyn Connector>,
    tool: &str,
    arguments: Option<ToolArguments>,
    policy: RetryPolicy,
) -> Result<ToolResult, ClientError> {
    InvocationClient::new(connector, policy)
        .call(tool, arguments)
        .await
        .map(|outcome| outcome.result)
}

// ─── Tests ───────────────────────────────────────────────────────────────────
