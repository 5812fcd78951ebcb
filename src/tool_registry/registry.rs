//! Tool registry: the single source of truth for tool behavior.
//!
//! Provides:
//! - Registration with duplicate-name rejection
//! - Tool lookup and registration-ordered listing
//! - Validation of arguments against each tool's declared parameters
//! - Query-string coercion for REST callers
//! - Invocation, wrapping handler failures in `ToolError::Execution`
//!
//! The registry is built once at startup and then shared behind an `Arc`;
//! it carries no per-call state, so concurrent invocations need no locking.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use serde_json::Value;

use super::errors::ToolError;
use super::types::{ToolArguments, ToolDefinition, ToolInvocationRequest, ToolResult};

// ─── Handlers ────────────────────────────────────────────────────────────────

/// The behavior behind a registered tool.
///
/// Handlers receive arguments that already passed schema validation.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    async fn call(&self, arguments: ToolArguments) -> anyhow::Result<ToolResult>;
}

/// Adapter turning an async closure into a [`ToolHandler`].
pub struct FnHandler<F>(F);

/// Wrap an async closure as a tool handler.
pub fn handler_fn<F, Fut>(f: F) -> FnHandler<F>
where
    F: Fn(ToolArguments) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<ToolResult>> + Send + 'static,
{
    FnHandler(f)
}

#[async_trait]
impl<F, Fut> ToolHandler for FnHandler<F>
where
    F: Fn(ToolArguments) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<ToolResult>> + Send + 'static,
{
    async fn call(&self, arguments: ToolArguments) -> anyhow::Result<ToolResult> {
        (self.0)(arguments).await
    }
}

// ─── ToolRegistry ────────────────────────────────────────────────────────────

struct RegisteredTool {
    definition: ToolDefinition,
    handler: Arc<dyn ToolHandler>,
}

/// Registry of named tools, ordered by registration.
#[derive(Default)]
pub struct ToolRegistry {
    tools: Vec<RegisteredTool>,
    /// `tool_name → position in tools`.
    index: HashMap<String, usize>,
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.list())
            .finish()
    }
}

impl ToolRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool. Fails if the name is already taken.
    pub fn register(
        &mut self,
        definition: ToolDefinition,
        handler: impl ToolHandler + 'static,
    ) -> Result<(), ToolError> {
        if self.index.contains_key(&definition.name) {
            return Err(ToolError::DuplicateName {
                name: definition.name,
            });
        }

        tracing::debug!(tool = %definition.name, params = definition.params.len(), "registered tool");
        self.index.insert(definition.name.clone(), self.tools.len());
        self.tools.push(RegisteredTool {
            definition,
            handler: Arc::new(handler),
        });
        Ok(())
    }

    /// Registered tool names, in registration order.
    pub fn list(&self) -> Vec<&str> {
        self.tools
            .iter()
            .map(|t| t.definition.name.as_str())
            .collect()
    }

    /// Registered tool definitions, in registration order.
    pub fn definitions(&self) -> Vec<&ToolDefinition> {
        self.tools.iter().map(|t| &t.definition).collect()
    }

    /// Look up a tool definition by name.
    pub fn get_tool(&self, name: &str) -> Option<&ToolDefinition> {
        self.index.get(name).map(|&i| &self.tools[i].definition)
    }

    /// Number of registered tools.
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    // ─── Validation ──────────────────────────────────────────────────────

    /// Validate a tool call and return the arguments the handler will see.
    ///
    /// - every key must be a declared parameter
    /// - `null` values for optional parameters are dropped
    /// - required parameters must be present and non-null
    /// - present values must match the declared type
    pub fn validate_tool_call(
        &self,
        tool_name: &str,
        arguments: Option<ToolArguments>,
    ) -> Result<ToolArguments, ToolError> {
        let def = self.get_tool(tool_name).ok_or_else(|| ToolError::UnknownTool {
            name: tool_name.to_string(),
        })?;

        let invalid = |reason: String| ToolError::InvalidArgument {
            tool: tool_name.to_string(),
            reason,
        };

        let mut validated = ToolArguments::new();
        for (key, value) in arguments.unwrap_or_default() {
            let spec = def
                .param(&key)
                .ok_or_else(|| invalid(format!("unexpected argument: '{key}'")))?;

            if value.is_null() {
                if spec.required {
                    return Err(invalid(format!("required field '{key}' is null")));
                }
                continue;
            }

            if !spec.param_type.matches(&value) {
                return Err(invalid(format!(
                    "field '{key}' must be of type {}",
                    spec.param_type.schema_name()
                )));
            }
            validated.insert(key, value);
        }

        if let Some(missing) = def
            .params
            .iter()
            .find(|p| p.required && !validated.contains_key(&p.name))
        {
            return Err(invalid(format!("missing required field: '{}'", missing.name)));
        }

        Ok(validated)
    }

    /// Build tool arguments from string pairs (e.g., an HTTP query string).
    ///
    /// Values are coerced to the declared parameter types. Undeclared keys are
    /// rejected so that they surface the same way as in a JSON call.
    pub fn coerce_query(
        &self,
        tool_name: &str,
        pairs: &[(String, String)],
    ) -> Result<ToolArguments, ToolError> {
        let def = self.get_tool(tool_name).ok_or_else(|| ToolError::UnknownTool {
            name: tool_name.to_string(),
        })?;

        let mut arguments = ToolArguments::new();
        for (key, raw) in pairs {
            let spec = def.param(key).ok_or_else(|| ToolError::InvalidArgument {
                tool: tool_name.to_string(),
                reason: format!("unexpected argument: '{key}'"),
            })?;
            let value = spec
                .param_type
                .coerce_str(raw)
                .ok_or_else(|| ToolError::InvalidArgument {
                    tool: tool_name.to_string(),
                    reason: format!(
                        "field '{key}' must be of type {}, got '{raw}'",
                        spec.param_type.schema_name()
                    ),
                })?;
            arguments.insert(key.clone(), value);
        }
        Ok(arguments)
    }

    // ─── Invocation ──────────────────────────────────────────────────────

    /// Validate and run a tool.
    pub async fn invoke(
        &self,
        tool_name: &str,
        arguments: Option<ToolArguments>,
    ) -> Result<ToolResult, ToolError> {
        let arguments = self.validate_tool_call(tool_name, arguments)?;
        let handler = self
            .index
            .get(tool_name)
            .map(|&i| Arc::clone(&self.tools[i].handler))
            .ok_or_else(|| ToolError::UnknownTool {
                name: tool_name.to_string(),
            })?;

        let start = Instant::now();
        let outcome = handler.call(arguments).await;
        let elapsed_ms = start.elapsed().as_millis() as u64;

        match outcome {
            Ok(result) => {
                tracing::debug!(tool = tool_name, elapsed_ms, "tool call completed");
                Ok(result)
            }
            Err(source) => {
                tracing::warn!(tool = tool_name, elapsed_ms, error = %format!("{source:#}"), "tool call failed");
                Err(ToolError::Execution {
                    tool: tool_name.to_string(),
                    source,
                })
            }
        }
    }

    /// Run a [`ToolInvocationRequest`].
    pub async fn invoke_request(
        &self,
        request: ToolInvocationRequest,
    ) -> Result<ToolResult, ToolError> {
        self.invoke(&request.tool_name, request.arguments).await
    }
}

/// Interpret a JSON value as tool arguments: `null` means none, objects pass through.
pub fn arguments_from_value(
    tool_name: &str,
    value: Value,
) -> Result<Option<ToolArguments>, ToolError> {
    match value {
        Value::Null => Ok(None),
        Value::Object(map) => Ok(Some(map)),
        other => Err(ToolError::InvalidArgument {
            tool: tool_name.to_string(),
            reason: format!("arguments must be a JSON object, got {other}"),
        }),
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
