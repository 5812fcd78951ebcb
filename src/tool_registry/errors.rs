//! Tool registry error types.

use thiserror::Error;

use crate::upstream::UpstreamError;

/// Errors that can occur while registering or invoking tools.
#[derive(Debug, Error)]
pub enum ToolError {
    /// A tool with this name is already registered.
    #[error("tool '{name}' is already registered")]
    DuplicateName { name: String },

    /// Tool not found in the registry.
    #[error("unknown tool: '{name}'")]
    UnknownTool { name: String },

    /// Arguments missing, mistyped or not declared by the tool.
    #[error("invalid arguments for '{tool}': {reason}")]
    InvalidArgument { tool: String, reason: String },

    /// The tool's handler failed.
    #[error("tool '{tool}' failed: {source:#}")]
    Execution {
        tool: String,
        #[source]
        source: anyhow::Error,
    },
}

impl ToolError {
    /// Whether this error was caused by the caller's input (unknown tool, bad arguments).
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            ToolError::UnknownTool { .. } | ToolError::InvalidArgument { .. }
        )
    }

    /// Whether the handler failed because an upstream HTTP call failed.
    pub fn is_upstream_failure(&self) -> bool {
        match self {
            ToolError::Execution { source, .. } => source.downcast_ref::<UpstreamError>().is_some(),
            _ => false,
        }
    }
}
