//! Tool Registry: named, schema-described tools shared by every transport.
//!
//! This module handles:
//! - Tool definitions and the tagged `ToolResult` union
//! - Registration, validation and invocation of tools
//! - Normalization of results into one canonical JSON form
//!
//! One `Arc<ToolRegistry>` is built at startup and injected into the REST
//! facade, the MCP sub-service and the in-process client, so tool behavior
//! cannot drift between transports.

pub mod errors;
pub mod normalize;
pub mod registry;
pub mod types;

// Re-exports for convenience
pub use errors::ToolError;
pub use normalize::normalize;
pub use registry::{arguments_from_value, handler_fn, ToolHandler, ToolRegistry};
pub use types::{
    ContentBlock, ParamSpec, ParamType, ToolArguments, ToolDefinition, ToolInvocationRequest,
    ToolResult,
};
