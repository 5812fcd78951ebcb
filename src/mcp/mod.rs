//! Structured tool-calling sub-service (MCP over JSON-RPC) mounted at `/mcp`.

pub mod server;
pub mod types;

pub use server::{router, Dispatch, McpService};
pub use types::{
    CallToolResult, JsonRpcError, JsonRpcRequest, JsonRpcResponse, McpToolDefinition,
    PROTOCOL_VERSION, SESSION_HEADER,
};
