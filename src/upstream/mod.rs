//! Upstream Client: bounded-timeout outbound HTTP calls.
//!
//! Used by tool handlers (user lookup, remote newsroom source) and by the
//! `/call` proxy route.

pub mod client;
pub mod errors;

pub use client::{join_url, ProxiedResponse, UpstreamClient, DEFAULT_TIMEOUT};
pub use errors::UpstreamError;
