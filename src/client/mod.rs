//! Invocation client for the tool registry, in-process or over HTTP.

pub mod errors;
pub mod invoker;
pub mod transport;

pub use errors::ClientError;
pub use invoker::{connect_and_call, CallOutcome, InvocationClient, RetryPolicy};
pub use transport::{Connector, HttpConnector, InProcessConnector, ToolSession};
