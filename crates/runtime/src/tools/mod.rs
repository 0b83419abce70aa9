//! Tool discovery and execution over the tool-host transport.

pub mod errors;
mod executor;
mod mcp_host;
mod registry;
mod transport;
mod types;

pub use errors::ToolError;
pub use executor::ToolExecutor;
pub use mcp_host::McpToolHost;
pub use registry::ToolRegistry;
pub use transport::ToolTransport;
pub use types::{NO_RESPONSE_TEXT, ToolArguments, ToolOutput};
