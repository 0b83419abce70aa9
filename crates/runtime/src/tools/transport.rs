//! Tool transport trait.

use crate::model::ToolSpec;
use crate::tools::ToolError;
use mcp::CallToolResult;
use serde_json::{Map, Value};
use std::future::Future;

/// The channel to the process hosting the tools.
///
/// This is the boundary between the query loop and side effects: the loop
/// only ever lists tools once and calls them by name.
pub trait ToolTransport: Send + Sync {
    /// Fetch the host's tool catalog.
    fn list_tools(&self) -> impl Future<Output = Result<Vec<ToolSpec>, ToolError>> + Send;

    /// Invoke a tool on the host.
    fn call_tool(
        &self,
        name: &str,
        arguments: Option<Map<String, Value>>,
    ) -> impl Future<Output = Result<CallToolResult, ToolError>> + Send;
}
