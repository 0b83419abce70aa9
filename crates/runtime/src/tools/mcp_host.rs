//! MCP-backed tool transport.

use super::{ToolError, ToolTransport};
use crate::model::ToolSpec;
use crate::{Error, Result};
use mcp::{CallToolResult, Server, ServerConfig};
use serde_json::{Map, Value};
use tracing::info;

impl From<mcp::Tool> for ToolSpec {
    fn from(tool: mcp::Tool) -> Self {
        Self {
            name: tool.name,
            description: tool.description.unwrap_or_default(),
            schema: tool.input_schema,
        }
    }
}

/// Tool transport backed by a child MCP server.
pub struct McpToolHost {
    server: Server,
}

impl McpToolHost {
    /// Spawn the server and complete the handshake.
    pub async fn connect(config: ServerConfig) -> Result<Self> {
        let name = config.name.clone();
        let server = Server::connect(config)
            .await
            .map_err(|e| Error::Connection(format!("failed to start tool host {name}: {e}")))?;
        info!(server = %name, "connected to tool host");
        Ok(Self { server })
    }

    /// Terminate the server process.
    pub async fn shutdown(self) -> Result<()> {
        self.server
            .shutdown()
            .await
            .map_err(|e| Error::Connection(e.to_string()))
    }
}

impl ToolTransport for McpToolHost {
    async fn list_tools(&self) -> std::result::Result<Vec<ToolSpec>, ToolError> {
        let tools = self.server.list_tools().await?;
        Ok(tools.into_iter().map(ToolSpec::from).collect())
    }

    async fn call_tool(
        &self,
        name: &str,
        arguments: Option<Map<String, Value>>,
    ) -> std::result::Result<CallToolResult, ToolError> {
        Ok(self.server.call_tool(name, arguments).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn remote_tool_maps_to_spec() {
        let tool = mcp::Tool {
            name: "get_time".into(),
            description: None,
            input_schema: json!({"type": "object", "properties": {}}),
        };
        let spec = ToolSpec::from(tool);
        assert_eq!(spec.name, "get_time");
        assert_eq!(spec.description, "");
        assert_eq!(spec.schema["type"], "object");
    }
}
