//! MCP (Model Context Protocol) client library.
//!
//! This crate provides a client for communicating with a tool-host process
//! over stdio: newline-delimited JSON-RPC 2.0 on the child's stdin/stdout.
//!
//! # Example
//!
//! ```no_run
//! use mcp::{Server, ServerConfig};
//!
//! # async fn example() -> mcp::Result<()> {
//! let config = ServerConfig::for_script("tools/server.js")?;
//! let server = Server::connect(config).await?;
//!
//! for tool in server.list_tools().await? {
//!     println!("Tool: {}", tool.name);
//! }
//!
//! let mut args = serde_json::Map::new();
//! args.insert("expression".into(), "2+2".into());
//! let result = server.call_tool("calculate", Some(args)).await?;
//! println!("{:?}", result.first_text());
//!
//! server.shutdown().await?;
//! # Ok(())
//! # }
//! ```

mod error;
mod launch;
mod protocol;
mod server;

pub use error::{Error, Result};
pub use launch::ServerKind;
pub use protocol::{
    CallToolParams, CallToolResult, InitializeParams, InitializeResult, JsonRpcError,
    JsonRpcNotification, JsonRpcRequest, JsonRpcResponse, ListToolsResult, PROTOCOL_VERSION,
    RequestId, ServerCapabilities, ServerInfo, Tool, ToolContent,
};
pub use server::{DEFAULT_TIMEOUT, MAX_OUTPUT_SIZE, Server, ServerConfig};
