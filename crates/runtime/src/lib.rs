//! Tether runtime: the query loop between a model and a tool host.
//!
//! A [`Session`] owns a model [`Backend`] and a [`ToolTransport`]. On start it
//! discovers the host's tools into a [`ToolRegistry`]; each query then runs
//! through a [`QueryLoop`]:
//!
//! 1. The model sees the query and the full tool catalog.
//! 2. Every tool call in its response is executed and the result fed back
//!    for one follow-up turn.
//! 3. If it asked for no tool, the fallback tool answers the query directly.
//!
//! # Example
//!
//! ```no_run
//! use mcp::ServerConfig;
//! use runtime::{AnthropicBackend, McpToolHost, Session};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let backend = AnthropicBackend::builder("sk-ant-api03-...", "claude-sonnet-4-20250514").build();
//! let host = McpToolHost::connect(ServerConfig::for_script("server.py")?).await?;
//!
//! let mut session = Session::start(backend, host).await?;
//! let answer = session.process_query("What is 2+2?").await?;
//! println!("{answer}");
//!
//! session.end()?.shutdown().await?;
//! # Ok(())
//! # }
//! ```

mod conversation;
mod error;
pub mod model;
mod orchestrator;
pub mod providers;
mod session;
#[cfg(test)]
mod testing;
pub mod tools;

pub use conversation::ConversationState;
pub use error::{Error, Result};
pub use model::{
    Backend, Message, ModelError, ModelRequest, ModelResponse, Part, Role, ToolCall, ToolSpec,
};
pub use orchestrator::{
    Answer, DEFAULT_FALLBACK_ARGUMENT, DEFAULT_FALLBACK_TOOL, FallbackTool, MAX_HOP_DEPTH,
    QueryLoop, Step,
};
pub use providers::{AnthropicBackend, AnthropicBackendBuilder};
pub use session::Session;
pub use tools::{McpToolHost, ToolError, ToolOutput, ToolRegistry, ToolTransport};
