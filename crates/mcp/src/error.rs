//! MCP error types.

use crate::protocol::JsonRpcError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("server I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("unsupported server script {}: expected a .js or .py file", .0.display())]
    UnsupportedServer(PathBuf),

    #[error("server not initialized")]
    NotInitialized,

    #[error("server exited unexpectedly")]
    ServerExited,

    #[error("timeout waiting for response")]
    Timeout,

    #[error("malformed message: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("JSON-RPC error: {0}")]
    JsonRpc(#[from] JsonRpcError),

    #[error("output too large: {size} bytes (max {max})")]
    OutputTooLarge { size: usize, max: usize },
}

impl Error {
    /// Whether the error means the channel to the server is unusable.
    ///
    /// A JSON-RPC error reply or an oversized line still leaves the stream in
    /// sync, so those are reported by the server about a single request.
    pub fn is_connection(&self) -> bool {
        !matches!(self, Self::JsonRpc(_) | Self::OutputTooLarge { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;
