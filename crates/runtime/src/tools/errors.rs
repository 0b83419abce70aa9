use thiserror::Error;

/// Errors that can occur while executing a tool call.
///
/// Only [`ToolError::Connection`] is fatal; the executor turns every other
/// variant into an error-flagged result the model can read.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ToolError {
    #[error("unknown tool: {0}")]
    NotFound(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("tool host unreachable: {0}")]
    Connection(String),
    #[error("execution failed: {0}")]
    Execution(String),
}

impl From<mcp::Error> for ToolError {
    fn from(err: mcp::Error) -> Self {
        if err.is_connection() {
            Self::Connection(err.to_string())
        } else {
            Self::Execution(err.to_string())
        }
    }
}
