//! Validates and dispatches tool calls.

use super::{ToolArguments, ToolError, ToolOutput, ToolRegistry, ToolTransport};
use crate::{Error, Result};
use serde_json::Value;
use tracing::{debug, warn};

/// Executes tool calls against the registry's host.
///
/// Problems with a single call (unknown name, bad arguments, the tool
/// failing) come back as error-flagged [`ToolOutput`]s. Only a broken
/// transport is returned as `Err`.
pub struct ToolExecutor<'a, T> {
    registry: &'a ToolRegistry,
    transport: &'a T,
}

impl<'a, T: ToolTransport> ToolExecutor<'a, T> {
    pub fn new(registry: &'a ToolRegistry, transport: &'a T) -> Self {
        Self {
            registry,
            transport,
        }
    }

    pub async fn execute(&self, name: &str, input: &Value) -> Result<ToolOutput> {
        if !self.registry.contains(name) {
            warn!(tool = %name, "model requested an unknown tool");
            return Ok(ToolOutput::error(
                ToolError::NotFound(name.to_string()).to_string(),
            ));
        }

        let arguments = match ToolArguments::try_from(input.clone()) {
            Ok(arguments) => arguments,
            Err(e) => return Ok(ToolOutput::error(e.to_string())),
        };

        debug!(tool = %name, "calling tool");
        match self.transport.call_tool(name, arguments.0).await {
            Ok(result) => {
                let output = ToolOutput::from_remote(&result);
                debug!(
                    tool = %name,
                    is_error = output.is_error,
                    blocks = result.content.len(),
                    "tool returned"
                );
                Ok(output)
            }
            Err(ToolError::Connection(msg)) => Err(Error::Connection(msg)),
            Err(e) => {
                warn!(tool = %name, error = %e, "tool call failed");
                Ok(ToolOutput::error(e.to_string()))
            }
        }
    }
}
