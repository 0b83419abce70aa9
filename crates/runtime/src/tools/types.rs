//! Tool-related types.

use super::ToolError;
use mcp::CallToolResult;
use serde_json::{Map, Value};

/// Result text used when a tool returns no text content.
pub const NO_RESPONSE_TEXT: &str = "[No response text]";

/// The normalized outcome of one tool call, as shown to the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolOutput {
    pub text: String,
    pub is_error: bool,
}

impl ToolOutput {
    pub fn success(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_error: false,
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_error: true,
        }
    }

    /// Normalize a remote result.
    ///
    /// Only the first text block is kept; any later blocks are dropped. A
    /// missing or empty text block becomes [`NO_RESPONSE_TEXT`].
    pub fn from_remote(result: &CallToolResult) -> Self {
        let text = result
            .first_text()
            .filter(|text| !text.is_empty())
            .unwrap_or(NO_RESPONSE_TEXT);
        Self {
            text: text.to_string(),
            is_error: result.is_error,
        }
    }
}

/// Arguments in the shape MCP expects: a JSON object, or nothing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolArguments(pub Option<Map<String, Value>>);

impl TryFrom<Value> for ToolArguments {
    type Error = ToolError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(map) => Ok(Self(Some(map))),
            Value::Null => Ok(Self(None)),
            other => Err(ToolError::InvalidInput(format!(
                "expected a JSON object, got {other}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mcp::ToolContent;
    use serde_json::json;

    fn remote(content: Vec<ToolContent>, is_error: bool) -> CallToolResult {
        CallToolResult { content, is_error }
    }

    fn text(s: &str) -> ToolContent {
        ToolContent::Text { text: s.into() }
    }

    #[test]
    fn first_text_block_wins() {
        let output = ToolOutput::from_remote(&remote(vec![text("one"), text("two")], false));
        assert_eq!(output, ToolOutput::success("one"));
    }

    #[test]
    fn no_content_uses_placeholder() {
        let output = ToolOutput::from_remote(&remote(vec![], false));
        assert_eq!(output.text, NO_RESPONSE_TEXT);
        assert!(!output.is_error);
    }

    #[test]
    fn non_text_content_uses_placeholder() {
        let image = ToolContent::Image {
            data: "AAAA".into(),
            mime_type: "image/png".into(),
        };
        let output = ToolOutput::from_remote(&remote(vec![image], false));
        assert_eq!(output.text, "[No response text]");
    }

    #[test]
    fn empty_text_uses_placeholder() {
        let output = ToolOutput::from_remote(&remote(vec![text("")], false));
        assert_eq!(output.text, NO_RESPONSE_TEXT);
    }

    #[test]
    fn remote_error_flag_is_kept() {
        let output = ToolOutput::from_remote(&remote(vec![text("division by zero")], true));
        assert_eq!(output, ToolOutput::error("division by zero"));
    }

    #[test]
    fn arguments_from_json() {
        let args = ToolArguments::try_from(json!({"expression": "2+2"})).unwrap();
        assert_eq!(args.0.unwrap()["expression"], "2+2");

        assert_eq!(ToolArguments::try_from(Value::Null).unwrap(), ToolArguments(None));

        let err = ToolArguments::try_from(json!([1, 2])).unwrap_err();
        assert!(matches!(err, ToolError::InvalidInput(_)));
    }

    #[test]
    fn mcp_errors_split_by_severity() {
        let exited: ToolError = mcp::Error::ServerExited.into();
        assert!(matches!(exited, ToolError::Connection(_)));

        let rpc: ToolError = mcp::Error::JsonRpc(mcp::JsonRpcError {
            code: -32603,
            message: "boom".into(),
            data: None,
        })
        .into();
        assert_eq!(rpc, ToolError::Execution("JSON-RPC error: [-32603] boom".into()));
    }
}
