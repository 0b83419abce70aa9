//! Scripted model and tool-host doubles shared by the unit tests.

use crate::model::{
    Backend, Message, ModelError, ModelRequest, ModelResponse, Part, Role, ToolCall, ToolSpec,
    Usage,
};
use crate::tools::{ToolError, ToolTransport};
use mcp::{CallToolResult, ToolContent};
use serde_json::{Map, Value, json};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

pub fn spec(name: &str) -> ToolSpec {
    ToolSpec {
        name: name.to_string(),
        description: format!("{name} tool"),
        schema: json!({"type": "object"}),
    }
}

pub fn text_result(text: &str) -> CallToolResult {
    CallToolResult {
        content: vec![ToolContent::Text {
            text: text.to_string(),
        }],
        is_error: false,
    }
}

/// A tool host with a fixed catalog and per-tool canned replies.
///
/// Tools without a canned reply answer `"<name> result"`.
pub struct FakeTransport {
    specs: Vec<ToolSpec>,
    replies: HashMap<String, Result<CallToolResult, ToolError>>,
    fail_listing: bool,
    list_count: AtomicUsize,
    calls: Mutex<Vec<(String, Option<Map<String, Value>>)>>,
}

impl FakeTransport {
    pub fn new(specs: Vec<ToolSpec>) -> Self {
        Self {
            specs,
            replies: HashMap::new(),
            fail_listing: false,
            list_count: AtomicUsize::new(0),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_reply(mut self, name: &str, reply: Result<CallToolResult, ToolError>) -> Self {
        self.replies.insert(name.to_string(), reply);
        self
    }

    pub fn with_text(self, name: &str, text: &str) -> Self {
        self.with_reply(name, Ok(text_result(text)))
    }

    pub fn fail_listing(mut self) -> Self {
        self.fail_listing = true;
        self
    }

    pub fn calls(&self) -> Vec<(String, Option<Map<String, Value>>)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_names(&self) -> Vec<String> {
        self.calls().into_iter().map(|(name, _)| name).collect()
    }

    pub fn list_count(&self) -> usize {
        self.list_count.load(Ordering::SeqCst)
    }
}

impl ToolTransport for FakeTransport {
    async fn list_tools(&self) -> Result<Vec<ToolSpec>, ToolError> {
        self.list_count.fetch_add(1, Ordering::SeqCst);
        if self.fail_listing {
            return Err(ToolError::Connection("server exited unexpectedly".into()));
        }
        Ok(self.specs.clone())
    }

    async fn call_tool(
        &self,
        name: &str,
        arguments: Option<Map<String, Value>>,
    ) -> Result<CallToolResult, ToolError> {
        self.calls
            .lock()
            .unwrap()
            .push((name.to_string(), arguments));
        match self.replies.get(name) {
            Some(reply) => reply.clone(),
            None => Ok(text_result(&format!("{name} result"))),
        }
    }
}

/// What the loop sent to the model on one call.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub messages: Vec<Message>,
    pub tools: Vec<String>,
}

/// A model that returns scripted turns in order.
///
/// Panics if called more times than it has turns.
pub struct ScriptedBackend {
    turns: Mutex<VecDeque<Result<Message, ModelError>>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl ScriptedBackend {
    pub fn new(turns: Vec<Result<Message, ModelError>>) -> Self {
        Self {
            turns: Mutex::new(turns.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn replies(turns: Vec<Message>) -> Self {
        Self::new(turns.into_iter().map(Ok).collect())
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

impl Backend for ScriptedBackend {
    async fn call(&self, request: ModelRequest<'_>) -> Result<ModelResponse, ModelError> {
        self.requests.lock().unwrap().push(RecordedRequest {
            messages: request.messages.to_vec(),
            tools: request.tools.iter().map(|t| t.name.clone()).collect(),
        });

        let next = self.turns.lock().unwrap().pop_front();
        let message = match next {
            Some(turn) => turn?,
            None => panic!(
                "ScriptedBackend: no more turns (call #{})",
                self.call_count()
            ),
        };
        Ok(ModelResponse {
            message,
            usage: Usage::default(),
        })
    }
}

/// An assistant turn made of the given parts.
pub fn assistant(parts: Vec<Part>) -> Message {
    Message {
        role: Role::Assistant,
        parts,
    }
}

pub fn text(s: &str) -> Part {
    Part::Text(s.to_string())
}

pub fn tool_call(id: &str, name: &str, input: Value) -> Part {
    Part::ToolCall(ToolCall {
        id: id.to_string(),
        name: name.to_string(),
        input,
    })
}
