//! The tool-invocation loop for a single query.
//!
//! ```text
//! AwaitingQuery -> ModelThinking -> (ToolDispatch)* -> Finalizing -> Done
//! ```
//!
//! The model sees the query and every registered tool. Its response parts are
//! walked in order: text goes straight to the answer, each tool call is
//! executed, its result is fed back as a user turn and the model is asked
//! once more (without tools) for a follow-up. When the response asked for no
//! tool at all, the fallback tool answers the raw query instead.

use crate::conversation::ConversationState;
use crate::model::{Backend, ModelRequest, ModelResponse, Part, ToolCall, ToolSpec};
use crate::tools::{ToolExecutor, ToolOutput, ToolRegistry, ToolTransport};
use crate::Result;
use serde_json::{Map, Value};
use tracing::{debug, info};

/// Tool-call rounds per query. Tool calls in a follow-up response are not
/// executed.
pub const MAX_HOP_DEPTH: usize = 1;

pub const DEFAULT_FALLBACK_TOOL: &str = "ask_ai";
pub const DEFAULT_FALLBACK_ARGUMENT: &str = "question";

/// The tool that answers queries the model resolved without a tool call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FallbackTool {
    /// Tool name on the host.
    pub name: String,
    /// Argument that receives the raw query.
    pub argument: String,
}

impl Default for FallbackTool {
    fn default() -> Self {
        Self {
            name: DEFAULT_FALLBACK_TOOL.to_string(),
            argument: DEFAULT_FALLBACK_ARGUMENT.to_string(),
        }
    }
}

/// One tool execution performed while answering a query.
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    /// A tool the model asked for.
    Tool {
        name: String,
        input: Value,
        output: ToolOutput,
    },
    /// The fallback tool, run because the model asked for none.
    Fallback { name: String, output: ToolOutput },
}

/// The resolved answer to a query.
#[derive(Debug, Clone, PartialEq)]
pub struct Answer {
    /// Output lines joined with `\n`.
    pub text: String,
    pub steps: Vec<Step>,
}

impl Answer {
    /// Names of the tools the model called, in order.
    pub fn tool_calls(&self) -> Vec<&str> {
        self.steps
            .iter()
            .filter_map(|step| match step {
                Step::Tool { name, .. } => Some(name.as_str()),
                Step::Fallback { .. } => None,
            })
            .collect()
    }

    pub fn used_fallback(&self) -> bool {
        self.steps
            .iter()
            .any(|step| matches!(step, Step::Fallback { .. }))
    }
}

impl std::fmt::Display for Answer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.text)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    AwaitingQuery,
    ModelThinking,
    ToolDispatch,
    Finalizing,
    Done,
}

/// Drives one query to an [`Answer`].
pub struct QueryLoop<'a, B, T> {
    backend: &'a B,
    registry: &'a ToolRegistry,
    executor: ToolExecutor<'a, T>,
    fallback: &'a FallbackTool,
    conversation: ConversationState,
    output: Vec<String>,
    steps: Vec<Step>,
    phase: Phase,
}

impl<'a, B: Backend, T: ToolTransport> QueryLoop<'a, B, T> {
    pub fn new(
        backend: &'a B,
        registry: &'a ToolRegistry,
        transport: &'a T,
        fallback: &'a FallbackTool,
        query: &str,
    ) -> Self {
        Self {
            backend,
            registry,
            executor: ToolExecutor::new(registry, transport),
            fallback,
            conversation: ConversationState::new(query),
            output: Vec::new(),
            steps: Vec::new(),
            phase: Phase::AwaitingQuery,
        }
    }

    /// Run the loop. Model or transport failures abort the query.
    pub async fn run(mut self) -> Result<Answer> {
        let query = self.conversation.query();

        self.enter(Phase::ModelThinking);
        let registry = self.registry;
        let response = self.generate(registry.specs()).await?;

        let mut called_tool = false;
        for part in response.message.parts {
            match part {
                Part::Text(text) => self.output.push(text),
                Part::ToolCall(call) => {
                    called_tool = true;
                    self.dispatch(call).await?;
                }
            }
        }

        self.enter(Phase::Finalizing);
        if !called_tool {
            self.run_fallback(&query).await?;
        }

        self.enter(Phase::Done);
        Ok(Answer {
            text: self.output.join("\n"),
            steps: self.steps,
        })
    }

    fn enter(&mut self, phase: Phase) {
        debug!(from = ?self.phase, to = ?phase, "query loop transition");
        self.phase = phase;
    }

    async fn generate(&self, tools: &[ToolSpec]) -> Result<ModelResponse> {
        let request = ModelRequest::new(self.conversation.transcript()).with_tools(tools);
        Ok(self.backend.call(request).await?)
    }

    async fn dispatch(&mut self, call: ToolCall) -> Result<()> {
        self.enter(Phase::ToolDispatch);
        info!(tool = %call.name, "model requested tool");

        let output = self.executor.execute(&call.name, &call.input).await?;
        self.output
            .push(format!("[Tool {} result]: {}", call.name, output.text));
        self.conversation.push_tool_result(output.text.clone());

        let follow_up = self.generate(&[]).await?;
        let ignored = follow_up.message.tool_calls().len();
        if ignored > 0 {
            debug!(
                ignored,
                max_hop_depth = MAX_HOP_DEPTH,
                "follow-up tool calls not executed"
            );
        }
        self.output.push(follow_up.message.text());

        self.steps.push(Step::Tool {
            name: call.name,
            input: call.input,
            output,
        });
        Ok(())
    }

    async fn run_fallback(&mut self, query: &str) -> Result<()> {
        let fallback = self.fallback;
        info!(tool = %fallback.name, "no tool requested, running fallback");

        let mut arguments = Map::new();
        arguments.insert(fallback.argument.clone(), Value::String(query.to_string()));
        let output = self
            .executor
            .execute(&fallback.name, &Value::Object(arguments))
            .await?;

        self.output
            .push(format!("[{} fallback]: {}", fallback.name, output.text));
        self.steps.push(Step::Fallback {
            name: fallback.name.clone(),
            output,
        });
        Ok(())
    }
}
