//! Session management.

use crate::model::Backend;
use crate::orchestrator::{Answer, FallbackTool, QueryLoop, Step};
use crate::tools::{ToolRegistry, ToolTransport};
use crate::Result;
use storage::{Event, EventKind, EventStore, Role, SessionId};
use tracing::{debug, info};

/// A connected tool host plus a model, answering queries one at a time.
///
/// The tool catalog is discovered once on start. Each query gets a fresh
/// transcript; nothing carries over between queries except the event log.
pub struct Session<B, T> {
    pub id: SessionId,
    backend: B,
    transport: T,
    registry: ToolRegistry,
    fallback: FallbackTool,
    store: Option<EventStore>,
}

impl<B: Backend, T: ToolTransport> Session<B, T> {
    /// Discover the host's tools and open a session.
    pub async fn start(backend: B, transport: T) -> Result<Self> {
        let registry = ToolRegistry::discover(&transport).await?;
        let id = SessionId::new();
        info!(session = %id, tools = registry.len(), "session started");

        Ok(Self {
            id,
            backend,
            transport,
            registry,
            fallback: FallbackTool::default(),
            store: None,
        })
    }

    pub fn with_fallback(mut self, fallback: FallbackTool) -> Self {
        self.fallback = fallback;
        self
    }

    /// Record this session's events in `store`.
    pub fn with_store(mut self, store: EventStore, server: impl Into<String>) -> Result<Self> {
        store.append(&Event::new(
            self.id,
            EventKind::SessionStart {
                server: server.into(),
            },
        ))?;
        self.store = Some(store);
        Ok(self)
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Answer one query.
    pub async fn process_query(&mut self, query: &str) -> Result<Answer> {
        self.record(Event::message(self.id, Role::User, query))?;

        let answer = QueryLoop::new(
            &self.backend,
            &self.registry,
            &self.transport,
            &self.fallback,
            query,
        )
        .run()
        .await?;

        for step in &answer.steps {
            match step {
                Step::Tool {
                    name,
                    input,
                    output,
                } => {
                    self.record(Event::new(
                        self.id,
                        EventKind::ToolCall {
                            name: name.clone(),
                            input: input.clone(),
                        },
                    ))?;
                    self.record(Event::new(
                        self.id,
                        EventKind::ToolResult {
                            name: name.clone(),
                            output: output.text.clone(),
                            is_error: output.is_error,
                        },
                    ))?;
                }
                Step::Fallback { name, output } => {
                    self.record(Event::new(
                        self.id,
                        EventKind::Fallback {
                            name: name.clone(),
                            output: output.text.clone(),
                        },
                    ))?;
                }
            }
        }
        self.record(Event::message(self.id, Role::Assistant, &answer.text))?;

        debug!(session = %self.id, steps = answer.steps.len(), "query answered");
        Ok(answer)
    }

    /// End the session and hand back the transport for shutdown.
    pub fn end(self) -> Result<T> {
        if let Some(store) = &self.store {
            store.append(&Event::new(self.id, EventKind::SessionEnd))?;
        }
        info!(session = %self.id, "session ended");
        Ok(self.transport)
    }

    fn record(&self, event: Event) -> Result<()> {
        if let Some(store) = &self.store {
            store.append(&event)?;
        }
        Ok(())
    }
}
