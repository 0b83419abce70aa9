//! Per-query transcript.

use crate::model::{Message, Role};

/// The turns submitted to the model while resolving one query.
///
/// Append-only: turns are never removed, reordered or edited. A fresh
/// state is created for every query.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversationState {
    turns: Vec<Message>,
}

impl ConversationState {
    /// Start a transcript holding the user's query.
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            turns: vec![Message::user(query)],
        }
    }

    /// The query that opened this transcript.
    pub fn query(&self) -> String {
        self.turns[0].text()
    }

    pub fn push(&mut self, turn: Message) {
        self.turns.push(turn);
    }

    /// Feed a tool result back to the model as a user turn.
    pub fn push_tool_result(&mut self, text: impl Into<String>) {
        self.push(Message::new(Role::User, text));
    }

    pub fn transcript(&self) -> &[Message] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    /// Always false: a transcript starts with the query.
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}
