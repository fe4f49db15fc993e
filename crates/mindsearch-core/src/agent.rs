use serde::{Deserialize, Serialize};

use crate::error::AgentError;
use crate::event::StepEvent;

/// Blocking iterator of agent steps. An `Err` item ends the run.
pub type StepIter = Box<dyn Iterator<Item = Result<StepEvent, AgentError>> + Send>;

/// A prior turn in the conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".into(),
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".into(),
            content: content.into(),
        }
    }
}

/// What the agent is asked to solve.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentInput {
    pub query: String,
    #[serde(default)]
    pub history: Vec<ChatMessage>,
    /// Ask the agent to tag each update with the branch node that produced it.
    #[serde(default)]
    pub multi_branch: bool,
}

impl AgentInput {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Default::default()
        }
    }

    pub fn with_history(mut self, history: Vec<ChatMessage>) -> Self {
        self.history = history;
        self
    }

    pub fn with_multi_branch(mut self, multi_branch: bool) -> Self {
        self.multi_branch = multi_branch;
        self
    }
}

/// A search agent that plans and executes steps synchronously.
///
/// `stream_chat` is called on a blocking worker thread, so implementations
/// are free to block between items.
pub trait Agent: Send + Sync {
    fn stream_chat(&self, input: AgentInput) -> StepIter;

    fn name(&self) -> &str {
        "agent"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_builder() {
        let input = AgentInput::new("what is rust?")
            .with_history(vec![ChatMessage::user("hi"), ChatMessage::assistant("hello")])
            .with_multi_branch(true);
        assert_eq!(input.query, "what is rust?");
        assert_eq!(input.history.len(), 2);
        assert!(input.multi_branch);
    }

    #[test]
    fn input_deserializes_with_defaults() {
        let input: AgentInput = serde_json::from_str(r#"{"query": "q"}"#).unwrap();
        assert_eq!(input, AgentInput::new("q"));
    }
}
