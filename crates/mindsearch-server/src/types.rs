use serde::Deserialize;
use serde_json::{Map, Value};

use mindsearch_core::agent::{AgentInput, ChatMessage};

use crate::error::AppError;

/// Question text or a chat transcript ending in a user turn.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Inputs {
    Text(String),
    Messages(Vec<ChatMessage>),
}

/// Body of `POST /solve`.
#[derive(Debug, Clone, Deserialize)]
pub struct SolveRequest {
    pub inputs: Inputs,
    #[serde(default)]
    pub agent_cfg: Map<String, Value>,
}

impl SolveRequest {
    /// Resolve the request into the agent's input.
    ///
    /// For transcripts the last user message is the query and everything
    /// before it is history.
    pub fn agent_input(&self) -> Result<AgentInput, AppError> {
        let (query, history) = match &self.inputs {
            Inputs::Text(text) => (text.clone(), Vec::new()),
            Inputs::Messages(messages) => {
                let pos = messages
                    .iter()
                    .rposition(|m| m.role == "user")
                    .ok_or_else(|| AppError::BadRequest("inputs contain no user message".into()))?;
                (messages[pos].content.clone(), messages[..pos].to_vec())
            }
        };

        if query.trim().is_empty() {
            return Err(AppError::BadRequest("query must not be empty".into()));
        }

        let multi_branch = self
            .agent_cfg
            .get("multi_branch")
            .and_then(Value::as_bool)
            .unwrap_or(false);

        Ok(AgentInput::new(query)
            .with_history(history)
            .with_multi_branch(multi_branch))
    }
}
