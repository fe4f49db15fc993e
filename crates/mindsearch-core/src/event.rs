use serde::{Deserialize, Serialize};

use crate::graph::GraphState;

/// One emission from an agent's step iterator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum StepEvent {
    /// Single-agent mode: the snapshot alone.
    Single(GraphState),
    /// Multi-branch mode: the snapshot plus the branch node that produced it.
    Branch { state: GraphState, node: String },
}

impl StepEvent {
    pub fn single(state: GraphState) -> Self {
        Self::Single(state)
    }

    pub fn branch(state: GraphState, node: impl Into<String>) -> Self {
        Self::Branch {
            state,
            node: node.into(),
        }
    }

    pub fn state(&self) -> &GraphState {
        match self {
            Self::Single(state) | Self::Branch { state, .. } => state,
        }
    }

    pub fn branch_id(&self) -> Option<&str> {
        match self {
            Self::Single(_) => None,
            Self::Branch { node, .. } => Some(node),
        }
    }

    /// Whether this event ends the whole run.
    ///
    /// Only untagged snapshots can finish a run; a branch reporting `End`
    /// has finished its own sub-search.
    pub fn finishes_run(&self) -> bool {
        matches!(self, Self::Single(state) if state.is_finished())
    }

    pub fn into_parts(self) -> (GraphState, Option<String>) {
        match self {
            Self::Single(state) => (state, None),
            Self::Branch { state, node } => (state, Some(node)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::AgentStatus;

    #[test]
    fn single_into_parts() {
        let event = StepEvent::single(GraphState::new(AgentStatus::Streaming));
        let (state, branch) = event.into_parts();
        assert_eq!(state.state, AgentStatus::Streaming);
        assert!(branch.is_none());
    }

    #[test]
    fn branch_into_parts() {
        let event = StepEvent::branch(GraphState::new(AgentStatus::Streaming), "q1");
        assert_eq!(event.branch_id(), Some("q1"));
        let (_, branch) = event.into_parts();
        assert_eq!(branch.as_deref(), Some("q1"));
    }

    #[test]
    fn only_single_end_finishes_run() {
        let done = GraphState::new(AgentStatus::End);
        assert!(StepEvent::single(done.clone()).finishes_run());
        assert!(!StepEvent::branch(done, "q1").finishes_run());
        assert!(!StepEvent::single(GraphState::new(AgentStatus::Streaming)).finishes_run());
    }

    #[test]
    fn serde_tags_mode() {
        let event = StepEvent::branch(GraphState::new(AgentStatus::Streaming), "q1");
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["mode"], "branch");
        assert_eq!(json["node"], "q1");
        let parsed: StepEvent = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, event);
    }
}
