use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::graph::{Adjacency, AgentStatus};
use crate::tree::TreeNode;

/// User-facing message attached to every error frame.
pub const GENERIC_ERROR_MESSAGE: &str = "An error occurred while generating the response.";

/// A projected snapshot ready to hand to a renderer.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderSnapshot {
    pub tree: TreeNode,
    pub raw_adjacency: Adjacency,
    pub branch_id: Option<String>,
    pub state: AgentStatus,
    pub response: Option<String>,
    pub references: BTreeMap<String, String>,
    pub nodes: Map<String, Value>,
}

impl RenderSnapshot {
    pub fn into_frame(self) -> StreamFrame {
        StreamFrame::Snapshot {
            response: SnapshotBody {
                state: self.state,
                response: self.response,
                references: self.references,
                nodes: self.nodes,
                adjacency_list: self.tree.children,
                adj: self.raw_adjacency,
            },
            current_node: self.branch_id,
        }
    }
}

/// Body of a snapshot frame.
///
/// `adjacency_list` holds the root's children as trees; `adj` keeps the
/// flat map for clients that want it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotBody {
    pub state: AgentStatus,
    pub response: Option<String>,
    pub references: BTreeMap<String, String>,
    pub nodes: Map<String, Value>,
    pub adjacency_list: Vec<TreeNode>,
    pub adj: Adjacency,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub msg: String,
    pub details: String,
}

/// One unit pushed to a transport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StreamFrame {
    Snapshot {
        response: SnapshotBody,
        current_node: Option<String>,
    },
    Error {
        error: ErrorBody,
    },
}

impl StreamFrame {
    /// An error frame carrying the generic user-facing message.
    pub fn error(details: impl Into<String>) -> Self {
        Self::Error {
            error: ErrorBody {
                msg: GENERIC_ERROR_MESSAGE.to_string(),
                details: details.into(),
            },
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error { .. })
    }

    pub fn snapshot(&self) -> Option<&SnapshotBody> {
        match self {
            Self::Snapshot { response, .. } => Some(response),
            Self::Error { .. } => None,
        }
    }

    pub fn current_node(&self) -> Option<&str> {
        match self {
            Self::Snapshot { current_node, .. } => current_node.as_deref(),
            Self::Error { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{ChildRef, GraphState, ROOT};
    use crate::tree::TreeProjector;
    use serde_json::json;

    fn sample_snapshot(branch: Option<&str>) -> RenderSnapshot {
        let state = GraphState::new(AgentStatus::Streaming)
            .with_edge(ROOT, ChildRef::new("s1", AgentStatus::Streaming, "1"));
        TreeProjector::new()
            .render(state, branch.map(String::from))
            .unwrap()
    }

    #[test]
    fn snapshot_frame_wire_shape() {
        let frame = sample_snapshot(None).into_frame();
        let json = serde_json::to_value(&frame).unwrap();
        assert_eq!(json["current_node"], Value::Null);
        assert_eq!(json["response"]["state"], 1);
        assert_eq!(json["response"]["adjacency_list"][0]["name"], "s1");
        assert_eq!(json["response"]["adjacency_list"][0]["id"], "1");
        assert_eq!(json["response"]["adj"]["root"][0]["name"], "s1");
    }

    #[test]
    fn snapshot_frame_carries_branch() {
        let frame = sample_snapshot(Some("s1")).into_frame();
        assert_eq!(frame.current_node(), Some("s1"));
        let json = serde_json::to_value(&frame).unwrap();
        assert_eq!(json["current_node"], "s1");
    }

    #[test]
    fn error_frame_wire_shape() {
        let frame = StreamFrame::error("boom");
        assert!(frame.is_error());
        assert_eq!(
            serde_json::to_value(&frame).unwrap(),
            json!({"error": {"msg": GENERIC_ERROR_MESSAGE, "details": "boom"}})
        );
    }

    #[test]
    fn frames_parse_back_by_shape() {
        let frame = sample_snapshot(Some("s1")).into_frame();
        let text = serde_json::to_string(&frame).unwrap();
        let parsed: StreamFrame = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed, frame);

        let err: StreamFrame =
            serde_json::from_str(r#"{"error":{"msg":"m","details":"d"}}"#).unwrap();
        assert!(err.is_error());
    }
}
