pub mod agent;
pub mod config;
pub mod error;
pub mod event;
pub mod graph;
pub mod mock;
pub mod snapshot;
pub mod tree;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::agent::{Agent, AgentInput, ChatMessage, StepIter};
    pub use crate::config::StreamConfig;
    pub use crate::error::{
        AgentError, MalformedGraphError, MindSearchError, Result, TransportError,
    };
    pub use crate::event::StepEvent;
    pub use crate::graph::{Adjacency, AgentStatus, ChildRef, GraphState, NodeId, ROOT};
    pub use crate::snapshot::{
        ErrorBody, GENERIC_ERROR_MESSAGE, RenderSnapshot, SnapshotBody, StreamFrame,
    };
    pub use crate::tree::{TreeNode, TreeProjector};
}
