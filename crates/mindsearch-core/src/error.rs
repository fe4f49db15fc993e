use thiserror::Error;

/// Top-level error type for the MindSearch streaming pipeline.
#[derive(Debug, Error)]
pub enum MindSearchError {
    #[error("Malformed graph: {0}")]
    Graph(#[from] MalformedGraphError),

    #[error("Agent error: {0}")]
    Agent(#[from] AgentError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("No agent step within {elapsed_ms}ms")]
    Timeout { elapsed_ms: u64 },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

/// An adjacency map that cannot be projected into a tree.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MalformedGraphError {
    #[error("adjacency map has no '{root}' node")]
    MissingRoot { root: String },

    #[error("cycle detected: {}", path.join(" -> "))]
    Cycle { path: Vec<String> },

    #[error("tree depth limit ({limit}) exceeded")]
    DepthExceeded { limit: usize },

    #[error("tree size limit ({limit} nodes) exceeded")]
    TooManyNodes { limit: usize },
}

/// Failure raised inside an agent's step computation.
#[derive(Debug, Clone, Error)]
pub enum AgentError {
    #[error("search failed: {0}")]
    Search(String),

    #[error("model call failed: {0}")]
    Model(String),

    #[error("{0}")]
    Other(String),
}

/// Failure delivering a frame downstream.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("transport closed by receiver")]
    Closed,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("encode failed: {0}")]
    Encode(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, MindSearchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_root_display() {
        let err = MalformedGraphError::MissingRoot {
            root: "root".into(),
        };
        assert_eq!(err.to_string(), "adjacency map has no 'root' node");
    }

    #[test]
    fn cycle_display_joins_path() {
        let err = MalformedGraphError::Cycle {
            path: vec!["root".into(), "a".into(), "root".into()],
        };
        assert_eq!(err.to_string(), "cycle detected: root -> a -> root");
    }

    #[test]
    fn agent_error_display() {
        let err = AgentError::Search("quota exhausted".into());
        assert_eq!(err.to_string(), "search failed: quota exhausted");
    }

    #[test]
    fn timeout_display() {
        let err = MindSearchError::Timeout { elapsed_ms: 1500 };
        assert_eq!(err.to_string(), "No agent step within 1500ms");
    }

    #[test]
    fn from_malformed_graph() {
        let err: MindSearchError = MalformedGraphError::DepthExceeded { limit: 8 }.into();
        assert!(matches!(
            err,
            MindSearchError::Graph(MalformedGraphError::DepthExceeded { limit: 8 })
        ));
    }

    #[test]
    fn from_transport_error() {
        let err: MindSearchError = TransportError::Closed.into();
        assert_eq!(err.to_string(), "Transport error: transport closed by receiver");
    }
}
