use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Name of the node every reasoning graph is rooted at.
pub const ROOT: &str = "root";

/// Status code reported by the agent for a snapshot or a single graph node.
///
/// Serialized as the integer code the agent framework uses on the wire.
/// Deserialization accepts the code or a snake_case name (plus a few
/// lifecycle aliases such as `"running"` and `"finished"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "i32", try_from = "StatusRepr")]
pub enum AgentStatus {
    ServerError,
    SessionClosed,
    SessionOutOfLimit,
    SessionInvalidArg,
    /// The agent finished; no further steps follow.
    End,
    Streaming,
    SessionReady,
    PluginStart,
    PluginEnd,
    PluginReturn,
    Coding,
    CodeEnd,
    CodeReturn,
}

impl AgentStatus {
    pub fn code(self) -> i32 {
        match self {
            Self::ServerError => -1,
            Self::SessionClosed => -2,
            Self::SessionOutOfLimit => -3,
            Self::SessionInvalidArg => -4,
            Self::End => 0,
            Self::Streaming => 1,
            Self::SessionReady => 2,
            Self::PluginStart => 3,
            Self::PluginEnd => 4,
            Self::PluginReturn => 5,
            Self::Coding => 6,
            Self::CodeEnd => 7,
            Self::CodeReturn => 8,
        }
    }

    pub fn from_code(code: i64) -> Option<Self> {
        Some(match code {
            -1 => Self::ServerError,
            -2 => Self::SessionClosed,
            -3 => Self::SessionOutOfLimit,
            -4 => Self::SessionInvalidArg,
            0 => Self::End,
            1 => Self::Streaming,
            2 => Self::SessionReady,
            3 => Self::PluginStart,
            4 => Self::PluginEnd,
            5 => Self::PluginReturn,
            6 => Self::Coding,
            7 => Self::CodeEnd,
            8 => Self::CodeReturn,
            _ => return None,
        })
    }

    /// True once the agent reports it is done.
    pub fn is_finished(self) -> bool {
        self == Self::End
    }

    /// True for the session-level failure codes.
    pub fn is_error(self) -> bool {
        self.code() < 0
    }
}

impl std::fmt::Display for AgentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::ServerError => "server_error",
            Self::SessionClosed => "session_closed",
            Self::SessionOutOfLimit => "session_out_of_limit",
            Self::SessionInvalidArg => "session_invalid_arg",
            Self::End => "end",
            Self::Streaming => "streaming",
            Self::SessionReady => "session_ready",
            Self::PluginStart => "plugin_start",
            Self::PluginEnd => "plugin_end",
            Self::PluginReturn => "plugin_return",
            Self::Coding => "coding",
            Self::CodeEnd => "code_end",
            Self::CodeReturn => "code_return",
        };
        f.write_str(name)
    }
}

impl std::str::FromStr for AgentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "server_error" | "failed" => Ok(Self::ServerError),
            "session_closed" => Ok(Self::SessionClosed),
            "session_out_of_limit" => Ok(Self::SessionOutOfLimit),
            "session_invalid_arg" => Ok(Self::SessionInvalidArg),
            "end" | "finished" | "succeeded" => Ok(Self::End),
            "streaming" | "running" => Ok(Self::Streaming),
            "session_ready" | "pending" => Ok(Self::SessionReady),
            "plugin_start" => Ok(Self::PluginStart),
            "plugin_end" => Ok(Self::PluginEnd),
            "plugin_return" => Ok(Self::PluginReturn),
            "coding" => Ok(Self::Coding),
            "code_end" => Ok(Self::CodeEnd),
            "code_return" => Ok(Self::CodeReturn),
            other => Err(format!("unknown agent status: '{other}'")),
        }
    }
}

impl From<AgentStatus> for i32 {
    fn from(status: AgentStatus) -> Self {
        status.code()
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StatusRepr {
    Code(i64),
    Name(String),
}

impl TryFrom<StatusRepr> for AgentStatus {
    type Error = String;

    fn try_from(repr: StatusRepr) -> Result<Self, Self::Error> {
        match repr {
            StatusRepr::Code(code) => {
                Self::from_code(code).ok_or_else(|| format!("unknown agent status code: {code}"))
            }
            StatusRepr::Name(name) => name.parse(),
        }
    }
}

/// Stable identifier of an edge in the reasoning graph.
///
/// Agents emit either integers or strings; both are normalized to a string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "IdRepr", into = "String")]
pub struct NodeId(String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for NodeId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<u64> for NodeId {
    fn from(n: u64) -> Self {
        Self(n.to_string())
    }
}

impl From<NodeId> for String {
    fn from(id: NodeId) -> Self {
        id.0
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum IdRepr {
    Text(String),
    Number(serde_json::Number),
}

impl From<IdRepr> for NodeId {
    fn from(repr: IdRepr) -> Self {
        match repr {
            IdRepr::Text(s) => Self(s),
            IdRepr::Number(n) => Self(n.to_string()),
        }
    }
}

/// One outgoing edge of a node: the child's name plus the edge's state and id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChildRef {
    pub name: String,
    pub state: AgentStatus,
    pub id: NodeId,
}

impl ChildRef {
    pub fn new(name: impl Into<String>, state: AgentStatus, id: impl Into<NodeId>) -> Self {
        Self {
            name: name.into(),
            state,
            id: id.into(),
        }
    }
}

/// Flat graph representation: node name to its ordered children.
pub type Adjacency = BTreeMap<String, Vec<ChildRef>>;

/// One cumulative snapshot of the agent's reasoning graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphState {
    pub state: AgentStatus,

    #[serde(rename = "adjacency_list", default)]
    pub adjacency: Adjacency,

    /// Final answer text, set once the agent reports completion.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,

    /// Citation index to source URL.
    #[serde(default)]
    pub references: BTreeMap<String, String>,

    /// Per-node details attached by the agent (search results, sub-answers).
    #[serde(default)]
    pub nodes: Map<String, Value>,
}

impl GraphState {
    /// A snapshot holding only an empty root node.
    pub fn new(state: AgentStatus) -> Self {
        let mut adjacency = Adjacency::new();
        adjacency.insert(ROOT.to_string(), Vec::new());
        Self {
            state,
            adjacency,
            response: None,
            references: BTreeMap::new(),
            nodes: Map::new(),
        }
    }

    /// Append a child edge under `parent`, creating the parent entry if needed.
    pub fn with_edge(mut self, parent: impl Into<String>, child: ChildRef) -> Self {
        self.adjacency.entry(parent.into()).or_default().push(child);
        self
    }

    pub fn with_response(mut self, response: impl Into<String>) -> Self {
        self.response = Some(response.into());
        self
    }

    pub fn with_reference(mut self, index: impl Into<String>, url: impl Into<String>) -> Self {
        self.references.insert(index.into(), url.into());
        self
    }

    pub fn with_node_detail(mut self, name: impl Into<String>, detail: Value) -> Self {
        self.nodes.insert(name.into(), detail);
        self
    }

    pub fn is_finished(&self) -> bool {
        self.state.is_finished()
    }

    /// Number of distinct node names mentioned as keys or children.
    pub fn node_count(&self) -> usize {
        let mut names: std::collections::BTreeSet<&str> =
            self.adjacency.keys().map(String::as_str).collect();
        for children in self.adjacency.values() {
            names.extend(children.iter().map(|c| c.name.as_str()));
        }
        names.len()
    }
}
