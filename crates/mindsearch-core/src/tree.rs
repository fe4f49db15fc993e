use serde::{Deserialize, Serialize};

use crate::error::MalformedGraphError;
use crate::graph::{Adjacency, AgentStatus, GraphState, NodeId, ROOT};
use crate::snapshot::RenderSnapshot;

/// Rooted tree view of a reasoning graph.
///
/// Every node except the root carries the `state` and `id` of the edge that
/// leads to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeNode {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<AgentStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<NodeId>,
    #[serde(default)]
    pub children: Vec<TreeNode>,
}

impl TreeNode {
    pub fn leaf(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: None,
            id: None,
            children: Vec::new(),
        }
    }

    /// Total number of nodes in this subtree, including itself.
    pub fn size(&self) -> usize {
        1 + self.children.iter().map(TreeNode::size).sum::<usize>()
    }

    /// Length of the longest root-to-leaf path, counted in edges.
    pub fn depth(&self) -> usize {
        self.children
            .iter()
            .map(|c| c.depth() + 1)
            .max()
            .unwrap_or(0)
    }

    /// Depth-first search for the first node with the given name.
    pub fn find(&self, name: &str) -> Option<&TreeNode> {
        if self.name == name {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(name))
    }
}

/// Converts flat adjacency maps into rooted trees.
///
/// Expansion is depth-first from the root, keeping each node's child order.
/// A child without its own adjacency entry is a leaf. A DAG child shared by
/// several parents is expanded once under each of them.
#[derive(Debug, Clone)]
pub struct TreeProjector {
    root: String,
    max_depth: usize,
    max_nodes: usize,
}

impl Default for TreeProjector {
    fn default() -> Self {
        Self {
            root: ROOT.to_string(),
            max_depth: 64,
            max_nodes: 10_000,
        }
    }
}

impl TreeProjector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_root(mut self, root: impl Into<String>) -> Self {
        self.root = root.into();
        self
    }

    pub fn with_max_depth(mut self, limit: usize) -> Self {
        self.max_depth = limit;
        self
    }

    pub fn with_max_nodes(mut self, limit: usize) -> Self {
        self.max_nodes = limit;
        self
    }

    pub fn root(&self) -> &str {
        &self.root
    }

    /// Build the tree rooted at the configured root name.
    pub fn project(&self, adjacency: &Adjacency) -> Result<TreeNode, MalformedGraphError> {
        if !adjacency.contains_key(&self.root) {
            return Err(MalformedGraphError::MissingRoot {
                root: self.root.clone(),
            });
        }

        let mut walk = Walk {
            adjacency,
            path: Vec::new(),
            emitted: 0,
            max_depth: self.max_depth,
            max_nodes: self.max_nodes,
        };
        walk.expand(self.root.as_str())
    }

    /// Project a snapshot and package it for emission.
    pub fn render(
        &self,
        state: GraphState,
        branch_id: Option<String>,
    ) -> Result<RenderSnapshot, MalformedGraphError> {
        let tree = self.project(&state.adjacency).inspect_err(|err| {
            tracing::warn!(
                error = %err,
                branch = branch_id.as_deref().unwrap_or("-"),
                "snapshot not projectable"
            );
        })?;
        tracing::trace!(nodes = tree.size(), depth = tree.depth(), "projected reasoning tree");
        Ok(RenderSnapshot {
            tree,
            raw_adjacency: state.adjacency,
            branch_id,
            state: state.state,
            response: state.response,
            references: state.references,
            nodes: state.nodes,
        })
    }
}

struct Walk<'a> {
    adjacency: &'a Adjacency,
    // Names on the path from the root to the node being expanded.
    path: Vec<&'a str>,
    emitted: usize,
    max_depth: usize,
    max_nodes: usize,
}

impl<'a> Walk<'a> {
    fn expand(&mut self, name: &'a str) -> Result<TreeNode, MalformedGraphError> {
        if self.path.contains(&name) {
            let mut path: Vec<String> = self.path.iter().map(|s| s.to_string()).collect();
            path.push(name.to_string());
            return Err(MalformedGraphError::Cycle { path });
        }
        if self.path.len() > self.max_depth {
            return Err(MalformedGraphError::DepthExceeded {
                limit: self.max_depth,
            });
        }
        self.emitted += 1;
        if self.emitted > self.max_nodes {
            return Err(MalformedGraphError::TooManyNodes {
                limit: self.max_nodes,
            });
        }

        let mut node = TreeNode::leaf(name);
        if let Some(children) = self.adjacency.get(name) {
            self.path.push(name);
            node.children.reserve(children.len());
            for child in children {
                let mut subtree = self.expand(&child.name)?;
                subtree.state = Some(child.state);
                subtree.id = Some(child.id.clone());
                node.children.push(subtree);
            }
            self.path.pop();
        }
        Ok(node)
    }
}
