//! Arena-backed package graph
//!
//! Every installed package instance lives in one `Vec<PackageNode>` and is
//! addressed by its [`NodeId`]. Dependency edges and parent back-references
//! are plain indices, so hoisted packages are shared by copying an id and
//! cyclic installs need no reference counting.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::ops::{Index, IndexMut};
use std::path::PathBuf;

/// Index of a node in a [`PackageGraph`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(usize);

impl NodeId {
    pub(crate) fn new(index: usize) -> Self {
        Self(index)
    }

    /// Position of the node in the arena
    pub fn index(self) -> usize {
        self.0
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// State of one declared dependency
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DependencyEdge {
    /// Declared with this range but not matched to an installed package
    Unresolved(String),
    /// Satisfied by an installed package, possibly shared with other dependants
    Resolved(NodeId),
    /// Installed below the depth limit; only its version was read
    Leaf(String),
}

impl DependencyEdge {
    /// Target node, if this edge is resolved
    pub fn target(&self) -> Option<NodeId> {
        match self {
            DependencyEdge::Resolved(id) => Some(*id),
            _ => None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, DependencyEdge::Resolved(_))
    }

    pub fn is_unresolved(&self) -> bool {
        matches!(self, DependencyEdge::Unresolved(_))
    }
}

/// One installed package instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageNode {
    /// Name from the package's own manifest
    pub name: String,
    /// Name the dependant expected to find at this location
    pub real_name: String,
    pub version: String,
    /// Location the package was reached through
    pub path: PathBuf,
    /// Canonical location, the node's identity
    pub real_path: PathBuf,
    /// Set when the install location is a link to `real_path`
    pub link_target: Option<PathBuf>,
    pub dependencies: IndexMap<String, DependencyEdge>,
    pub dev_dependencies: IndexMap<String, String>,
    pub peer_dependencies: IndexMap<String, String>,
    pub optional_dependencies: IndexMap<String, String>,
    /// Physical parent; `None` only for the root
    pub parent: Option<NodeId>,
    pub invalid: bool,
    pub extraneous: bool,
    pub peer_invalid: bool,
    pub depth: u32,
}

impl PackageNode {
    /// Create a node with no dependencies and no flags set
    pub fn new(name: impl Into<String>, version: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        let name = name.into();
        let path = path.into();
        Self {
            real_name: name.clone(),
            name,
            version: version.into(),
            real_path: path.clone(),
            path,
            link_target: None,
            dependencies: IndexMap::new(),
            dev_dependencies: IndexMap::new(),
            peer_dependencies: IndexMap::new(),
            optional_dependencies: IndexMap::new(),
            parent: None,
            invalid: false,
            extraneous: false,
            peer_invalid: false,
            depth: 0,
        }
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    pub fn is_link(&self) -> bool {
        self.link_target.is_some()
    }

    /// `realName@version`, or `(root)` for an anonymous root
    pub fn id(&self) -> String {
        if self.real_name.is_empty() {
            "(root)".to_string()
        } else {
            format!("{}@{}", self.real_name, self.version)
        }
    }

    /// Resolved dependency targets in declaration order
    pub fn resolved_dependencies(&self) -> impl Iterator<Item = (&str, NodeId)> + '_ {
        self.dependencies
            .iter()
            .filter_map(|(name, edge)| edge.target().map(|id| (name.as_str(), id)))
    }
}

/// The arena plus the id of its root
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageGraph {
    nodes: Vec<PackageNode>,
    root: NodeId,
}

impl PackageGraph {
    /// Wrap a finished arena. `root` must index into `nodes`.
    pub(crate) fn from_parts(nodes: Vec<PackageNode>, root: NodeId) -> Self {
        debug_assert!(root.index() < nodes.len());
        Self { nodes, root }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Every node with its id, in arena order
    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &PackageNode)> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .map(|(index, node)| (NodeId::new(index), node))
    }

    pub fn ids(&self) -> impl Iterator<Item = NodeId> {
        (0..self.nodes.len()).map(NodeId::new)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Walk the parent chain of `id`, nearest ancestor first
    pub fn ancestors(&self, id: NodeId) -> Ancestors<'_> {
        Ancestors {
            graph: self,
            next: self[id].parent,
        }
    }

    /// Nodes reachable from the root through resolved edges, children
    /// before their dependants. Each node appears once even when shared
    /// or part of a cycle.
    pub fn post_order(&self) -> Vec<NodeId> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut visited = HashSet::with_capacity(self.nodes.len());
        // (node, children already pushed)
        let mut stack = vec![(self.root, false)];
        visited.insert(self.root);

        while let Some((id, expanded)) = stack.pop() {
            if expanded {
                order.push(id);
                continue;
            }

            stack.push((id, true));
            let children: Vec<NodeId> = self[id]
                .resolved_dependencies()
                .map(|(_, target)| target)
                .collect();
            for target in children.into_iter().rev() {
                if visited.insert(target) {
                    stack.push((target, false));
                }
            }
        }

        order
    }
}

impl Index<NodeId> for PackageGraph {
    type Output = PackageNode;

    fn index(&self, id: NodeId) -> &PackageNode {
        &self.nodes[id.index()]
    }
}

impl IndexMut<NodeId> for PackageGraph {
    fn index_mut(&mut self, id: NodeId) -> &mut PackageNode {
        &mut self.nodes[id.index()]
    }
}

/// Iterator over a node's parent chain
pub struct Ancestors<'a> {
    graph: &'a PackageGraph,
    next: Option<NodeId>,
}

impl Iterator for Ancestors<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.next?;
        self.next = self.graph[current].parent;
        Some(current)
    }
}
