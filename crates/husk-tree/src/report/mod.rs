//! Read-only view of a fully resolved tree

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::HashSet;

use crate::graph::{DependencyEdge, NodeId, PackageGraph, PackageNode};
use crate::unmet::UnmetWarning;

/// A declared dependency nothing installed satisfies
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissingDependency {
    pub dependant: NodeId,
    pub name: String,
    pub range: String,
}

/// Something a caller may want to fail on
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Problem {
    Missing(MissingDependency),
    Invalid { node: NodeId },
    Extraneous { node: NodeId },
    PeerInvalid { node: NodeId },
}

impl Problem {
    /// One-line description in npm's wording
    pub fn describe(&self, tree: &ResolvedTree) -> String {
        match self {
            Problem::Missing(missing) => format!(
                "missing: {}@{}, required by {}",
                missing.name,
                missing.range,
                tree.node(missing.dependant).id()
            ),
            Problem::Invalid { node } => {
                let node = tree.node(*node);
                format!("invalid: {} {}", node.id(), node.path.display())
            },
            Problem::Extraneous { node } => {
                let node = tree.node(*node);
                format!("extraneous: {} {}", node.id(), node.path.display())
            },
            Problem::PeerInvalid { node } => {
                let node = tree.node(*node);
                format!("peer invalid: {} {}", node.id(), node.path.display())
            },
        }
    }
}

/// Result of a resolution run
#[derive(Debug, Clone)]
pub struct ResolvedTree {
    graph: PackageGraph,
    warnings: Vec<UnmetWarning>,
}

impl ResolvedTree {
    pub(crate) fn new(graph: PackageGraph, warnings: Vec<UnmetWarning>) -> Self {
        Self { graph, warnings }
    }

    pub fn root_id(&self) -> NodeId {
        self.graph.root()
    }

    pub fn root(&self) -> &PackageNode {
        &self.graph[self.graph.root()]
    }

    /// Node by id. Ids only come from this tree, so the lookup cannot miss.
    pub fn node(&self, id: NodeId) -> &PackageNode {
        &self.graph[id]
    }

    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &PackageNode)> + '_ {
        self.graph.nodes()
    }

    pub fn len(&self) -> usize {
        self.graph.len()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.is_empty()
    }

    pub fn graph(&self) -> &PackageGraph {
        &self.graph
    }

    pub fn into_graph(self) -> PackageGraph {
        self.graph
    }

    /// Every installed instance of `name`
    pub fn find<'a>(&'a self, name: &'a str) -> impl Iterator<Item = (NodeId, &'a PackageNode)> + 'a {
        self.graph
            .nodes()
            .filter(move |(_, node)| node.real_name == name || node.name == name)
    }

    /// Warnings raised while sharing hoisted packages
    pub fn warnings(&self) -> &[UnmetWarning] {
        &self.warnings
    }

    /// Unresolved edges in tree order
    pub fn missing(&self) -> Vec<MissingDependency> {
        self.tree_order()
            .into_iter()
            .flat_map(|id| {
                self.graph[id]
                    .dependencies
                    .iter()
                    .filter_map(move |(name, edge)| match edge {
                        DependencyEdge::Unresolved(range) => Some(MissingDependency {
                            dependant: id,
                            name: name.clone(),
                            range: range.clone(),
                        }),
                        _ => None,
                    })
            })
            .collect()
    }

    /// Everything flagged on the tree, in tree order
    pub fn problems(&self) -> Vec<Problem> {
        let mut problems = Vec::new();
        let missing = self.missing();

        for id in self.tree_order() {
            let node = &self.graph[id];
            if node.extraneous {
                problems.push(Problem::Extraneous { node: id });
            }
            if node.invalid {
                problems.push(Problem::Invalid { node: id });
            }
            if node.peer_invalid {
                problems.push(Problem::PeerInvalid { node: id });
            }
            problems.extend(
                missing
                    .iter()
                    .filter(|entry| entry.dependant == id)
                    .cloned()
                    .map(Problem::Missing),
            );
        }

        problems
    }

    pub fn has_problems(&self) -> bool {
        self.graph.nodes().any(|(_, node)| node.extraneous || node.invalid || node.peer_invalid)
            || self
                .graph
                .nodes()
                .any(|(_, node)| node.dependencies.values().any(DependencyEdge::is_unresolved))
    }

    /// `npm ls --json` style document
    ///
    /// A package is expanded under the node that physically contains it;
    /// every other reference to it is marked `deduped`.
    pub fn to_json(&self) -> Value {
        let mut expanded = HashSet::new();
        let mut document = match self.node_json(self.graph.root(), &mut expanded) {
            Value::Object(map) => map,
            _ => Map::new(),
        };

        let root = self.root();
        if !root.name.is_empty() {
            document.insert("name".to_string(), json!(root.name));
        }

        let problems: Vec<String> = self.problems().iter().map(|p| p.describe(self)).collect();
        if !problems.is_empty() {
            document.insert("problems".to_string(), json!(problems));
        }

        Value::Object(document)
    }

    fn node_json(&self, id: NodeId, expanded: &mut HashSet<NodeId>) -> Value {
        expanded.insert(id);
        let node = &self.graph[id];
        let mut object = Map::new();

        if !node.version.is_empty() {
            object.insert("version".to_string(), json!(node.version));
        }
        if node.real_name != node.name && !node.name.is_empty() {
            object.insert("name".to_string(), json!(node.name));
        }
        object.insert("path".to_string(), json!(node.path.display().to_string()));
        if let Some(target) = &node.link_target {
            object.insert("link".to_string(), json!(target.display().to_string()));
        }
        for (flag, set) in [
            ("extraneous", node.extraneous),
            ("invalid", node.invalid),
            ("peerInvalid", node.peer_invalid),
        ] {
            if set {
                object.insert(flag.to_string(), Value::Bool(true));
            }
        }

        let mut dependencies = Map::new();
        for (name, edge) in &node.dependencies {
            let value = match edge {
                DependencyEdge::Unresolved(range) => json!({ "required": range, "missing": true }),
                DependencyEdge::Leaf(version) => json!(version),
                DependencyEdge::Resolved(target) => {
                    if self.graph[*target].parent == Some(id) && !expanded.contains(target) {
                        self.node_json(*target, expanded)
                    } else {
                        json!({ "version": self.graph[*target].version, "deduped": true })
                    }
                },
            };
            dependencies.insert(name.clone(), value);
        }
        if !dependencies.is_empty() {
            object.insert("dependencies".to_string(), Value::Object(dependencies));
        }

        Value::Object(object)
    }

    /// Pre-order over resolved edges from the root, each node once
    fn tree_order(&self) -> Vec<NodeId> {
        let mut order = Vec::with_capacity(self.graph.len());
        let mut visited = HashSet::with_capacity(self.graph.len());
        let mut stack = vec![self.graph.root()];

        while let Some(id) = stack.pop() {
            if !visited.insert(id) {
                continue;
            }
            order.push(id);

            let children: Vec<NodeId> = self.graph[id]
                .resolved_dependencies()
                .map(|(_, target)| target)
                .collect();
            stack.extend(children.into_iter().rev().filter(|target| !visited.contains(target)));
        }

        order
    }
}
