//! `npm ls` style tree rendering

use std::collections::HashSet;

use husk_tree::{DependencyEdge, NodeId, PackageNode, ResolvedTree};

use super::colors::ColorSupport;

/// Renders a resolved tree as box-drawn text
///
/// A package is expanded under the package that physically contains it.
/// Every other edge to it, hoisted shares and cycles alike, prints a
/// single `deduped` line.
pub struct TreeRenderer {
    colors: ColorSupport,
}

impl TreeRenderer {
    pub fn new(colors: ColorSupport) -> Self {
        Self { colors }
    }

    pub fn render(&self, tree: &ResolvedTree) -> String {
        let root = tree.root();
        let mut lines = vec![format!("{} {}", self.node_label(root), root.path.display())];
        let mut expanded = HashSet::from([tree.root_id()]);

        self.render_children(tree, tree.root_id(), "", &mut expanded, &mut lines);
        lines.join("\n")
    }

    fn render_children(
        &self,
        tree: &ResolvedTree,
        id: NodeId,
        prefix: &str,
        expanded: &mut HashSet<NodeId>,
        lines: &mut Vec<String>,
    ) {
        let edges = &tree.node(id).dependencies;

        for (index, (name, edge)) in edges.iter().enumerate() {
            let last = index + 1 == edges.len();
            let branch = if last { "└── " } else { "├── " };

            match edge {
                DependencyEdge::Unresolved(range) => {
                    let unmet = format!("UNMET DEPENDENCY {}@{}", name, range);
                    lines.push(format!("{}{}{}", prefix, branch, self.colors.red(&unmet)));
                },
                DependencyEdge::Leaf(version) => {
                    lines.push(format!("{}{}{}@{}", prefix, branch, name, version));
                },
                DependencyEdge::Resolved(target) => {
                    let child = tree.node(*target);
                    if child.parent == Some(id) && expanded.insert(*target) {
                        lines.push(format!("{}{}{}", prefix, branch, self.node_label(child)));
                        let nested = format!("{}{}", prefix, if last { "    " } else { "│   " });
                        self.render_children(tree, *target, &nested, expanded, lines);
                    } else {
                        lines.push(format!(
                            "{}{}{} {}",
                            prefix,
                            branch,
                            child.id(),
                            self.colors.dim("deduped")
                        ));
                    }
                },
            }
        }
    }

    fn node_label(&self, node: &PackageNode) -> String {
        let mut label = node.id();

        if let Some(target) = &node.link_target {
            label.push_str(&format!(" -> {}", target.display()));
        }
        if node.extraneous {
            label.push(' ');
            label.push_str(&self.colors.yellow("extraneous"));
        }
        if node.invalid {
            label.push(' ');
            label.push_str(&self.colors.red("invalid"));
        }
        if node.peer_invalid {
            label.push(' ');
            label.push_str(&self.colors.red("peer invalid"));
        }

        label
    }
}
