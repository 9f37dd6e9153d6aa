//! Unmet-Dependency Resolver
//!
//! Matches every dependency the builder could not find physically
//! installed against the packages installed by its ancestors, the way
//! nested installs shadow hoisted ones.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

use crate::fs::RangeMatcher;
use crate::graph::{DependencyEdge, NodeId, PackageGraph};

/// A shared package that cannot satisfy one of its consumers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnmetWarning {
    pub dependant: PathBuf,
    pub name: String,
    pub range: String,
    pub found: NodeId,
    pub found_path: PathBuf,
    pub found_version: String,
}

impl fmt::Display for UnmetWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} requires {}@'{}' but will load {}, which is version {}",
            self.dependant.display(),
            self.name,
            self.range,
            self.found_path.display(),
            self.found_version
        )
    }
}

/// Resolve every `Unresolved` edge reachable from the root against the
/// dependant's ancestors. Edges nothing matches stay unresolved.
pub(crate) fn resolve_unmet(graph: &mut PackageGraph, ranges: &dyn RangeMatcher) -> Vec<UnmetWarning> {
    let mut warnings = Vec::new();

    for id in graph.post_order() {
        let unmet: Vec<(String, String)> = graph[id]
            .dependencies
            .iter()
            .filter_map(|(name, edge)| match edge {
                DependencyEdge::Unresolved(range) => Some((name.clone(), range.clone())),
                _ => None,
            })
            .collect();

        for (name, range) in unmet {
            let Some(found) = find_in_ancestors(graph, id, &name) else {
                tracing::trace!("{} has no installed {}", graph[id].id(), name);
                continue;
            };

            if ranges.rejects(&graph[found].version, &range) {
                graph[found].invalid = true;
                let warning = UnmetWarning {
                    dependant: graph[id].path.clone(),
                    name: name.clone(),
                    range,
                    found,
                    found_path: graph[found].path.clone(),
                    found_version: graph[found].version.clone(),
                };
                tracing::warn!("{}", warning);
                warnings.push(warning);
            }

            graph[id]
                .dependencies
                .insert(name, DependencyEdge::Resolved(found));
        }
    }

    warnings
}

/// Closest ancestor-provided package called `name`
///
/// A link is a hoisting boundary: nothing above a linked package is
/// consulted, and a linked dependant does not look upward at all.
fn find_in_ancestors(graph: &PackageGraph, id: NodeId, name: &str) -> Option<NodeId> {
    if graph[id].is_link() {
        return None;
    }

    for ancestor in graph.ancestors(id) {
        let node = &graph[ancestor];
        if node.real_name == name {
            return Some(ancestor);
        }
        if let Some(DependencyEdge::Resolved(target)) = node.dependencies.get(name) {
            return Some(*target);
        }
        if node.is_link() {
            break;
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::NpmRanges;
    use crate::graph::fixture::GraphFixture;

    #[test]
    fn test_hoisted_dependency_is_shared() {
        let mut fixture = GraphFixture::new("app", "1.0.0");
        let root = fixture.root();
        let a = fixture.install(root, "a", "1.0.0");
        let b = fixture.install(root, "b", "1.0.0");
        let shared = fixture.install(root, "shared", "2.1.0");
        fixture.unmet(a, "shared", "^2.0.0").unmet(b, "shared", "2.x");
        let mut graph = fixture.build();

        let warnings = resolve_unmet(&mut graph, &NpmRanges);

        assert!(warnings.is_empty());
        assert_eq!(graph[a].dependencies["shared"], DependencyEdge::Resolved(shared));
        assert_eq!(graph[b].dependencies["shared"], DependencyEdge::Resolved(shared));
        assert!(!graph[shared].invalid);
    }

    #[test]
    fn test_closest_ancestor_wins() {
        let mut fixture = GraphFixture::new("app", "1.0.0");
        let root = fixture.root();
        let a = fixture.install(root, "a", "1.0.0");
        let outer = fixture.install(root, "dep", "1.0.0");
        let inner = fixture.install(a, "dep", "2.0.0");
        let b = fixture.install(a, "b", "1.0.0");
        fixture.unmet(b, "dep", "*");
        let mut graph = fixture.build();

        resolve_unmet(&mut graph, &NpmRanges);

        assert_eq!(graph[b].dependencies["dep"], DependencyEdge::Resolved(inner));
        assert_ne!(inner, outer);
    }

    #[test]
    fn test_version_mismatch_warns_and_still_resolves() {
        let mut fixture = GraphFixture::new("app", "1.0.0");
        let root = fixture.root();
        let a = fixture.install(root, "a", "1.0.0");
        let old = fixture.install(root, "old", "1.0.0");
        fixture.unmet(a, "old", "^2.0.0");
        let mut graph = fixture.build();

        let warnings = resolve_unmet(&mut graph, &NpmRanges);

        assert!(graph[old].invalid);
        assert_eq!(graph[a].dependencies["old"], DependencyEdge::Resolved(old));
        assert_eq!(warnings.len(), 1);
        assert_eq!(
            warnings[0].to_string(),
            "/app/node_modules/a requires old@'^2.0.0' but will load /app/node_modules/old, which is version 1.0.0"
        );
    }

    #[test]
    fn test_self_dependency_matches_ancestor() {
        let mut fixture = GraphFixture::new("app", "1.0.0");
        let root = fixture.root();
        let a = fixture.install(root, "a", "1.0.0");
        let b = fixture.install(a, "b", "1.0.0");
        fixture.unmet(b, "a", "1");
        let mut graph = fixture.build();

        resolve_unmet(&mut graph, &NpmRanges);

        assert_eq!(graph[b].dependencies["a"], DependencyEdge::Resolved(a));
    }

    #[test]
    fn test_missing_stays_unresolved() {
        let mut fixture = GraphFixture::new("app", "1.0.0");
        let root = fixture.root();
        let a = fixture.install(root, "a", "1.0.0");
        fixture.unmet(a, "ghost", "^1.0.0").unmet(root, "phantom", "*");
        let mut graph = fixture.build();

        resolve_unmet(&mut graph, &NpmRanges);

        assert!(graph[a].dependencies["ghost"].is_unresolved());
        assert!(graph[root].dependencies["phantom"].is_unresolved());
    }

    #[test]
    fn test_link_blocks_hoisting() {
        let mut fixture = GraphFixture::new("app", "1.0.0");
        let root = fixture.root();
        let linked = fixture.install(root, "linked", "1.0.0");
        let inner = fixture.install(linked, "inner", "1.0.0");
        let across = fixture.install(root, "across", "1.0.0");
        fixture.link(linked);
        fixture.unmet(linked, "across", "*").unmet(inner, "across", "*");
        let mut graph = fixture.build();

        resolve_unmet(&mut graph, &NpmRanges);

        // the link itself does not look upward
        assert!(graph[linked].dependencies["across"].is_unresolved());
        // below the link, the walk stops at the link
        assert!(graph[inner].dependencies["across"].is_unresolved());
        assert!(!graph[across].invalid);
    }

    #[test]
    fn test_link_provides_to_its_children() {
        let mut fixture = GraphFixture::new("app", "1.0.0");
        let root = fixture.root();
        let linked = fixture.install(root, "linked", "1.0.0");
        let sibling = fixture.install(linked, "sibling", "1.0.0");
        let inner = fixture.install(linked, "inner", "1.0.0");
        fixture.link(linked);
        fixture.unmet(inner, "sibling", "*");
        let mut graph = fixture.build();

        resolve_unmet(&mut graph, &NpmRanges);

        assert_eq!(graph[inner].dependencies["sibling"], DependencyEdge::Resolved(sibling));
    }

    #[test]
    fn test_second_pass_changes_nothing() {
        let mut fixture = GraphFixture::new("app", "1.0.0");
        let root = fixture.root();
        let a = fixture.install(root, "a", "1.0.0");
        let b = fixture.install(a, "b", "1.0.0");
        fixture.install(root, "c", "0.9.0");
        fixture.unmet(a, "c", "^1.0.0").unmet(b, "c", "^1.0.0").unmet(b, "d", "1");
        let mut graph = fixture.build();

        let first = resolve_unmet(&mut graph, &NpmRanges);
        let once = graph.clone();
        let second = resolve_unmet(&mut graph, &NpmRanges);

        assert_eq!(first.len(), 2);
        assert!(second.is_empty());
        assert_eq!(graph, once);
    }
}
