//! Extraneous Propagator

use std::collections::HashSet;

use crate::fs::RangeMatcher;
use crate::graph::{NodeId, PackageGraph};
use crate::peers::satisfied_peers;

/// Mark everything reachable from a used root dependency as used
///
/// Both resolved dependencies and satisfied peers are followed. Root
/// dependencies still flagged extraneous are skipped, so their subtrees
/// keep whatever the earlier phases decided.
pub(crate) fn propagate_extraneous(graph: &mut PackageGraph, ranges: &dyn RangeMatcher) {
    let root = graph.root();
    let starts: Vec<NodeId> = graph[root]
        .resolved_dependencies()
        .map(|(_, target)| target)
        .filter(|target| !graph[*target].extraneous)
        .collect();

    let mut visited = HashSet::with_capacity(graph.len());
    visited.insert(root);
    for start in starts {
        force_not_extraneous(graph, start, ranges, &mut visited);
    }
}

fn force_not_extraneous(
    graph: &mut PackageGraph,
    start: NodeId,
    ranges: &dyn RangeMatcher,
    visited: &mut HashSet<NodeId>,
) {
    let mut stack = vec![start];

    while let Some(id) = stack.pop() {
        if !visited.insert(id) {
            continue;
        }

        graph[id].extraneous = false;
        stack.extend(
            graph[id]
                .resolved_dependencies()
                .map(|(_, target)| target)
                .chain(satisfied_peers(graph, id, ranges))
                .filter(|target| !visited.contains(target)),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::NpmRanges;
    use crate::graph::fixture::GraphFixture;
    use crate::graph::DependencyEdge;

    #[test]
    fn test_forces_through_used_subtrees() {
        let mut fixture = GraphFixture::new("app", "1.0.0");
        let root = fixture.root();
        let a = fixture.install(root, "a", "1.0.0");
        let nested = fixture.install(a, "nested", "1.0.0");
        let deeper = fixture.install(nested, "deeper", "1.0.0");
        fixture.extraneous(nested, true).extraneous(deeper, true);
        let mut graph = fixture.build();

        propagate_extraneous(&mut graph, &NpmRanges);

        assert!(!graph[nested].extraneous);
        assert!(!graph[deeper].extraneous);
    }

    #[test]
    fn test_extraneous_root_dependency_is_skipped() {
        let mut fixture = GraphFixture::new("app", "1.0.0");
        let root = fixture.root();
        let stray = fixture.install(root, "stray", "1.0.0");
        let below = fixture.install(stray, "below", "1.0.0");
        fixture.extraneous(stray, true).extraneous(below, true);
        let mut graph = fixture.build();

        propagate_extraneous(&mut graph, &NpmRanges);

        assert!(graph[stray].extraneous);
        assert!(graph[below].extraneous);
    }

    #[test]
    fn test_shared_node_reached_from_used_side() {
        let mut fixture = GraphFixture::new("app", "1.0.0");
        let root = fixture.root();
        let used = fixture.install(root, "used", "1.0.0");
        let stray = fixture.install(root, "stray", "1.0.0");
        let shared = fixture.install(root, "shared", "1.0.0");
        fixture
            .extraneous(stray, true)
            .extraneous(shared, true);
        let mut graph = fixture.build();
        graph[used].dependencies.insert("shared".into(), DependencyEdge::Resolved(shared));
        graph[stray].dependencies.insert("shared".into(), DependencyEdge::Resolved(shared));

        propagate_extraneous(&mut graph, &NpmRanges);

        assert!(!graph[shared].extraneous);
        assert!(graph[stray].extraneous);
    }

    #[test]
    fn test_terminates_on_cycles() {
        let mut fixture = GraphFixture::new("app", "1.0.0");
        let root = fixture.root();
        let a = fixture.install(root, "a", "1.0.0");
        let b = fixture.install(root, "b", "1.0.0");
        fixture.extraneous(b, true);
        let mut graph = fixture.build();
        graph[a].dependencies.insert("b".into(), DependencyEdge::Resolved(b));
        graph[b].dependencies.insert("a".into(), DependencyEdge::Resolved(a));
        graph[b].dependencies.insert("app".into(), DependencyEdge::Resolved(root));

        propagate_extraneous(&mut graph, &NpmRanges);

        assert!(!graph[a].extraneous);
        assert!(!graph[b].extraneous);
        assert!(!graph[root].extraneous);
    }

    #[test]
    fn test_second_pass_changes_nothing() {
        let mut fixture = GraphFixture::new("app", "1.0.0");
        let root = fixture.root();
        let a = fixture.install(root, "a", "1.0.0");
        let stray = fixture.install(root, "stray", "1.0.0");
        let nested = fixture.install(a, "nested", "1.0.0");
        fixture.extraneous(stray, true).extraneous(nested, true);
        let mut graph = fixture.build();

        propagate_extraneous(&mut graph, &NpmRanges);
        let once = graph.clone();
        propagate_extraneous(&mut graph, &NpmRanges);

        assert_eq!(graph, once);
    }

    #[test]
    fn test_peers_of_used_packages_are_used() {
        let mut fixture = GraphFixture::new("app", "1.0.0");
        let root = fixture.root();
        let a = fixture.install(root, "a", "1.0.0");
        let b = fixture.install(root, "b", "1.0.0");
        let p = fixture.install(root, "p", "1.2.0");
        let old = fixture.install(root, "old", "1.0.0");
        fixture
            .peer(b, "p", "^1.0.0")
            .peer(b, "old", "^2.0.0")
            .extraneous(b, true)
            .extraneous(p, true)
            .extraneous(old, true);
        let mut graph = fixture.build();
        graph[a].dependencies.insert("b".into(), DependencyEdge::Resolved(b));

        propagate_extraneous(&mut graph, &NpmRanges);

        assert!(!graph[b].extraneous);
        assert!(!graph[p].extraneous);
        // a peer in the wrong version does not prove anything
        assert!(graph[old].extraneous);
    }
}
