//! Peer-Dependency Resolver

use std::collections::VecDeque;

use crate::fs::RangeMatcher;
use crate::graph::{DependencyEdge, NodeId, PackageGraph};

/// Outcome of looking up one peer constraint
#[derive(Debug, Clone, PartialEq, Eq)]
enum PeerLookup {
    /// Nothing installed for the consumer; recorded on the dependant
    Missing(String),
    Satisfied(NodeId),
    Unsatisfied(NodeId),
    /// Provided below the depth limit or by the root's own table
    Unchecked,
}

/// Check every node's peer constraints against what its consumer provides
///
/// A non-extraneous package proves its satisfied peers are used, and a
/// peer proven used in turn proves its own peers.
pub(crate) fn resolve_peers(graph: &mut PackageGraph, ranges: &dyn RangeMatcher) {
    let mut satisfied: Vec<Vec<NodeId>> = vec![Vec::new(); graph.len()];

    for id in graph.ids().collect::<Vec<_>>() {
        for (name, lookup) in lookup_peers(graph, id, ranges) {
            match lookup {
                PeerLookup::Missing(range) => {
                    tracing::trace!("{} is missing peer {}@{}", graph[id].id(), name, range);
                    graph[id]
                        .dependencies
                        .entry(name)
                        .or_insert(DependencyEdge::Unresolved(range));
                },
                PeerLookup::Unsatisfied(target) => {
                    tracing::debug!(
                        "{} fails the {} peer constraint of {}",
                        graph[target].id(),
                        name,
                        graph[id].id()
                    );
                    graph[target].peer_invalid = true;
                },
                PeerLookup::Satisfied(target) => satisfied[id.index()].push(target),
                PeerLookup::Unchecked => {},
            }
        }
    }

    let mut queue: VecDeque<NodeId> = graph.ids().filter(|id| !graph[*id].extraneous).collect();
    while let Some(id) = queue.pop_front() {
        for &target in &satisfied[id.index()] {
            if graph[target].extraneous {
                graph[target].extraneous = false;
                queue.push_back(target);
            }
        }
    }
}

/// Peers of `id` its consumer provides in an acceptable version
pub(crate) fn satisfied_peers(graph: &PackageGraph, id: NodeId, ranges: &dyn RangeMatcher) -> Vec<NodeId> {
    lookup_peers(graph, id, ranges)
        .into_iter()
        .filter_map(|(_, lookup)| match lookup {
            PeerLookup::Satisfied(target) => Some(target),
            _ => None,
        })
        .collect()
}

fn lookup_peers(graph: &PackageGraph, id: NodeId, ranges: &dyn RangeMatcher) -> Vec<(String, PeerLookup)> {
    let node = &graph[id];

    node.peer_dependencies
        .iter()
        .map(|(name, range)| {
            let provided = match node.parent {
                // the root provides its own peers
                None => {
                    let lookup = if node.dependencies.contains_key(name) {
                        PeerLookup::Unchecked
                    } else {
                        PeerLookup::Missing(range.clone())
                    };
                    return (name.clone(), lookup);
                },
                Some(parent) => graph[parent].dependencies.get(name),
            };

            let lookup = match provided {
                None | Some(DependencyEdge::Unresolved(_)) => PeerLookup::Missing(range.clone()),
                Some(DependencyEdge::Leaf(_)) => PeerLookup::Unchecked,
                Some(DependencyEdge::Resolved(target)) => {
                    if ranges.rejects(&graph[*target].version, range) {
                        PeerLookup::Unsatisfied(*target)
                    } else {
                        PeerLookup::Satisfied(*target)
                    }
                },
            };
            (name.clone(), lookup)
        })
        .collect()
}


#[cfg(test)]
mod property_tests {
    use super::*;
    use crate::fs::NpmRanges;
    use crate::graph::fixture::GraphFixture;
    use proptest::prelude::*;

    const NAMES: [&str; 5] = ["a", "b", "c", "d", "e"];

    prop_compose! {
        fn arb_flat_tree()(
            versions in prop::collection::vec(1u8..4, 5),
            extraneous in prop::collection::vec(any::<bool>(), 5),
            peers in prop::collection::vec((0usize..5, 0usize..5, 1u8..4), 0..8),
        ) -> PackageGraph {
            let mut fixture = GraphFixture::new("app", "1.0.0");
            let root = fixture.root();
            let ids: Vec<NodeId> = NAMES
                .iter()
                .zip(&versions)
                .map(|(name, major)| fixture.install(root, name, &format!("{}.0.0", major)))
                .collect();
            for (id, flag) in ids.iter().zip(&extraneous) {
                fixture.extraneous(*id, *flag);
            }
            for (from, to, major) in peers {
                fixture.peer(ids[from], NAMES[to], &format!("^{}.0.0", major));
            }
            fixture.build()
        }
    }

    proptest! {
        #[test]
        fn second_pass_is_a_no_op(mut graph in arb_flat_tree()) {
            resolve_peers(&mut graph, &NpmRanges);
            let once = graph.clone();
            resolve_peers(&mut graph, &NpmRanges);

            prop_assert_eq!(graph, once);
        }

        #[test]
        fn peer_flags_never_clear(mut graph in arb_flat_tree()) {
            resolve_peers(&mut graph, &NpmRanges);
            let invalid: Vec<bool> = graph.nodes().map(|(_, node)| node.peer_invalid).collect();
            resolve_peers(&mut graph, &NpmRanges);

            for ((_, node), was_invalid) in graph.nodes().zip(invalid) {
                prop_assert!(node.peer_invalid || !was_invalid);
            }
        }
    }
}
