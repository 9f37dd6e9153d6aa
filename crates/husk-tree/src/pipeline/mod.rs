//! Phase ordering as types
//!
//! A [`Tree`] carries a zero-sized stage marker. Each phase consumes the
//! tree of the previous stage and returns the next one, so the phases can
//! only run in order and only once each.

use std::marker::PhantomData;

use crate::fs::RangeMatcher;
use crate::graph::PackageGraph;
use crate::report::ResolvedTree;
use crate::unmet::UnmetWarning;

/// Output of the Tree Builder
#[derive(Debug)]
pub enum Built {}

/// Ancestor-provided dependencies matched
#[derive(Debug)]
pub enum UnmetResolved {}

/// Peer constraints checked
#[derive(Debug)]
pub enum PeersResolved {}

/// Extraneous flags final
#[derive(Debug)]
pub enum Finalized {}

/// The package graph at a given resolution stage
#[derive(Debug)]
pub struct Tree<S> {
    graph: PackageGraph,
    warnings: Vec<UnmetWarning>,
    stage: PhantomData<S>,
}

impl<S> Tree<S> {
    fn advance<T>(self) -> Tree<T> {
        Tree {
            graph: self.graph,
            warnings: self.warnings,
            stage: PhantomData,
        }
    }

    /// Read-only view of the graph at this stage
    pub fn graph(&self) -> &PackageGraph {
        &self.graph
    }
}

impl Tree<Built> {
    pub(crate) fn new(graph: PackageGraph) -> Self {
        Self {
            graph,
            warnings: Vec::new(),
            stage: PhantomData,
        }
    }

    /// Match unresolved dependencies against ancestors
    pub fn resolve_unmet(mut self, ranges: &dyn RangeMatcher) -> Tree<UnmetResolved> {
        let warnings = crate::unmet::resolve_unmet(&mut self.graph, ranges);
        self.warnings.extend(warnings);
        self.advance()
    }
}

impl Tree<UnmetResolved> {
    /// Check peer constraints of every node
    pub fn resolve_peers(mut self, ranges: &dyn RangeMatcher) -> Tree<PeersResolved> {
        crate::peers::resolve_peers(&mut self.graph, ranges);
        self.advance()
    }
}

impl Tree<PeersResolved> {
    /// Force used subtrees out of the extraneous state
    pub fn propagate_extraneous(mut self, ranges: &dyn RangeMatcher) -> Tree<Finalized> {
        crate::extraneous::propagate_extraneous(&mut self.graph, ranges);
        self.advance()
    }
}

impl Tree<Finalized> {
    pub fn into_resolved(self) -> ResolvedTree {
        ResolvedTree::new(self.graph, self.warnings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::NpmRanges;
    use crate::graph::fixture::GraphFixture;

    #[test]
    fn test_stages_run_in_order() {
        let mut fixture = GraphFixture::new("app", "1.0.0");
        let root = fixture.root();
        let a = fixture.install(root, "a", "1.0.0");
        let old = fixture.install(root, "old", "1.0.0");
        let plugin = fixture.install(a, "plugin", "1.0.0");
        fixture
            .unmet(a, "old", "^2.0.0")
            .peer(plugin, "a", "1")
            .extraneous(old, true)
            .extraneous(plugin, true);

        let resolved = Tree::new(fixture.build())
            .resolve_unmet(&NpmRanges)
            .resolve_peers(&NpmRanges)
            .propagate_extraneous(&NpmRanges)
            .into_resolved();

        assert_eq!(resolved.warnings().len(), 1);
        assert!(resolved.node(old).invalid);
        // old was extraneous at the top level, but a used package needs it
        assert!(!resolved.node(old).extraneous);
        assert!(!resolved.node(plugin).extraneous);
    }

    #[test]
    fn test_rerunning_phases_changes_no_flags() {
        let mut fixture = GraphFixture::new("app", "1.0.0");
        let root = fixture.root();
        let a = fixture.install(root, "a", "1.0.0");
        let b = fixture.install(root, "b", "1.0.0");
        let c = fixture.install(root, "c", "1.0.0");
        let host = fixture.install(root, "host", "3.0.0");
        let nested = fixture.install(a, "nested", "1.0.0");
        let stray = fixture.install(root, "stray", "1.0.0");
        fixture
            .unmet(a, "c", "^2.0.0")
            .unmet(nested, "b", "1")
            .unmet(b, "a", "1")
            .peer(c, "host", "^3.0.0")
            .peer(nested, "c", "1")
            .peer(stray, "host", "^1.0.0")
            .extraneous(b, true)
            .extraneous(c, true)
            .extraneous(host, true)
            .extraneous(stray, true);

        let mut graph = Tree::new(fixture.build())
            .resolve_unmet(&NpmRanges)
            .resolve_peers(&NpmRanges)
            .propagate_extraneous(&NpmRanges)
            .into_resolved()
            .into_graph();
        let once = graph.clone();

        let warnings = crate::unmet::resolve_unmet(&mut graph, &NpmRanges);
        crate::peers::resolve_peers(&mut graph, &NpmRanges);
        crate::extraneous::propagate_extraneous(&mut graph, &NpmRanges);

        assert!(warnings.is_empty());
        assert_eq!(graph, once);
        assert!(graph[stray].extraneous);
        assert!(graph[host].peer_invalid);
        assert!(!graph[host].extraneous);
    }
}
