//! Installed package tree resolution for husk
//!
//! Reads an installed tree (a root package plus nested package-store
//! directories) into an arena graph and classifies every package in four
//! phases:
//!
//! 1. the Tree Builder materializes nodes from disk, deduplicating by
//!    canonical path and stopping at the depth limit;
//! 2. the Unmet-Dependency Resolver matches dependencies the builder could
//!    not find against packages installed by ancestors;
//! 3. the Peer-Dependency Resolver checks peer constraints against what each
//!    consumer provides;
//! 4. the Extraneous Propagator marks everything a used root dependency
//!    reaches as used.
//!
//! The phases are chained through [`Tree`] stage types, so they can only
//! run in that order.

mod build;
mod extraneous;
pub mod fs;
pub mod graph;
mod peers;
pub mod pipeline;
pub mod report;
pub mod unmet;

// Re-export main types
pub use fs::{
    CanonicalPaths, Collaborators, DirectoryLister, JsonManifestLoader, ManifestLoader,
    NpmRanges, PathResolver, RangeMatcher, StoreLister,
};
pub use graph::{DependencyEdge, NodeId, PackageGraph, PackageNode};
pub use pipeline::{Built, Finalized, PeersResolved, Tree, UnmetResolved};
pub use report::{MissingDependency, Problem, ResolvedTree};
pub use unmet::UnmetWarning;

use husk_config::ResolveOptions;
use husk_core::error::{HuskError, HuskResult};
use husk_core::utils::normalize_path;
use std::path::{Path, PathBuf};

/// Resolve the installed tree at `root` from the real filesystem
pub fn resolve(root: impl AsRef<Path>, options: &ResolveOptions) -> HuskResult<ResolvedTree> {
    resolve_with(root, options, &Collaborators::filesystem())
}

/// Resolve the installed tree at `root` through the given collaborators
pub fn resolve_with(
    root: impl AsRef<Path>,
    options: &ResolveOptions,
    collaborators: &Collaborators,
) -> HuskResult<ResolvedTree> {
    let built = build_tree(root, options, collaborators)?;
    let ranges = collaborators.ranges.as_ref();

    let resolved = built
        .resolve_unmet(ranges)
        .resolve_peers(ranges)
        .propagate_extraneous(ranges)
        .into_resolved();

    tracing::debug!(
        "Resolved {} packages, {} problems, {} warnings",
        resolved.len(),
        resolved.problems().len(),
        resolved.warnings().len()
    );
    Ok(resolved)
}

/// Run only the Tree Builder, leaving the remaining phases to the caller
pub fn build_tree(
    root: impl AsRef<Path>,
    options: &ResolveOptions,
    collaborators: &Collaborators,
) -> HuskResult<Tree<Built>> {
    let root = absolute_root(root.as_ref())?;
    tracing::debug!(
        "Reading installed tree at {} (dev: {}, depth: {})",
        root.display(),
        options.dev,
        options.max_depth
    );

    let graph = build::TreeBuilder::new(collaborators, options).build(&root, 0)?;
    Ok(Tree::new(graph))
}

fn absolute_root(root: &Path) -> HuskResult<PathBuf> {
    if root.is_absolute() {
        return Ok(normalize_path(root));
    }

    let cwd = std::env::current_dir().map_err(|e| HuskError::root_unreadable(root, e))?;
    Ok(normalize_path(&cwd.join(root)))
}
