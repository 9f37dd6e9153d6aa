//! Tree Builder: materializes the installed directory layout into the arena
//!
//! Siblings are built in parallel. The identity registry maps each
//! canonical path to the single node built for it; a location whose
//! identity is already registered is linked to the existing node instead
//! of being walked again, which both deduplicates shared installs and
//! breaks cycles.
//!
//! Linked locations are held back until every real location has been
//! registered, so a package's node always describes where it is actually
//! installed rather than wherever a link to it happened to be read first.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use husk_config::ResolveOptions;
use husk_core::error::{HuskError, HuskResult};
use husk_core::utils::package_dir;
use husk_core::Manifest;
use parking_lot::Mutex;
use rayon::prelude::*;
use std::path::{Path, PathBuf};

use crate::fs::Collaborators;
use crate::graph::{DependencyEdge, NodeId, PackageGraph, PackageNode};

/// Builds one [`PackageGraph`] from disk
pub(crate) struct TreeBuilder<'a> {
    collaborators: &'a Collaborators,
    options: &'a ResolveOptions,
    registry: DashMap<PathBuf, NodeId>,
    arena: Mutex<Vec<Option<PackageNode>>>,
    deferred: Mutex<Vec<DeferredLink>>,
}

/// What a child build needs to know about its parent
struct ParentFrame<'m> {
    id: NodeId,
    path: PathBuf,
    real_path: PathBuf,
    manifest: &'m Manifest,
    depth: u32,
}

/// A location that has been read but not yet registered
struct Site {
    path: PathBuf,
    real_path: PathBuf,
    is_link: bool,
    manifest: Manifest,
    listing: Vec<String>,
}

/// Where a node sits relative to the package that installed it
struct Placement {
    parent: Option<NodeId>,
    expected_name: Option<String>,
    required_range: Option<String>,
    extraneous: bool,
    depth: u32,
}

/// A linked location waiting for the real locations to be registered
struct DeferredLink {
    name: String,
    path: PathBuf,
    real_path: PathBuf,
    manifest: Manifest,
    placement: Placement,
}

/// Outcome of reading one installed entry
#[derive(Debug, PartialEq, Eq)]
enum Child {
    Edge(DependencyEdge),
    /// A link, resolved once the real locations are known
    Deferred,
}

impl<'a> TreeBuilder<'a> {
    pub(crate) fn new(collaborators: &'a Collaborators, options: &'a ResolveOptions) -> Self {
        Self {
            collaborators,
            options,
            registry: DashMap::new(),
            arena: Mutex::new(Vec::new()),
            deferred: Mutex::new(Vec::new()),
        }
    }

    /// Build the whole tree rooted at `location`
    ///
    /// Fails only when the root location itself cannot be resolved.
    pub(crate) fn build(self, location: &Path, depth: u32) -> HuskResult<PackageGraph> {
        let root = self.build_root(location, depth)?;
        self.build_deferred_links();
        self.into_graph(root)
    }

    fn build_root(&self, location: &Path, depth: u32) -> HuskResult<NodeId> {
        let (real_path, is_link) = self
            .collaborators
            .paths
            .canonicalize(location)
            .map_err(|source| HuskError::root_unreadable(location, source))?;

        let listing = self.list(location);
        let manifest = match self.collaborators.manifests.load(location) {
            Ok(manifest) => manifest,
            Err(e) => {
                tracing::debug!(
                    "No usable manifest at {} ({}), requiring every installed package",
                    location.display(),
                    e
                );
                Manifest::synthesize(listing.iter().cloned())
            },
        };

        let id = self.reserve();
        self.registry.insert(real_path.clone(), id);

        let site = Site {
            path: location.to_path_buf(),
            real_path,
            is_link,
            manifest,
            listing,
        };
        let placement = Placement {
            parent: None,
            expected_name: None,
            required_range: None,
            extraneous: false,
            depth,
        };
        self.materialize(id, site, placement);
        Ok(id)
    }

    /// Build the package installed as `name` under `parent`
    ///
    /// Returns `None` when the location cannot be read; the package then
    /// behaves as if it were not installed.
    fn build_child(&self, parent: &ParentFrame<'_>, name: &str) -> Option<Child> {
        let store = parent.path.join(&self.options.store_dir);
        let path = match package_dir(&store, name) {
            Ok(path) => path,
            Err(e) => {
                tracing::debug!("Skipping {}: {}", name, e);
                return None;
            },
        };

        if parent.depth > self.options.max_depth {
            return self
                .load_manifest(&path)
                .map(|manifest| Child::Edge(DependencyEdge::Leaf(manifest.version)));
        }

        let (real_path, is_symlink) = match self.collaborators.paths.canonicalize(&path) {
            Ok(resolved) => resolved,
            Err(e) => {
                tracing::debug!("Skipping unreadable {}: {}", path.display(), e);
                return None;
            },
        };
        let manifest = self.load_manifest(&path)?;

        // A scope directory that is itself a link also moves the package
        let expected_real = package_dir(&parent.real_path.join(&self.options.store_dir), name).ok();
        let is_link = is_symlink || expected_real.as_deref() != Some(real_path.as_path());

        let placement = Placement {
            parent: Some(parent.id),
            expected_name: Some(name.to_string()),
            required_range: parent
                .manifest
                .requested_range(name, self.options.dev)
                .map(str::to_string),
            extraneous: !parent.manifest.requires(name, self.options.dev),
            depth: parent.depth.saturating_add(1),
        };

        if is_link {
            tracing::trace!("Deferring link {} -> {}", path.display(), real_path.display());
            self.deferred.lock().push(DeferredLink {
                name: name.to_string(),
                path,
                real_path,
                manifest,
                placement,
            });
            return Some(Child::Deferred);
        }

        let id = match self.registry.entry(real_path.clone()) {
            Entry::Occupied(existing) => {
                tracing::trace!("{} already built as {}", path.display(), existing.get());
                return Some(Child::Edge(DependencyEdge::Resolved(*existing.get())));
            },
            Entry::Vacant(slot) => {
                let id = self.reserve();
                slot.insert(id);
                id
            },
        };

        let listing = self.list(&path);
        let site = Site {
            path,
            real_path,
            is_link: false,
            manifest,
            listing,
        };
        self.materialize(id, site, placement);
        Some(Child::Edge(DependencyEdge::Resolved(id)))
    }

    /// Point every deferred link at the node registered for its target,
    /// building the target from the link only when nothing else installs it
    ///
    /// Links are handled one at a time in path order; links found while
    /// building a target are handled in the next round.
    fn build_deferred_links(&self) {
        loop {
            let mut pending = std::mem::take(&mut *self.deferred.lock());
            if pending.is_empty() {
                return;
            }
            pending.sort_by(|a, b| a.path.cmp(&b.path));

            for link in pending {
                let Some(parent) = link.placement.parent else {
                    continue;
                };
                let (id, fresh) = match self.registry.entry(link.real_path.clone()) {
                    Entry::Occupied(existing) => (*existing.get(), false),
                    Entry::Vacant(slot) => {
                        let id = self.reserve();
                        slot.insert(id);
                        (id, true)
                    },
                };

                if fresh {
                    let site = Site {
                        listing: self.list(&link.path),
                        path: link.path,
                        real_path: link.real_path,
                        is_link: true,
                        manifest: link.manifest,
                    };
                    self.materialize(id, site, link.placement);
                } else {
                    tracing::trace!("{} links to {}", link.path.display(), id);
                }

                if let Some(Some(node)) = self.arena.lock().get_mut(parent.index()) {
                    node.dependencies.insert(link.name, DependencyEdge::Resolved(id));
                }
            }
        }
    }

    /// Fill the reserved slot `id` with the node for `site`, building its
    /// installed children first
    fn materialize(&self, id: NodeId, site: Site, placement: Placement) {
        let Site {
            path,
            real_path,
            is_link,
            manifest,
            listing,
        } = site;
        let Placement {
            parent,
            expected_name,
            required_range,
            extraneous,
            depth,
        } = placement;

        let mut node = PackageNode::new(manifest.name.clone(), manifest.version.clone(), path.clone());
        node.real_name = expected_name.clone().unwrap_or_else(|| manifest.name.clone());
        node.real_path = real_path.clone();
        node.link_target = is_link.then(|| real_path.clone());
        node.parent = parent;
        node.depth = depth;
        node.extraneous = extraneous;
        node.dev_dependencies = manifest.dev_dependencies.clone();
        node.optional_dependencies = manifest.optional_dependencies.clone();

        if expected_name.is_some_and(|expected| expected != manifest.name) {
            tracing::debug!(
                "{} is installed as {} but names itself {}",
                path.display(),
                node.real_name,
                manifest.name
            );
            node.invalid = true;
        }
        if let Some(range) = &required_range {
            if self.collaborators.ranges.rejects(&manifest.version, range) {
                node.invalid = true;
            }
        }

        if depth > self.options.max_depth {
            tracing::trace!("{} is past the depth limit, not expanding", node.id());
        } else {
            node.peer_dependencies = manifest.peer_dependencies.clone();
            node.dependencies = manifest
                .dependencies
                .iter()
                .map(|(name, range)| (name.clone(), DependencyEdge::Unresolved(range.clone())))
                .collect();

            // Development dependencies are only ever installed for the root
            if parent.is_none() && self.options.dev {
                for (name, range) in &manifest.dev_dependencies {
                    node.dependencies
                        .entry(name.clone())
                        .or_insert_with(|| DependencyEdge::Unresolved(range.clone()));
                }
            }
        }

        let frame = ParentFrame {
            id,
            path,
            real_path,
            manifest: &manifest,
            depth,
        };
        let children: Vec<(String, Child)> = listing
            .par_iter()
            .filter_map(|name| self.build_child(&frame, name).map(|child| (name.clone(), child)))
            .collect();

        let mut linked = Vec::new();
        for (name, child) in children {
            match child {
                Child::Edge(edge) => {
                    node.dependencies.insert(name, edge);
                },
                Child::Deferred => {
                    // holds the entry's position until the link is resolved
                    node.dependencies
                        .entry(name.clone())
                        .or_insert_with(|| DependencyEdge::Unresolved("*".to_string()));
                    linked.push(name);
                },
            }
        }

        for name in manifest.optional_dependencies.keys() {
            if linked.contains(name) {
                continue;
            }
            if node.dependencies.get(name).is_some_and(DependencyEdge::is_unresolved) {
                tracing::trace!("Optional dependency {} of {} is not installed", name, node.id());
                node.dependencies.shift_remove(name);
            }
        }

        self.arena.lock()[id.index()] = Some(node);
    }

    fn reserve(&self) -> NodeId {
        let mut arena = self.arena.lock();
        arena.push(None);
        NodeId::new(arena.len() - 1)
    }

    fn list(&self, location: &Path) -> Vec<String> {
        let store = location.join(&self.options.store_dir);
        self.collaborators.lister.list(&store).unwrap_or_else(|e| {
            tracing::trace!("Nothing installed under {}: {}", store.display(), e);
            Vec::new()
        })
    }

    fn load_manifest(&self, path: &Path) -> Option<Manifest> {
        match self.collaborators.manifests.load(path) {
            Ok(manifest) => Some(manifest),
            Err(e) => {
                tracing::debug!("Skipping {}: {}", path.display(), e);
                None
            },
        }
    }

    fn into_graph(self, root: NodeId) -> HuskResult<PackageGraph> {
        let nodes = self
            .arena
            .into_inner()
            .into_iter()
            .enumerate()
            .map(|(index, slot)| {
                slot.ok_or_else(|| HuskError::Internal {
                    message: format!("node #{} was reserved but never built", index),
                })
            })
            .collect::<HuskResult<Vec<_>>>()?;

        Ok(PackageGraph::from_parts(nodes, root))
    }
}
