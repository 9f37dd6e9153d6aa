//! Collaborators the resolver reads the installed tree through
//!
//! The builder never touches the filesystem directly: manifests, directory
//! listings, canonical paths and range checks all go through these traits,
//! bundled in [`Collaborators`].

use husk_core::error::HuskResult;
use husk_core::{Manifest, VersionReq};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Reads the manifest of an installed package directory
pub trait ManifestLoader: Send + Sync {
    fn load(&self, dir: &Path) -> HuskResult<Manifest>;
}

/// Lists the packages installed in a package-store directory
pub trait DirectoryLister: Send + Sync {
    /// Package names found directly in `store`. Scoped packages are
    /// reported as `@scope/name`.
    fn list(&self, store: &Path) -> std::io::Result<Vec<String>>;
}

/// Resolves install locations to their canonical identity
pub trait PathResolver: Send + Sync {
    /// Returns the canonical path and whether `path` itself is a symlink
    fn canonicalize(&self, path: &Path) -> std::io::Result<(PathBuf, bool)>;
}

/// Version range predicate
pub trait RangeMatcher: Send + Sync {
    fn is_valid_range(&self, range: &str) -> bool;

    fn satisfies(&self, version: &str, range: &str) -> bool;

    /// True only for a well-formed range the version fails. Tags, URLs
    /// and other non-range specs never reject.
    fn rejects(&self, version: &str, range: &str) -> bool {
        self.is_valid_range(range) && !self.satisfies(version, range)
    }
}

/// `package.json` reader
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonManifestLoader;

impl ManifestLoader for JsonManifestLoader {
    fn load(&self, dir: &Path) -> HuskResult<Manifest> {
        husk_config::load_manifest(dir)
    }
}

/// Lists a store directory, skipping hidden entries and expanding scopes
#[derive(Debug, Default, Clone, Copy)]
pub struct StoreLister;

impl StoreLister {
    fn package_dirs(dir: &Path) -> std::io::Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                tracing::debug!("Skipping non UTF-8 entry in {}", dir.display());
                continue;
            };
            if name.starts_with('.') {
                continue;
            }
            // follows symlinks, so linked packages count as directories
            if entry.path().is_dir() {
                names.push(name);
            }
        }
        names.sort();
        Ok(names)
    }
}

impl DirectoryLister for StoreLister {
    fn list(&self, store: &Path) -> std::io::Result<Vec<String>> {
        let mut packages = Vec::new();

        for name in Self::package_dirs(store)? {
            if !name.starts_with('@') {
                packages.push(name);
                continue;
            }

            match Self::package_dirs(&store.join(&name)) {
                Ok(scoped) => {
                    packages.extend(scoped.into_iter().map(|inner| format!("{}/{}", name, inner)))
                },
                Err(e) => tracing::debug!("Cannot list scope {}: {}", name, e),
            }
        }

        Ok(packages)
    }
}

/// `std::fs::canonicalize` plus a symlink check on the location itself
#[derive(Debug, Default, Clone, Copy)]
pub struct CanonicalPaths;

impl PathResolver for CanonicalPaths {
    fn canonicalize(&self, path: &Path) -> std::io::Result<(PathBuf, bool)> {
        let is_symlink = std::fs::symlink_metadata(path)?.file_type().is_symlink();
        Ok((std::fs::canonicalize(path)?, is_symlink))
    }
}

/// npm range semantics backed by [`VersionReq`]
#[derive(Debug, Default, Clone, Copy)]
pub struct NpmRanges;

impl RangeMatcher for NpmRanges {
    fn is_valid_range(&self, range: &str) -> bool {
        VersionReq::is_valid(range)
    }

    fn satisfies(&self, version: &str, range: &str) -> bool {
        husk_core::types::satisfies(version, range)
    }
}

/// The full set of collaborators one resolution run uses
#[derive(Clone)]
pub struct Collaborators {
    pub manifests: Arc<dyn ManifestLoader>,
    pub lister: Arc<dyn DirectoryLister>,
    pub paths: Arc<dyn PathResolver>,
    pub ranges: Arc<dyn RangeMatcher>,
}

impl Collaborators {
    /// Collaborators backed by the real filesystem
    pub fn filesystem() -> Self {
        Self {
            manifests: Arc::new(JsonManifestLoader),
            lister: Arc::new(StoreLister),
            paths: Arc::new(CanonicalPaths),
            ranges: Arc::new(NpmRanges),
        }
    }

    pub fn with_manifests(mut self, manifests: Arc<dyn ManifestLoader>) -> Self {
        self.manifests = manifests;
        self
    }

    pub fn with_lister(mut self, lister: Arc<dyn DirectoryLister>) -> Self {
        self.lister = lister;
        self
    }

    pub fn with_paths(mut self, paths: Arc<dyn PathResolver>) -> Self {
        self.paths = paths;
        self
    }

    pub fn with_ranges(mut self, ranges: Arc<dyn RangeMatcher>) -> Self {
        self.ranges = ranges;
        self
    }
}

impl Default for Collaborators {
    fn default() -> Self {
        Self::filesystem()
    }
}

impl std::fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collaborators").finish_non_exhaustive()
    }
}
