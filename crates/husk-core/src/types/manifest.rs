//! Normalized package manifest.
//!
//! Every package directory is read into a Manifest regardless of the file
//! format it came from. Dependency maps keep declaration order.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Range assigned to dependencies nobody declared explicitly
pub const WILDCARD_RANGE: &str = "*";

/// Declared name, version and dependency constraints of one package
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    pub name: String,
    pub version: String,
    pub dependencies: IndexMap<String, String>,
    pub dev_dependencies: IndexMap<String, String>,
    pub peer_dependencies: IndexMap<String, String>,
    pub optional_dependencies: IndexMap<String, String>,
}

impl Manifest {
    /// Create a manifest with no declared dependencies
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            ..Self::default()
        }
    }

    /// Manifest for a root directory that has no package.json of its own:
    /// everything physically installed is treated as required.
    pub fn synthesize<I, S>(installed: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            dependencies: installed
                .into_iter()
                .map(|name| (name.into(), WILDCARD_RANGE.to_string()))
                .collect(),
            ..Self::default()
        }
    }

    /// Add a runtime dependency
    pub fn with_dependency(mut self, name: impl Into<String>, range: impl Into<String>) -> Self {
        self.dependencies.insert(name.into(), range.into());
        self
    }

    /// Add a development dependency
    pub fn with_dev_dependency(mut self, name: impl Into<String>, range: impl Into<String>) -> Self {
        self.dev_dependencies.insert(name.into(), range.into());
        self
    }

    /// Add a peer dependency
    pub fn with_peer_dependency(mut self, name: impl Into<String>, range: impl Into<String>) -> Self {
        self.peer_dependencies.insert(name.into(), range.into());
        self
    }

    /// Add an optional dependency. Optional dependencies are also runtime
    /// dependencies, so the range is recorded in both maps.
    pub fn with_optional_dependency(
        mut self,
        name: impl Into<String>,
        range: impl Into<String>,
    ) -> Self {
        let (name, range) = (name.into(), range.into());
        self.dependencies.insert(name.clone(), range.clone());
        self.optional_dependencies.insert(name, range);
        self
    }

    /// Range this package requests for `name`, consulting devDependencies
    /// only when development dependencies count.
    pub fn requested_range(&self, name: &str, dev: bool) -> Option<&str> {
        self.dependencies
            .get(name)
            .or_else(|| if dev { self.dev_dependencies.get(name) } else { None })
            .map(String::as_str)
    }

    /// Whether this package declares `name` as something it needs
    pub fn requires(&self, name: &str, dev: bool) -> bool {
        self.requested_range(name, dev).is_some()
    }

    /// Display identifier used in logs (`name@version`)
    pub fn id(&self) -> String {
        if self.name.is_empty() {
            "(root)".to_string()
        } else {
            format!("{}@{}", self.name, self.version)
        }
    }
}
