//! Options controlling how an installed tree is read

use serde::{Deserialize, Serialize};

/// Directory packages are installed into, relative to each package
pub const DEFAULT_STORE_DIR: &str = "node_modules";

/// Options for one resolution run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolveOptions {
    /// Count devDependencies as required
    pub dev: bool,
    /// Depth at which the tree stops expanding (root is depth 0)
    pub max_depth: u32,
    /// Name of the per-package installation directory
    pub store_dir: String,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            dev: false,
            max_depth: u32::MAX,
            store_dir: DEFAULT_STORE_DIR.to_string(),
        }
    }
}

impl ResolveOptions {
    pub fn with_dev(mut self, dev: bool) -> Self {
        self.dev = dev;
        self
    }

    pub fn with_max_depth(mut self, max_depth: u32) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_store_dir(mut self, store_dir: impl Into<String>) -> Self {
        self.store_dir = store_dir.into();
        self
    }
}

/// Partial options from one configuration layer
///
/// This is also the shape of the `[resolve]` table in husk.toml.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct OptionOverrides {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dev: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub depth: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub store_dir: Option<String>,
}

impl OptionOverrides {
    /// Apply every value this layer sets on top of `options`
    pub fn apply(&self, options: &mut ResolveOptions) {
        if let Some(dev) = self.dev {
            options.dev = dev;
        }
        if let Some(depth) = self.depth {
            options.max_depth = depth;
        }
        if let Some(store_dir) = &self.store_dir {
            options.store_dir = store_dir.clone();
        }
    }

    pub fn is_empty(&self) -> bool {
        self.dev.is_none() && self.depth.is_none() && self.store_dir.is_none()
    }
}
