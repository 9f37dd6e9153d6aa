//! Manifest and configuration parsing for husk
//!
//! This crate reads package.json manifests into the normalized
//! [`husk_core::Manifest`] and assembles [`ResolveOptions`] from defaults,
//! husk.toml files, `HUSK_*` environment variables and command line flags.

pub mod json;
pub mod merge;
pub mod options;
pub mod toml;

// Re-export main types
pub use json::{load_manifest, parse_package_json, PackageJson, MANIFEST_FILE};
pub use merge::{collect_env_overrides, ConfigLayering, ConfigLoader, ConfigSource, PROJECT_CONFIG_FILE};
pub use options::{OptionOverrides, ResolveOptions, DEFAULT_STORE_DIR};
pub use self::toml::HuskToml;

use husk_core::error::HuskError;

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, HuskError>;
