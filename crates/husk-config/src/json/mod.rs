//! package.json parsing into the normalized manifest

use husk_core::error::HuskError;
use husk_core::Manifest;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::ConfigResult;

/// File every installed package directory carries
pub const MANIFEST_FILE: &str = "package.json";

/// The parts of package.json the tree reader cares about
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PackageJson {
    /// Package name
    #[serde(default)]
    pub name: String,

    /// Package version
    #[serde(default)]
    pub version: String,

    /// Package description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Runtime dependencies
    #[serde(default)]
    pub dependencies: IndexMap<String, String>,

    /// Development dependencies
    #[serde(default, rename = "devDependencies")]
    pub dev_dependencies: IndexMap<String, String>,

    /// Peer dependencies
    #[serde(default, rename = "peerDependencies")]
    pub peer_dependencies: IndexMap<String, String>,

    /// Optional dependencies
    #[serde(default, rename = "optionalDependencies")]
    pub optional_dependencies: IndexMap<String, String>,

    /// Private flag
    #[serde(default)]
    pub private: bool,
}

impl PackageJson {
    /// Normalize into a [`Manifest`]
    ///
    /// Optional dependencies are runtime dependencies too: each one is
    /// copied into `dependencies`, and its optional range wins.
    pub fn into_manifest(self) -> Manifest {
        let mut dependencies = self.dependencies;
        for (name, range) in &self.optional_dependencies {
            dependencies.insert(name.clone(), range.clone());
        }

        Manifest {
            name: self.name.trim().to_string(),
            version: self.version.trim().to_string(),
            dependencies,
            dev_dependencies: self.dev_dependencies,
            peer_dependencies: self.peer_dependencies,
            optional_dependencies: self.optional_dependencies,
        }
    }
}

/// Parse JSON string to PackageJson
pub fn parse_package_json(content: &str) -> ConfigResult<PackageJson> {
    serde_json::from_str(content).map_err(|e| HuskError::JsonParse {
        message: format!("JSON parsing error: {}", e),
    })
}

/// Read `<dir>/package.json` and normalize it
pub fn load_manifest(dir: &Path) -> ConfigResult<Manifest> {
    let path = dir.join(MANIFEST_FILE);
    let content = std::fs::read_to_string(&path)
        .map_err(|e| HuskError::io(format!("Failed to read {}", path.display()), e))?;

    let package_json = parse_package_json(&content).map_err(|e| match e {
        HuskError::JsonParse { message } => HuskError::JsonParse {
            message: format!("In file {}: {}", path.display(), message),
        },
        other => other,
    })?;

    Ok(package_json.into_manifest())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal_package_json() {
        let json = r#"
{
  "name": "test-package",
  "version": "1.0.0"
}
"#;

        let config = parse_package_json(json).unwrap();
        assert_eq!(config.name, "test-package");
        assert_eq!(config.version, "1.0.0");
        assert!(config.dependencies.is_empty());
    }

    #[test]
    fn test_parse_with_dependencies() {
        let json = r#"
{
  "name": "test-package",
  "version": "1.0.0",
  "dependencies": {
    "lodash": "^4.17.21",
    "react": "^18.0.0"
  },
  "devDependencies": {
    "typescript": "^4.9.0"
  },
  "peerDependencies": {
    "react-dom": ">=18"
  },
  "scripts": { "build": "tsc" }
}
"#;

        let config = parse_package_json(json).unwrap();
        assert_eq!(config.dependencies.len(), 2);
        assert_eq!(config.dev_dependencies.len(), 1);
        assert_eq!(config.dependencies.get("lodash").unwrap(), "^4.17.21");
        assert_eq!(config.peer_dependencies.get("react-dom").unwrap(), ">=18");
    }

    #[test]
    fn test_missing_name_and_version_default_to_empty() {
        let manifest = parse_package_json("{}").unwrap().into_manifest();
        assert_eq!(manifest.name, "");
        assert_eq!(manifest.version, "");
    }

    #[test]
    fn test_optional_dependencies_merge_into_dependencies() {
        let json = r#"
{
  "name": "watcher",
  "version": "2.0.0",
  "dependencies": { "fsevents": "^1.0.0", "glob": "^7.0.0" },
  "optionalDependencies": { "fsevents": "^2.0.0" }
}
"#;

        let manifest = parse_package_json(json).unwrap().into_manifest();
        assert_eq!(manifest.dependencies.get("fsevents").unwrap(), "^2.0.0");
        assert_eq!(manifest.dependencies.get("glob").unwrap(), "^7.0.0");
        assert!(manifest.optional_dependencies.contains_key("fsevents"));
    }

    #[test]
    fn test_dependency_order_is_preserved() {
        let json = r#"{ "dependencies": { "zeta": "1", "alpha": "2", "mid": "3" } }"#;
        let manifest = parse_package_json(json).unwrap().into_manifest();
        let names: Vec<&str> = manifest.dependencies.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn test_invalid_json() {
        let err = parse_package_json("{ not json").unwrap_err();
        assert!(matches!(err, HuskError::JsonParse { .. }));
    }

    #[test]
    fn test_load_manifest_from_dir() {
        let temp_dir = tempfile::tempdir().unwrap();
        std::fs::write(
            temp_dir.path().join(MANIFEST_FILE),
            r#"{ "name": "on-disk", "version": "0.1.0" }"#,
        )
        .unwrap();

        let manifest = load_manifest(temp_dir.path()).unwrap();
        assert_eq!(manifest.id(), "on-disk@0.1.0");
    }

    #[test]
    fn test_load_manifest_missing_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let err = load_manifest(temp_dir.path()).unwrap_err();
        assert!(matches!(err, HuskError::Io { .. }));
    }

    #[test]
    fn test_load_manifest_reports_file_on_parse_error() {
        let temp_dir = tempfile::tempdir().unwrap();
        std::fs::write(temp_dir.path().join(MANIFEST_FILE), "{").unwrap();

        match load_manifest(temp_dir.path()).unwrap_err() {
            HuskError::JsonParse { message } => assert!(message.contains("package.json")),
            other => panic!("unexpected error: {other}"),
        }
    }
}
