//! Configuration layering, fallback logic, and environment overrides

use std::collections::HashMap;
use std::path::{Component, Path};

use camino::Utf8PathBuf;
use husk_core::error::HuskError;

use crate::options::{OptionOverrides, ResolveOptions};
use crate::toml::HuskToml;
use crate::ConfigResult;

/// Project configuration file name
pub const PROJECT_CONFIG_FILE: &str = "husk.toml";

/// Environment variables read by [`collect_env_overrides`]
pub const ENV_DEV: &str = "HUSK_DEV";
pub const ENV_DEPTH: &str = "HUSK_DEPTH";
pub const ENV_STORE_DIR: &str = "HUSK_STORE_DIR";

/// Main configuration loading interface
pub struct ConfigLoader {
    /// Current working directory
    cwd: Utf8PathBuf,
}

/// Configuration layering and merging
pub struct ConfigLayering;

/// Configuration source tracking
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigSource {
    /// Built-in defaults
    Default,
    /// Global config file
    Global(Utf8PathBuf),
    /// Project husk.toml file
    Project(Utf8PathBuf),
    /// Environment variable
    Environment(String),
    /// CLI flag
    CommandLine,
}

impl ConfigLoader {
    /// Create a new configuration loader
    pub fn new(cwd: Utf8PathBuf) -> Self {
        Self { cwd }
    }

    /// Find a configuration file, walking up from the working directory
    pub fn resolve_config_path(&self, filename: &str) -> Option<Utf8PathBuf> {
        let mut current = Some(self.cwd.as_path());

        while let Some(dir) = current {
            let config_path = dir.join(filename);
            if config_path.is_file() {
                return Some(config_path);
            }
            current = dir.parent();
        }

        None
    }

    /// Load the nearest project husk.toml, if any
    pub fn load_project_overrides(&self) -> ConfigResult<Option<(OptionOverrides, ConfigSource)>> {
        let Some(path) = self.resolve_config_path(PROJECT_CONFIG_FILE) else {
            return Ok(None);
        };

        tracing::debug!("Loading project config from {}", path);
        let config = crate::toml::load_from_file(&path)?;
        Ok(Some((config.resolve, ConfigSource::Project(path))))
    }

    /// Load global configuration from `~/.husk/config.toml`
    pub fn load_global_overrides(&self) -> ConfigResult<Option<(OptionOverrides, ConfigSource)>> {
        let Some(home_dir) = dirs::home_dir() else {
            tracing::debug!("No home directory, skipping global config");
            return Ok(None);
        };

        let global_config_path = Utf8PathBuf::try_from(home_dir)
            .map_err(|e| HuskError::ConfigValidation {
                field: "home_dir".to_string(),
                reason: format!("Invalid home directory path: {}", e),
            })?
            .join(".husk")
            .join("config.toml");

        if !global_config_path.is_file() {
            return Ok(None);
        }

        tracing::debug!("Loading global config from {}", global_config_path);
        let config: HuskToml = crate::toml::load_from_file(&global_config_path)?;
        Ok(Some((config.resolve, ConfigSource::Global(global_config_path))))
    }
}

impl ConfigLayering {
    /// Merge all layers, lowest priority first
    ///
    /// defaults < global < project < environment < command line
    pub fn merge_options(
        global: Option<OptionOverrides>,
        project: Option<OptionOverrides>,
        env: &HashMap<String, String>,
        cli: &OptionOverrides,
    ) -> ConfigResult<ResolveOptions> {
        let mut options = ResolveOptions::default();

        for layer in [global, project].into_iter().flatten() {
            layer.apply(&mut options);
        }

        Self::env_overrides(env)?.apply(&mut options);
        cli.apply(&mut options);

        validate_store_dir(&options.store_dir)?;
        Ok(options)
    }

    /// Turn `HUSK_*` variables into an override layer
    pub fn env_overrides(env: &HashMap<String, String>) -> ConfigResult<OptionOverrides> {
        let mut overrides = OptionOverrides::default();

        if let Some(value) = env.get(ENV_DEV) {
            overrides.dev = Some(parse_bool(ENV_DEV, value)?);
        }

        if let Some(value) = env.get(ENV_DEPTH) {
            overrides.depth = Some(parse_depth(ENV_DEPTH, value)?);
        }

        if let Some(value) = env.get(ENV_STORE_DIR) {
            validate_store_dir(value).map_err(|e| match e {
                HuskError::ConfigValidation { reason, .. } => HuskError::ConfigValidation {
                    field: ENV_STORE_DIR.to_string(),
                    reason,
                },
                other => other,
            })?;
            overrides.store_dir = Some(value.clone());
        }

        Ok(overrides)
    }

    /// Report which layer decided each option
    pub fn sources(
        global: Option<&(OptionOverrides, ConfigSource)>,
        project: Option<&(OptionOverrides, ConfigSource)>,
        env: &HashMap<String, String>,
        cli: &OptionOverrides,
    ) -> Vec<(&'static str, ConfigSource)> {
        let pick = |from_layer: &dyn Fn(&OptionOverrides) -> bool, var: &str| {
            if from_layer(cli) {
                ConfigSource::CommandLine
            } else if env.contains_key(var) {
                ConfigSource::Environment(var.to_string())
            } else if let Some((_, source)) = project.filter(|(layer, _)| from_layer(layer)) {
                source.clone()
            } else if let Some((_, source)) = global.filter(|(layer, _)| from_layer(layer)) {
                source.clone()
            } else {
                ConfigSource::Default
            }
        };

        vec![
            ("dev", pick(&|layer: &OptionOverrides| layer.dev.is_some(), ENV_DEV)),
            ("depth", pick(&|layer: &OptionOverrides| layer.depth.is_some(), ENV_DEPTH)),
            ("store-dir", pick(&|layer: &OptionOverrides| layer.store_dir.is_some(), ENV_STORE_DIR)),
        ]
    }
}

/// Snapshot the `HUSK_*` variables of the current process
pub fn collect_env_overrides() -> HashMap<String, String> {
    std::env::vars()
        .filter(|(key, _)| key.starts_with("HUSK_"))
        .collect()
}

fn parse_bool(field: &str, value: &str) -> ConfigResult<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "" | "0" | "false" | "no" | "off" => Ok(false),
        other => Err(HuskError::ConfigValidation {
            field: field.to_string(),
            reason: format!("expected a boolean, got '{}'", other),
        }),
    }
}

fn parse_depth(field: &str, value: &str) -> ConfigResult<u32> {
    let value = value.trim();
    if value.eq_ignore_ascii_case("infinity") {
        return Ok(u32::MAX);
    }

    value.parse().map_err(|_| HuskError::ConfigValidation {
        field: field.to_string(),
        reason: format!("expected a non-negative depth or 'infinity', got '{}'", value),
    })
}

/// The store directory must be a single plain path component
fn validate_store_dir(store_dir: &str) -> ConfigResult<()> {
    let mut components = Path::new(store_dir).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(()),
        _ => Err(HuskError::ConfigValidation {
            field: "store-dir".to_string(),
            reason: format!("'{}' must be a single directory name", store_dir),
        }),
    }
}
