//! Command implementations and dispatch logic.
//!
//! Every command resolves its options through the configuration layers
//! (global file, project husk.toml, `HUSK_*` environment, flags) before
//! touching the installed tree.

use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use husk_config::{
    collect_env_overrides, ConfigLayering, ConfigLoader, ConfigSource, OptionOverrides,
    ResolveOptions,
};
use husk_tree::ResolvedTree;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::debug;

pub mod check;
pub mod config;
pub mod ls;


use crate::{output::OutputHandler, Commands};

/// How a command finished, mapped to the process exit code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Clean,
    Problems,
}

impl Outcome {
    pub fn of(tree: &ResolvedTree) -> Self {
        if tree.has_problems() {
            Outcome::Problems
        } else {
            Outcome::Clean
        }
    }
}

/// Override layers read from configuration files
#[derive(Debug, Default)]
pub struct ConfigLayers {
    pub global: Option<(OptionOverrides, ConfigSource)>,
    pub project: Option<(OptionOverrides, ConfigSource)>,
}

/// Shared context for all commands
pub struct CommandContext {
    pub cwd: Utf8PathBuf,
    pub env: HashMap<String, String>,
    /// Read `~/.husk/config.toml`
    pub read_global: bool,
    pub output: OutputHandler,
}

impl CommandContext {
    /// Create a new command context
    pub fn new() -> anyhow::Result<Self> {
        let cwd = std::env::current_dir().context("Failed to get current directory")?;
        let cwd = Utf8PathBuf::from_path_buf(cwd).map_err(|path| {
            anyhow::anyhow!("Current directory is not valid UTF-8: {}", path.display())
        })?;

        Ok(Self {
            cwd,
            env: collect_env_overrides(),
            read_global: true,
            output: OutputHandler::new(),
        })
    }

    /// Package directory a command operates on
    pub fn target(&self, path: Option<PathBuf>) -> PathBuf {
        match path {
            Some(path) if path.is_absolute() => path,
            Some(path) => self.cwd.as_std_path().join(path),
            None => self.cwd.clone().into_std_path_buf(),
        }
    }

    /// Load the file layers that apply to `dir`
    pub fn load_layers(&self, dir: &Path) -> anyhow::Result<ConfigLayers> {
        let start = Utf8Path::from_path(dir).unwrap_or(self.cwd.as_path());
        let loader = ConfigLoader::new(start.to_path_buf());

        let global = if self.read_global {
            loader.load_global_overrides().context("Failed to load global configuration")?
        } else {
            None
        };
        let project = loader
            .load_project_overrides()
            .context("Failed to load project configuration")?;

        Ok(ConfigLayers { global, project })
    }

    /// Effective options for a run against `dir`
    pub fn resolve_options(&self, dir: &Path, cli: &OptionOverrides) -> anyhow::Result<ResolveOptions> {
        let layers = self.load_layers(dir)?;
        let options = ConfigLayering::merge_options(
            layers.global.map(|(overrides, _)| overrides),
            layers.project.map(|(overrides, _)| overrides),
            &self.env,
            cli,
        )
        .context("Invalid configuration")?;

        debug!(
            "Options: dev={}, depth={}, store-dir={}",
            options.dev, options.max_depth, options.store_dir
        );
        Ok(options)
    }
}

/// Dispatch a command to its handler
pub fn dispatch_command(command: Commands, ctx: &CommandContext) -> anyhow::Result<Outcome> {
    match command {
        Commands::Ls { path, dev, depth, json } => {
            debug!("Listing installed tree (dev: {}, depth: {:?}, json: {})", dev, depth, json);
            let overrides = OptionOverrides {
                dev: dev.then_some(true),
                depth,
                store_dir: None,
            };
            ls::execute(path, overrides, json, ctx)
        },
        Commands::Check { path, dev } => {
            debug!("Checking installed tree (dev: {})", dev);
            let overrides = OptionOverrides {
                dev: dev.then_some(true),
                ..OptionOverrides::default()
            };
            check::execute(path, overrides, ctx)
        },
        Commands::Config => {
            debug!("Showing effective configuration");
            config::execute(ctx)
        },
    }
}

/// Resolve the tree at `path` with the context's options
pub(crate) fn resolve_tree(
    path: Option<PathBuf>,
    overrides: &OptionOverrides,
    ctx: &CommandContext,
) -> anyhow::Result<ResolvedTree> {
    let root = ctx.target(path);
    let options = ctx.resolve_options(&root, overrides)?;

    husk_tree::resolve(&root, &options)
        .with_context(|| format!("Failed to read installed tree at {}", root.display()))
}
