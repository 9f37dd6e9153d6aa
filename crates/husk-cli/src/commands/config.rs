//! `husk config` command implementation.

use anyhow::Context;
use husk_config::{ConfigLayering, ConfigSource, OptionOverrides};

use super::{CommandContext, Outcome};

/// Execute the `husk config` command
pub fn execute(ctx: &CommandContext) -> anyhow::Result<Outcome> {
    let cli = OptionOverrides::default();
    let layers = ctx.load_layers(ctx.cwd.as_std_path())?;
    let sources = ConfigLayering::sources(layers.global.as_ref(), layers.project.as_ref(), &ctx.env, &cli);
    let options = ConfigLayering::merge_options(
        layers.global.map(|(overrides, _)| overrides),
        layers.project.map(|(overrides, _)| overrides),
        &ctx.env,
        &cli,
    )
    .context("Invalid configuration")?;

    let depth = if options.max_depth == u32::MAX {
        "infinity".to_string()
    } else {
        options.max_depth.to_string()
    };
    let values = [options.dev.to_string(), depth, options.store_dir.clone()];

    for ((key, source), value) in sources.into_iter().zip(values) {
        ctx.output.line(&format!("{} = {} ({})", key, value, describe_source(&source)));
    }

    Ok(Outcome::Clean)
}

pub(crate) fn describe_source(source: &ConfigSource) -> String {
    match source {
        ConfigSource::Default => "default".to_string(),
        ConfigSource::Global(path) => format!("global {}", path),
        ConfigSource::Project(path) => format!("project {}", path),
        ConfigSource::Environment(var) => format!("environment {}", var),
        ConfigSource::CommandLine => "command line".to_string(),
    }
}
