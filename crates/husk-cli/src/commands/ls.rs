//! `husk ls` command implementation.

use husk_config::OptionOverrides;
use std::path::PathBuf;

use super::{resolve_tree, CommandContext, Outcome};
use crate::output::tree::TreeRenderer;

/// Execute the `husk ls` command
pub fn execute(
    path: Option<PathBuf>,
    overrides: OptionOverrides,
    json: bool,
    ctx: &CommandContext,
) -> anyhow::Result<Outcome> {
    let tree = resolve_tree(path, &overrides, ctx)?;

    if json {
        ctx.output.line(&serde_json::to_string_pretty(&tree.to_json())?);
    } else {
        ctx.output.line(&TreeRenderer::new(ctx.output.colors()).render(&tree));
        for warning in tree.warnings() {
            ctx.output.warn(&warning.to_string());
        }
    }

    Ok(Outcome::of(&tree))
}
