//! `husk check` command implementation.
//!
//! Prints the sharing warnings and the problem list without the tree.

use husk_config::OptionOverrides;
use std::path::PathBuf;

use super::{resolve_tree, CommandContext, Outcome};

/// Execute the `husk check` command
pub fn execute(
    path: Option<PathBuf>,
    overrides: OptionOverrides,
    ctx: &CommandContext,
) -> anyhow::Result<Outcome> {
    let tree = resolve_tree(path, &overrides, ctx)?;

    for warning in tree.warnings() {
        ctx.output.warn(&warning.to_string());
    }

    let problems = tree.problems();
    if problems.is_empty() {
        ctx.output.success(&format!("{} packages, no problems found", tree.len()));
        return Ok(Outcome::Clean);
    }

    for problem in &problems {
        ctx.output.problem(&problem.describe(&tree));
    }
    ctx.output.info(&format!(
        "{} problems in {} packages",
        problems.len(),
        tree.len()
    ));

    Ok(Outcome::Problems)
}
