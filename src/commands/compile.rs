//! Implementation of the `fleet compile` command.
//!
//! Loads every agent, builds the job graph and writes the workflow
//! document. With `--check` nothing is written; a document that differs
//! from what would be generated is a validation failure, so CI can reject
//! agent edits that were not recompiled.

use crate::cli::CompileArgs;
use crate::context::FleetContext;
use crate::error::{FleetError, Result};
use crate::fs::write_if_changed;
use crate::graph::GraphBuilder;
use crate::outputs::Registry;
use tracing::info;

/// Render the document for the agents under `ctx`.
pub(crate) fn render(ctx: &FleetContext) -> Result<String> {
    let agents = ctx.load_agents()?;
    let registry = Registry::standard();
    let mut builder = GraphBuilder::new(&ctx.config, &registry);
    if let Some(path) = ctx.config_override() {
        builder = builder.config_path(path);
    }
    builder.render(&agents)
}

/// Execute the `fleet compile` command.
pub fn cmd_compile(ctx: &FleetContext, args: CompileArgs) -> Result<()> {
    let document = render(ctx)?;

    if args.stdout {
        print!("{}", document);
        return Ok(());
    }

    let path = ctx.workflow_path();
    let display_path = path
        .strip_prefix(&ctx.repo_root)
        .unwrap_or(&path)
        .display()
        .to_string();

    if args.check {
        let current = std::fs::read_to_string(&path).unwrap_or_default();
        if current != document {
            return Err(FleetError::ValidationError(format!(
                "'{}' is out of date with the agent definitions.\n\
                 Fix: run `fleet compile` and commit the result.",
                display_path
            )));
        }
        println!("{} is up to date.", display_path);
        return Ok(());
    }

    if write_if_changed(&path, &document)? {
        info!(path = %display_path, "wrote workflow document");
        println!("Wrote {}", display_path);
    } else {
        println!("{} is up to date.", display_path);
    }
    Ok(())
}
