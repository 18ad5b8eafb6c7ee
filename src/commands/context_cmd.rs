//! Implementation of the `fleet context` command.
//!
//! Renders what the engine reads before it acts: the agent's instructions,
//! the event, the capability description of every enabled action-kind, and
//! the read-only context those kinds look up (e.g. the labels that exist).

use crate::agent::AgentSpec;
use crate::cli::ContextArgs;
use crate::context::{FleetContext, RunEnvironment, find_agent};
use crate::error::Result;
use crate::event::InboundEvent;
use crate::fs::atomic_write;
use crate::git;
use crate::github::GhClient;
use crate::outputs::{Registry, RunContext, Tracker};
use std::fmt::Write;

/// Render the context document for `agent`.
pub(crate) fn render(
    agent: &AgentSpec,
    event: &InboundEvent,
    run: &RunContext,
    registry: &Registry,
    tracker: &dyn Tracker,
) -> Result<String> {
    let mut out = String::new();
    let _ = writeln!(out, "# Agent: {}\n", agent.name);
    if !agent.description.is_empty() {
        let _ = writeln!(out, "{}\n", agent.description.trim());
    }
    if !agent.instructions.is_empty() {
        let _ = writeln!(out, "{}\n", agent.instructions.trim());
    }

    let _ = writeln!(out, "## Event\n");
    let _ = writeln!(
        out,
        "{} triggered by @{} (run {}).\n",
        event.describe(),
        event.actor,
        run.run_url
    );

    let _ = writeln!(out, "## Outputs\n");
    let capabilities = registry.describe(&agent.outputs);
    if capabilities.is_empty() {
        let _ = writeln!(
            out,
            "No outputs are enabled for this agent. Report findings in your final message only.\n"
        );
    } else {
        let _ = writeln!(
            out,
            "Propose each action as one JSON object per line, with a \"type\" field naming \
             its kind. Nothing is applied unless every proposal of that kind is valid.\n"
        );
        let _ = writeln!(out, "{}\n", capabilities);
    }

    let entries = registry.context(&agent.outputs, run, tracker)?;
    if !entries.is_empty() {
        let _ = writeln!(out, "## Repository context\n");
        for (kind, text) in entries {
            let _ = writeln!(out, "### {}\n\n{}\n", kind, text.trim_end());
        }
    }
    Ok(out)
}

/// Execute the `fleet context` command.
pub fn cmd_context(ctx: &FleetContext, args: ContextArgs) -> Result<()> {
    let agents = ctx.load_agents()?;
    let agent = find_agent(&agents, &args.agent)?;
    let run = RunEnvironment::from_env()?;
    let event = run.event()?;
    let client = GhClient::new(
        run.repository.clone(),
        ctx.repo_root.clone(),
        ctx.config.workflow_file_name(),
    )?;
    let run_context = run.run_context(
        agent,
        &ctx.config,
        &event,
        git::signing_available(&ctx.repo_root),
    );

    let document = render(agent, &event, &run_context, &Registry::standard(), &client)?;
    match args.output {
        Some(path) => atomic_write(path, document.as_bytes()),
        None => {
            print!("{}", document);
            Ok(())
        }
    }
}
