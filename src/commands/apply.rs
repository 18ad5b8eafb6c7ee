//! Implementation of the `fleet apply` command.
//!
//! Parses the engine's NDJSON proposals, runs both phases of the output
//! protocol kind by kind, and writes the agent's audit record. Validation
//! failures are data in the record, so the command succeeds whenever the
//! record was written.

use crate::agent::AgentSpec;
use crate::audit::AuditRecord;
use crate::cli::ApplyArgs;
use crate::context::{FleetContext, RunEnvironment, find_agent};
use crate::error::{FleetError, Result};
use crate::git;
use crate::github::GhClient;
use crate::outputs::{Registry, RunContext, Tracker, parse_output_lines};
use std::path::Path;
use tracing::{info, warn};

/// Validate and apply `text` for `agent`, returning its audit record.
pub(crate) fn apply_outputs(
    agent: &AgentSpec,
    run: &RunContext,
    registry: &Registry,
    tracker: &dyn Tracker,
    text: &str,
) -> AuditRecord {
    let parsed = parse_output_lines(text);
    if !parsed.rejected.is_empty() {
        warn!(agent = %agent.name, rejected = parsed.rejected.len(), "rejected output lines");
    }

    let mut record = AuditRecord::new(agent.name.clone());
    record.outputs = registry.process(&agent.outputs, run, tracker, &parsed.instances);
    record.rejected = parsed.rejected;
    info!(
        agent = %agent.name,
        kinds = record.outputs.len(),
        failed = record.failed(),
        "processed outputs"
    );
    record
}

/// Read the proposals file. An engine that wrote nothing proposed nothing.
fn read_proposals(path: &Path) -> Result<String> {
    match std::fs::read_to_string(path) {
        Ok(text) => Ok(text),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            warn!(path = %path.display(), "no outputs file; treating as empty");
            Ok(String::new())
        }
        Err(e) => Err(FleetError::UserError(format!(
            "failed to read outputs '{}': {}",
            path.display(),
            e
        ))),
    }
}

/// Execute the `fleet apply` command.
pub fn cmd_apply(ctx: &FleetContext, args: ApplyArgs) -> Result<()> {
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

    let text = read_proposals(&args.outputs)?;
    let record = apply_outputs(agent, &run_context, &Registry::standard(), &client, &text);
    record.save(&args.record)?;

    for report in &record.outputs {
        let applied = if report.applied { "applied" } else { "not applied" };
        println!("{}: {} ({} instance(s))", report.kind, applied, report.instances.len());
    }
    if !record.rejected.is_empty() {
        println!("{} output line(s) rejected", record.rejected.len());
    }
    Ok(())
}
