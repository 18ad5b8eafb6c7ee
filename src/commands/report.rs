//! Implementation of the `fleet report` command.
//!
//! Runs in the audit node after every agent node has finished, whatever
//! their outcome. Merges the dispatch verdicts, node results and uploaded
//! audit records into the manifest, appends the Markdown summary, and
//! publishes `failed_agents` for the failure-tracking matrix.

use crate::agent::AgentSpec;
use crate::audit::{AuditRecord, Manifest, load_records};
use crate::cli::ReportArgs;
use crate::commands::step_output::StepOutputs;
use crate::context::{FleetContext, RunEnvironment};
use crate::dispatch::VerdictMap;
use crate::error::{FleetError, Result};
use crate::fs::append_text;
use crate::graph::DISPATCH_JOB;
use serde_json::Value;
use tracing::warn;

/// Parse the verdict map. Missing or malformed verdicts mean dispatch never
/// finished; the manifest reports that as a platform failure.
pub(crate) fn parse_verdicts(raw: &str) -> VerdictMap {
    if raw.trim().is_empty() {
        return VerdictMap::new();
    }
    serde_json::from_str(raw).unwrap_or_else(|e| {
        warn!(error = %e, "ignoring malformed verdicts");
        VerdictMap::new()
    })
}

pub(crate) fn parse_needs(raw: &str) -> Result<Value> {
    serde_json::from_str(raw)
        .map_err(|e| FleetError::UserError(format!("failed to parse node results: {}", e)))
}

/// Debounce key the dispatch node published, if any.
pub(crate) fn debounce_key(needs: &Value) -> Option<String> {
    needs
        .pointer(&format!("/{}/outputs/debounce_key", DISPATCH_JOB))
        .and_then(Value::as_str)
        .filter(|k| !k.is_empty())
        .map(str::to_string)
}

/// Build the manifest for one event.
pub(crate) fn build_manifest(
    event: &str,
    run_id: &str,
    agents: &[AgentSpec],
    verdicts_raw: &str,
    needs_raw: &str,
    records: Vec<AuditRecord>,
) -> Result<Manifest> {
    let needs = parse_needs(needs_raw)?;
    let verdicts = parse_verdicts(verdicts_raw);
    Ok(Manifest::new(event, run_id)
        .with_debounce_key(debounce_key(&needs))
        .assemble(agents, &verdicts, &needs, records))
}

pub(crate) fn failed_agents_output(manifest: &Manifest) -> Result<StepOutputs> {
    let failed = serde_json::to_string(&manifest.failed_agents()).map_err(|e| {
        FleetError::UserError(format!("failed to serialize failed agents: {}", e))
    })?;
    let mut outputs = StepOutputs::new();
    outputs.set("failed_agents", failed);
    Ok(outputs)
}

/// Execute the `fleet report` command.
pub fn cmd_report(ctx: &FleetContext, args: ReportArgs) -> Result<()> {
    let agents = ctx.load_agents()?;
    let run = RunEnvironment::from_env()?;
    let event = run
        .event()
        .map(|e| e.describe())
        .unwrap_or_else(|_| run.event_name.clone());

    let records = load_records(&args.records)?;
    let manifest = build_manifest(
        &event,
        &run.run_id,
        &agents,
        args.verdicts.as_deref().unwrap_or_default(),
        &args.needs,
        records,
    )?;
    manifest.save(&args.manifest)?;

    let summary = manifest.summary_markdown();
    match &args.summary {
        Some(path) => append_text(path, &summary)?,
        None => eprint!("{}", summary),
    }

    failed_agents_output(&manifest)?.write(args.output.as_deref())
}
