//! Implementation of the `fleet dispatch` command.
//!
//! Evaluates every agent against the current event and publishes the
//! verdicts as step outputs:
//!
//! - `verdict_<slug>`: `admit` or `skip`, gating that agent's node
//! - `verdicts`: the full verdict map as JSON, for the audit node
//! - `debounce_key`: the runtime form of the concurrency group

use crate::agent::AgentSpec;
use crate::cli::DispatchArgs;
use crate::commands::step_output::StepOutputs;
use crate::concurrency;
use crate::config::Config;
use crate::context::{FleetContext, RunEnvironment};
use crate::dispatch::{DispatchEngine, RepoState, VerdictMap};
use crate::error::{FleetError, Result};
use crate::event::InboundEvent;
use crate::github::GhClient;
use chrono::{DateTime, Utc};

/// Verdicts for `event`. A failed lookup skips only the agent it belongs to.
pub(crate) fn decide(
    config: &Config,
    agents: &[AgentSpec],
    event: &InboundEvent,
    state: &dyn RepoState,
    now: DateTime<Utc>,
) -> VerdictMap {
    DispatchEngine::new(config, state, now).evaluate_all(agents, event)
}

/// Step outputs for a verdict map.
pub(crate) fn verdict_outputs(
    config: &Config,
    agents: &[AgentSpec],
    event: &InboundEvent,
    verdicts: &VerdictMap,
) -> Result<StepOutputs> {
    let mut outputs = StepOutputs::new();
    for agent in agents {
        let value = verdicts
            .get(&agent.name)
            .map(|v| v.output_value())
            .unwrap_or("skip");
        outputs.set(agent.verdict_output(), value);
    }

    let json = serde_json::to_string(verdicts).map_err(|e| {
        FleetError::UserError(format!("failed to serialize verdicts: {}", e))
    })?;
    outputs.set("verdicts", json);

    let key = if concurrency::is_exempt(agents) {
        String::new()
    } else {
        concurrency::debounce_key(&config.workflow_name, event)
    };
    outputs.set("debounce_key", key);
    Ok(outputs)
}

/// Execute the `fleet dispatch` command.
pub fn cmd_dispatch(ctx: &FleetContext, args: DispatchArgs) -> Result<()> {
    let agents = ctx.load_agents()?;
    let run = RunEnvironment::from_env()?;
    let event = run.event()?;
    let client = GhClient::new(
        run.repository.clone(),
        ctx.repo_root.clone(),
        ctx.config.workflow_file_name(),
    )?;

    let verdicts = decide(&ctx.config, &agents, &event, &client, Utc::now());
    verdict_outputs(&ctx.config, &agents, &event, &verdicts)?.write(args.output.as_deref())?;

    for (agent, verdict) in &verdicts {
        eprintln!("{}: {}", agent, verdict.summary());
    }
    Ok(())
}
