//! Implementation of the `fleet track-failure` command.
//!
//! Runs once per failed agent. Each agent has at most one open tracking
//! issue: a later failure comments on it instead of opening another.

use crate::cli::TrackFailureArgs;
use crate::config::Config;
use crate::context::{FleetContext, RunEnvironment};
use crate::error::Result;
use crate::github::GhClient;
use crate::outputs::Tracker;
use tracing::info;

/// What tracking a failure did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum TrackOutcome {
    Created(u64),
    Commented(u64),
}

/// Title shared by every tracking issue of `agent`; dedup keys on it.
pub(crate) fn failure_title(agent: &str) -> String {
    format!("Agent '{}' is failing", agent)
}

/// File or update the tracking issue for `agent`.
pub(crate) fn track(
    config: &Config,
    agent: &str,
    run_id: &str,
    run_url: &str,
    tracker: &dyn Tracker,
) -> Result<TrackOutcome> {
    let title = failure_title(agent);
    let body = format!(
        "Agent `{}` failed in run [{}]({}).\n\n\
         The run summary holds the audit report for every agent of the event.",
        agent, run_id, run_url
    );

    let outcome = match tracker.find_open_issue(&title, &config.failure_label)? {
        Some(number) => {
            tracker.add_comment(number, &body)?;
            TrackOutcome::Commented(number)
        }
        None => {
            let number =
                tracker.create_issue(&title, &body, std::slice::from_ref(&config.failure_label))?;
            TrackOutcome::Created(number)
        }
    };
    info!(agent, outcome = ?outcome, "tracked failure");
    Ok(outcome)
}

/// Execute the `fleet track-failure` command.
pub fn cmd_track_failure(ctx: &FleetContext, args: TrackFailureArgs) -> Result<()> {
    // No agent lookup: a failed agent may have been removed since the run started.
    let name = args.agent;
    let run = RunEnvironment::from_env()?;
    let client = GhClient::new(
        run.repository.clone(),
        ctx.repo_root.clone(),
        ctx.config.workflow_file_name(),
    )?;

    match track(&ctx.config, &name, &run.run_id, &run.run_url(), &client)? {
        TrackOutcome::Created(n) => println!("Opened tracking issue #{} for {}", n, name),
        TrackOutcome::Commented(n) => println!("Updated tracking issue #{} for {}", n, name),
    }
    Ok(())
}
