//! Implementation of the `fleet preflight` command.
//!
//! Runs once per event before any verdict is computed. A failure here is a
//! platform failure: no agent node runs for the event.

use crate::context::FleetContext;
use crate::error::{FleetError, Result};
use tracing::info;

/// Check the event-wide preconditions against `lookup` (an env reader).
pub(crate) fn check<F>(ctx: &FleetContext, lookup: F) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    let secret = &ctx.config.engine_secret;
    let present = lookup(secret).is_some_and(|v| !v.trim().is_empty());
    if !present {
        return Err(FleetError::PlatformError(format!(
            "no usable agent credential: secret '{}' is empty or not configured.\n\
             Fix: add the secret to the repository, or set `engine_secret` in the config.",
            secret
        )));
    }

    ctx.config.engine_args()?;
    let agents = ctx.load_agents()?;
    info!(agents = agents.len(), "preflight passed");
    Ok(())
}

/// Execute the `fleet preflight` command.
pub fn cmd_preflight(ctx: &FleetContext) -> Result<()> {
    check(ctx, |name| std::env::var(name).ok())?;
    println!("Preflight passed.");
    Ok(())
}
