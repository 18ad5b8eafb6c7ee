//! Command implementations for fleet.
//!
//! This module routes CLI commands to their implementations. Each command
//! module separates the live wiring (`cmd_*`, which reads the environment
//! and talks to `gh`) from the logic it runs, so the logic is testable with
//! in-memory trackers.

mod apply;
mod compile;
mod context_cmd;
mod dispatch_cmd;
mod preflight;
mod report;
mod step_output;
mod track_failure;


use crate::cli::{Cli, Command};
use crate::context::FleetContext;
use crate::error::Result;

/// Dispatch a command to its implementation.
pub fn dispatch(cli: Cli) -> Result<()> {
    let ctx = FleetContext::resolve(&cli.config)?;
    match cli.command {
        Command::Compile(args) => compile::cmd_compile(&ctx, args),
        Command::Preflight => preflight::cmd_preflight(&ctx),
        Command::Dispatch(args) => dispatch_cmd::cmd_dispatch(&ctx, args),
        Command::Context(args) => context_cmd::cmd_context(&ctx, args),
        Command::Apply(args) => apply::cmd_apply(&ctx, args),
        Command::Report(args) => report::cmd_report(&ctx, args),
        Command::TrackFailure(args) => track_failure::cmd_track_failure(&ctx, args),
    }
}
