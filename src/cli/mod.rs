//! CLI argument parsing for fleet.
//!
//! Uses clap derive macros for declarative argument definitions.
//! This module defines the command structure; actual implementations
//! are in the `commands` module.

use crate::context::DEFAULT_CONFIG_PATH;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Fleet: compile repository agents into one CI workflow and run its steps.
///
/// `compile` runs on a developer machine. Every other command is invoked by
/// a step of the generated workflow and reads the run from `GITHUB_*`
/// environment variables.
#[derive(Parser, Debug)]
#[command(name = "fleet")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to fleet.yaml, relative to the repository root.
    #[arg(long, global = true, env = "FLEET_CONFIG", default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands for fleet.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Compile agent definitions into the workflow document.
    ///
    /// Writes the document only when its content changed.
    Compile(CompileArgs),

    /// Check the global preconditions of an event.
    ///
    /// Fails the whole event when no agent credential is configured.
    Preflight,

    /// Decide which agents run for the current event.
    ///
    /// Writes one `verdict_<agent>` output per agent plus `verdicts` JSON.
    Dispatch(DispatchArgs),

    /// Render the context handed to one agent's engine.
    Context(ContextArgs),

    /// Validate and apply the outputs one agent proposed.
    ///
    /// Always writes the agent's audit record, even when nothing applied.
    Apply(ApplyArgs),

    /// Assemble the event's manifest and summary.
    Report(ReportArgs),

    /// File or update the tracking issue for a failed agent.
    TrackFailure(TrackFailureArgs),
}

/// Arguments for the `compile` command.
#[derive(Parser, Debug)]
pub struct CompileArgs {
    /// Fail instead of writing when the document on disk is out of date.
    #[arg(long)]
    pub check: bool,

    /// Print the document to stdout instead of writing it.
    #[arg(long, conflicts_with = "check")]
    pub stdout: bool,
}

/// Arguments for the `dispatch` command.
#[derive(Parser, Debug)]
pub struct DispatchArgs {
    /// File to append `key=value` step outputs to (stdout if omitted).
    #[arg(long)]
    pub output: Option<PathBuf>,
}

/// Arguments for the `context` command.
#[derive(Parser, Debug)]
pub struct ContextArgs {
    /// Agent to render the context for.
    #[arg(long, env = "FLEET_AGENT")]
    pub agent: String,

    /// File to write the context to (stdout if omitted).
    #[arg(long)]
    pub output: Option<PathBuf>,
}

/// Arguments for the `apply` command.
#[derive(Parser, Debug)]
pub struct ApplyArgs {
    /// Agent whose outputs are applied.
    #[arg(long, env = "FLEET_AGENT")]
    pub agent: String,

    /// NDJSON file the engine wrote its proposals to.
    #[arg(long)]
    pub outputs: PathBuf,

    /// Where to write the agent's audit record.
    #[arg(long)]
    pub record: PathBuf,
}

/// Arguments for the `report` command.
#[derive(Parser, Debug)]
pub struct ReportArgs {
    /// Directory holding the agents' audit records.
    #[arg(long)]
    pub records: PathBuf,

    /// Where to write the manifest.
    #[arg(long)]
    pub manifest: PathBuf,

    /// File to append the Markdown summary to.
    #[arg(long)]
    pub summary: Option<PathBuf>,

    /// File to append `key=value` step outputs to (stdout if omitted).
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Dispatch verdicts as JSON. Absent when dispatch did not finish.
    #[arg(long, env = "FLEET_VERDICTS")]
    pub verdicts: Option<String>,

    /// Node results as JSON (`needs` context).
    #[arg(long, env = "FLEET_NEEDS", default_value = "{}")]
    pub needs: String,
}

/// Arguments for the `track-failure` command.
#[derive(Parser, Debug)]
pub struct TrackFailureArgs {
    /// Agent whose execution failed.
    #[arg(long, env = "FLEET_AGENT")]
    pub agent: String,
}

impl Cli {
    /// Parse command line arguments.
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use serial_test::serial;

    #[test]
    fn cli_debug_assert() {
        Cli::command().debug_assert();
    }

    #[test]
    #[serial]
    fn parse_compile_defaults() {
        // SAFETY: tests touching the environment are serialized.
        unsafe { std::env::remove_var("FLEET_CONFIG") };
        let cli = Cli::try_parse_from(["fleet", "compile"]).unwrap();
        assert_eq!(cli.config, PathBuf::from(".github/fleet.yaml"));
        if let Command::Compile(args) = cli.command {
            assert!(!args.check);
            assert!(!args.stdout);
        } else {
            panic!("Expected Compile command");
        }
    }

    #[test]
    fn parse_compile_check_conflicts_with_stdout() {
        assert!(Cli::try_parse_from(["fleet", "compile", "--check", "--stdout"]).is_err());
    }

    #[test]
    fn parse_global_config_after_subcommand() {
        let cli = Cli::try_parse_from(["fleet", "preflight", "--config", "ci/fleet.yaml"]).unwrap();
        assert_eq!(cli.config, PathBuf::from("ci/fleet.yaml"));
        assert!(matches!(cli.command, Command::Preflight));
    }

    #[test]
    fn parse_dispatch() {
        let cli = Cli::try_parse_from(["fleet", "dispatch", "--output", "out.txt"]).unwrap();
        if let Command::Dispatch(args) = cli.command {
            assert_eq!(args.output, Some(PathBuf::from("out.txt")));
        } else {
            panic!("Expected Dispatch command");
        }
    }

    #[test]
    fn parse_apply() {
        let cli = Cli::try_parse_from([
            "fleet",
            "apply",
            "--agent",
            "triage",
            "--outputs",
            ".fleet/outputs.ndjson",
            "--record",
            ".fleet/audit/triage.json",
        ])
        .unwrap();
        if let Command::Apply(args) = cli.command {
            assert_eq!(args.agent, "triage");
            assert_eq!(args.outputs, PathBuf::from(".fleet/outputs.ndjson"));
        } else {
            panic!("Expected Apply command");
        }
    }

    #[test]
    fn parse_report_with_explicit_json() {
        let cli = Cli::try_parse_from([
            "fleet",
            "report",
            "--records",
            "r",
            "--manifest",
            "m.json",
            "--verdicts",
            "{}",
            "--needs",
            "{}",
        ])
        .unwrap();
        if let Command::Report(args) = cli.command {
            assert_eq!(args.records, PathBuf::from("r"));
            assert_eq!(args.summary, None);
            assert_eq!(args.verdicts.as_deref(), Some("{}"));
        } else {
            panic!("Expected Report command");
        }
    }

    #[test]
    fn parse_track_failure() {
        let cli = Cli::try_parse_from(["fleet", "track-failure", "--agent", "docs"]).unwrap();
        assert!(matches!(cli.command, Command::TrackFailure(ref a) if a.agent == "docs"));
    }
}
