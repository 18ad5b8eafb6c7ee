//! Job graph construction.
//!
//! The graph has four tiers: one dispatch node, one execution node per
//! agent gated on that agent's verdict, an always-run audit node fanning in
//! from all of them, and a matrix node filing one tracking item per failed
//! agent.

use super::expr::Expr;
use super::model::{
    AUDIT_JOB, Cardinality, DISPATCH_JOB, FAILURE_JOB, Job, JobGraph, Step, Strategy,
    WorkflowDocument,
};
use crate::agent::{AgentSpec, validate_agents};
use crate::concurrency;
use crate::config::Config;
use crate::error::{FleetError, Result};
use crate::outputs::Registry;
use crate::permissions::{self, PermissionLevel, PermissionSet};
use crate::triggers;
use std::collections::BTreeMap;
use tracing::debug;

/// Working directory (relative to the checkout) for per-run files.
pub const WORK_DIR: &str = ".fleet";
/// Prefix of the artifact each agent node uploads its audit record under.
pub const RECORD_ARTIFACT_PREFIX: &str = "fleet-audit-";
/// Artifact holding the assembled manifest.
pub const MANIFEST_ARTIFACT: &str = "fleet-manifest";

const HEADER: &str = "# Generated by fleet. Do not edit by hand; run `fleet compile`.\n";

/// Builds the compiled document for a set of agents.
pub struct GraphBuilder<'a> {
    config: &'a Config,
    registry: &'a Registry,
    config_path: String,
}

impl<'a> GraphBuilder<'a> {
    pub fn new(config: &'a Config, registry: &'a Registry) -> Self {
        Self {
            config,
            registry,
            config_path: String::new(),
        }
    }

    /// Path of `fleet.yaml` the emitted steps should read, if not the default.
    pub fn config_path(mut self, path: impl Into<String>) -> Self {
        self.config_path = path.into();
        self
    }

    /// Build and check the document.
    pub fn build(&self, agents: &[AgentSpec]) -> Result<WorkflowDocument> {
        validate_agents(agents)?;

        let mut jobs = JobGraph::new();
        jobs.insert(DISPATCH_JOB, self.dispatch_job(agents));
        for agent in agents {
            jobs.insert(agent.job_id(), self.agent_job(agent)?);
        }
        jobs.insert(AUDIT_JOB, self.audit_job(agents));
        jobs.insert(FAILURE_JOB, self.failure_job());
        jobs.check()?;
        debug!(nodes = jobs.len(), agents = agents.len(), "built job graph");

        let mut env = BTreeMap::new();
        if !self.config_path.is_empty() {
            env.insert("FLEET_CONFIG".to_string(), self.config_path.clone());
        }

        Ok(WorkflowDocument {
            name: self.config.workflow_name.clone(),
            on: triggers::aggregate(agents),
            permissions: permissions::aggregate(agents),
            concurrency: concurrency::plan(agents, self.config),
            env,
            jobs,
        })
    }

    /// Build, check and render the document as YAML.
    pub fn render(&self, agents: &[AgentSpec]) -> Result<String> {
        let document = self.build(agents)?;
        let body = serde_yaml::to_string(&document).map_err(|e| {
            FleetError::UserError(format!("failed to serialize workflow document: {}", e))
        })?;
        Ok(format!("{}{}", HEADER, body))
    }

    fn setup_steps(&self) -> Vec<Step> {
        vec![
            Step::uses("Check out repository", &self.config.checkout_action),
            Step::run("Install fleet", &self.config.install_command),
        ]
    }

    fn token_env() -> Expr {
        Expr::ctx("github.token")
    }

    fn secret(&self) -> Expr {
        Expr::ctx(format!("secrets.{}", self.config.engine_secret))
    }

    fn dispatch_job(&self, agents: &[AgentSpec]) -> Job {
        let mut job = Job::new("Dispatch", &self.config.runs_on);
        job.permissions = [
            ("actions", PermissionLevel::Read),
            ("contents", PermissionLevel::Read),
            ("issues", PermissionLevel::Read),
            ("pull-requests", PermissionLevel::Read),
        ]
        .into_iter()
        .map(|(r, l)| (r.to_string(), l))
        .collect();

        job.steps = self.setup_steps();
        job.steps.push(
            Step::run("Preflight", "fleet preflight")
                .env(self.config.engine_secret.clone(), self.secret()),
        );
        job.steps.push(
            Step::run("Decide", "fleet dispatch --output \"$GITHUB_OUTPUT\"")
                .id("decide")
                .env("GH_TOKEN", Self::token_env()),
        );

        job.outputs.insert("verdicts".to_string(), Expr::ctx("steps.decide.outputs.verdicts"));
        job.outputs.insert(
            "debounce_key".to_string(),
            Expr::ctx("steps.decide.outputs.debounce_key"),
        );
        for agent in agents {
            let output = agent.verdict_output();
            job.outputs
                .insert(output.clone(), Expr::ctx(format!("steps.decide.outputs.{}", output)));
        }
        job
    }

    fn agent_job(&self, agent: &AgentSpec) -> Result<Job> {
        let verdict = agent.verdict_output();
        let slug = agent.slug();
        let declared: Vec<String> = self
            .registry
            .handlers()
            .iter()
            .filter(|h| h.describe(&agent.outputs).is_some())
            .map(|h| h.kind().to_string())
            .collect();

        let mut job = Job::new(format!("Agent: {}", agent.name), &self.config.runs_on);
        job.needs = vec![DISPATCH_JOB.to_string()];
        job.condition = Some(
            Expr::ctx(format!("needs.{}.outputs.{}", DISPATCH_JOB, verdict)).eq(Expr::str("admit")),
        );
        job.timeout_minutes = Some(
            agent
                .timeout
                .total_minutes(self.config.setup_headroom_minutes),
        );
        job.permissions = permissions::for_agent(agent);
        job.cardinality = Cardinality::PerAgent;
        job.side_effects = !declared.is_empty();
        job.gate = Some(verdict);
        job.env.insert("FLEET_AGENT".to_string(), agent.name.clone());

        let context_file = format!("{}/context.md", WORK_DIR);
        let outputs_file = format!("{}/outputs.ndjson", WORK_DIR);
        let record_dir = format!("{}/audit", WORK_DIR);
        let engine = shell_words::join(self.config.engine_args()?);

        // The engine step sees neither the token nor persisted git credentials;
        // only the fleet steps around it may write to the repository.
        job.steps = vec![
            Step::uses("Check out repository", &self.config.checkout_action)
                .with("persist-credentials", "false"),
            Step::run("Install fleet", &self.config.install_command),
        ];
        job.steps.push(
            Step::run(
                "Collect context",
                format!(
                    "mkdir -p {}\nfleet context --agent \"$FLEET_AGENT\" --output {}",
                    record_dir, context_file
                ),
            )
            .env("GH_TOKEN", Self::token_env())
            .timeout(agent.timeout.context_minutes),
        );
        job.steps.push(
            Step::run(
                "Run agent",
                format!("{} < {} > {}", engine, context_file, outputs_file),
            )
            .id("engine")
            .env(self.config.engine_secret.clone(), self.secret())
            .timeout(agent.timeout.action_minutes),
        );
        if !declared.is_empty() {
            job.steps.push(
                Step::run(
                    format!("Apply outputs ({})", declared.join(", ")),
                    format!(
                        "gh auth setup-git\nfleet apply --agent \"$FLEET_AGENT\" --outputs {} --record {}/{}.json",
                        outputs_file, record_dir, slug
                    ),
                )
                .env("GH_TOKEN", Self::token_env()),
            );
        }
        job.steps.push(
            Step::uses("Upload audit record", &self.config.upload_artifact_action)
                .when(Expr::always())
                .with("name", format!("{}{}", RECORD_ARTIFACT_PREFIX, slug))
                .with("path", record_dir)
                .with("if-no-files-found", "ignore"),
        );
        Ok(job)
    }

    fn audit_job(&self, agents: &[AgentSpec]) -> Job {
        let mut job = Job::new("Audit", &self.config.runs_on);
        job.needs = std::iter::once(DISPATCH_JOB.to_string())
            .chain(agents.iter().map(AgentSpec::job_id))
            .collect();
        job.condition = Some(Expr::always());
        job.continue_on_error = true;
        job.permissions = [
            ("actions", PermissionLevel::Read),
            ("contents", PermissionLevel::Read),
        ]
        .into_iter()
        .map(|(r, l)| (r.to_string(), l))
        .collect();

        let record_dir = format!("{}/audit", WORK_DIR);
        let manifest = format!("{}/manifest.json", WORK_DIR);
        job.steps = self.setup_steps();
        job.steps.push(
            Step::uses("Download audit records", &self.config.download_artifact_action)
                .with("pattern", format!("{}*", RECORD_ARTIFACT_PREFIX))
                .with("path", record_dir.clone())
                .with("merge-multiple", "true"),
        );
        job.steps.push(
            Step::run(
                "Assemble report",
                format!(
                    "fleet report --records {} --manifest {} --summary \"$GITHUB_STEP_SUMMARY\" --output \"$GITHUB_OUTPUT\"",
                    record_dir, manifest
                ),
            )
            .id("report")
            .env(
                "FLEET_VERDICTS",
                Expr::ctx(format!("needs.{}.outputs.verdicts", DISPATCH_JOB)),
            )
            .env("FLEET_NEEDS", Expr::call("toJSON", vec![Expr::ctx("needs")])),
        );
        job.steps.push(
            Step::uses("Upload manifest", &self.config.upload_artifact_action)
                .when(Expr::always())
                .with("name", MANIFEST_ARTIFACT)
                .with("path", manifest),
        );
        job.outputs.insert(
            "failed_agents".to_string(),
            Expr::ctx("steps.report.outputs.failed_agents"),
        );
        job
    }

    fn failure_job(&self) -> Job {
        let failed = Expr::ctx(format!("needs.{}.outputs.failed_agents", AUDIT_JOB));

        let mut job = Job::new("Track failure: ${{ matrix.agent }}", &self.config.runs_on);
        job.needs = vec![AUDIT_JOB.to_string()];
        // An empty matrix is rejected by the runner.
        job.condition = Some(Expr::and(vec![
            Expr::always(),
            failed.clone().ne(Expr::str("")),
            failed.clone().ne(Expr::str("[]")),
        ]));
        job.permissions = PermissionSet::from_iter([
            ("contents".to_string(), PermissionLevel::Read),
            ("issues".to_string(), PermissionLevel::Write),
        ]);
        job.cardinality = Cardinality::PerFailedAgent;
        job.strategy = Some(Strategy {
            matrix: BTreeMap::from([(
                "agent".to_string(),
                Expr::call("fromJSON", vec![failed]),
            )]),
            fail_fast: false,
        });

        job.steps = self.setup_steps();
        job.steps.push(
            Step::run("File or update tracking issue", "fleet track-failure --agent \"$FLEET_AGENT\"")
                .env("FLEET_AGENT", Expr::ctx("matrix.agent"))
                .env("GH_TOKEN", Self::token_env()),
        );
        job
    }
}
