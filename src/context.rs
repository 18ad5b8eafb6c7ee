//! Repository and run context resolution for fleet.
//!
//! Every command resolves two things before doing work: where the
//! repository and its `fleet.yaml` are ([`FleetContext`]), and, for the
//! runtime entrypoints, which event the substrate is processing
//! ([`RunEnvironment`]).

use crate::agent::{AgentSpec, load_agents};
use crate::config::Config;
use crate::error::{FleetError, Result};
use crate::event::InboundEvent;
use crate::git;
use crate::outputs::RunContext;
use std::env;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Default config path relative to the repository root.
pub const DEFAULT_CONFIG_PATH: &str = ".github/fleet.yaml";

/// Resolved repository paths and configuration. All paths are absolute.
#[derive(Debug, Clone)]
pub struct FleetContext {
    pub repo_root: PathBuf,
    pub config_path: PathBuf,
    pub config: Config,
}

impl FleetContext {
    /// Resolve the context from the current working directory.
    pub fn resolve(config_path: &Path) -> Result<Self> {
        let cwd = env::current_dir().map_err(|e| {
            FleetError::UserError(format!("failed to get current working directory: {}", e))
        })?;
        Self::resolve_from(&cwd, config_path)
    }

    /// Resolve the context from a specific directory.
    ///
    /// A relative `config_path` is taken relative to the repository root. A
    /// missing config file means defaults.
    pub fn resolve_from<P: AsRef<Path>>(cwd: P, config_path: &Path) -> Result<Self> {
        let repo_root = git::get_repo_root(cwd)?;
        let config_path = if config_path.is_absolute() {
            config_path.to_path_buf()
        } else {
            repo_root.join(config_path)
        };
        let config = Config::load_or_default(&config_path)?;
        debug!(root = %repo_root.display(), config = %config_path.display(), "resolved context");

        Ok(Self {
            repo_root,
            config_path,
            config,
        })
    }

    pub fn agents_path(&self) -> PathBuf {
        self.repo_root.join(&self.config.agents_dir)
    }

    pub fn workflow_path(&self) -> PathBuf {
        self.repo_root.join(&self.config.workflow_file)
    }

    /// `config_path` relative to the root, or `None` for the default location.
    pub fn config_override(&self) -> Option<String> {
        let relative = self.config_path.strip_prefix(&self.repo_root).ok()?;
        if relative == Path::new(DEFAULT_CONFIG_PATH) {
            None
        } else {
            Some(relative.to_string_lossy().replace('\\', "/"))
        }
    }

    pub fn load_agents(&self) -> Result<Vec<AgentSpec>> {
        load_agents(self.agents_path())
    }
}

/// Look up one agent by name.
pub fn find_agent<'a>(agents: &'a [AgentSpec], name: &str) -> Result<&'a AgentSpec> {
    agents.iter().find(|a| a.name == name).ok_or_else(|| {
        FleetError::UserError(format!(
            "unknown agent '{}'. Known agents: {}",
            name,
            agents
                .iter()
                .map(|a| a.name.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        ))
    })
}

/// What the substrate tells a node about the run it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunEnvironment {
    pub event_name: String,
    pub event_path: PathBuf,
    pub actor: String,
    pub run_id: String,
    /// `owner/name`.
    pub repository: String,
    pub server_url: String,
}

fn required_var(name: &str) -> Result<String> {
    match env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(FleetError::UserError(format!(
            "{} is not set; this command runs inside a workflow node",
            name
        ))),
    }
}

impl RunEnvironment {
    /// Read the run from `GITHUB_*` variables.
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            event_name: required_var("GITHUB_EVENT_NAME")?,
            event_path: PathBuf::from(required_var("GITHUB_EVENT_PATH")?),
            actor: required_var("GITHUB_ACTOR")?,
            run_id: required_var("GITHUB_RUN_ID")?,
            repository: required_var("GITHUB_REPOSITORY")?,
            server_url: env::var("GITHUB_SERVER_URL")
                .unwrap_or_else(|_| "https://github.com".to_string()),
        })
    }

    /// Parse the event payload file.
    pub fn event(&self) -> Result<InboundEvent> {
        let content = std::fs::read_to_string(&self.event_path).map_err(|e| {
            FleetError::UserError(format!(
                "failed to read event payload '{}': {}",
                self.event_path.display(),
                e
            ))
        })?;
        let payload: serde_json::Value = serde_json::from_str(&content).map_err(|e| {
            FleetError::UserError(format!(
                "failed to parse event payload '{}': {}",
                self.event_path.display(),
                e
            ))
        })?;
        InboundEvent::from_payload(&self.event_name, &payload, &self.actor, &self.run_id)
    }

    pub fn run_url(&self) -> String {
        format!(
            "{}/{}/actions/runs/{}",
            self.server_url.trim_end_matches('/'),
            self.repository,
            self.run_id
        )
    }

    /// Context the output handlers see for `agent`.
    pub fn run_context(
        &self,
        agent: &AgentSpec,
        config: &Config,
        event: &InboundEvent,
        can_sign: bool,
    ) -> RunContext {
        RunContext {
            agent: agent.name.clone(),
            run_id: self.run_id.clone(),
            run_url: self.run_url(),
            item: event.item,
            can_sign,
            companion_label: agent
                .admission
                .retry_on_companion_close
                .then(|| config.companion_label(&agent.name)),
        }
    }
}
