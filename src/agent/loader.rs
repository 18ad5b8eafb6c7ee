//! Loading and validating agent records.
//!
//! Agents live in a directory of YAML files (one agent per file, loaded in
//! file-name order) or in a single YAML file holding one agent or a list.

use super::model::{AgentSpec, TimeoutBudget};
use crate::error::{FleetError, Result};
use crate::permissions;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Load every agent under `path` and validate the set.
pub fn load_agents<P: AsRef<Path>>(path: P) -> Result<Vec<AgentSpec>> {
    let path = path.as_ref();

    let agents = if path.is_dir() {
        let mut agents = Vec::new();
        for file in agent_files(path)? {
            agents.extend(read_agent_file(&file)?);
        }
        agents
    } else if path.is_file() {
        read_agent_file(path)?
    } else {
        return Err(FleetError::UserError(format!(
            "agent definitions not found at '{}'\n\
             Fix: create the directory or set `agents_dir` in the config.",
            path.display()
        )));
    };

    validate_agents(&agents)?;
    debug!(count = agents.len(), path = %path.display(), "loaded agents");
    Ok(agents)
}

/// Parse agents from YAML text: a single mapping or a list of mappings.
pub fn agents_from_yaml(yaml: &str) -> Result<Vec<AgentSpec>> {
    let value: serde_yaml::Value = serde_yaml::from_str(yaml)
        .map_err(|e| FleetError::UserError(format!("failed to parse agent YAML: {}", e)))?;

    let parsed = if value.is_null() {
        Ok(Vec::new())
    } else if value.is_sequence() {
        serde_yaml::from_value::<Vec<AgentSpec>>(value)
    } else {
        serde_yaml::from_value::<AgentSpec>(value).map(|a| vec![a])
    };
    parsed.map_err(|e| FleetError::UserError(format!("invalid agent definition: {}", e)))
}

fn agent_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = std::fs::read_dir(dir).map_err(|e| {
        FleetError::UserError(format!(
            "failed to read agents directory '{}': {}",
            dir.display(),
            e
        ))
    })?;

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| {
            FleetError::UserError(format!(
                "failed to read agents directory '{}': {}",
                dir.display(),
                e
            ))
        })?;
        let path = entry.path();
        let is_yaml = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e == "yaml" || e == "yml");
        if path.is_file() && is_yaml {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn read_agent_file(path: &Path) -> Result<Vec<AgentSpec>> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        FleetError::UserError(format!(
            "failed to read agent file '{}': {}",
            path.display(),
            e
        ))
    })?;
    agents_from_yaml(&content).map_err(|e| match e {
        FleetError::UserError(msg) => {
            FleetError::UserError(format!("{}: {}", path.display(), msg))
        }
        other => other,
    })
}

/// Validate a set of agents.
///
/// Validation rules:
/// - names are non-empty and unique
/// - slugs (job identifiers) are unique
/// - triggers, outputs and permissions are individually valid
/// - timeout sub-budgets are positive and together fit in a runner's job limit
/// - minimum interval, when set, is positive
pub fn validate_agents(agents: &[AgentSpec]) -> Result<()> {
    let mut names = BTreeSet::new();
    let mut slugs = BTreeSet::new();

    for agent in agents {
        if agent.name.trim().is_empty() {
            return Err(FleetError::UserError(
                "agent validation failed: agent name cannot be empty".to_string(),
            ));
        }
        if !names.insert(agent.name.as_str()) {
            return Err(FleetError::UserError(format!(
                "agent validation failed: duplicate agent name '{}'",
                agent.name
            )));
        }
        let slug = agent.slug();
        if !slugs.insert(slug.clone()) {
            return Err(FleetError::UserError(format!(
                "agent validation failed: agent '{}' has the same identifier '{}' as another agent",
                agent.name, slug
            )));
        }

        agent.triggers.validate(&agent.name)?;
        agent.outputs.validate(&agent.name)?;
        permissions::validate_declaration(agent)?;

        if agent.timeout.context_minutes == 0 || agent.timeout.action_minutes == 0 {
            return Err(FleetError::UserError(format!(
                "agent validation failed: agent '{}' has a timeout of 0 minutes",
                agent.name
            )));
        }
        if agent.timeout.budget_minutes() > TimeoutBudget::MAX_MINUTES {
            return Err(FleetError::UserError(format!(
                "agent validation failed: agent '{}' has a timeout of {} minutes (max {})",
                agent.name,
                agent.timeout.budget_minutes(),
                TimeoutBudget::MAX_MINUTES
            )));
        }
        if agent.admission.min_interval_minutes == Some(0) {
            return Err(FleetError::UserError(format!(
                "agent validation failed: agent '{}' has min_interval_minutes of 0",
                agent.name
            )));
        }
        if agent.admission.allowed_actors.iter().any(|a| a.trim().is_empty())
            || agent.admission.required_labels.iter().any(|l| l.trim().is_empty())
        {
            return Err(FleetError::UserError(format!(
                "agent validation failed: agent '{}' has an empty actor or label entry",
                agent.name
            )));
        }
    }

    Ok(())
}
