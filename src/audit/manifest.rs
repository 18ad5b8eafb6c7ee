//! The per-event manifest: every agent's record plus event metadata.

use super::record::{AuditRecord, ExecutionResult};
use crate::agent::AgentSpec;
use crate::dispatch::VerdictMap;
use crate::error::{FleetError, Result};
use crate::graph::DISPATCH_JOB;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, warn};

/// The durable artifact of one event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    /// Short event description, e.g. `issues.opened #12`.
    pub event: String,
    pub run_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debounce_key: Option<String>,
    pub generated_at: DateTime<Utc>,
    /// `user@host` of the process that assembled the manifest.
    pub generated_by: String,
    /// Set when the event could not be processed at all.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform_failure: Option<String>,
    /// One record per agent, ordered by agent name.
    pub records: Vec<AuditRecord>,
}

impl Manifest {
    pub fn new(event: impl Into<String>, run_id: impl Into<String>) -> Self {
        Self {
            event: event.into(),
            run_id: run_id.into(),
            debounce_key: None,
            generated_at: Utc::now(),
            generated_by: generator_identity(),
            platform_failure: None,
            records: Vec::new(),
        }
    }

    pub fn with_debounce_key(mut self, key: Option<String>) -> Self {
        self.debounce_key = key;
        self
    }

    /// Merge everything known about the event into one record per agent.
    ///
    /// - `verdicts`: the dispatch node's verdict map
    /// - `needs`: the substrate's `needs` context as JSON (node id to
    ///   `{result, outputs}`)
    /// - `uploaded`: records written by the agents' own apply steps
    ///
    /// Agents without an uploaded record still get one, so skips and node
    /// failures always appear.
    pub fn assemble(
        mut self,
        agents: &[AgentSpec],
        verdicts: &VerdictMap,
        needs: &Value,
        uploaded: Vec<AuditRecord>,
    ) -> Self {
        let mut by_agent: BTreeMap<String, AuditRecord> = BTreeMap::new();
        for record in uploaded {
            if agents.iter().any(|a| a.name == record.agent) {
                by_agent.insert(record.agent.clone(), record);
            } else {
                warn!(agent = %record.agent, "ignoring audit record for unknown agent");
            }
        }

        let dispatch = job_result(needs, DISPATCH_JOB);
        if dispatch != ExecutionResult::Success {
            self.platform_failure = Some(format!(
                "dispatch finished with result '{}'; no agent was evaluated",
                dispatch
            ));
        }

        for agent in agents {
            let mut record = by_agent
                .remove(&agent.name)
                .unwrap_or_else(|| AuditRecord::new(agent.name.clone()));
            record.verdict = verdicts.get(&agent.name).cloned();
            record.execution = job_result(needs, &agent.job_id());
            debug!(agent = %agent.name, execution = %record.execution, "assembled record");
            by_agent.insert(agent.name.clone(), record);
        }

        self.records = by_agent.into_values().collect();
        self
    }

    /// Names of agents whose execution failed, ordered by name.
    pub fn failed_agents(&self) -> Vec<String> {
        self.records
            .iter()
            .filter(|r| r.failed())
            .map(|r| r.agent.clone())
            .collect()
    }

    #[cfg(test)]
    pub(crate) fn record(&self, agent: &str) -> Option<&AuditRecord> {
        self.records.iter().find(|r| r.agent == agent)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        crate::fs::write_json(path, self)
    }

}

/// Load every `*.json` audit record in `dir`. A missing directory holds none.
pub fn load_records<P: AsRef<Path>>(dir: P) -> Result<Vec<AuditRecord>> {
    let dir = dir.as_ref();
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let entries = std::fs::read_dir(dir).map_err(|e| {
        FleetError::UserError(format!(
            "failed to read records directory '{}': {}",
            dir.display(),
            e
        ))
    })?;
    let mut paths: Vec<_> = entries
        .filter_map(|e| e.ok().map(|e| e.path()))
        .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
        .collect();
    paths.sort();

    paths.iter().map(AuditRecord::load).collect()
}

fn job_result(needs: &Value, job: &str) -> ExecutionResult {
    needs
        .get(job)
        .and_then(|n| n.get("result"))
        .and_then(Value::as_str)
        .map(ExecutionResult::from_str)
        .unwrap_or_default()
}

fn generator_identity() -> String {
    let user = std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "unknown".to_string());

    let host = hostname::get()
        .map(|h| h.to_string_lossy().to_string())
        .unwrap_or_else(|_| "unknown".to_string());

    format!("{}@{}", user, host)
}
