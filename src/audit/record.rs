//! Per-agent audit record.

use crate::dispatch::DispatchVerdict;
use crate::error::{FleetError, Result};
use crate::outputs::{ExecutionOutcome, KindReport, RejectedLine};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Terminal state of an agent's execution node, as the substrate reports it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionResult {
    Success,
    Failure,
    Cancelled,
    Skipped,
    /// No result was observed for the node.
    #[default]
    Unknown,
}

impl ExecutionResult {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionResult::Success => "success",
            ExecutionResult::Failure => "failure",
            ExecutionResult::Cancelled => "cancelled",
            ExecutionResult::Skipped => "skipped",
            ExecutionResult::Unknown => "unknown",
        }
    }

    /// Parse the substrate's job result string.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Self {
        match s {
            "success" => ExecutionResult::Success,
            "failure" => ExecutionResult::Failure,
            "cancelled" => ExecutionResult::Cancelled,
            "skipped" => ExecutionResult::Skipped,
            _ => ExecutionResult::Unknown,
        }
    }
}

impl std::fmt::Display for ExecutionResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything that happened to one agent for one event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub agent: String,

    /// Absent when dispatch never produced one (platform failure).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verdict: Option<DispatchVerdict>,

    #[serde(default)]
    pub execution: ExecutionResult,

    /// One report per action-kind the agent proposed.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub outputs: Vec<KindReport>,

    /// Output lines that were not valid instances.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rejected: Vec<RejectedLine>,
}

impl AuditRecord {
    pub fn new(agent: impl Into<String>) -> Self {
        Self {
            agent: agent.into(),
            verdict: None,
            execution: ExecutionResult::Unknown,
            outputs: Vec::new(),
            rejected: Vec::new(),
        }
    }

    /// The node failed, or a tracker call failed while applying outputs.
    pub fn failed(&self) -> bool {
        self.execution == ExecutionResult::Failure
            || self.outputs.iter().any(|k| {
                k.instances
                    .iter()
                    .any(|i| matches!(i.outcome, ExecutionOutcome::Failed { .. }))
            })
    }

    /// Any instance failed validation, or a line was rejected.
    pub fn has_validation_failures(&self) -> bool {
        !self.rejected.is_empty() || self.outputs.iter().any(|k| k.validation_failures().next().is_some())
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            FleetError::UserError(format!(
                "failed to read audit record '{}': {}",
                path.display(),
                e
            ))
        })?;
        serde_json::from_str(&content).map_err(|e| {
            FleetError::UserError(format!(
                "failed to parse audit record '{}': {}",
                path.display(),
                e
            ))
        })
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        crate::fs::write_json(path, self)
    }
}
