//! Agent record definition.

use crate::outputs::OutputDeclaration;
use crate::permissions::PermissionLevel;
use crate::triggers::TriggerDeclaration;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

fn default_context_minutes() -> u32 {
    5
}

fn default_action_minutes() -> u32 {
    20
}

/// One agent, fully resolved. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AgentSpec {
    /// Stable identity; also the manual-invocation handle.
    pub name: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,

    /// Instructions handed to the engine ahead of the generated context.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub instructions: String,

    #[serde(default)]
    pub triggers: TriggerDeclaration,

    /// Resource to access level.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub permissions: BTreeMap<String, PermissionLevel>,

    #[serde(default)]
    pub outputs: OutputDeclaration,

    #[serde(default)]
    pub admission: AdmissionSettings,

    /// Exempt every event this agent participates in from debouncing.
    #[serde(default)]
    pub disable_concurrency: bool,

    #[serde(default)]
    pub timeout: TimeoutBudget,
}

/// Who and when an agent may run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AdmissionSettings {
    /// Logins, or `org/team` slugs, admitted regardless of repository role.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub allowed_actors: Vec<String>,

    /// The item must carry at least one of these.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub required_labels: Vec<String>,

    /// Minimum minutes since the last successful run.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_interval_minutes: Option<u32>,

    /// Hold runs while a companion item this agent opened is still open,
    /// and run again when it is closed.
    pub retry_on_companion_close: bool,
}

/// Wall-clock budget of one agent's node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TimeoutBudget {
    /// Read-only context collection.
    #[serde(default = "default_context_minutes")]
    pub context_minutes: u32,

    /// The agent run itself, including output application.
    #[serde(default = "default_action_minutes")]
    pub action_minutes: u32,
}

impl Default for TimeoutBudget {
    fn default() -> Self {
        Self {
            context_minutes: default_context_minutes(),
            action_minutes: default_action_minutes(),
        }
    }
}

impl TimeoutBudget {
    /// Longest node a hosted runner accepts.
    pub const MAX_MINUTES: u32 = 360;

    /// Both sub-budgets, without headroom.
    pub fn budget_minutes(&self) -> u32 {
        self.context_minutes.saturating_add(self.action_minutes)
    }

    /// Node timeout: both sub-budgets plus `headroom`.
    pub fn total_minutes(&self, headroom: u32) -> u32 {
        self.budget_minutes().saturating_add(headroom)
    }
}

impl AgentSpec {
    /// A bare agent with defaults for everything but the name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            instructions: String::new(),
            triggers: TriggerDeclaration::default(),
            permissions: BTreeMap::new(),
            outputs: OutputDeclaration::default(),
            admission: AdmissionSettings::default(),
            disable_concurrency: false,
            timeout: TimeoutBudget::default(),
        }
    }

    /// Identifier safe for job ids and output names.
    ///
    /// Lowercase ASCII alphanumerics; everything else becomes `_`.
    pub fn slug(&self) -> String {
        self.name
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() {
                    c.to_ascii_lowercase()
                } else {
                    '_'
                }
            })
            .collect()
    }

    /// Id of this agent's execution node.
    pub fn job_id(&self) -> String {
        format!("agent_{}", self.slug())
    }

    /// Name of the dispatch output carrying this agent's verdict.
    pub fn verdict_output(&self) -> String {
        format!("verdict_{}", self.slug())
    }
}
