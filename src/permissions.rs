//! Permission aggregation.
//!
//! Each agent declares the access it needs per resource. The document-level
//! set is the union of every declaration with the more permissive level
//! winning, plus a fixed baseline the fleet itself needs.

use crate::agent::AgentSpec;
use crate::error::{FleetError, Result};
use crate::outputs::OutputKind;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Resources the substrate accepts in a permission block.
pub const KNOWN_RESOURCES: &[&str] = &[
    "actions",
    "attestations",
    "checks",
    "contents",
    "deployments",
    "discussions",
    "id-token",
    "issues",
    "models",
    "packages",
    "pages",
    "pull-requests",
    "repository-projects",
    "security-events",
    "statuses",
];

/// Access level for one resource. `Write` implies `Read`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionLevel {
    Read,
    Write,
}

impl PermissionLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            PermissionLevel::Read => "read",
            PermissionLevel::Write => "write",
        }
    }
}

impl std::fmt::Display for PermissionLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resource to level mapping, serialized as a permission block.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PermissionSet(BTreeMap<String, PermissionLevel>);

impl PermissionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Entries every compiled document carries.
    pub fn baseline() -> Self {
        let mut set = Self::new();
        set.grant("actions", PermissionLevel::Write);
        set.grant("contents", PermissionLevel::Read);
        set.grant("issues", PermissionLevel::Write);
        set
    }

    /// Grant `level` on `resource`. Never downgrades an existing entry.
    pub fn grant(&mut self, resource: &str, level: PermissionLevel) {
        let entry = self.0.entry(resource.to_string()).or_insert(level);
        if level > *entry {
            *entry = level;
        }
    }

    /// Merge another set into this one, upgrading where it is more permissive.
    pub fn merge(&mut self, other: &PermissionSet) {
        for (resource, level) in &other.0 {
            self.grant(resource, *level);
        }
    }

    pub fn get(&self, resource: &str) -> Option<PermissionLevel> {
        self.0.get(resource).copied()
    }

    /// Whether `level` (or more) is granted on `resource`.
    pub fn allows(&self, resource: &str, level: PermissionLevel) -> bool {
        self.get(resource).is_some_and(|granted| granted >= level)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, PermissionLevel)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, PermissionLevel)> for PermissionSet {
    fn from_iter<I: IntoIterator<Item = (String, PermissionLevel)>>(iter: I) -> Self {
        let mut set = Self::new();
        for (resource, level) in iter {
            set.grant(&resource, level);
        }
        set
    }
}

/// Access an action-kind needs to be applied by the agent's own node.
pub fn required_for_output(kind: OutputKind) -> &'static [(&'static str, PermissionLevel)] {
    match kind {
        OutputKind::AddComment
        | OutputKind::AddLabels
        | OutputKind::RemoveLabels
        | OutputKind::CreateIssue => &[("issues", PermissionLevel::Write)],
        OutputKind::CreatePullRequest => &[
            ("contents", PermissionLevel::Write),
            ("pull-requests", PermissionLevel::Write),
        ],
        OutputKind::UpdateDiscussion => &[("discussions", PermissionLevel::Write)],
    }
}

/// Check one agent's declaration: known resources only, and enough access
/// for every action-kind it declares.
pub fn validate_declaration(agent: &AgentSpec) -> Result<()> {
    for resource in agent.permissions.keys() {
        if !KNOWN_RESOURCES.contains(&resource.as_str()) {
            return Err(FleetError::UserError(format!(
                "agent '{}': unknown permission resource '{}'",
                agent.name, resource
            )));
        }
    }

    let declared = for_agent(agent);
    for kind in agent.outputs.kinds() {
        for (resource, level) in required_for_output(kind) {
            if !declared.allows(resource, *level) {
                return Err(FleetError::UserError(format!(
                    "agent '{}' declares {} but lacks `{}: {}` permission",
                    agent.name, kind, resource, level
                )));
            }
        }
    }
    Ok(())
}

/// Permissions granted to one agent's node: its own declaration plus
/// read access to contents. Nothing from other agents leaks in.
pub fn for_agent(agent: &AgentSpec) -> PermissionSet {
    let mut set: PermissionSet = agent
        .permissions
        .iter()
        .map(|(k, v)| (k.clone(), *v))
        .collect();
    set.grant("contents", PermissionLevel::Read);
    set
}

/// Document-level permissions: baseline merged with every agent's set.
///
/// The result does not depend on agent order.
pub fn aggregate(agents: &[AgentSpec]) -> PermissionSet {
    let mut set = PermissionSet::baseline();
    for agent in agents {
        set.merge(&for_agent(agent));
    }
    set
}
