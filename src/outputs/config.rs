//! Per-agent output declarations.
//!
//! Each action-kind an agent may use is enabled by the presence of its key:
//!
//! ```yaml
//! outputs:
//!   add_comment: { max: 2 }
//!   add_labels: { allowed: [bug, enhancement] }
//!   create_pull_request:
//!     signed_commits: true
//!     allowed_paths: ["docs/**"]
//! ```

use super::instance::OutputKind;
use super::paths::PathAllowList;
use crate::error::{FleetError, Result};
use serde::{Deserialize, Serialize};

fn default_max() -> u32 {
    1
}

fn default_label_max() -> u32 {
    3
}

fn default_true() -> bool {
    true
}

fn default_base_branch() -> String {
    "main".to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentConfig {
    #[serde(default = "default_max")]
    pub max: u32,
}

impl Default for CommentConfig {
    fn default() -> Self {
        Self { max: default_max() }
    }
}

/// Shared by `add_labels` and `remove_labels`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelConfig {
    #[serde(default = "default_label_max")]
    pub max: u32,

    /// Labels the agent may touch. Empty means any existing label.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub allowed: Vec<String>,
}

impl Default for LabelConfig {
    fn default() -> Self {
        Self {
            max: default_label_max(),
            allowed: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueConfig {
    #[serde(default = "default_max")]
    pub max: u32,

    /// Prepended to every created issue's title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title_prefix: Option<String>,

    /// Labels attached to every created issue.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<String>,
}

impl Default for IssueConfig {
    fn default() -> Self {
        Self {
            max: default_max(),
            title_prefix: None,
            labels: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequestConfig {
    #[serde(default = "default_max")]
    pub max: u32,

    #[serde(default = "default_true")]
    pub draft: bool,

    /// Refuse to apply unless the run can produce signed commits.
    #[serde(default)]
    pub signed_commits: bool,

    /// Globs the changed files must match. Empty means unrestricted.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub allowed_paths: Vec<String>,

    #[serde(default = "default_base_branch")]
    pub base_branch: String,
}

impl Default for PullRequestConfig {
    fn default() -> Self {
        Self {
            max: default_max(),
            draft: default_true(),
            signed_commits: false,
            allowed_paths: Vec::new(),
            base_branch: default_base_branch(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscussionConfig {
    #[serde(default = "default_max")]
    pub max: u32,
}

impl Default for DiscussionConfig {
    fn default() -> Self {
        Self { max: default_max() }
    }
}

/// The action-kinds an agent may use, with their configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputDeclaration {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub add_comment: Option<CommentConfig>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub add_labels: Option<LabelConfig>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub remove_labels: Option<LabelConfig>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub create_issue: Option<IssueConfig>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub create_pull_request: Option<PullRequestConfig>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub update_discussion: Option<DiscussionConfig>,
}

impl OutputDeclaration {
    /// Whether `kind` is enabled.
    pub fn is_enabled(&self, kind: OutputKind) -> bool {
        self.max_for(kind).is_some()
    }

    /// Configured instance cap for `kind`, if enabled.
    pub fn max_for(&self, kind: OutputKind) -> Option<u32> {
        match kind {
            OutputKind::AddComment => self.add_comment.as_ref().map(|c| c.max),
            OutputKind::AddLabels => self.add_labels.as_ref().map(|c| c.max),
            OutputKind::RemoveLabels => self.remove_labels.as_ref().map(|c| c.max),
            OutputKind::CreateIssue => self.create_issue.as_ref().map(|c| c.max),
            OutputKind::CreatePullRequest => self.create_pull_request.as_ref().map(|c| c.max),
            OutputKind::UpdateDiscussion => self.update_discussion.as_ref().map(|c| c.max),
        }
    }

    /// Enabled kinds in canonical order.
    pub fn kinds(&self) -> Vec<OutputKind> {
        OutputKind::ALL
            .into_iter()
            .filter(|k| self.is_enabled(*k))
            .collect()
    }

    /// Validate limits and patterns for `agent`.
    pub fn validate(&self, agent: &str) -> Result<()> {
        for kind in self.kinds() {
            if self.max_for(kind) == Some(0) {
                return Err(FleetError::UserError(format!(
                    "agent '{}': outputs.{}.max must be greater than 0",
                    agent, kind
                )));
            }
        }

        if let Some(pr) = &self.create_pull_request {
            if pr.base_branch.trim().is_empty() {
                return Err(FleetError::UserError(format!(
                    "agent '{}': outputs.create_pull_request.base_branch must not be empty",
                    agent
                )));
            }
            PathAllowList::new(&pr.allowed_paths).map_err(|e| {
                FleetError::UserError(format!("agent '{}': {}", agent, e))
            })?;
        }

        Ok(())
    }
}
