//! Live repository state consulted during admission.
//!
//! Nothing here is cached between events; every lookup reads the
//! substrate's current run history or tracker state.

use crate::error::Result;
use crate::event::ItemRef;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An actor's role on the repository, least to most privileged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RepoRole {
    None,
    Read,
    Triage,
    Write,
    Maintain,
    Admin,
}

impl RepoRole {
    /// Parse the tracker's role or permission name.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Self {
        match s {
            "admin" => RepoRole::Admin,
            "maintain" => RepoRole::Maintain,
            "write" | "push" => RepoRole::Write,
            "triage" => RepoRole::Triage,
            "read" | "pull" => RepoRole::Read,
            _ => RepoRole::None,
        }
    }

    /// Administrators and write-capable collaborators.
    pub fn can_write(&self) -> bool {
        *self >= RepoRole::Write
    }
}

/// One completed run of the compiled document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunRecord {
    pub completed_at: DateTime<Utc>,
    pub succeeded: bool,
}

/// Read-only view of the repository used by the dispatcher.
pub trait RepoState {
    fn actor_role(&self, actor: &str) -> Result<RepoRole>;

    /// Whether `actor` belongs to the organization owning the repository.
    fn is_org_member(&self, actor: &str) -> Result<bool>;

    /// Whether `actor` belongs to `team`, given as `org/team-slug`.
    fn is_team_member(&self, actor: &str, team: &str) -> Result<bool>;

    /// Labels the item carries right now.
    fn current_labels(&self, item: ItemRef) -> Result<Vec<String>>;

    /// Recently completed runs of the compiled document.
    fn recent_runs(&self) -> Result<Vec<RunRecord>>;

    /// An open issue carrying `label`, if any.
    fn open_item_with_label(&self, label: &str) -> Result<Option<u64>>;
}
