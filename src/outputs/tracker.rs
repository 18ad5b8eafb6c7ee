//! The external work-item tracker, as seen by action-kind handlers.
//!
//! No lock exists on tracker state. Handlers re-read the state right before
//! writing and send only the change, never a whole replacement set.

use crate::error::Result;
use serde::{Deserialize, Serialize};

/// One file written by a proposed pull request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileEdit {
    pub path: String,
    pub content: String,
}

/// Everything needed to push a branch and open a pull request for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequestDraft {
    pub branch: String,
    pub base: String,
    pub title: String,
    pub body: String,
    pub draft: bool,
    pub files: Vec<FileEdit>,
    /// Commit must be signed.
    pub signed: bool,
}

/// Operations on the external tracker used by the apply phase.
pub trait Tracker {
    /// Names of every label defined in the repository.
    fn repository_labels(&self) -> Result<Vec<String>>;

    /// Current labels of an issue or pull request.
    fn item_labels(&self, number: u64) -> Result<Vec<String>>;

    /// Add labels to an issue or pull request, keeping every other label.
    fn add_item_labels(&self, number: u64, labels: &[String]) -> Result<()>;

    /// Remove one label. A label that is already gone is not an error.
    fn remove_item_label(&self, number: u64, label: &str) -> Result<()>;

    /// Post a comment; returns its URL.
    fn add_comment(&self, number: u64, body: &str) -> Result<String>;

    /// Open an issue; returns its number.
    fn create_issue(&self, title: &str, body: &str, labels: &[String]) -> Result<u64>;

    /// Find an open issue with exactly `title` that carries `label`.
    fn find_open_issue(&self, title: &str, label: &str) -> Result<Option<u64>>;

    /// Number of the open pull request whose head is `branch`, if any.
    fn open_pull_request_for_branch(&self, branch: &str) -> Result<Option<u64>>;

    /// Whether `branch` exists on the remote.
    fn branch_exists(&self, branch: &str) -> Result<bool>;

    /// Delete `branch` remotely and any local copy of it.
    fn delete_branch(&self, branch: &str) -> Result<()>;

    /// Commit the draft's files onto a fresh branch from its base and push it.
    fn push_branch(&self, draft: &PullRequestDraft) -> Result<()>;

    /// Open a pull request for an already pushed branch; returns its number.
    fn create_pull_request(&self, draft: &PullRequestDraft) -> Result<u64>;

    /// Replace the body of a discussion.
    fn update_discussion_body(&self, number: u64, body: &str) -> Result<()>;
}
