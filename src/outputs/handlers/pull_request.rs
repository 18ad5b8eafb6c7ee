//! `create_pull_request`: push a branch with file edits and open a PR.
//!
//! Creation is idempotent across re-runs: an open PR for the branch means
//! nothing is created, and a leftover branch from a failed attempt is
//! deleted before the branch is pushed again.

use crate::error::Result;
use crate::outputs::config::PullRequestConfig;
use crate::outputs::footer::with_footer;
use crate::outputs::instance::OutputKind;
use crate::outputs::paths::PathAllowList;
use crate::outputs::protocol::{ExecutionOutcome, OutputHandler, RunContext};
use crate::outputs::tracker::{FileEdit, PullRequestDraft, Tracker};
use regex::Regex;
use serde::Deserialize;
use std::sync::LazyLock;
use tracing::info;

static BRANCH_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9][A-Za-z0-9._/-]*$").expect("branch name regex is valid")
});

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PullRequestPayload {
    pub title: String,
    pub body: String,
    pub branch: String,
    pub files: Vec<FileEdit>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PullRequestHandler;

/// Why `branch` is not a usable branch name, if it is not.
fn branch_name_problem(branch: &str) -> Option<String> {
    if !BRANCH_NAME.is_match(branch)
        || branch.contains("..")
        || branch.contains("//")
        || branch.ends_with('/')
        || branch.ends_with(".lock")
    {
        Some(format!("branch name '{}' is not a valid git ref", branch))
    } else {
        None
    }
}

impl PullRequestHandler {
    fn draft(
        config: &PullRequestConfig,
        run: &RunContext,
        payload: &PullRequestPayload,
    ) -> PullRequestDraft {
        PullRequestDraft {
            branch: payload.branch.clone(),
            base: config.base_branch.clone(),
            title: payload.title.trim().to_string(),
            body: with_footer(&payload.body, run),
            draft: config.draft,
            files: payload.files.clone(),
            signed: config.signed_commits,
        }
    }
}

impl OutputHandler for PullRequestHandler {
    type Config = PullRequestConfig;
    type Payload = PullRequestPayload;

    const KIND: OutputKind = OutputKind::CreatePullRequest;

    fn max_instances(config: &PullRequestConfig) -> u32 {
        config.max
    }

    fn describe(&self, config: &PullRequestConfig) -> String {
        let paths = if config.allowed_paths.is_empty() {
            "any repository path".to_string()
        } else {
            config.allowed_paths.join(", ")
        };
        format!(
            "### create_pull_request\n\
             Push a branch with file changes and open a {}pull request against `{}`.\n\
             Fields: `title` (string, required), `body` (string, required), `branch` (string, required), \
             `files` (array of {{`path`, `content`}}, required).\n\
             Allowed paths: {}.\n\
             Signed commits required: {}.\n\
             Limit: at most {} per run.",
            if config.draft { "draft " } else { "" },
            config.base_branch,
            paths,
            if config.signed_commits { "yes" } else { "no" },
            config.max
        )
    }

    fn check(
        &self,
        config: &PullRequestConfig,
        run: &RunContext,
        _tracker: &dyn Tracker,
        payload: &PullRequestPayload,
    ) -> Result<Vec<String>> {
        let mut reasons = Vec::new();

        if payload.title.trim().is_empty() {
            reasons.push("`title` must not be empty".to_string());
        }
        if payload.body.trim().is_empty() {
            reasons.push("`body` must not be empty".to_string());
        }
        if payload.branch.trim().is_empty() {
            reasons.push("`branch` must not be empty".to_string());
        } else if let Some(problem) = branch_name_problem(&payload.branch) {
            reasons.push(problem);
        } else if payload.branch == config.base_branch {
            reasons.push(format!("branch '{}' is the base branch", payload.branch));
        }

        if payload.files.is_empty() {
            reasons.push("`files` must contain at least one file".to_string());
        }
        match PathAllowList::new(&config.allowed_paths) {
            Ok(allow) => {
                for file in &payload.files {
                    if let Some(problem) = allow.check(&file.path) {
                        reasons.push(problem);
                    }
                }
            }
            Err(e) => reasons.push(e.to_string()),
        }

        if config.signed_commits && !run.can_sign {
            reasons.push(
                "signed commits are required but this environment cannot sign commits".to_string(),
            );
        }

        Ok(reasons)
    }

    fn apply(
        &self,
        config: &PullRequestConfig,
        run: &RunContext,
        tracker: &dyn Tracker,
        payload: &PullRequestPayload,
    ) -> Result<ExecutionOutcome> {
        if let Some(existing) = tracker.open_pull_request_for_branch(&payload.branch)? {
            return Ok(ExecutionOutcome::Skipped {
                reason: format!(
                    "already exists: pull request #{} is open for branch '{}'",
                    existing, payload.branch
                ),
            });
        }

        if tracker.branch_exists(&payload.branch)? {
            info!(branch = %payload.branch, "deleting stale branch from a previous attempt");
            tracker.delete_branch(&payload.branch)?;
        }

        let draft = Self::draft(config, run, payload);
        tracker.push_branch(&draft)?;
        let number = tracker.create_pull_request(&draft)?;
        Ok(ExecutionOutcome::Applied {
            detail: format!("opened pull request #{} from '{}'", number, draft.branch),
        })
    }
}
