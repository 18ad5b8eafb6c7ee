//! GitHub access through the `gh` command line client.
//!
//! [`GhClient`] implements both the [`Tracker`] written to by the apply
//! phase and the [`RepoState`] read by the dispatcher. Every call goes
//! through [`run_gh`], so authentication is whatever `gh` is configured
//! with (`GH_TOKEN` in workflow runs).

use crate::dispatch::{RepoRole, RepoState, RunRecord};
use crate::error::{FleetError, Result};
use crate::event::ItemRef;
use crate::git::{self, BranchCommit};
use crate::outputs::{PullRequestDraft, Tracker};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{Value, json};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tracing::{debug, info};

/// How many completed runs the rate limiter looks back over.
const RECENT_RUNS: u32 = 20;

/// Run `gh` with `args`, feeding `stdin` when given.
///
/// # Returns
///
/// * `Ok(String)` - Trimmed stdout on exit code 0
/// * `Err(FleetError::TrackerError)` - On non-zero exit code
pub fn run_gh(args: &[&str], stdin: Option<&str>) -> Result<String> {
    debug!(args = %args.join(" "), "running gh");

    let mut child = Command::new("gh")
        .args(args)
        .stdin(if stdin.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| FleetError::TrackerError(format!("failed to execute gh: {}", e)))?;

    if let (Some(input), Some(mut pipe)) = (stdin, child.stdin.take()) {
        pipe.write_all(input.as_bytes())
            .map_err(|e| FleetError::TrackerError(format!("failed to write to gh: {}", e)))?;
    }

    let output = child
        .wait_with_output()
        .map_err(|e| FleetError::TrackerError(format!("failed to wait for gh: {}", e)))?;

    let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if output.status.success() {
        return Ok(stdout);
    }

    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
    Err(FleetError::TrackerError(format!(
        "gh {} failed: {}",
        args.first().copied().unwrap_or_default(),
        if stderr.is_empty() { stdout } else { stderr }
    )))
}

fn is_not_found(err: &FleetError) -> bool {
    matches!(err, FleetError::TrackerError(msg) if msg.contains("HTTP 404"))
}

fn parse_json<T: for<'de> Deserialize<'de>>(what: &str, raw: &str) -> Result<T> {
    serde_json::from_str(raw)
        .map_err(|e| FleetError::TrackerError(format!("unexpected {} response: {}", what, e)))
}

/// A repository on GitHub plus the local checkout used for branch pushes.
#[derive(Debug, Clone)]
pub struct GhClient {
    /// `owner/name`.
    repo: String,
    workdir: PathBuf,
    /// File name of the compiled workflow, for run history.
    workflow_file: String,
}

impl GhClient {
    pub fn new(
        repo: impl Into<String>,
        workdir: impl Into<PathBuf>,
        workflow_file: impl Into<String>,
    ) -> Result<Self> {
        let repo = repo.into();
        if !repo.contains('/') {
            return Err(FleetError::UserError(format!(
                "repository must be given as owner/name, got '{}'",
                repo
            )));
        }
        Ok(Self {
            repo,
            workdir: workdir.into(),
            workflow_file: workflow_file.into(),
        })
    }

    pub fn repo(&self) -> &str {
        &self.repo
    }

    fn owner(&self) -> &str {
        self.repo.split('/').next().unwrap_or_default()
    }

    fn name(&self) -> &str {
        self.repo.split('/').nth(1).unwrap_or_default()
    }

    fn workdir(&self) -> &Path {
        &self.workdir
    }

    fn get(&self, endpoint: &str) -> Result<String> {
        run_gh(&["api", &format!("repos/{}/{}", self.repo, endpoint)], None)
    }

    fn send(&self, method: &str, endpoint: &str, body: &Value) -> Result<String> {
        let path = format!("repos/{}/{}", self.repo, endpoint);
        run_gh(
            &["api", "--method", method, &path, "--input", "-"],
            Some(&body.to_string()),
        )
    }

    fn open_issues_with_label(&self, label: &str) -> Result<Vec<IssueSummary>> {
        let path = format!("repos/{}/issues", self.repo);
        let label_field = format!("labels={}", label);
        let raw = run_gh(
            &[
                "api", "--method", "GET", &path, "-f", "state=open", "-f", &label_field, "-f",
                "per_page=100",
            ],
            None,
        )?;
        parse_json("issue list", &raw)
    }
}

#[derive(Debug, Deserialize)]
struct NamedLabel {
    name: String,
}

#[derive(Debug, Deserialize)]
struct IssueSummary {
    number: u64,
    title: String,
    #[serde(default)]
    pull_request: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct Created {
    number: u64,
}

#[derive(Debug, Deserialize)]
struct CreatedComment {
    html_url: String,
}

#[derive(Debug, Deserialize)]
struct Permission {
    #[serde(default)]
    role_name: Option<String>,
    permission: String,
}

#[derive(Debug, Deserialize)]
struct TeamMembership {
    state: String,
}

#[derive(Debug, Deserialize)]
struct WorkflowRuns {
    workflow_runs: Vec<WorkflowRun>,
}

#[derive(Debug, Deserialize)]
struct WorkflowRun {
    updated_at: DateTime<Utc>,
    #[serde(default)]
    conclusion: Option<String>,
}

/// Percent-encode everything outside the unreserved URL characters.
fn encode_path_segment(segment: &str) -> String {
    let mut out = String::with_capacity(segment.len());
    for byte in segment.bytes() {
        if byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'_' | b'.' | b'~') {
            out.push(byte as char);
        } else {
            out.push_str(&format!("%{:02X}", byte));
        }
    }
    out
}

fn label_names(raw: &str) -> Result<Vec<String>> {
    let labels: Vec<NamedLabel> = parse_json("label list", raw)?;
    Ok(labels.into_iter().map(|l| l.name).collect())
}

/// Issues (never pull requests) with exactly `title`.
fn first_issue_titled(issues: &[IssueSummary], title: &str) -> Option<u64> {
    issues
        .iter()
        .find(|i| i.pull_request.is_none() && i.title == title)
        .map(|i| i.number)
}

fn role_from_permission(raw: &str) -> Result<RepoRole> {
    let permission: Permission = parse_json("permission", raw)?;
    let name = permission.role_name.unwrap_or(permission.permission);
    Ok(RepoRole::from_str(&name))
}

fn runs_from_response(raw: &str) -> Result<Vec<RunRecord>> {
    let runs: WorkflowRuns = parse_json("workflow run list", raw)?;
    Ok(runs
        .workflow_runs
        .into_iter()
        .map(|r| RunRecord {
            completed_at: r.updated_at,
            succeeded: r.conclusion.as_deref() == Some("success"),
        })
        .collect())
}

impl Tracker for GhClient {
    fn repository_labels(&self) -> Result<Vec<String>> {
        let path = format!("repos/{}/labels?per_page=100", self.repo);
        let raw = run_gh(&["api", "--paginate", "--slurp", &path], None)?;
        let pages: Vec<Vec<NamedLabel>> = parse_json("label list", &raw)?;
        Ok(pages.into_iter().flatten().map(|l| l.name).collect())
    }

    fn item_labels(&self, number: u64) -> Result<Vec<String>> {
        label_names(&self.get(&format!("issues/{}/labels", number))?)
    }

    fn add_item_labels(&self, number: u64, labels: &[String]) -> Result<()> {
        self.send(
            "POST",
            &format!("issues/{}/labels", number),
            &json!({ "labels": labels }),
        )?;
        Ok(())
    }

    fn remove_item_label(&self, number: u64, label: &str) -> Result<()> {
        let path = format!(
            "repos/{}/issues/{}/labels/{}",
            self.repo,
            number,
            encode_path_segment(label)
        );
        match run_gh(&["api", "--method", "DELETE", &path], None) {
            Ok(_) => Ok(()),
            Err(e) if is_not_found(&e) => Ok(()),
            Err(e) => Err(e),
        }
    }

    fn add_comment(&self, number: u64, body: &str) -> Result<String> {
        let raw = self.send(
            "POST",
            &format!("issues/{}/comments", number),
            &json!({ "body": body }),
        )?;
        let comment: CreatedComment = parse_json("comment", &raw)?;
        Ok(comment.html_url)
    }

    fn create_issue(&self, title: &str, body: &str, labels: &[String]) -> Result<u64> {
        let raw = self.send(
            "POST",
            "issues",
            &json!({ "title": title, "body": body, "labels": labels }),
        )?;
        let created: Created = parse_json("issue", &raw)?;
        info!(number = created.number, "created issue");
        Ok(created.number)
    }

    fn find_open_issue(&self, title: &str, label: &str) -> Result<Option<u64>> {
        let issues = self.open_issues_with_label(label)?;
        Ok(first_issue_titled(&issues, title))
    }

    fn open_pull_request_for_branch(&self, branch: &str) -> Result<Option<u64>> {
        let path = format!("repos/{}/pulls", self.repo);
        let head = format!("head={}:{}", self.owner(), branch);
        let raw = run_gh(
            &["api", "--method", "GET", &path, "-f", "state=open", "-f", &head],
            None,
        )?;
        let pulls: Vec<Created> = parse_json("pull request list", &raw)?;
        Ok(pulls.first().map(|p| p.number))
    }

    fn branch_exists(&self, branch: &str) -> Result<bool> {
        let output = git::run_git(self.workdir(), &["ls-remote", "--heads", "origin", branch])?;
        Ok(!output.is_empty())
    }

    fn delete_branch(&self, branch: &str) -> Result<()> {
        if self.branch_exists(branch)? {
            git::run_git(self.workdir(), &["push", "origin", "--delete", branch])?;
            info!(branch, "deleted remote branch");
        }
        git::delete_local_branch(self.workdir(), branch)
    }

    fn push_branch(&self, draft: &PullRequestDraft) -> Result<()> {
        git::run_git(self.workdir(), &["fetch", "origin", &draft.base])?;
        let base = format!("origin/{}", draft.base);
        let commit = BranchCommit {
            branch: &draft.branch,
            base: &base,
            message: &draft.title,
            files: draft
                .files
                .iter()
                .map(|f| (f.path.as_str(), f.content.as_str()))
                .collect(),
            signed: draft.signed,
        };
        git::commit_files_to_branch(self.workdir(), &commit)?;
        git::run_git(self.workdir(), &["push", "origin", &draft.branch])?;
        Ok(())
    }

    fn create_pull_request(&self, draft: &PullRequestDraft) -> Result<u64> {
        let raw = self.send(
            "POST",
            "pulls",
            &json!({
                "title": draft.title,
                "body": draft.body,
                "head": draft.branch,
                "base": draft.base,
                "draft": draft.draft,
            }),
        )?;
        let created: Created = parse_json("pull request", &raw)?;
        info!(number = created.number, branch = %draft.branch, "created pull request");
        Ok(created.number)
    }

    fn update_discussion_body(&self, number: u64, body: &str) -> Result<()> {
        const LOOKUP: &str = "query($owner: String!, $name: String!, $number: Int!) { \
             repository(owner: $owner, name: $name) { discussion(number: $number) { id } } }";
        const UPDATE: &str = "mutation($id: ID!, $body: String!) { \
             updateDiscussion(input: {discussionId: $id, body: $body}) { discussion { id } } }";

        let raw = run_gh(
            &[
                "api",
                "graphql",
                "-f",
                &format!("query={}", LOOKUP),
                "-f",
                &format!("owner={}", self.owner()),
                "-f",
                &format!("name={}", self.name()),
                "-F",
                &format!("number={}", number),
                "--jq",
                ".data.repository.discussion.id",
            ],
            None,
        )?;
        if raw.is_empty() || raw == "null" {
            return Err(FleetError::TrackerError(format!(
                "discussion #{} not found",
                number
            )));
        }

        run_gh(
            &[
                "api",
                "graphql",
                "-f",
                &format!("query={}", UPDATE),
                "-f",
                &format!("id={}", raw),
                "-f",
                &format!("body={}", body),
            ],
            None,
        )?;
        Ok(())
    }
}

impl RepoState for GhClient {
    fn actor_role(&self, actor: &str) -> Result<RepoRole> {
        match self.get(&format!("collaborators/{}/permission", actor)) {
            Ok(raw) => role_from_permission(&raw),
            Err(e) if is_not_found(&e) => Ok(RepoRole::None),
            Err(e) => Err(e),
        }
    }

    fn is_org_member(&self, actor: &str) -> Result<bool> {
        let path = format!("orgs/{}/members/{}", self.owner(), actor);
        match run_gh(&["api", &path], None) {
            Ok(_) => Ok(true),
            Err(e) if is_not_found(&e) => Ok(false),
            Err(e) => Err(e),
        }
    }

    fn is_team_member(&self, actor: &str, team: &str) -> Result<bool> {
        let Some((org, slug)) = team.split_once('/') else {
            return Err(FleetError::UserError(format!(
                "team must be given as org/team-slug, got '{}'",
                team
            )));
        };
        let path = format!("orgs/{}/teams/{}/memberships/{}", org, slug, actor);
        match run_gh(&["api", &path], None) {
            Ok(raw) => {
                let membership: TeamMembership = parse_json("team membership", &raw)?;
                Ok(membership.state == "active")
            }
            Err(e) if is_not_found(&e) => Ok(false),
            Err(e) => Err(e),
        }
    }

    fn current_labels(&self, item: ItemRef) -> Result<Vec<String>> {
        self.item_labels(item.number)
    }

    fn recent_runs(&self) -> Result<Vec<RunRecord>> {
        let raw = self.get(&format!(
            "actions/workflows/{}/runs?status=completed&per_page={}",
            self.workflow_file, RECENT_RUNS
        ))?;
        runs_from_response(&raw)
    }

    fn open_item_with_label(&self, label: &str) -> Result<Option<u64>> {
        Ok(self
            .open_issues_with_label(label)?
            .iter()
            .find(|i| i.pull_request.is_none())
            .map(|i| i.number))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repository_must_be_owner_and_name() {
        assert!(GhClient::new("widgets", ".", "fleet.yml").is_err());
        let client = GhClient::new("acme/widgets", ".", "fleet.yml").unwrap();
        assert_eq!(client.owner(), "acme");
        assert_eq!(client.name(), "widgets");
    }

    #[test]
    fn label_names_are_encoded_for_paths() {
        assert_eq!(encode_path_segment("bug"), "bug");
        assert_eq!(encode_path_segment("good first issue"), "good%20first%20issue");
        assert_eq!(encode_path_segment("agent-followup:docs"), "agent-followup%3Adocs");
        assert_eq!(encode_path_segment("area/ci"), "area%2Fci");
        assert_eq!(encode_path_segment("é"), "%C3%A9");
    }

    #[test]
    fn role_prefers_role_name() {
        let raw = r#"{"permission": "write", "role_name": "maintain"}"#;
        assert_eq!(role_from_permission(raw).unwrap(), RepoRole::Maintain);

        let raw = r#"{"permission": "read"}"#;
        assert_eq!(role_from_permission(raw).unwrap(), RepoRole::Read);
    }

    #[test]
    fn runs_keep_completion_time_and_conclusion() {
        let raw = r#"{"total_count": 2, "workflow_runs": [
            {"id": 1, "updated_at": "2026-03-01T10:00:00Z", "conclusion": "success"},
            {"id": 2, "updated_at": "2026-03-01T09:00:00Z", "conclusion": "failure"}
        ]}"#;
        let runs = runs_from_response(raw).unwrap();
        assert_eq!(runs.len(), 2);
        assert!(runs[0].succeeded);
        assert!(!runs[1].succeeded);
        assert_eq!(runs[1].completed_at.to_rfc3339(), "2026-03-01T09:00:00+00:00");
    }

    #[test]
    fn issue_lookup_ignores_pull_requests() {
        let raw = r#"[
            {"number": 4, "title": "Agent triage failed", "pull_request": {"url": "x"}},
            {"number": 9, "title": "Agent triage failed"},
            {"number": 10, "title": "Other"}
        ]"#;
        let issues: Vec<IssueSummary> = parse_json("issue list", raw).unwrap();
        assert_eq!(first_issue_titled(&issues, "Agent triage failed"), Some(9));
        assert_eq!(first_issue_titled(&issues, "Missing"), None);
    }

    #[test]
    fn not_found_is_recognized() {
        let err = FleetError::TrackerError("gh api failed: gh: Not Found (HTTP 404)".to_string());
        assert!(is_not_found(&err));
        assert!(!is_not_found(&FleetError::TrackerError("HTTP 502".to_string())));
    }

    #[test]
    fn malformed_response_is_tracker_error() {
        let err = label_names("not json").unwrap_err();
        assert!(matches!(err, FleetError::TrackerError(_)));
        assert_eq!(label_names(r#"[{"name": "bug"}]"#).unwrap(), vec!["bug"]);
    }
}
