use crate::agent::AgentSpec;
use crate::dispatch::{RepoRole, RepoState, RunRecord};
use crate::error::{FleetError, Result};
use crate::event::{EventType, InboundEvent, ItemKind, ItemRef};
use crate::outputs::{PullRequestDraft, RunContext, Tracker};
use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::process::Command;
use tempfile::TempDir;

pub(crate) fn agent(name: &str) -> AgentSpec {
    AgentSpec::new(name)
}

pub(crate) fn run_context(agent: &str) -> RunContext {
    RunContext {
        agent: agent.to_string(),
        run_id: "123".to_string(),
        run_url: "https://github.com/acme/widgets/actions/runs/123".to_string(),
        item: Some(ItemRef {
            kind: ItemKind::Issue,
            number: 1,
        }),
        can_sign: false,
        companion_label: None,
    }
}

pub(crate) fn issue_event(action: &str, number: u64, actor: &str) -> InboundEvent {
    InboundEvent {
        event_type: EventType::Issues,
        action: Some(action.to_string()),
        item: Some(ItemRef {
            kind: ItemKind::Issue,
            number,
        }),
        actor: actor.to_string(),
        item_labels: Vec::new(),
        schedule: None,
        requested_agent: None,
        run_id: "900".to_string(),
    }
}

pub(crate) fn schedule_event(cron: &str, run_id: &str) -> InboundEvent {
    InboundEvent {
        event_type: EventType::Schedule,
        action: None,
        item: None,
        actor: "github-actions[bot]".to_string(),
        item_labels: Vec::new(),
        schedule: Some(cron.to_string()),
        requested_agent: None,
        run_id: run_id.to_string(),
    }
}

/// In-memory tracker recording every write.
#[derive(Default)]
pub(crate) struct FakeTracker {
    repo_labels: Vec<String>,
    item_labels: RefCell<BTreeMap<u64, Vec<String>>>,
    open_prs: BTreeMap<String, u64>,
    branches: RefCell<BTreeSet<String>>,
    open_issues: RefCell<Vec<(u64, String, Vec<String>)>>,
    /// Label someone else adds right after the next label read.
    added_after_read: RefCell<Option<(u64, String)>>,
    /// (operation, 1-based call number) pairs that fail.
    failures: Vec<(&'static str, usize)>,
    counts: RefCell<BTreeMap<&'static str, usize>>,
    calls: RefCell<Vec<String>>,
}

impl FakeTracker {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_repo_labels(mut self, labels: &[&str]) -> Self {
        self.repo_labels = labels.iter().map(|l| l.to_string()).collect();
        self
    }

    pub(crate) fn with_item_labels(self, number: u64, labels: &[&str]) -> Self {
        self.item_labels
            .borrow_mut()
            .insert(number, labels.iter().map(|l| l.to_string()).collect());
        self
    }

    pub(crate) fn with_open_pr(mut self, branch: &str, number: u64) -> Self {
        self.open_prs.insert(branch.to_string(), number);
        self
    }

    pub(crate) fn with_branch(self, branch: &str) -> Self {
        self.branches.borrow_mut().insert(branch.to_string());
        self
    }

    pub(crate) fn with_open_issue(self, number: u64, title: &str, labels: &[&str]) -> Self {
        self.open_issues.borrow_mut().push((
            number,
            title.to_string(),
            labels.iter().map(|l| l.to_string()).collect(),
        ));
        self
    }

    /// Add `label` to `number` behind the reader's back after the next read.
    pub(crate) fn adding_after_read(self, number: u64, label: &str) -> Self {
        *self.added_after_read.borrow_mut() = Some((number, label.to_string()));
        self
    }

    /// Make the `nth` call (1-based) of `op` fail.
    pub(crate) fn failing(mut self, op: &'static str, nth: usize) -> Self {
        self.failures.push((op, nth));
        self
    }

    /// Every write, in order, e.g. `add_comment #1`.
    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    pub(crate) fn labels_of(&self, number: u64) -> Vec<String> {
        self.item_labels
            .borrow()
            .get(&number)
            .cloned()
            .unwrap_or_default()
    }

    pub(crate) fn has_branch(&self, branch: &str) -> bool {
        self.branches.borrow().contains(branch)
    }

    fn record(&self, op: &'static str, detail: String) -> Result<()> {
        let mut counts = self.counts.borrow_mut();
        let count = counts.entry(op).or_insert(0);
        *count += 1;
        if self.failures.contains(&(op, *count)) {
            return Err(FleetError::TrackerError(format!("{} failed", op)));
        }
        self.calls.borrow_mut().push(format!("{} {}", op, detail));
        Ok(())
    }
}

impl Tracker for FakeTracker {
    fn repository_labels(&self) -> Result<Vec<String>> {
        Ok(self.repo_labels.clone())
    }

    fn item_labels(&self, number: u64) -> Result<Vec<String>> {
        let seen = self.labels_of(number);
        if let Some((target, label)) = self.added_after_read.borrow_mut().take() {
            self.item_labels
                .borrow_mut()
                .entry(target)
                .or_default()
                .push(label);
        }
        Ok(seen)
    }

    fn add_item_labels(&self, number: u64, labels: &[String]) -> Result<()> {
        self.record("add_item_labels", format!("#{} [{}]", number, labels.join(",")))?;
        let mut items = self.item_labels.borrow_mut();
        let current = items.entry(number).or_default();
        for label in labels {
            if !current.contains(label) {
                current.push(label.clone());
            }
        }
        Ok(())
    }

    fn remove_item_label(&self, number: u64, label: &str) -> Result<()> {
        self.record("remove_item_label", format!("#{} {}", number, label))?;
        if let Some(current) = self.item_labels.borrow_mut().get_mut(&number) {
            current.retain(|l| l != label);
        }
        Ok(())
    }

    fn add_comment(&self, number: u64, _body: &str) -> Result<String> {
        self.record("add_comment", format!("#{}", number))?;
        Ok(format!("https://github.com/acme/widgets/issues/{}#issuecomment-1", number))
    }

    fn create_issue(&self, title: &str, _body: &str, labels: &[String]) -> Result<u64> {
        self.record("create_issue", format!("{} [{}]", title, labels.join(",")))?;
        let mut issues = self.open_issues.borrow_mut();
        let number = 100 + issues.len() as u64;
        issues.push((number, title.to_string(), labels.to_vec()));
        Ok(number)
    }

    fn find_open_issue(&self, title: &str, label: &str) -> Result<Option<u64>> {
        Ok(self
            .open_issues
            .borrow()
            .iter()
            .find(|(_, t, labels)| t == title && labels.iter().any(|l| l == label))
            .map(|(n, _, _)| *n))
    }

    fn open_pull_request_for_branch(&self, branch: &str) -> Result<Option<u64>> {
        Ok(self.open_prs.get(branch).copied())
    }

    fn branch_exists(&self, branch: &str) -> Result<bool> {
        Ok(self.has_branch(branch))
    }

    fn delete_branch(&self, branch: &str) -> Result<()> {
        self.record("delete_branch", branch.to_string())?;
        self.branches.borrow_mut().remove(branch);
        Ok(())
    }

    fn push_branch(&self, draft: &PullRequestDraft) -> Result<()> {
        self.record("push_branch", draft.branch.clone())?;
        self.branches.borrow_mut().insert(draft.branch.clone());
        Ok(())
    }

    fn create_pull_request(&self, draft: &PullRequestDraft) -> Result<u64> {
        self.record("create_pull_request", draft.branch.clone())?;
        Ok(77)
    }

    fn update_discussion_body(&self, number: u64, _body: &str) -> Result<()> {
        self.record("update_discussion_body", format!("#{}", number))
    }
}

/// In-memory repository state with a lookup log.
#[derive(Default)]
pub(crate) struct FakeRepoState {
    pub(crate) roles: BTreeMap<String, RepoRole>,
    pub(crate) org_members: BTreeSet<String>,
    pub(crate) teams: BTreeMap<String, BTreeSet<String>>,
    pub(crate) labels: BTreeMap<u64, Vec<String>>,
    pub(crate) runs: Vec<RunRecord>,
    pub(crate) open_by_label: BTreeMap<String, u64>,
    pub(crate) broken: bool,
    /// Lookups that fail even when the state is not `broken`.
    pub(crate) failing: BTreeSet<String>,
    lookups: RefCell<Vec<String>>,
}

impl FakeRepoState {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_role(mut self, actor: &str, role: RepoRole) -> Self {
        self.roles.insert(actor.to_string(), role);
        self
    }

    pub(crate) fn lookups(&self) -> Vec<String> {
        self.lookups.borrow().clone()
    }

    fn lookup(&self, what: String) -> Result<()> {
        let fails = self.broken || self.failing.contains(&what);
        self.lookups.borrow_mut().push(what);
        if fails {
            return Err(FleetError::TrackerError("state lookup failed".to_string()));
        }
        Ok(())
    }
}

impl RepoState for FakeRepoState {
    fn actor_role(&self, actor: &str) -> Result<RepoRole> {
        self.lookup(format!("role {}", actor))?;
        Ok(self.roles.get(actor).copied().unwrap_or(RepoRole::None))
    }

    fn is_org_member(&self, actor: &str) -> Result<bool> {
        self.lookup(format!("org {}", actor))?;
        Ok(self.org_members.contains(actor))
    }

    fn is_team_member(&self, actor: &str, team: &str) -> Result<bool> {
        self.lookup(format!("team {} {}", team, actor))?;
        Ok(self.teams.get(team).is_some_and(|m| m.contains(actor)))
    }

    fn current_labels(&self, item: ItemRef) -> Result<Vec<String>> {
        self.lookup(format!("labels #{}", item.number))?;
        Ok(self.labels.get(&item.number).cloned().unwrap_or_default())
    }

    fn recent_runs(&self) -> Result<Vec<RunRecord>> {
        self.lookup("runs".to_string())?;
        Ok(self.runs.clone())
    }

    fn open_item_with_label(&self, label: &str) -> Result<Option<u64>> {
        self.lookup(format!("open {}", label))?;
        Ok(self.open_by_label.get(label).copied())
    }
}

/// A git repository with one commit on `main`.
pub(crate) fn create_test_repo() -> TempDir {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path();

    git(path, &["init"]);
    git(path, &["symbolic-ref", "HEAD", "refs/heads/main"]);
    git(path, &["config", "user.email", "test@example.com"]);
    git(path, &["config", "user.name", "Test User"]);
    git(path, &["config", "commit.gpgsign", "false"]);

    std::fs::write(path.join("README.md"), "# Test\n").unwrap();
    git(path, &["add", "."]);
    git(path, &["commit", "-m", "Initial commit"]);

    temp_dir
}

pub(crate) fn git(repo_dir: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .current_dir(repo_dir)
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("failed to execute git {}: {}", args.join(" "), e));

    if !output.status.success() {
        panic!(
            "git {} failed (exit code {:?})\nstdout:\n{}\nstderr:\n{}",
            args.join(" "),
            output.status.code(),
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        );
    }
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}
