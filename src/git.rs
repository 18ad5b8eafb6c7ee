//! Git command runner for fleet.
//!
//! Provides a safe wrapper around git commands with captured stdout/stderr
//! and structured error handling. Pull-request branches are built here.

use crate::error::{FleetError, Result};
use std::path::{Component, Path, PathBuf};
use std::process::{Command, Output};
use tracing::{debug, info};

/// Result of a successful git command execution.
#[derive(Debug, Clone)]
pub struct GitOutput {
    /// Standard output from the command (trimmed).
    pub stdout: String,
    /// Standard error from the command (trimmed).
    pub stderr: String,
}

impl GitOutput {
    fn from_output(output: &Output) -> Self {
        Self {
            stdout: String::from_utf8_lossy(&output.stdout).trim().to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        }
    }

    /// Returns true if stdout is empty.
    pub fn is_empty(&self) -> bool {
        self.stdout.is_empty()
    }
}

/// Run a git command with the specified working directory.
///
/// # Returns
///
/// * `Ok(GitOutput)` - On successful execution (exit code 0)
/// * `Err(FleetError::GitError)` - On non-zero exit code
///
/// # Examples
///
/// ```no_run
/// use fleet::git::run_git;
/// use std::path::Path;
///
/// let output = run_git(Path::new("."), &["status", "--porcelain"])?;
/// println!("Status: {}", output.stdout);
/// # Ok::<(), fleet::error::FleetError>(())
/// ```
pub fn run_git<P: AsRef<Path>>(cwd: P, args: &[&str]) -> Result<GitOutput> {
    let cwd = cwd.as_ref();
    debug!(args = %args.join(" "), "running git");

    let output = Command::new("git")
        .current_dir(cwd)
        .args(args)
        .output()
        .map_err(|e| FleetError::GitError(format!("failed to execute git: {}", e)))?;

    let git_output = GitOutput::from_output(&output);

    if output.status.success() {
        Ok(git_output)
    } else {
        let error_msg = if git_output.stderr.is_empty() {
            format!(
                "git {} failed with exit code {:?}",
                args.join(" "),
                output.status.code()
            )
        } else {
            format!("git {} failed: {}", args.join(" "), git_output.stderr)
        };
        Err(FleetError::GitError(error_msg))
    }
}

/// Get the repository root directory.
///
/// Outside a repository this is a user error (exit 1) rather than a git
/// error.
pub fn get_repo_root<P: AsRef<Path>>(cwd: P) -> Result<PathBuf> {
    let cwd = cwd.as_ref();
    let output = Command::new("git")
        .current_dir(cwd)
        .args(["rev-parse", "--show-toplevel"])
        .output()
        .map_err(|e| {
            FleetError::UserError(format!("failed to execute git: {} (is git installed?)", e))
        })?;

    if !output.status.success() {
        return Err(FleetError::UserError(
            "not inside a git repository. Run this command from within a git repository."
                .to_string(),
        ));
    }

    let root = GitOutput::from_output(&output).stdout;
    Ok(PathBuf::from(root))
}

/// Whether a commit signing key is configured for `cwd`.
pub fn signing_available<P: AsRef<Path>>(cwd: P) -> bool {
    match run_git(cwd, &["config", "--get", "user.signingkey"]) {
        Ok(output) => !output.is_empty(),
        Err(_) => false,
    }
}

/// Whether a local branch named `branch` exists.
pub fn local_branch_exists<P: AsRef<Path>>(cwd: P, branch: &str) -> Result<bool> {
    let cwd = cwd.as_ref();
    let refname = format!("refs/heads/{}", branch);
    let output = Command::new("git")
        .current_dir(cwd)
        .args(["show-ref", "--verify", "--quiet", &refname])
        .output()
        .map_err(|e| FleetError::GitError(format!("failed to execute git: {}", e)))?;
    Ok(output.status.success())
}

/// Delete a local branch if it exists. The current branch cannot be deleted.
pub fn delete_local_branch<P: AsRef<Path>>(cwd: P, branch: &str) -> Result<()> {
    let cwd = cwd.as_ref();
    if !local_branch_exists(cwd, branch)? {
        return Ok(());
    }
    run_git(cwd, &["branch", "-D", branch])?;
    debug!(branch, "deleted local branch");
    Ok(())
}

/// A branch to create from `base` holding one commit with `files`.
#[derive(Debug, Clone)]
pub struct BranchCommit<'a> {
    pub branch: &'a str,
    /// Ref the branch starts from, e.g. `origin/main`.
    pub base: &'a str,
    pub message: &'a str,
    /// Repository-relative paths and their new content.
    pub files: Vec<(&'a str, &'a str)>,
    pub signed: bool,
}

/// Create `commit.branch` from its base, write and commit the files, then
/// return to the branch that was checked out before.
///
/// Returns the new commit's SHA. The caller pushes the branch.
pub fn commit_files_to_branch<P: AsRef<Path>>(cwd: P, commit: &BranchCommit<'_>) -> Result<String> {
    let cwd = cwd.as_ref();
    if commit.signed && !signing_available(cwd) {
        return Err(FleetError::GitError(
            "a signed commit is required but no signing key is configured".to_string(),
        ));
    }

    let mut targets = Vec::with_capacity(commit.files.len());
    for (path, _) in &commit.files {
        targets.push(checked_relative_path(path)?);
    }

    let previous = run_git(cwd, &["rev-parse", "--abbrev-ref", "HEAD"])?.stdout;
    run_git(cwd, &["checkout", "-B", commit.branch, commit.base])?;

    let result = write_and_commit(cwd, commit, &targets);

    // Leave the checkout where it was, even after a failed commit.
    if previous != "HEAD" && previous != commit.branch {
        run_git(cwd, &["checkout", "--force", &previous])?;
    }

    let sha = result?;
    info!(branch = commit.branch, sha = %sha, "committed files to branch");
    Ok(sha)
}

fn write_and_commit(cwd: &Path, commit: &BranchCommit<'_>, targets: &[PathBuf]) -> Result<String> {
    for (target, (_, content)) in targets.iter().zip(&commit.files) {
        let full = cwd.join(target);
        if let Some(parent) = full.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                FleetError::GitError(format!(
                    "failed to create directory '{}': {}",
                    parent.display(),
                    e
                ))
            })?;
        }
        std::fs::write(&full, content).map_err(|e| {
            FleetError::GitError(format!("failed to write '{}': {}", full.display(), e))
        })?;
        let rel = target.to_string_lossy();
        run_git(cwd, &["add", "--", &rel])?;
    }

    let mut args = vec!["commit", "--no-verify", "-m", commit.message];
    if commit.signed {
        args.push("-S");
    } else {
        args.push("--no-gpg-sign");
    }
    run_git(cwd, &args)?;

    Ok(run_git(cwd, &["rev-parse", "HEAD"])?.stdout)
}

/// Reject absolute paths and any `..` component.
fn checked_relative_path(path: &str) -> Result<PathBuf> {
    let candidate = Path::new(path);
    let escapes = candidate
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
    if path.is_empty() || escapes {
        return Err(FleetError::UserError(format!(
            "refusing to write outside the repository: '{}'",
            path
        )));
    }
    Ok(candidate.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{create_test_repo, git};
    use tempfile::TempDir;

    fn draft<'a>(files: Vec<(&'a str, &'a str)>) -> BranchCommit<'a> {
        BranchCommit {
            branch: "fleet/fix-docs",
            base: "main",
            message: "Fix docs",
            files,
            signed: false,
        }
    }

    #[test]
    fn test_run_git_captures_stdout() {
        let temp_dir = create_test_repo();
        let output = run_git(temp_dir.path(), &["rev-parse", "--show-toplevel"]).unwrap();
        assert!(!output.stdout.is_empty());
    }

    #[test]
    fn test_run_git_failure_returns_git_error() {
        let temp_dir = create_test_repo();
        let err = run_git(temp_dir.path(), &["checkout", "nonexistent-branch"]).unwrap_err();
        assert!(matches!(err, FleetError::GitError(_)));
        assert!(err.to_string().contains("git checkout nonexistent-branch failed"));
    }

    #[test]
    fn test_get_repo_root_from_subdirectory() {
        let temp_dir = create_test_repo();
        let subdir = temp_dir.path().join("subdir").join("nested");
        std::fs::create_dir_all(&subdir).unwrap();

        let root = get_repo_root(&subdir).unwrap();
        let expected = temp_dir.path().canonicalize().unwrap();
        assert_eq!(root.canonicalize().unwrap(), expected);
    }

    #[test]
    fn test_get_repo_root_outside_repo_returns_user_error() {
        let temp_dir = TempDir::new().unwrap();
        let err = get_repo_root(temp_dir.path()).unwrap_err();
        assert!(matches!(err, FleetError::UserError(_)));
        assert!(err.to_string().contains("not inside a git repository"));
    }

    #[test]
    fn test_signing_available_with_local_key() {
        let temp_dir = create_test_repo();
        git(temp_dir.path(), &["config", "user.signingkey", "ABCDEF12"]);
        assert!(signing_available(temp_dir.path()));
    }

    #[test]
    fn test_delete_local_branch() {
        let temp_dir = create_test_repo();
        git(temp_dir.path(), &["branch", "stale"]);
        assert!(local_branch_exists(temp_dir.path(), "stale").unwrap());

        delete_local_branch(temp_dir.path(), "stale").unwrap();
        assert!(!local_branch_exists(temp_dir.path(), "stale").unwrap());

        // Missing branch is fine.
        delete_local_branch(temp_dir.path(), "stale").unwrap();
    }

    #[test]
    fn test_commit_files_to_branch() {
        let temp_dir = create_test_repo();
        let path = temp_dir.path();

        let sha = commit_files_to_branch(
            path,
            &draft(vec![("docs/guide.md", "# Guide\n"), ("README.md", "# Fixed\n")]),
        )
        .unwrap();

        assert_eq!(git(path, &["rev-parse", "fleet/fix-docs"]), sha);
        assert_eq!(git(path, &["rev-parse", "--abbrev-ref", "HEAD"]), "main");
        assert_eq!(git(path, &["show", "fleet/fix-docs:docs/guide.md"]), "# Guide");
        assert_eq!(git(path, &["log", "-1", "--format=%s", "fleet/fix-docs"]), "Fix docs");
        // Main is untouched.
        assert_eq!(std::fs::read_to_string(path.join("README.md")).unwrap(), "# Test\n");
    }

    #[test]
    fn test_commit_files_to_branch_replaces_existing_branch() {
        let temp_dir = create_test_repo();
        let path = temp_dir.path();
        commit_files_to_branch(path, &draft(vec![("a.txt", "one\n")])).unwrap();
        commit_files_to_branch(path, &draft(vec![("b.txt", "two\n")])).unwrap();

        let files = git(path, &["ls-tree", "--name-only", "fleet/fix-docs"]);
        assert!(files.contains("b.txt"));
        assert!(!files.contains("a.txt"));
    }

    #[test]
    fn test_commit_files_rejects_escaping_paths() {
        let temp_dir = create_test_repo();
        for bad in ["../outside.txt", "/etc/passwd", "docs/../../x", ""] {
            let err = commit_files_to_branch(temp_dir.path(), &draft(vec![(bad, "x")])).unwrap_err();
            assert!(matches!(err, FleetError::UserError(_)), "{bad}");
        }
        assert!(!local_branch_exists(temp_dir.path(), "fleet/fix-docs").unwrap());
    }

    #[test]
    fn test_git_output_is_empty() {
        let output = GitOutput {
            stdout: String::new(),
            stderr: "warning".to_string(),
        };
        assert!(output.is_empty());
    }
}
