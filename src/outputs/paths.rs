//! Path allow-lists for file edits proposed by agents.

use crate::error::{FleetError, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};

/// Compiled set of globs a changed file must match.
///
/// An empty pattern list allows any safe relative path.
#[derive(Debug, Clone)]
pub struct PathAllowList {
    patterns: Vec<String>,
    globs: GlobSet,
}

impl PathAllowList {
    pub fn new(patterns: &[String]) -> Result<Self> {
        let mut builder = GlobSetBuilder::new();

        for pattern in patterns {
            let glob = Glob::new(&normalize_path(pattern)).map_err(|e| {
                FleetError::UserError(format!(
                    "invalid glob pattern in allowed_paths: '{}' - {}",
                    pattern, e
                ))
            })?;
            builder.add(glob);
        }

        let globs = builder.build().map_err(|e| {
            FleetError::UserError(format!("failed to compile allowed_paths globs: {}", e))
        })?;

        Ok(Self {
            patterns: patterns.to_vec(),
            globs,
        })
    }

    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    /// Check one path, returning the violation reason if it is not allowed.
    pub fn check(&self, path: &str) -> Option<String> {
        let normalized = normalize_path(path);

        if normalized.is_empty() {
            return Some("empty file path".to_string());
        }
        if normalized.starts_with('/') {
            return Some(format!("path '{}' must be repository-relative", path));
        }
        if normalized.split('/').any(|c| c == "..") {
            return Some(format!("path '{}' escapes the repository", path));
        }
        if normalized == ".git" || normalized.starts_with(".git/") {
            return Some(format!("path '{}' is inside .git", path));
        }

        if self.patterns.is_empty() || self.globs.is_match(&normalized) {
            None
        } else {
            Some(format!(
                "path '{}' is outside the allowed paths ({})",
                path,
                self.patterns.join(", ")
            ))
        }
    }
}

/// Normalize a file path to use forward slashes and no leading `./`.
fn normalize_path(path: &str) -> String {
    let path = path.replace('\\', "/");
    path.strip_prefix("./").unwrap_or(&path).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn allow(patterns: &[&str]) -> PathAllowList {
        let patterns: Vec<String> = patterns.iter().map(|p| p.to_string()).collect();
        PathAllowList::new(&patterns).unwrap()
    }

    #[test]
    fn empty_list_allows_relative_paths() {
        let list = allow(&[]);
        assert_eq!(list.check("src/lib.rs"), None);
        assert_eq!(list.check("./README.md"), None);
    }

    #[test]
    fn glob_match_required_when_configured() {
        let list = allow(&["docs/**", "*.md"]);
        assert_eq!(list.check("docs/guide/intro.md"), None);
        assert_eq!(list.check("CHANGELOG.md"), None);

        let reason = list.check("src/main.rs").unwrap();
        assert!(reason.contains("outside the allowed paths (docs/**, *.md)"));
    }

    #[test]
    fn backslashes_are_normalized() {
        let list = allow(&["docs/**"]);
        assert_eq!(list.check("docs\\a.md"), None);
    }

    #[test]
    fn unsafe_paths_rejected_even_without_patterns() {
        let list = allow(&[]);
        assert!(list.check("/etc/passwd").unwrap().contains("repository-relative"));
        assert!(list.check("docs/../../x").unwrap().contains("escapes"));
        assert!(list.check(".git/config").unwrap().contains(".git"));
        assert!(list.check("").is_some());
    }

    #[test]
    fn invalid_glob_is_user_error() {
        let err = PathAllowList::new(&["docs/[".to_string()]).unwrap_err();
        assert!(err.to_string().contains("invalid glob pattern in allowed_paths"));
    }
}
