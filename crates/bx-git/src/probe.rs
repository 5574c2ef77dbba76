use std::{
    path::Path,
    process::{Command, Output},
};

use thiserror::Error;
use tracing::debug;

use crate::diff::{parse_name_status, GitDiff};
use crate::DEFAULT_BASE_BRANCH_CANDIDATES;

#[derive(Debug, Error)]
#[error("git {command} failed: {stderr}")]
pub struct GitError {
    pub command: String,
    pub stderr: String,
    #[source]
    pub cause: Option<std::io::Error>,
}

impl GitError {
    fn command_failed(command: String, stderr: String) -> Self {
        Self {
            command,
            stderr,
            cause: None,
        }
    }

    fn spawn_failed(command: String, cause: std::io::Error) -> Self {
        Self {
            command,
            stderr: String::new(),
            cause: Some(cause),
        }
    }
}

/// Git context discovery. Every method shells out to `git -C <workspace>`.
#[derive(Debug, Clone, Default)]
pub struct GitProbe;

impl GitProbe {
    pub fn new() -> Self {
        Self
    }

    pub fn current_branch(&self, workspace: &Path) -> Result<String, GitError> {
        Ok(self
            .git(workspace, ["rev-parse", "--abbrev-ref", "HEAD"])?
            .trim()
            .to_string())
    }

    pub fn current_commit(&self, workspace: &Path) -> Result<String, GitError> {
        Ok(self.git(workspace, ["rev-parse", "HEAD"])?.trim().to_string())
    }

    pub fn remote_url(&self, workspace: &Path) -> Result<Option<String>, GitError> {
        match self.git(workspace, ["remote", "get-url", "origin"]) {
            Ok(out) => Ok(Some(out.trim().to_string())),
            Err(_) => Ok(None),
        }
    }

    pub fn is_repo(&self, workspace: &Path) -> bool {
        self.git(workspace, ["rev-parse", "--is-inside-work-tree"])
            .map(|out| out.trim() == "true")
            .unwrap_or(false)
    }

    pub fn has_uncommitted(&self, workspace: &Path) -> Result<bool, GitError> {
        Ok(!self.git(workspace, ["status", "--porcelain"])?.trim().is_empty())
    }

    /// `git ls-files`, one path per line, trimmed, empties dropped.
    /// Accepts arbitrarily large output since we read the full subprocess
    /// stdout buffer rather than streaming line-by-line.
    pub fn tracked_files(&self, workspace: &Path) -> Result<Vec<String>, GitError> {
        let out = self.git(workspace, ["ls-files"])?;
        Ok(out
            .lines()
            .map(|l| l.trim())
            .filter(|l| !l.is_empty())
            .map(|l| l.to_string())
            .collect())
    }

    /// Parse `refs/remotes/origin/HEAD`; retry once via `git remote set-head
    /// origin --auto` if the symbolic ref is missing. Returns `None`
    /// ("absent" in spec terms) if it cannot be determined.
    pub fn default_branch_from_remote(&self, workspace: &Path) -> Option<String> {
        if let Some(name) = self.read_origin_head(workspace) {
            return Some(name);
        }
        if self
            .git(workspace, ["remote", "set-head", "origin", "--auto"])
            .is_ok()
        {
            if let Some(name) = self.read_origin_head(workspace) {
                return Some(name);
            }
        }
        debug!("default_branch_from_remote: could not determine origin HEAD");
        None
    }

    fn read_origin_head(&self, workspace: &Path) -> Option<String> {
        let out = self
            .git(workspace, ["symbolic-ref", "refs/remotes/origin/HEAD"])
            .ok()?;
        let trimmed = out.trim();
        trimmed
            .strip_prefix("refs/remotes/origin/")
            .map(|s| s.to_string())
    }

    fn verify_branch(&self, workspace: &Path, name: &str) -> bool {
        self.git(workspace, ["rev-parse", "--verify", name]).is_ok()
    }

    /// First the remote's default branch (if it verifies locally), then
    /// `main`/`develop`/`master` in order, ultimately falling back to `"main"`.
    pub fn base_branch(&self, workspace: &Path) -> String {
        if let Some(remote_default) = self.default_branch_from_remote(workspace) {
            if self.verify_branch(workspace, &remote_default) {
                return remote_default;
            }
        }
        for candidate in DEFAULT_BASE_BRANCH_CANDIDATES {
            if self.verify_branch(workspace, candidate) {
                return candidate.to_string();
            }
        }
        "main".to_string()
    }

    /// True for any case-insensitive match of `{main, master, develop,
    /// development}`, or when `workspace` is supplied and `name` matches the
    /// remote's default branch case-insensitively.
    pub fn is_base_branch(&self, name: &str, workspace: Option<&Path>) -> bool {
        let lower = name.to_lowercase();
        if matches!(lower.as_str(), "main" | "master" | "develop" | "development") {
            return true;
        }
        if let Some(ws) = workspace {
            if let Some(remote_default) = self.default_branch_from_remote(ws) {
                return remote_default.to_lowercase() == lower;
            }
        }
        false
    }

    /// `git diff --name-status <merge-base>..<feature>`, folded into a
    /// [`GitDiff`].
    pub fn diff(&self, feature: &str, base: &str, workspace: &Path) -> Result<GitDiff, GitError> {
        let merge_base = self
            .git(workspace, ["merge-base", base, feature])?
            .trim()
            .to_string();
        let range = format!("{merge_base}..{feature}");
        let out = self.git(workspace, ["diff", "--name-status", &range])?;
        Ok(GitDiff::from_changes(parse_name_status(&out)))
    }

    fn git<I, S>(&self, workspace: &Path, args: I) -> Result<String, GitError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<std::ffi::OsStr>,
    {
        let git_bin = bx_utils::resolve_executable("git")
            .ok_or_else(|| GitError::command_failed("git --version".into(), "git not found on PATH".into()))?;

        let mut cmd = Command::new(&git_bin);
        cmd.arg("-C").arg(workspace);
        let mut joined = String::from("git");
        for a in args {
            let a_ref = a.as_ref();
            joined.push(' ');
            joined.push_str(&a_ref.to_string_lossy());
            cmd.arg(a_ref);
        }

        let output: Output = cmd
            .output()
            .map_err(|e| GitError::spawn_failed(joined.clone(), e))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(GitError::command_failed(joined, stderr));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::process::Command as StdCommand;
    use tempfile::tempdir;

    fn init_repo() -> tempfile::TempDir {
        let dir = tempdir().unwrap();
        let run = |args: &[&str]| {
            let status = StdCommand::new("git")
                .arg("-C")
                .arg(dir.path())
                .args(args)
                .status()
                .unwrap();
            assert!(status.success(), "git {args:?} failed");
        };
        run(&["init", "-q", "-b", "main"]);
        run(&["config", "user.email", "t@example.com"]);
        run(&["config", "user.name", "Test"]);
        std::fs::write(dir.path().join("a.txt"), "hello\n").unwrap();
        run(&["add", "."]);
        run(&["commit", "-q", "-m", "init"]);
        dir
    }

    #[test]
    fn is_repo_detects_git_workspace() {
        let dir = init_repo();
        let probe = GitProbe::new();
        assert!(probe.is_repo(dir.path()));
    }

    #[test]
    fn is_repo_false_for_non_repo() {
        let dir = tempdir().unwrap();
        let probe = GitProbe::new();
        assert!(!probe.is_repo(dir.path()));
    }

    #[test]
    fn current_branch_reports_main() {
        let dir = init_repo();
        let probe = GitProbe::new();
        assert_eq!(probe.current_branch(dir.path()).unwrap(), "main");
    }

    #[test]
    fn tracked_files_lists_committed_paths() {
        let dir = init_repo();
        let probe = GitProbe::new();
        assert_eq!(probe.tracked_files(dir.path()).unwrap(), vec!["a.txt".to_string()]);
    }

    #[test]
    fn base_branch_falls_back_to_main_without_remote() {
        let dir = init_repo();
        let probe = GitProbe::new();
        assert_eq!(probe.base_branch(dir.path()), "main");
    }

    #[test]
    fn is_base_branch_matches_known_names_case_insensitively() {
        let probe = GitProbe::new();
        assert!(probe.is_base_branch("Main", None));
        assert!(probe.is_base_branch("DEVELOP", None));
        assert!(!probe.is_base_branch("feature/x", None));
    }

    #[test]
    fn diff_reports_added_file_on_feature_branch() {
        let dir = init_repo();
        let run = |args: &[&str]| {
            let status = StdCommand::new("git")
                .arg("-C")
                .arg(dir.path())
                .args(args)
                .status()
                .unwrap();
            assert!(status.success());
        };
        run(&["checkout", "-q", "-b", "feature/x"]);
        std::fs::write(dir.path().join("b.txt"), "new\n").unwrap();
        run(&["add", "."]);
        run(&["commit", "-q", "-m", "add b"]);

        let probe = GitProbe::new();
        let diff = probe.diff("feature/x", "main", dir.path()).unwrap();
        assert_eq!(diff.added, vec!["b.txt".to_string()]);
        assert!(diff.deleted.is_empty());
    }

    #[test]
    fn has_uncommitted_detects_dirty_worktree() {
        let dir = init_repo();
        let probe = GitProbe::new();
        assert!(!probe.has_uncommitted(dir.path()).unwrap());
        std::fs::write(dir.path().join("a.txt"), "changed\n").unwrap();
        assert!(probe.has_uncommitted(dir.path()).unwrap());
    }
}
