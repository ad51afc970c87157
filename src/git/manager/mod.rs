//! Git manager implementation

mod diff;
mod push;
mod types;


pub use push::ConfirmPush;
pub use types::{CommitReview, FileDiff, GitError, PushResult};

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

/// Find the git repository root for a given path.
/// Returns None if the path is not inside a git repository.
pub fn find_git_root(path: &Path) -> Option<PathBuf> {
    let start_dir = if path.is_file() { path.parent()? } else { path };

    let output = Command::new("git")
        .args(["rev-parse", "--show-toplevel"])
        .current_dir(start_dir)
        .output()
        .ok()?;

    if !output.status.success() {
        return None;
    }

    let root = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if root.is_empty() {
        None
    } else {
        Some(PathBuf::from(root))
    }
}

/// Stateless git operations rooted at one working tree.
///
/// Every method shells out to `git` and reports non-zero exits as
/// [`GitError::CommandFailed`] carrying the command and its stderr.
#[derive(Clone, Debug)]
pub struct GitManager {
    /// Root directory of the repository
    root: PathBuf,
}

impl GitManager {
    /// Create a new Git manager
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, GitError> {
        let root = root.into();

        if !root.join(".git").exists() {
            return Err(GitError::NotARepository(root.display().to_string()));
        }

        Ok(Self { root })
    }

    /// Get the root path
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Run a git command, capturing output. Non-zero exit is an error.
    pub(super) fn git(&self, args: &[&str]) -> Result<Output, GitError> {
        let output = Command::new("git")
            .args(args)
            .current_dir(&self.root)
            .output()
            .map_err(|source| GitError::Spawn {
                command: args.join(" "),
                source,
            })?;

        if !output.status.success() {
            return Err(GitError::CommandFailed {
                command: args.join(" "),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(output)
    }

    /// Run a git command and return trimmed stdout.
    pub(super) fn git_stdout(&self, args: &[&str]) -> Result<String, GitError> {
        let output = self.git(args)?;
        Ok(String::from_utf8_lossy(&output.stdout).trim_end().to_string())
    }

    /// Get the current HEAD commit SHA
    pub fn head_sha(&self) -> Result<String, GitError> {
        self.git_stdout(&["rev-parse", "HEAD"])
    }

    /// Get the current branch name
    pub fn current_branch(&self) -> Result<String, GitError> {
        self.git_stdout(&["rev-parse", "--abbrev-ref", "HEAD"])
    }

    /// Resolve the remote-tracking branch of HEAD (e.g. `origin/main`).
    /// Returns Ok(None) when no upstream is configured.
    pub fn upstream(&self) -> Result<Option<String>, GitError> {
        match self.git_stdout(&[
            "rev-parse",
            "--abbrev-ref",
            "--symbolic-full-name",
            "@{u}",
        ]) {
            Ok(name) if !name.is_empty() => Ok(Some(name)),
            Ok(_) => Ok(None),
            // No upstream configured is a normal state, not a failure.
            Err(GitError::CommandFailed { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Count commits on HEAD that are absent from the remote-tracking branch.
    /// Without an upstream, every local commit counts as unpushed.
    pub fn unpushed_commit_count(&self) -> Result<usize, GitError> {
        let range = match self.upstream()? {
            Some(upstream) => format!("{upstream}..HEAD"),
            None => "HEAD".to_string(),
        };

        let count = self.git_stdout(&["rev-list", "--count", &range])?;
        count.parse::<usize>().map_err(|_| GitError::CommandFailed {
            command: format!("rev-list --count {range}"),
            stderr: format!("unparseable commit count: {count}"),
        })
    }

    /// Short branch-aware status, as shown by `git status --short --branch`.
    pub fn short_status(&self) -> Result<String, GitError> {
        self.git_stdout(&["status", "--short", "--branch"])
    }
}
