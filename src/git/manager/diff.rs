//! Diff and log operations for GitManager

use super::types::{CommitReview, FileDiff, GitError};
use super::GitManager;

/// SHA-1 id of git's empty tree, the diff base for a root commit.
pub(super) const EMPTY_TREE: &str = "4b825dc642cb6eb9a060e54bf8d69288fbee4904";

/// Normalize a review range for `git diff`.
///
/// A range containing `..` is used verbatim. A bare ref names a single commit
/// and is diffed against its parent, so `HEAD` covers only the tip commit,
/// never the whole history. A bare root commit has no parent and is diffed
/// against the empty tree instead.
pub(super) fn resolve_range(range: &str, parent_exists: bool) -> String {
    if range.contains("..") {
        range.to_string()
    } else if parent_exists {
        format!("{range}~1..{range}")
    } else {
        format!("{EMPTY_TREE}..{range}")
    }
}

impl GitManager {
    /// True iff `rev` resolves to an object.
    fn rev_exists(&self, rev: &str) -> bool {
        self.git(&["rev-parse", "--verify", "--quiet", rev]).is_ok()
    }

    fn diff_range(&self, range: &str) -> String {
        if range.contains("..") {
            return range.to_string();
        }
        resolve_range(range, self.rev_exists(&format!("{range}~1")))
    }

    /// List the files changed in a review range, in git's reported order.
    pub fn changed_files(&self, range: &str) -> Result<Vec<String>, GitError> {
        let resolved = self.diff_range(range);
        let output = self.git_stdout(&["diff", "--name-only", &resolved])?;

        Ok(output
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect())
    }

    /// Per-file unified diffs for a review range.
    pub fn file_diffs(&self, range: &str) -> Result<Vec<FileDiff>, GitError> {
        let resolved = self.diff_range(range);
        let mut diffs = Vec::new();

        for path in self.changed_files(range)? {
            let diff = self.git_stdout(&["diff", "--no-color", &resolved, "--", &path])?;
            diffs.push(FileDiff { path, diff });
        }

        Ok(diffs)
    }

    /// Commit metadata for every commit in a review range, newest first.
    /// `log` cannot take the empty tree as an endpoint, so a bare root commit
    /// is listed by its own ref.
    pub fn commit_reviews(&self, range: &str) -> Result<Vec<CommitReview>, GitError> {
        let resolved = if range.contains("..") {
            range.to_string()
        } else if self.rev_exists(&format!("{range}~1")) {
            format!("{range}~1..{range}")
        } else {
            range.to_string()
        };

        let output = self.git_stdout(&[
            "log",
            "--format=%H%x09%an%x09%ad%x09%s",
            "--date=short",
            &resolved,
        ])?;

        Ok(output
            .lines()
            .filter_map(|line| {
                let mut parts = line.splitn(4, '\t');
                Some(CommitReview {
                    hash: parts.next()?.to_string(),
                    author: parts.next()?.to_string(),
                    date: parts.next()?.to_string(),
                    subject: parts.next().unwrap_or_default().to_string(),
                })
            })
            .collect())
    }

    /// Oneline commit list for a range, or for the whole history when the
    /// range is empty (no upstream).
    pub fn oneline_log(&self, range: Option<&str>) -> Result<String, GitError> {
        match range {
            Some(range) => self.git_stdout(&["log", "--oneline", range]),
            None => self.git_stdout(&["log", "--oneline"]),
        }
    }
}
