//! Git types and errors

use serde::Serialize;

/// Errors from git subprocess invocations.
///
/// `CommandFailed` is always recoverable: callers convert it to user-facing
/// text, it is never fatal to the process.
#[derive(Debug, thiserror::Error)]
pub enum GitError {
    #[error("git {command} failed: {stderr}")]
    CommandFailed { command: String, stderr: String },

    #[error("failed to run git {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("not a git repository: {0}")]
    NotARepository(String),
}

/// One changed file within a review range, in the order git reports it.
#[derive(Debug, Clone)]
pub struct FileDiff {
    /// Path relative to the repository root
    pub path: String,
    /// Unified diff text for this file
    pub diff: String,
}

/// Metadata for one commit under review. Built fresh per review, never persisted.
#[derive(Debug, Clone)]
pub struct CommitReview {
    pub hash: String,
    pub author: String,
    pub date: String,
    pub subject: String,
}

/// Outcome of an auto-push attempt.
///
/// `success: false` means the operation could not even be attempted;
/// `success: true, pushed: false` means the operation was valid but nothing
/// was pushed (missing remote branch, or the user declined).
#[derive(Debug, Clone, Serialize)]
pub struct PushResult {
    pub success: bool,
    pub pushed: bool,
    pub message: String,
    pub branch: String,
}

impl PushResult {
    pub(super) fn skipped(branch: &str, message: impl Into<String>) -> Self {
        Self {
            success: true,
            pushed: false,
            message: message.into(),
            branch: branch.to_string(),
        }
    }

    pub(super) fn pushed(branch: &str, message: impl Into<String>) -> Self {
        Self {
            success: true,
            pushed: true,
            message: message.into(),
            branch: branch.to_string(),
        }
    }

    pub(super) fn failed(branch: &str, message: impl Into<String>) -> Self {
        Self {
            success: false,
            pushed: false,
            message: message.into(),
            branch: branch.to_string(),
        }
    }
}
