//! Git operations for review and gated pushes

mod manager;

pub use manager::{
    find_git_root, CommitReview, ConfirmPush, FileDiff, GitError, GitManager, PushResult,
};
