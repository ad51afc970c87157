//! Push, rollback and push-safety operations for GitManager

use tracing::{info, warn};

use super::types::{GitError, PushResult};
use super::GitManager;

/// Seam for asking the user to confirm a push when `auto_push_flow` is called
/// without prior confirmation. The terminal front end implements this with a
/// raw prompt; tests stub it.
pub trait ConfirmPush {
    /// Returns true when the user approves pushing `branch`. `force` signals
    /// that the push will need `--force-with-lease`.
    fn confirm(&self, branch: &str, force: bool) -> bool;
}

/// Returns true when a short branch status indicates the local branch is
/// behind or has diverged from its upstream.
pub(super) fn status_indicates_force(short_status: &str) -> bool {
    short_status
        .lines()
        .next()
        .map(|branch_line| branch_line.contains("behind") || branch_line.contains("diverged"))
        .unwrap_or(false)
}

impl GitManager {
    /// True iff `origin` has a branch with this name.
    pub fn validate_remote_branch(&self, name: &str) -> Result<bool, GitError> {
        let output = self.git_stdout(&["ls-remote", "--heads", "origin", name])?;
        Ok(output.lines().any(|l| !l.trim().is_empty()))
    }

    /// True iff the branch status shows a "behind" or "diverged" marker
    /// relative to upstream, meaning a plain push would be rejected.
    pub fn check_force_push(&self) -> Result<bool, GitError> {
        Ok(status_indicates_force(&self.short_status()?))
    }

    /// Push `branch` to origin. A forced push always uses
    /// `--force-with-lease`, never bare `--force`.
    pub fn execute_push(&self, branch: &str, force: bool) -> Result<(), GitError> {
        if force {
            self.git(&["push", "--force-with-lease", "origin", branch])?;
        } else {
            self.git(&["push", "origin", branch])?;
        }
        Ok(())
    }

    /// Rewind the branch pointer by `n` commits while keeping every file
    /// change in the working tree as unstaged modifications. Commit and
    /// staging metadata is discarded; no file content is lost.
    pub fn rollback_commits(&self, n: usize) -> Result<(), GitError> {
        if n == 0 {
            warn!("rollback requested with no unpushed commits; nothing to do");
            return Ok(());
        }

        let target = format!("HEAD~{n}");
        self.git(&["reset", "--soft", &target])?;
        self.git(&["reset"])?;
        Ok(())
    }

    /// Validate -> detect force -> confirm (unless skipped) -> push.
    ///
    /// A missing remote branch and a declined confirmation both short-circuit
    /// to a non-fatal `{ success: true, pushed: false }`; only an unexpected
    /// git failure reports `success: false`.
    pub fn auto_push_flow(
        &self,
        branch: &str,
        skip_confirmation: bool,
        confirm: &dyn ConfirmPush,
    ) -> PushResult {
        match self.try_push_flow(branch, skip_confirmation, confirm) {
            Ok(result) => result,
            Err(e) => {
                warn!("push flow failed for '{branch}': {e}");
                PushResult::failed(branch, e.to_string())
            }
        }
    }

    fn try_push_flow(
        &self,
        branch: &str,
        skip_confirmation: bool,
        confirm: &dyn ConfirmPush,
    ) -> Result<PushResult, GitError> {
        if !self.validate_remote_branch(branch)? {
            return Ok(PushResult::skipped(
                branch,
                format!("Remote branch 'origin/{branch}' does not exist; nothing to push"),
            ));
        }

        let force = self.check_force_push()?;

        if !skip_confirmation && !confirm.confirm(branch, force) {
            return Ok(PushResult::skipped(branch, "Push declined"));
        }

        self.execute_push(branch, force)?;

        let message = if force {
            format!("Pushed '{branch}' to origin (force-with-lease)")
        } else {
            format!("Pushed '{branch}' to origin")
        };
        info!("{message}");
        Ok(PushResult::pushed(branch, message))
    }
}
