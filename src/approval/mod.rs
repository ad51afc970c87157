//! Approval state machine for gated pushes.
//!
//! One engine serves two front ends: the local `/review-push` command and the
//! bridged `review_push` tool call. The `Idle` entry guard is the sole mutual
//! exclusion for push/rollback: a second trigger while a flow is active is
//! rejected outright, never queued or interleaved.

use std::sync::Mutex;

use tracing::warn;

use crate::git::{ConfirmPush, GitManager};
use crate::review::{DiffRenderer, ReviewBuilder, NO_UNPUSHED_COMMITS};
use crate::terminal::{PushDecision, TerminalController, TerminalGuard};

/// Where the flow currently is. Process-wide; reset to `Idle` after every
/// completed or failed flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApprovalState {
    Idle,
    ReviewRendering,
    AwaitingAnswer,
    Pushing,
    RollingBack,
}

#[derive(Debug, thiserror::Error)]
pub enum ApprovalError {
    #[error("approval already in progress")]
    AlreadyInProgress,
}

impl ConfirmPush for TerminalGuard {
    fn confirm(&self, branch: &str, force: bool) -> bool {
        let question = if force {
            format!("Force push (with lease) '{branch}' to origin?")
        } else {
            format!("Push '{branch}' to origin?")
        };
        matches!(self.ask_yes_no(&question), Ok(PushDecision::Approved))
    }
}

/// Orchestrates render review -> suspend terminal -> ask -> push or rollback
/// -> resume terminal.
pub struct ApprovalEngine {
    state: Mutex<ApprovalState>,
    git: GitManager,
    renderer: DiffRenderer,
    terminal: TerminalController,
}

impl ApprovalEngine {
    pub fn new(git: GitManager, renderer: DiffRenderer, terminal: TerminalController) -> Self {
        Self {
            state: Mutex::new(ApprovalState::Idle),
            git,
            renderer,
            terminal,
        }
    }

    pub fn state(&self) -> ApprovalState {
        *self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Plain-text status for the `git_status` tool and `/status` command.
    pub fn git_status_text(&self) -> String {
        let branch = match self.git.current_branch() {
            Ok(branch) => branch,
            Err(e) => return format!("git status failed: {e}"),
        };
        let count = match self.git.unpushed_commit_count() {
            Ok(count) => count,
            Err(e) => return format!("git status failed: {e}"),
        };
        let status = match self.git.short_status() {
            Ok(status) => status,
            Err(e) => return format!("git status failed: {e}"),
        };

        format!("Branch: {branch}\nUnpushed commits: {count}\n\n{status}")
    }

    /// Run the full review-and-push flow, blocking until the user has
    /// answered. Returns user-facing result text; git failures are reported,
    /// never propagated as errors.
    pub fn run_review_push(&self, branch_override: Option<String>) -> String {
        let mut flow = match FlowGuard::begin(self) {
            Ok(flow) => flow,
            Err(e) => return e.to_string(),
        };

        let branch = match branch_override {
            Some(branch) => branch,
            None => match self.git.current_branch() {
                Ok(branch) => branch,
                Err(e) => return format!("Review failed: {e}"),
            },
        };

        let builder = ReviewBuilder::new(&self.git, &self.renderer);
        let content = match builder.review_content() {
            Ok(content) => content,
            Err(e) => return format!("Review failed: {e}"),
        };
        if content == NO_UNPUSHED_COMMITS {
            return content.to_string();
        }

        // From here the terminal belongs to the flow; the guard returns it to
        // line editing on every exit path.
        let guard = self.terminal.suspend();

        if let Err(e) = self.renderer.display_review(&content) {
            // Best-effort review display; the prompt still happens.
            warn!("review display failed: {e}");
        }

        flow.set(ApprovalState::AwaitingAnswer);

        let count = self.git.unpushed_commit_count().unwrap_or(0);
        let force = self.git.check_force_push().unwrap_or(false);
        let question = if force {
            format!(
                "Branch '{branch}' is behind its upstream; pushing will use --force-with-lease.\n\
                 Push {count} commit(s) on '{branch}' to origin?"
            )
        } else {
            format!("Push {count} commit(s) on '{branch}' to origin?")
        };

        let decision = match guard.ask_yes_no(&question) {
            Ok(decision) => decision,
            Err(e) => {
                warn!("failed to read approval answer: {e}");
                PushDecision::Invalid(String::new())
            }
        };

        match decision {
            PushDecision::Approved => {
                flow.set(ApprovalState::Pushing);
                // Confirmation was just obtained at the prompt.
                let result = self.git.auto_push_flow(&branch, true, &guard);
                result.message
            }
            PushDecision::Rejected => {
                flow.set(ApprovalState::RollingBack);
                self.rollback(count)
            }
            PushDecision::Invalid(answer) => format!(
                "Cancelled: answer '{answer}' not recognized. Run /review-push again and answer y or n."
            ),
        }
    }

    fn rollback(&self, count: usize) -> String {
        if count == 0 {
            warn!("rejected review had no unpushed commits");
            return "Nothing to roll back: no unpushed commits.".to_string();
        }

        match self.git.rollback_commits(count) {
            Ok(()) => format!(
                "Rolled back {count} commit(s). All changes kept in the working tree as unstaged modifications."
            ),
            Err(e) => format!("Rollback failed: {e}"),
        }
    }
}

/// Holds the non-Idle state for the lifetime of one flow; Drop restores
/// `Idle` even when the flow panics.
struct FlowGuard<'a> {
    engine: &'a ApprovalEngine,
}

impl<'a> FlowGuard<'a> {
    /// Atomic check-and-set of the entry guard: one lock acquisition decides
    /// whether the trigger wins the Idle state.
    fn begin(engine: &'a ApprovalEngine) -> Result<Self, ApprovalError> {
        let mut state = engine.state.lock().unwrap_or_else(|e| e.into_inner());
        if *state != ApprovalState::Idle {
            return Err(ApprovalError::AlreadyInProgress);
        }
        *state = ApprovalState::ReviewRendering;
        Ok(Self { engine })
    }

    fn set(&mut self, next: ApprovalState) {
        *self
            .engine
            .state
            .lock()
            .unwrap_or_else(|e| e.into_inner()) = next;
    }
}

impl Drop for FlowGuard<'_> {
    fn drop(&mut self) {
        self.set(ApprovalState::Idle);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn already_in_progress_message() {
        assert_eq!(
            ApprovalError::AlreadyInProgress.to_string(),
            "approval already in progress"
        );
    }
}
