//! Interactive session loop for the process that owns the terminal.

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tokio::task::JoinHandle;
use tracing::info;

use crate::approval::ApprovalEngine;
use crate::bridge;
use crate::config::Config;
use crate::git::GitManager;
use crate::mcp::{self, Dispatcher};
use crate::review::DiffRenderer;
use crate::terminal::{ReadlineEvent, TerminalController};

const HELP: &str = "Commands:\n  /review-push (/rp)  review unpushed commits, then push or roll back\n  /status             branch, unpushed count and working tree status\n  /help               this help\n  /quit               exit";

/// Run the interactive process: readline REPL, loopback bridge endpoint and
/// WebSocket endpoint, all sharing one approval engine.
pub async fn run(config: Config, git: GitManager) -> Result<()> {
    let (terminal, mut events) = TerminalController::spawn();
    let renderer = DiffRenderer::new(&config.highlighter, &config.pager);
    let engine = Arc::new(ApprovalEngine::new(git, renderer, terminal.clone()));
    let dispatcher = Dispatcher::new(Arc::clone(&engine));

    bridge::server::start(&config, dispatcher.clone())?;
    mcp::ws::start(config.ws_port, dispatcher).await?;

    terminal.print(format!(
        "pushgate ready. bridge: http://127.0.0.1:{}/mcp  ws: ws://127.0.0.1:{}\nType /help for commands.",
        config.bridge_port, config.ws_port
    ));
    terminal.request_line();

    // At most one local flow at a time; remote triggers go straight to the
    // engine from the transport threads and hit the same entry guard.
    let mut active_flow: Option<JoinHandle<String>> = None;

    loop {
        tokio::select! {
            event = events.recv() => {
                let Some(event) = event else {
                    // Losing the line editor leaves the terminal in an
                    // unknown state; treat as fatal rather than limp along.
                    bail!("terminal line editor terminated unexpectedly");
                };

                match event {
                    ReadlineEvent::Line(line) => {
                        match line.trim() {
                            "" => terminal.request_line(),
                            "/review-push" | "/rp" => {
                                let engine = Arc::clone(&engine);
                                active_flow = Some(tokio::task::spawn_blocking(move || {
                                    engine.run_review_push(None)
                                }));
                            }
                            "/status" => {
                                terminal.print(engine.git_status_text());
                                terminal.request_line();
                            }
                            "/help" => {
                                terminal.print(HELP);
                                terminal.request_line();
                            }
                            "/quit" | "/exit" => break,
                            other => {
                                terminal.print(format!(
                                    "Unknown command '{other}'. Type /help for commands."
                                ));
                                terminal.request_line();
                            }
                        }
                    }
                    ReadlineEvent::Interrupted | ReadlineEvent::Eof => break,
                }
            }

            outcome = wait_flow(&mut active_flow), if active_flow.is_some() => {
                terminal.print(outcome);
                active_flow = None;
                terminal.request_line();
            }

            _ = tokio::signal::ctrl_c() => {
                if interrupt_shutdown(&mut active_flow).await {
                    info!("interrupted during an active review, exiting");
                    std::process::exit(0);
                }
                break;
            }
        }
    }

    info!("shutting down");
    Ok(())
}

/// Shutdown step for an interrupt. Returns true when the process must exit
/// immediately: an active flow is blocked in a plain stdin read for the
/// approval answer, which nothing here can unblock, so shutdown never waits
/// on the flow handle.
async fn interrupt_shutdown(active_flow: &mut Option<JoinHandle<String>>) -> bool {
    active_flow.take().is_some()
}

async fn wait_flow(flow: &mut Option<JoinHandle<String>>) -> String {
    match flow.as_mut() {
        Some(handle) => handle
            .await
            .unwrap_or_else(|e| format!("review flow failed: {e}")),
        None => unreachable!("wait_flow polled without an active flow"),
    }
}

/// Resolve the repository and start the interactive session.
pub async fn run_in(work_dir: &std::path::Path, config: Config) -> Result<()> {
    let root = crate::git::find_git_root(work_dir)
        .with_context(|| format!("git repository not found at {}", work_dir.display()))?;
    let git = GitManager::new(root)?;
    run(config, git).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn interrupt_never_waits_on_a_blocked_flow() {
        let (release_tx, release_rx) = std::sync::mpsc::channel::<()>();
        let mut flow = Some(tokio::task::spawn_blocking(move || {
            let _ = release_rx.recv();
            String::new()
        }));

        let exit_now =
            tokio::time::timeout(Duration::from_secs(1), interrupt_shutdown(&mut flow))
                .await
                .expect("shutdown step must not block on the flow");

        assert!(exit_now);
        assert!(flow.is_none());
        let _ = release_tx.send(());
    }

    #[tokio::test]
    async fn interrupt_without_a_flow_shuts_down_in_place() {
        let mut flow: Option<JoinHandle<String>> = None;
        assert!(!interrupt_shutdown(&mut flow).await);
    }
}
