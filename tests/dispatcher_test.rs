//! Integration tests for envelope routing through the dispatcher.
//!
//! These run the real approval engine against a real repository, exercising
//! the paths that complete without terminal input: the no-unpushed-commits
//! short circuit, status reporting, and method routing.

use std::fs;
use std::path::Path;
use std::process::Command;
use std::sync::Arc;

use serde_json::{json, Value};
use tempfile::TempDir;

use pushgate::approval::ApprovalEngine;
use pushgate::git::GitManager;
use pushgate::mcp::Dispatcher;
use pushgate::review::DiffRenderer;
use pushgate::terminal::TerminalController;

fn git(dir: &Path, args: &[&str]) {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .expect("failed to run git");
    assert!(
        output.status.success(),
        "git {args:?} failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
}

/// A work repo with an `origin` bare remote, fully pushed. Every path the
/// dispatcher can take without a terminal answer is reachable from here.
fn pushed_repo() -> TempDir {
    let temp = TempDir::new().expect("failed to create temp dir");
    let work = temp.path().join("work");
    let remote = temp.path().join("origin.git");
    fs::create_dir_all(&work).expect("failed to create work dir");

    git(temp.path(), &["init", "--bare", "origin.git"]);
    git(&work, &["init", "-b", "main"]);
    git(&work, &["config", "user.email", "test@test.com"]);
    git(&work, &["config", "user.name", "Test User"]);
    git(&work, &["remote", "add", "origin", remote.to_str().unwrap()]);

    fs::write(work.join("a.txt"), "initial\n").expect("failed to write file");
    git(&work, &["add", "."]);
    git(&work, &["commit", "-m", "initial"]);
    git(&work, &["push", "-u", "origin", "main"]);

    temp
}

fn dispatcher_for(repo: &TempDir) -> Dispatcher {
    let manager = GitManager::new(repo.path().join("work")).expect("failed to open repo");
    let (terminal, _events) = TerminalController::spawn();
    let renderer = DiffRenderer::new("delta", "less");
    Dispatcher::new(Arc::new(ApprovalEngine::new(manager, renderer, terminal)))
}

fn tool_text(response: &Value) -> &str {
    response
        .pointer("/result/content/0/text")
        .and_then(Value::as_str)
        .expect("response carries no text content")
}

#[test]
fn review_push_with_nothing_to_push_reports_sentinel() {
    let repo = pushed_repo();
    let dispatcher = dispatcher_for(&repo);

    let response = dispatcher
        .dispatch(&json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "tools/call",
            "params": { "name": "review_push", "arguments": {} },
        }))
        .expect("tools/call must get a response");

    assert_eq!(tool_text(&response), "No unpushed commits to review.");
    assert_eq!(response["id"], json!(1));
}

#[test]
fn git_status_tool_reports_branch_and_dirty_files() {
    let repo = pushed_repo();
    fs::write(repo.path().join("work/a.txt"), "edited\n").expect("failed to write file");
    let dispatcher = dispatcher_for(&repo);

    let response = dispatcher
        .dispatch(&json!({
            "jsonrpc": "2.0",
            "id": 2,
            "method": "tools/call",
            "params": { "name": "git_status", "arguments": {} },
        }))
        .expect("tools/call must get a response");

    let text = tool_text(&response);
    assert!(text.contains("Branch: main"), "got: {text}");
    assert!(text.contains("Unpushed commits: 0"), "got: {text}");
    assert!(text.contains("a.txt"), "got: {text}");
}

#[test]
fn initialize_reports_protocol_and_tools() {
    let repo = pushed_repo();
    let dispatcher = dispatcher_for(&repo);

    let response = dispatcher
        .dispatch(&json!({ "jsonrpc": "2.0", "id": 3, "method": "initialize" }))
        .expect("initialize must get a response");
    assert_eq!(response["result"]["protocolVersion"], json!("2024-11-05"));
    assert_eq!(response["result"]["serverInfo"]["name"], json!("pushgate"));

    let tools = dispatcher
        .dispatch(&json!({ "jsonrpc": "2.0", "id": 4, "method": "tools/list" }))
        .expect("tools/list must get a response");
    let names: Vec<&str> = tools["result"]["tools"]
        .as_array()
        .expect("tools must be an array")
        .iter()
        .filter_map(|t| t["name"].as_str())
        .collect();
    assert_eq!(names, ["review_push", "git_status"]);
}

#[test]
fn notifications_get_no_response() {
    let repo = pushed_repo();
    let dispatcher = dispatcher_for(&repo);

    let response = dispatcher.dispatch(&json!({
        "jsonrpc": "2.0",
        "method": "notifications/initialized",
    }));
    assert!(response.is_none());
}

#[test]
fn unknown_tool_is_an_error_but_unknown_method_is_not() {
    let repo = pushed_repo();
    let dispatcher = dispatcher_for(&repo);

    let response = dispatcher
        .dispatch(&json!({
            "jsonrpc": "2.0",
            "id": 5,
            "method": "tools/call",
            "params": { "name": "delete_everything", "arguments": {} },
        }))
        .expect("tools/call must get a response");
    assert_eq!(response["error"]["code"], json!(-32000));
    assert!(response["error"]["message"]
        .as_str()
        .unwrap()
        .contains("unknown tool"));

    // Unknown methods stay tolerant: a result, not an error.
    let response = dispatcher
        .dispatch(&json!({ "jsonrpc": "2.0", "id": 6, "method": "prompts/list" }))
        .expect("unknown methods still get a response");
    assert!(response.get("error").is_none());
    assert!(tool_text(&response).contains("not implemented"));
}
