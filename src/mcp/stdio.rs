//! stdio transport: the MCP server an agent launches directly.
//!
//! Line-delimited JSON-RPC on stdin/stdout. `initialize` and `tools/list`
//! are answered locally; tool calls are forwarded over the loopback bridge
//! to the interactive process that owns the terminal and the approval
//! engine, and the text result is relayed back.

use std::sync::Arc;

use anyhow::{Context, Result};
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{debug, info};

use super::{
    error_response, initialize_result, result_response, text_result, tool_descriptors,
    PARSE_ERROR_CODE, TOOL_ERROR_CODE,
};
use crate::bridge::BridgeClient;
use crate::config::Config;

/// Serve the stdio transport until stdin closes.
pub async fn run(config: Config) -> Result<()> {
    let client = Arc::new(BridgeClient::new(&config));
    info!("stdio MCP server forwarding tools to {}", config.bridge_url());

    let stdin = BufReader::new(tokio::io::stdin());
    let mut lines = stdin.lines();
    let mut stdout = tokio::io::stdout();

    while let Some(line) = lines.next_line().await.context("failed to read stdin")? {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let response = match serde_json::from_str::<Value>(trimmed) {
            Ok(envelope) => handle(&client, envelope).await,
            Err(e) => Some(error_response(
                Value::Null,
                PARSE_ERROR_CODE,
                &format!("invalid JSON: {e}"),
            )),
        };

        if let Some(response) = response {
            let mut payload = serde_json::to_string(&response)?;
            payload.push('\n');
            stdout
                .write_all(payload.as_bytes())
                .await
                .context("failed to write stdout")?;
            stdout.flush().await.context("failed to flush stdout")?;
        }
    }

    debug!("stdin closed, shutting down stdio server");
    Ok(())
}

async fn handle(client: &Arc<BridgeClient>, envelope: Value) -> Option<Value> {
    let method = envelope.get("method").and_then(Value::as_str).unwrap_or("");
    let id = envelope.get("id").cloned().unwrap_or(Value::Null);

    if method.starts_with("notifications/") {
        return None;
    }

    Some(match method {
        "initialize" => result_response(id, initialize_result("pushgate-stdio")),
        "tools/list" => result_response(id, json!({ "tools": tool_descriptors() })),
        "tools/call" => forward_tool_call(client, id, envelope.get("params")).await,
        "resources/list" => result_response(id, json!({ "resources": [] })),
        other => text_result(id, &format!("not implemented: {other}")),
    })
}

/// Forward one tool call over the bridge. Bridge failures become a tool
/// error envelope carrying the `BridgeError` message.
async fn forward_tool_call(client: &Arc<BridgeClient>, id: Value, params: Option<&Value>) -> Value {
    let Some(params) = params else {
        return error_response(id, TOOL_ERROR_CODE, "tools/call requires params");
    };
    let Some(name) = params.get("name").and_then(Value::as_str) else {
        return error_response(id, TOOL_ERROR_CODE, "tools/call requires a tool name");
    };

    let name = name.to_string();
    let arguments = params.get("arguments").cloned().unwrap_or(json!({}));

    let client = Arc::clone(client);
    let outcome =
        tokio::task::spawn_blocking(move || client.call_tool(&name, arguments)).await;

    match outcome {
        Ok(Ok(text)) => text_result(id, &text),
        Ok(Err(e)) => error_response(id, TOOL_ERROR_CODE, &e.to_string()),
        Err(e) => error_response(id, TOOL_ERROR_CODE, &format!("bridge call failed: {e}")),
    }
}
