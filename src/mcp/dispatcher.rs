//! Method routing for envelopes arriving on the interactive process.
//!
//! Stateless: all approval and git state lives in the shared engine. Unknown
//! methods get a generic "not implemented" result rather than an error, to
//! stay tolerant of protocol evolution.

use std::sync::Arc;

use serde_json::{json, Value};
use tracing::debug;

use super::{
    error_response, initialize_result, result_response, text_result, tool_descriptors,
    TOOL_ERROR_CODE,
};
use crate::approval::ApprovalEngine;

#[derive(Clone)]
pub struct Dispatcher {
    engine: Arc<ApprovalEngine>,
}

impl Dispatcher {
    pub fn new(engine: Arc<ApprovalEngine>) -> Self {
        Self { engine }
    }

    /// Route one envelope. Returns None for notifications, which get no
    /// response. Blocking: tool calls run the full approval flow inline, so
    /// async callers wrap this in `spawn_blocking`.
    pub fn dispatch(&self, envelope: &Value) -> Option<Value> {
        let method = envelope.get("method").and_then(Value::as_str).unwrap_or("");
        let id = envelope.get("id").cloned().unwrap_or(Value::Null);
        debug!("dispatching method '{method}'");

        if method.starts_with("notifications/") {
            return None;
        }

        Some(match method {
            "initialize" => result_response(id, initialize_result("pushgate")),
            "tools/list" => result_response(id, json!({ "tools": tool_descriptors() })),
            "tools/call" => self.handle_tool_call(id, envelope.get("params")),
            // Workspace/resource enumeration lives outside this process.
            "resources/list" => result_response(id, json!({ "resources": [] })),
            other => text_result(id, &format!("not implemented: {other}")),
        })
    }

    fn handle_tool_call(&self, id: Value, params: Option<&Value>) -> Value {
        let Some(params) = params else {
            return error_response(id, TOOL_ERROR_CODE, "tools/call requires params");
        };
        let Some(name) = params.get("name").and_then(Value::as_str) else {
            return error_response(id, TOOL_ERROR_CODE, "tools/call requires a tool name");
        };
        let arguments = params.get("arguments").cloned().unwrap_or(json!({}));

        match name {
            "review_push" => {
                let branch = arguments
                    .get("branch")
                    .and_then(Value::as_str)
                    .map(str::to_string);
                let outcome = self.engine.run_review_push(branch);
                text_result(id, &outcome)
            }
            "git_status" => text_result(id, &self.engine.git_status_text()),
            other => error_response(id, TOOL_ERROR_CODE, &format!("unknown tool: {other}")),
        }
    }
}
