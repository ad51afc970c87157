//! Model-Context-Protocol plumbing: the envelope helpers shared by every
//! transport, the method dispatcher, and the two transports themselves.

pub mod dispatcher;
pub mod stdio;
pub mod ws;

pub use dispatcher::Dispatcher;

use serde_json::{json, Value};

pub const JSONRPC_VERSION: &str = "2.0";
pub const PROTOCOL_VERSION: &str = "2024-11-05";

/// JSON-RPC error code for tool-call failures.
pub const TOOL_ERROR_CODE: i64 = -32000;
/// JSON-RPC error code for unparseable payloads.
pub const PARSE_ERROR_CODE: i64 = -32700;

/// A result envelope carrying one text content block.
pub fn text_result(id: Value, text: &str) -> Value {
    json!({
        "jsonrpc": JSONRPC_VERSION,
        "id": id,
        "result": { "content": [{ "type": "text", "text": text }] },
    })
}

/// An error envelope. Carries only the message, never a raw error object.
pub fn error_response(id: Value, code: i64, message: &str) -> Value {
    json!({
        "jsonrpc": JSONRPC_VERSION,
        "id": id,
        "error": { "code": code, "message": message },
    })
}

/// A plain (non-content) result envelope.
pub fn result_response(id: Value, result: Value) -> Value {
    json!({
        "jsonrpc": JSONRPC_VERSION,
        "id": id,
        "result": result,
    })
}

/// The `initialize` result for a server with the given name.
pub fn initialize_result(server_name: &str) -> Value {
    json!({
        "protocolVersion": PROTOCOL_VERSION,
        "serverInfo": {
            "name": server_name,
            "version": env!("CARGO_PKG_VERSION"),
        },
        "capabilities": { "tools": {} },
    })
}

/// Descriptors for the agent-facing tools. Both processes expose the same
/// two tools; the stdio process forwards them over the bridge.
pub fn tool_descriptors() -> Value {
    json!([
        {
            "name": "review_push",
            "description": "Review unpushed commits with the developer and push only after explicit human approval. Rejection rolls the commits back into unstaged changes.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "branch": {
                        "type": "string",
                        "description": "Branch to push (defaults to the current branch)",
                    },
                },
            },
        },
        {
            "name": "git_status",
            "description": "Current branch, unpushed commit count, and short working tree status.",
            "inputSchema": { "type": "object", "properties": {} },
        },
    ])
}
