//! Loopback request/response bridge between the two processes.
//!
//! The stdio-transport process has no git access of its own: every tool call
//! it receives is serialized to a JSON-RPC envelope, POSTed to the
//! interactive process's `/mcp` endpoint, and the textual result is relayed
//! back. One stateful engine, two transports.

mod client;
pub mod server;

pub use client::BridgeClient;

/// HTTP-level failures between the two processes. Surfaced to the agent as a
/// tool error, never retried, never collapsed into an empty string.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error("bridge unreachable at {url}: {message}")]
    Connect { url: String, message: String },

    #[error("bridge returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed bridge response: {0}")]
    Malformed(String),

    #[error("tool call failed: {0}")]
    Tool(String),
}
