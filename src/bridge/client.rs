//! HTTP client side of the loopback bridge (stdio process).

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde_json::{json, Value};

use super::BridgeError;
use crate::config::Config;

/// Forwards tool invocations to the interactive process and unwraps the
/// textual result. Requests and responses are correlated by a monotonically
/// increasing id; every failure mode is a distinct [`BridgeError`].
pub struct BridgeClient {
    base_url: String,
    token: Option<String>,
    agent: ureq::Agent,
    next_id: AtomicU64,
}

impl BridgeClient {
    pub fn new(config: &Config) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(Duration::from_secs(config.bridge_connect_timeout_secs))
            // Reviews block on a human answer, so reads stay open for a while.
            .timeout_read(Duration::from_secs(config.bridge_read_timeout_secs))
            .build();

        Self {
            base_url: config.bridge_url(),
            token: config.bridge_token.clone(),
            agent,
            next_id: AtomicU64::new(1),
        }
    }

    /// POST one `tools/call` envelope and await the text result.
    pub fn call_tool(&self, name: &str, arguments: Value) -> Result<String, BridgeError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let envelope = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": "tools/call",
            "params": { "name": name, "arguments": arguments },
        });

        let url = format!("{}/mcp", self.base_url);
        let mut request = self.agent.post(&url);
        if let Some(token) = &self.token {
            request = request.set("Authorization", &format!("Bearer {token}"));
        }

        let response = match request.send_json(&envelope) {
            Ok(response) => response,
            Err(ureq::Error::Status(status, response)) => {
                let body = response.into_string().unwrap_or_default();
                return Err(BridgeError::Status { status, body });
            }
            Err(e) => {
                return Err(BridgeError::Connect {
                    url,
                    message: e.to_string(),
                });
            }
        };

        let value: Value = response
            .into_json()
            .map_err(|e| BridgeError::Malformed(e.to_string()))?;

        Self::unwrap_response(&value)
    }

    /// Extract the plain text from a JSON-RPC response, or the error message
    /// from its error envelope.
    fn unwrap_response(value: &Value) -> Result<String, BridgeError> {
        if let Some(error) = value.get("error") {
            let message = error
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("unknown bridge error");
            return Err(BridgeError::Tool(message.to_string()));
        }

        value
            .pointer("/result/content/0/text")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| BridgeError::Malformed(format!("missing result text in {value}")))
    }
}
