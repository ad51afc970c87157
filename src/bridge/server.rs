//! Loopback HTTP endpoint of the interactive process.
//!
//! Accepts `POST /mcp` with one JSON-RPC envelope per request and routes it
//! through the same dispatcher the WebSocket transport uses, so bridged tool
//! calls and local commands share one engine.

use std::io::Read;
use std::thread;

use anyhow::{Context, Result};
use serde_json::Value;
use tiny_http::{Response, Server};
use tracing::{error, info};

use crate::config::Config;
use crate::mcp::{self, Dispatcher, PARSE_ERROR_CODE};

const MAX_BODY_BYTES: usize = 1024 * 1024; // 1 MiB

/// Bind the loopback endpoint and serve it on a background thread.
/// Binding failure is a startup failure; the caller exits non-zero.
pub fn start(config: &Config, dispatcher: Dispatcher) -> Result<()> {
    let bind_addr = format!("127.0.0.1:{}", config.bridge_port);
    let server = Server::http(&bind_addr)
        .map_err(|e| anyhow::anyhow!("{e}"))
        .with_context(|| format!("failed to bind bridge endpoint on {bind_addr}"))?;

    let token = config.bridge_token.clone();
    info!(
        "bridge endpoint listening on http://{bind_addr}/mcp (auth: {})",
        if token.is_some() { "enabled" } else { "disabled" }
    );

    thread::Builder::new()
        .name("pushgate-bridge".into())
        .spawn(move || serve(server, dispatcher, token))
        .context("failed to spawn bridge server thread")?;

    Ok(())
}

fn serve(server: Server, dispatcher: Dispatcher, token: Option<String>) {
    // One thread per request: an approval flow can hold its round trip open
    // for minutes, and a concurrent trigger must still reach the engine's
    // entry guard to be rejected instead of queueing here.
    for request in server.incoming_requests() {
        let dispatcher = dispatcher.clone();
        let token = token.clone();
        thread::spawn(move || handle_request(request, &dispatcher, token.as_deref()));
    }
}

fn handle_request(mut request: tiny_http::Request, dispatcher: &Dispatcher, token: Option<&str>) {
    let method = request.method().to_string();
    let url = request.url().to_string();
    let path = url.split('?').next().unwrap_or(url.as_str());

    if !is_authorized(&request, token) {
        respond_json(request, 401, r#"{"error":"unauthorized"}"#.to_string());
        return;
    }

    if method != "POST" || path != "/mcp" {
        respond_json(request, 404, r#"{"error":"not_found"}"#.to_string());
        return;
    }

    let body = match read_request_body(&mut request) {
        Ok(body) => body,
        Err((status, body)) => {
            respond_json(request, status, body);
            return;
        }
    };

    let envelope: Value = match serde_json::from_str(&body) {
        Ok(envelope) => envelope,
        Err(e) => {
            let response =
                mcp::error_response(Value::Null, PARSE_ERROR_CODE, &format!("invalid JSON: {e}"));
            respond_json(request, 400, response.to_string());
            return;
        }
    };

    // This thread blocks for the whole approval flow; the agent's HTTP
    // round trip stays open until the human answers.
    match dispatcher.dispatch(&envelope) {
        Some(response) => respond_json(request, 200, response.to_string()),
        None => respond_json(request, 200, r#"{}"#.to_string()),
    }
}

fn is_authorized(request: &tiny_http::Request, expected: Option<&str>) -> bool {
    let Some(expected) = expected.filter(|t| !t.trim().is_empty()) else {
        return true;
    };

    let expected_value = format!("Bearer {expected}");
    request
        .headers()
        .iter()
        .find(|h| h.field.equiv("Authorization"))
        .map(|h| h.value.as_str() == expected_value)
        .unwrap_or(false)
}

fn read_request_body(request: &mut tiny_http::Request) -> Result<String, (u16, String)> {
    let mut body = String::new();
    let mut reader = request.as_reader().take((MAX_BODY_BYTES + 1) as u64);
    if let Err(e) = reader.read_to_string(&mut body) {
        error!("failed to read bridge request body: {e}");
        return Err((400, r#"{"error":"bad_request"}"#.to_string()));
    }

    if body.len() > MAX_BODY_BYTES {
        return Err((413, r#"{"error":"payload_too_large"}"#.to_string()));
    }

    Ok(body)
}

fn respond_json(request: tiny_http::Request, status_code: u16, body: String) {
    let response = Response::from_string(body)
        .with_status_code(status_code)
        .with_header(json_content_type());
    let _ = request.respond(response);
}

fn json_content_type() -> tiny_http::Header {
    tiny_http::Header::from_bytes(&b"Content-Type"[..], &b"application/json"[..]).unwrap()
}
