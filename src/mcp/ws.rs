//! WebSocket transport for the interactive process.
//!
//! Each text frame carries one JSON-RPC envelope; responses go back on the
//! same socket. Routing is shared with the loopback bridge endpoint through
//! the dispatcher.

use anyhow::{Context, Result};
use futures::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

use super::{error_response, Dispatcher, PARSE_ERROR_CODE};

/// Bind the WebSocket endpoint and serve it as a background task.
/// Binding failure is a startup failure; the caller exits non-zero.
pub async fn start(port: u16, dispatcher: Dispatcher) -> Result<()> {
    let bind_addr = format!("127.0.0.1:{port}");
    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind WebSocket endpoint on {bind_addr}"))?;

    info!("WebSocket endpoint listening on ws://{bind_addr}");

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((stream, peer)) => {
                    debug!("WebSocket connection from {peer}");
                    let dispatcher = dispatcher.clone();
                    tokio::spawn(handle_connection(stream, dispatcher));
                }
                Err(e) => {
                    warn!("WebSocket accept failed: {e}");
                }
            }
        }
    });

    Ok(())
}

async fn handle_connection(stream: TcpStream, dispatcher: Dispatcher) {
    let mut ws = match tokio_tungstenite::accept_async(stream).await {
        Ok(ws) => ws,
        Err(e) => {
            warn!("WebSocket handshake failed: {e}");
            return;
        }
    };

    while let Some(message) = ws.next().await {
        let message = match message {
            Ok(message) => message,
            Err(e) => {
                warn!("WebSocket read failed: {e}");
                break;
            }
        };

        let text = match message {
            Message::Text(text) => text,
            Message::Ping(payload) => {
                let _ = ws.send(Message::Pong(payload)).await;
                continue;
            }
            Message::Close(_) => break,
            _ => continue,
        };

        let response = match serde_json::from_str::<Value>(&text) {
            Ok(envelope) => {
                let dispatcher = dispatcher.clone();
                // Tool calls block on the approval flow; keep the runtime free.
                match tokio::task::spawn_blocking(move || dispatcher.dispatch(&envelope)).await {
                    Ok(response) => response,
                    Err(e) => Some(error_response(
                        Value::Null,
                        super::TOOL_ERROR_CODE,
                        &format!("dispatch failed: {e}"),
                    )),
                }
            }
            Err(e) => Some(error_response(
                Value::Null,
                PARSE_ERROR_CODE,
                &format!("invalid JSON: {e}"),
            )),
        };

        if let Some(response) = response {
            if let Err(e) = ws.send(Message::Text(response.to_string().into())).await {
                warn!("WebSocket write failed: {e}");
                break;
            }
        }
    }
}
