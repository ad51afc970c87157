//! Configuration loading and management

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Default port for the loopback HTTP bridge endpoint.
pub const DEFAULT_BRIDGE_PORT: u16 = 7925;

/// Default port for the WebSocket MCP endpoint.
pub const DEFAULT_WS_PORT: u16 = 7926;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Port for the loopback HTTP bridge (stdio process -> interactive process)
    #[serde(default = "default_bridge_port")]
    pub bridge_port: u16,

    /// Port for the WebSocket MCP endpoint
    #[serde(default = "default_ws_port")]
    pub ws_port: u16,

    /// Optional shared token for the bridge endpoint. When set, requests must
    /// carry it as `Authorization: Bearer <token>`; when unset the header is
    /// ignored.
    #[serde(default)]
    pub bridge_token: Option<String>,

    /// Pager command for full-screen review display, flags included
    #[serde(default = "default_pager")]
    pub pager: String,

    /// External diff highlighter command, flags included (identity fallback
    /// when the binary is missing)
    #[serde(default = "default_highlighter")]
    pub highlighter: String,

    /// Bridge client connect timeout in seconds
    #[serde(default = "default_connect_timeout")]
    pub bridge_connect_timeout_secs: u64,

    /// Bridge client read timeout in seconds. Reviews block on a human answer,
    /// so this is generous by default.
    #[serde(default = "default_read_timeout")]
    pub bridge_read_timeout_secs: u64,
}

fn default_bridge_port() -> u16 {
    DEFAULT_BRIDGE_PORT
}

fn default_ws_port() -> u16 {
    DEFAULT_WS_PORT
}

fn default_pager() -> String {
    "less -R".to_string()
}

fn default_highlighter() -> String {
    "delta --paging=never --file-style=omit --hunk-header-style=omit --keep-plus-minus-markers"
        .to_string()
}

fn default_connect_timeout() -> u64 {
    5
}

fn default_read_timeout() -> u64 {
    600
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bridge_port: default_bridge_port(),
            ws_port: default_ws_port(),
            bridge_token: None,
            pager: default_pager(),
            highlighter: default_highlighter(),
            bridge_connect_timeout_secs: default_connect_timeout(),
            bridge_read_timeout_secs: default_read_timeout(),
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Load configuration from a repository root.
    /// Looks for .pushgate/config.toml; a missing file means defaults.
    pub fn from_dir(dir: &Path) -> Result<Self> {
        let path = dir.join(".pushgate/config.toml");
        if path.exists() {
            return Self::from_file(&path);
        }
        Ok(Self::default())
    }

    /// Base URL of the loopback bridge endpoint.
    pub fn bridge_url(&self) -> String {
        format!("http://127.0.0.1:{}", self.bridge_port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_when_fields_missing() {
        let config: Config = toml::from_str("bridge_port = 9000").unwrap();
        assert_eq!(config.bridge_port, 9000);
        assert_eq!(config.ws_port, DEFAULT_WS_PORT);
        assert_eq!(config.pager, "less -R");
        assert!(config.highlighter.starts_with("delta "));
        assert!(config.bridge_token.is_none());
    }

    #[test]
    fn bridge_url_uses_configured_port() {
        let config = Config {
            bridge_port: 8123,
            ..Config::default()
        };
        assert_eq!(config.bridge_url(), "http://127.0.0.1:8123");
    }
}
