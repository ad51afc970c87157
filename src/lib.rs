//! pushgate - reviewed pushes for AI agents
//!
//! pushgate sits between a coding agent and `git push`. The agent asks for a
//! push through MCP; pushgate renders a highlighted review of every unpushed
//! commit in the developer's terminal and asks them to approve. Approved
//! pushes go to origin (force-with-lease when the branch is behind), rejected
//! ones are rolled back into the working tree as unstaged changes.
//!
//! ## Process roles
//!
//! 1. **Interactive (default)**: owns the terminal. Runs the REPL, the
//!    loopback HTTP bridge endpoint, the WebSocket endpoint and the approval
//!    engine.
//!
//! 2. **`pushgate mcp`**: a stdio MCP server for agents that only speak
//!    stdio. Forwards tool calls to the interactive process over the bridge.

pub mod approval;
pub mod bridge;
pub mod config;
pub mod git;
pub mod mcp;
pub mod repl;
pub mod review;
pub mod terminal;
