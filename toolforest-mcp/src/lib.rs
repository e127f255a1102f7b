//! Model Context Protocol front end for remote toolsets.
//!
//! [`McpBridge`] flattens a discovered [`ProxySet`](toolforest_remote::ProxySet)
//! into MCP tools named after the remote method, and [`McpServer`] answers
//! newline-delimited JSON-RPC 2.0 requests (`initialize`, `tools/list`,
//! `tools/call`) for it over any async byte stream, stdio included.

#![warn(missing_docs, clippy::pedantic)]

pub mod bridge;
pub mod server;

pub use bridge::{McpBridge, McpError, McpResult, McpTool};
pub use server::{McpServer, PROTOCOL_VERSION};
