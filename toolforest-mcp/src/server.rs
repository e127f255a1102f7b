//! Newline-delimited JSON-RPC 2.0 loop speaking the MCP tool methods.

use std::io;

use serde::Deserialize;
use serde_json::{Value, json};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{debug, info, warn};

use crate::bridge::{McpBridge, McpError};

/// MCP protocol revision announced by `initialize`.
pub const PROTOCOL_VERSION: &str = "2024-11-05";

const PARSE_ERROR: i64 = -32700;
const INVALID_REQUEST: i64 = -32600;
const METHOD_NOT_FOUND: i64 = -32601;
const INVALID_PARAMS: i64 = -32602;

#[derive(Debug, Deserialize)]
struct RpcRequest {
    #[serde(default)]
    id: Option<Value>,
    method: String,
    #[serde(default)]
    params: Value,
}

fn ok_result(id: Value, result: Value) -> Value {
    json!({"jsonrpc": "2.0", "id": id, "result": result})
}

fn rpc_error(id: Value, code: i64, message: impl Into<String>) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "error": {"code": code, "message": message.into()}
    })
}

fn tool_content(text: String, is_error: bool) -> Value {
    json!({
        "content": [{"type": "text", "text": text}],
        "isError": is_error
    })
}

/// MCP server answering for one [`McpBridge`].
#[derive(Debug)]
pub struct McpServer {
    bridge: McpBridge,
    name: String,
    version: String,
}

impl McpServer {
    /// Creates a server identifying itself as `toolforest`.
    #[must_use]
    pub fn new(bridge: McpBridge) -> Self {
        Self {
            bridge,
            name: "toolforest".to_owned(),
            version: env!("CARGO_PKG_VERSION").to_owned(),
        }
    }

    /// Overrides the `serverInfo` reported by `initialize`.
    #[must_use]
    pub fn with_server_info(mut self, name: impl Into<String>, version: impl Into<String>) -> Self {
        self.name = name.into();
        self.version = version.into();
        self
    }

    /// Returns the bridged tools.
    #[must_use]
    pub fn bridge(&self) -> &McpBridge {
        &self.bridge
    }

    /// Answers one decoded JSON-RPC message.
    ///
    /// Returns `None` for notifications, which never get a response.
    pub async fn handle(&self, message: Value) -> Option<Value> {
        let request: RpcRequest = match serde_json::from_value(message) {
            Ok(request) => request,
            Err(err) => {
                return Some(rpc_error(
                    Value::Null,
                    INVALID_REQUEST,
                    format!("invalid request: {err}"),
                ));
            }
        };

        let Some(id) = request.id else {
            debug!(method = %request.method, "notification received");
            return None;
        };

        let response = match request.method.as_str() {
            "initialize" => ok_result(
                id,
                json!({
                    "protocolVersion": PROTOCOL_VERSION,
                    "capabilities": {"tools": {}},
                    "serverInfo": {"name": self.name, "version": self.version}
                }),
            ),
            "ping" => ok_result(id, json!({})),
            "tools/list" => ok_result(id, json!({"tools": self.bridge.list_tools()})),
            "tools/call" => self.call_tool(id, request.params).await,
            method => rpc_error(id, METHOD_NOT_FOUND, format!("method not found: {method}")),
        };
        Some(response)
    }

    async fn call_tool(&self, id: Value, mut params: Value) -> Value {
        let Some(name) = params.get("name").and_then(Value::as_str).map(str::to_owned) else {
            return rpc_error(id, INVALID_PARAMS, "missing tool name");
        };
        let arguments = params.get_mut("arguments").map(Value::take);

        match self.bridge.call_tool(&name, arguments).await {
            Ok(result) => {
                let mut content = tool_content(result.to_string(), false);
                if result.is_object() {
                    content["structuredContent"] = result;
                }
                ok_result(id, content)
            }
            Err(err @ (McpError::UnknownTool { .. } | McpError::InvalidArguments)) => {
                rpc_error(id, INVALID_PARAMS, err.to_string())
            }
            Err(McpError::Proxy(err)) => {
                warn!(tool = %name, error = %err, "bridged tool call failed");
                ok_result(id, tool_content(err.to_string(), true))
            }
        }
    }

    /// Serves requests read line by line from `reader` until end of input.
    ///
    /// # Errors
    ///
    /// Returns any I/O error from reading requests or writing responses.
    pub async fn serve<R, W>(&self, reader: R, mut writer: W) -> io::Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        info!(tools = self.bridge.len(), "mcp server ready");
        let mut lines = reader.lines();

        while let Some(line) = lines.next_line().await? {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let response = match serde_json::from_str::<Value>(line) {
                Ok(message) => self.handle(message).await,
                Err(err) => Some(rpc_error(
                    Value::Null,
                    PARSE_ERROR,
                    format!("parse error: {err}"),
                )),
            };

            if let Some(response) = response {
                let mut bytes = serde_json::to_vec(&response)?;
                bytes.push(b'\n');
                writer.write_all(&bytes).await?;
                writer.flush().await?;
            }
        }

        debug!("input closed; mcp server stopping");
        Ok(())
    }

    /// Serves over the process's stdin and stdout.
    ///
    /// # Errors
    ///
    /// See [`McpServer::serve`].
    pub async fn serve_stdio(&self) -> io::Result<()> {
        self.serve(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
            .await
    }
}
