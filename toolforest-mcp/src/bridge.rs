//! Mapping from remote proxies to MCP tools.

use indexmap::IndexMap;
use indexmap::map::Entry;
use serde::Serialize;
use serde_json::{Map, Value, json};
use thiserror::Error;
use toolforest_remote::{ProxyError, ProxySet, RemoteProxy};
use tracing::{debug, warn};

/// Result alias for bridge operations.
pub type McpResult<T> = Result<T, McpError>;

/// Errors raised while calling a bridged tool.
#[derive(Debug, Error)]
pub enum McpError {
    /// No bridged tool carries the requested name.
    #[error("unknown tool `{name}`")]
    UnknownTool {
        /// Name that was requested.
        name: String,
    },
    /// `arguments` was present but not a JSON object.
    #[error("tool arguments must be a JSON object")]
    InvalidArguments,
    /// The remote call failed.
    #[error(transparent)]
    Proxy(#[from] ProxyError),
}

/// Tool entry advertised by `tools/list`.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct McpTool {
    /// Remote method name without the toolset prefix.
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// JSON Schema of the arguments object.
    pub input_schema: Value,
}

struct Binding {
    tool: McpTool,
    proxy: RemoteProxy,
}

/// Flat MCP view over a [`ProxySet`].
///
/// Tools are exposed under their bare method name. When two toolsets export
/// the same method, the first in directory order is kept.
#[derive(Default)]
pub struct McpBridge {
    bindings: IndexMap<String, Binding>,
}

impl std::fmt::Debug for McpBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<_> = self.bindings.keys().collect();
        f.debug_struct("McpBridge").field("tools", &names).finish()
    }
}

impl McpBridge {
    /// Binds every proxy in `proxies`.
    #[must_use]
    pub fn from_proxies(proxies: &ProxySet) -> Self {
        let mut bindings = IndexMap::with_capacity(proxies.len());

        for (qualified, proxy) in proxies.iter() {
            match bindings.entry(proxy.name().to_owned()) {
                Entry::Vacant(slot) => {
                    slot.insert(Binding {
                        tool: McpTool {
                            name: proxy.name().to_owned(),
                            description: format!("Lambda-backed tool {qualified}"),
                            input_schema: input_schema(proxy.params_schema()),
                        },
                        proxy: proxy.clone(),
                    });
                }
                Entry::Occupied(slot) => warn!(
                    tool = %slot.key(),
                    shadowed = qualified,
                    "tool name already bridged; skipping proxy"
                ),
            }
        }

        Self { bindings }
    }

    /// Lists bridged tools in directory order.
    #[must_use]
    pub fn list_tools(&self) -> Vec<McpTool> {
        self.bindings
            .values()
            .map(|binding| binding.tool.clone())
            .collect()
    }

    /// Returns the number of bridged tools.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// Returns `true` if nothing was bridged.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Calls the tool `name` with the given arguments.
    ///
    /// Missing or `null` arguments are sent as an empty object.
    ///
    /// # Errors
    ///
    /// Returns [`McpError::UnknownTool`], [`McpError::InvalidArguments`], or
    /// the proxy failure wrapped in [`McpError::Proxy`].
    pub async fn call_tool(&self, name: &str, arguments: Option<Value>) -> McpResult<Value> {
        let binding = self
            .bindings
            .get(name)
            .ok_or_else(|| McpError::UnknownTool {
                name: name.to_owned(),
            })?;

        let params = match arguments {
            None | Some(Value::Null) => Map::new(),
            Some(Value::Object(params)) => params,
            Some(_) => return Err(McpError::InvalidArguments),
        };

        debug!(tool = name, proxy = %binding.proxy.qualified_name(), "bridging tool call");
        Ok(binding.proxy.call(params).await?)
    }
}

fn input_schema(params_schema: &Value) -> Value {
    if params_schema.get("type").and_then(Value::as_str) == Some("object") {
        params_schema.clone()
    } else {
        json!({"type": "object"})
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;

    use toolforest_primitives::DirectoryEntry;
    use toolforest_remote::{LocalTransport, ProxyBuilder, Transport};

    fn entry(name: &str, endpoint: &str) -> DirectoryEntry {
        DirectoryEntry {
            toolset_id: name.to_owned(),
            name: name.to_owned(),
            lambda_function_arn: endpoint.to_owned(),
            alias: "test".to_owned(),
            alias_arn: None,
            version: "1".to_owned(),
            manifest_version: String::new(),
        }
    }

    async fn bridge(entries: &[DirectoryEntry]) -> McpBridge {
        let transport: Arc<dyn Transport> = Arc::new(
            LocalTransport::new()
                .with_endpoint("local:math", toolset_math::dispatcher("test").unwrap())
                .with_endpoint("local:calc", toolset_math::dispatcher("test").unwrap()),
        );
        let proxies = ProxyBuilder::new(transport).build(entries).await;
        McpBridge::from_proxies(&proxies)
    }

    #[tokio::test]
    async fn list_tools_strips_toolset_prefix() {
        let bridge = bridge(&[entry("math", "local:math")]).await;

        let tools = bridge.list_tools();
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0].name, "add");
        assert_eq!(tools[0].description, "Lambda-backed tool math.add");
        assert_eq!(tools[0].input_schema["type"], "object");
        assert!(tools[0].input_schema["properties"]["x"].is_object());
    }

    #[tokio::test]
    async fn call_tool_reaches_remote_toolset() {
        let bridge = bridge(&[entry("math", "local:math")]).await;

        let result = bridge
            .call_tool("add", Some(json!({"x": 3, "y": 4})))
            .await
            .unwrap();
        assert_eq!(result, json!({"value": 7.0}));
    }

    #[tokio::test]
    async fn first_toolset_wins_name_clash() {
        let bridge = bridge(&[entry("math", "local:math"), entry("calc", "local:calc")]).await;

        let tools = bridge.list_tools();
        assert_eq!(bridge.len(), 1);
        assert_eq!(tools[0].description, "Lambda-backed tool math.add");
    }

    #[tokio::test]
    async fn call_errors() {
        let bridge = bridge(&[entry("math", "local:math")]).await;

        assert!(matches!(
            bridge.call_tool("mul", None).await,
            Err(McpError::UnknownTool { name }) if name == "mul"
        ));
        assert!(matches!(
            bridge.call_tool("add", Some(json!([1, 2]))).await,
            Err(McpError::InvalidArguments)
        ));
        match bridge.call_tool("add", None).await {
            Err(McpError::Proxy(ProxyError::Remote { kind, .. })) => {
                assert_eq!(kind, "ValidationError");
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn non_object_schemas_are_replaced() {
        assert_eq!(input_schema(&Value::Null), json!({"type": "object"}));
        let declared = json!({"type": "object", "properties": {"q": {}}});
        assert_eq!(input_schema(&declared), declared);
    }
}
