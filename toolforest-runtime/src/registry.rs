//! Start-up registry of the tools a toolset exposes.

use std::future::Future;

use indexmap::IndexMap;
use schemars::JsonSchema;
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use toolforest_primitives::{ToolDescriptor, UNKNOWN_TOOLSET, UNKNOWN_TOOLSET_VERSION};

use crate::schema::Diagnostic;
use crate::spec::ToolSpec;

/// Result alias for tool operations.
pub type ToolResult<T> = Result<T, ToolError>;

/// Registry that stores tool specifications keyed by name.
///
/// Populated once during start-up through `&mut self`, then frozen behind an
/// `Arc` and shared read-only with the dispatcher. Iteration follows
/// registration order.
#[derive(Default)]
pub struct ToolRegistry {
    tools: IndexMap<String, ToolSpec>,
    toolset_name: Option<String>,
    toolset_version: Option<String>,
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<_> = self.tools.keys().cloned().collect();
        f.debug_struct("ToolRegistry")
            .field("toolset", &self.toolset_name())
            .field("version", &self.toolset_version())
            .field("registered", &names)
            .finish()
    }
}

impl ToolRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the toolset identity, returning the registry for chaining.
    #[must_use]
    pub fn with_toolset(mut self, name: impl Into<String>, version: impl Into<String>) -> Self {
        self.set_toolset(name, version);
        self
    }

    /// Sets the toolset identity reported by `describe_tools`.
    pub fn set_toolset(&mut self, name: impl Into<String>, version: impl Into<String>) {
        self.toolset_name = Some(name.into());
        self.toolset_version = Some(version.into());
    }

    /// Returns the toolset name, or `"unknown"` when unset.
    #[must_use]
    pub fn toolset_name(&self) -> &str {
        self.toolset_name.as_deref().unwrap_or(UNKNOWN_TOOLSET)
    }

    /// Returns the toolset version, or `"0.0.0"` when unset.
    #[must_use]
    pub fn toolset_version(&self) -> &str {
        self.toolset_version
            .as_deref()
            .unwrap_or(UNKNOWN_TOOLSET_VERSION)
    }

    /// Registers a tool specification.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::DuplicateTool`] if the name is already present;
    /// the existing registration is left untouched.
    pub fn register(&mut self, spec: ToolSpec) -> ToolResult<()> {
        let name = spec.name().to_owned();
        if self.tools.contains_key(&name) {
            return Err(ToolError::DuplicateTool { name });
        }

        self.tools.insert(name, spec);
        Ok(())
    }

    /// Builds and registers a typed tool in one step.
    ///
    /// # Errors
    ///
    /// Propagates schema and metadata errors from [`ToolSpec::typed`] and
    /// returns [`ToolError::DuplicateTool`] on a name collision.
    pub fn register_typed<P, R, F, Fut>(
        &mut self,
        name: impl Into<String>,
        doc: impl Into<String>,
        handler: F,
    ) -> ToolResult<()>
    where
        P: DeserializeOwned + JsonSchema + Send + 'static,
        R: Serialize + JsonSchema + Send + 'static,
        F: Fn(P) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ToolResult<R>> + Send + 'static,
    {
        self.register(ToolSpec::typed(name, doc, handler)?)
    }

    /// Returns the specification matching the supplied name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ToolSpec> {
        self.tools.get(name)
    }

    /// Lists registered tool names in registration order.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(String::as_str).collect()
    }

    /// Renders one descriptor per registered tool.
    #[must_use]
    pub fn describe(&self) -> Vec<ToolDescriptor> {
        self.tools.values().map(ToolSpec::descriptor).collect()
    }

    /// Returns the number of registered tools.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Returns `true` if no tools are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

/// Errors produced by tool registration and invocation.
#[derive(Debug, Error)]
pub enum ToolError {
    /// Tool metadata failed validation.
    #[error("invalid tool metadata: {reason}")]
    InvalidMetadata {
        /// Human-readable reason for rejection.
        reason: String,
    },

    /// A parameter or result schema is unusable.
    #[error("invalid tool schema: {reason}")]
    InvalidSchema {
        /// Human-readable reason for rejection.
        reason: String,
    },

    /// Tool name collided with an existing registration.
    #[error("tool `{name}` is already registered")]
    DuplicateTool {
        /// Name of the offending tool.
        name: String,
    },

    /// Parameters could not be coerced into the tool's input type.
    #[error("invalid parameters ({} problem(s))", diagnostics.len())]
    InvalidParams {
        /// Structured validator output.
        diagnostics: Vec<Diagnostic>,
    },

    /// Tool execution failed.
    #[error("tool execution failed: {reason}")]
    Execution {
        /// Human-readable error returned by the tool implementation.
        reason: String,
    },
}

impl ToolError {
    /// Creates an execution error from the supplied reason.
    #[must_use]
    pub fn execution(reason: impl Into<String>) -> Self {
        Self::Execution {
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use schemars::JsonSchema;
    use serde::Deserialize;
    use serde_json::{Value, json};

    use crate::schema::Schema;
    use crate::spec::ToolFuture;

    #[derive(Deserialize, JsonSchema)]
    struct Payload {
        message: String,
    }

    #[derive(Serialize, JsonSchema)]
    struct Echoed {
        message: String,
    }

    fn echo_spec(name: &str) -> ToolSpec {
        ToolSpec::typed(name, "Echo incoming payload", |params: Payload| async move {
            Ok(Echoed {
                message: params.message,
            })
        })
        .unwrap()
    }

    #[tokio::test]
    async fn register_and_invoke_tool() {
        let mut registry = ToolRegistry::new();
        registry.register(echo_spec("echo")).unwrap();

        let payload = json!({ "message": "hello" });
        let output = registry.get("echo").unwrap().call(payload.clone()).await.unwrap();
        assert_eq!(output, payload);
    }

    #[tokio::test]
    async fn register_boxed_executor() {
        fn passthrough(input: Value) -> ToolFuture {
            Box::pin(async move { Ok(input) })
        }

        let object = || Schema::from_value(json!({"type": "object"})).unwrap();
        let spec = ToolSpec::builder("passthrough")
            .params_schema(object())
            .result_schema(object())
            .handler(passthrough)
            .build()
            .unwrap();

        let mut registry = ToolRegistry::new();
        registry.register(spec).unwrap();

        let payload = json!({ "message": "binding" });
        let output = registry
            .get("passthrough")
            .unwrap()
            .call(payload.clone())
            .await
            .unwrap();
        assert_eq!(output, payload);
    }

    #[test]
    fn duplicate_registration_errors() {
        let mut registry = ToolRegistry::new();
        registry.register(echo_spec("echo")).unwrap();

        let err = registry
            .register(echo_spec("echo"))
            .expect_err("duplicate registration should fail");

        assert!(matches!(err, ToolError::DuplicateTool { name } if name == "echo"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn same_name_in_distinct_registries() {
        let mut first = ToolRegistry::new();
        let mut second = ToolRegistry::new();

        first.register(echo_spec("echo")).unwrap();
        second.register(echo_spec("echo")).unwrap();

        assert_eq!(first.names(), vec!["echo"]);
        assert_eq!(second.names(), vec!["echo"]);
    }

    #[test]
    fn lookup_of_missing_tool_is_none() {
        let mut registry = ToolRegistry::new();
        registry.register(echo_spec("echo")).unwrap();

        assert!(registry.get("missing").is_none());
        assert!(registry.get("echo").is_some());
    }

    #[test]
    fn describe_follows_registration_order() {
        let mut registry = ToolRegistry::new().with_toolset("text", "1.2.0");
        for name in ["zeta", "alpha", "mid"] {
            registry.register(echo_spec(name)).unwrap();
        }

        let names: Vec<_> = registry.describe().into_iter().map(|d| d.name).collect();
        assert_eq!(names, vec!["zeta", "alpha", "mid"]);
        assert_eq!(registry.toolset_name(), "text");
        assert_eq!(registry.toolset_version(), "1.2.0");
    }

    #[test]
    fn unnamed_toolset_uses_placeholders() {
        let registry = ToolRegistry::new();
        assert!(registry.is_empty());
        assert_eq!(registry.toolset_name(), "unknown");
        assert_eq!(registry.toolset_version(), "0.0.0");
    }
}
