//! Toolset manifest returned by the `describe_tools` action.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Toolset name reported when a registry was never given one.
pub const UNKNOWN_TOOLSET: &str = "unknown";
/// Toolset version reported when a registry was never given one.
pub const UNKNOWN_TOOLSET_VERSION: &str = "0.0.0";

fn unknown_toolset() -> String {
    UNKNOWN_TOOLSET.to_owned()
}

fn unknown_toolset_version() -> String {
    UNKNOWN_TOOLSET_VERSION.to_owned()
}

/// Description of every tool a toolset exposes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    /// Toolset name.
    #[serde(default = "unknown_toolset")]
    pub toolset: String,
    /// Toolset version string.
    #[serde(default = "unknown_toolset_version")]
    pub toolset_version: String,
    /// ISO-8601 UTC timestamp at which the manifest was generated; empty
    /// when the toolset did not report one.
    #[serde(default)]
    pub manifest_version: String,
    /// Tool descriptors in registration order.
    #[serde(default)]
    pub tools: Vec<ToolDescriptor>,
}

impl Manifest {
    /// Looks up a tool descriptor by name.
    #[must_use]
    pub fn tool(&self, name: &str) -> Option<&ToolDescriptor> {
        self.tools.iter().find(|tool| tool.name == name)
    }
}

/// Introspectable description of one tool.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDescriptor {
    /// Tool name, unique within the toolset.
    pub name: String,
    /// Human-readable documentation.
    #[serde(default)]
    pub doc: String,
    /// JSON Schema of the parameter object.
    #[serde(default)]
    pub params_schema: Value,
    /// JSON Schema of the result object.
    #[serde(default)]
    pub result_schema: Value,
}

impl ToolDescriptor {
    /// Returns the top-level parameter names declared by the parameter schema,
    /// in declaration order.
    #[must_use]
    pub fn parameter_names(&self) -> Vec<String> {
        self.params_schema
            .get("properties")
            .and_then(Value::as_object)
            .map(|properties| properties.keys().cloned().collect())
            .unwrap_or_default()
    }
}
