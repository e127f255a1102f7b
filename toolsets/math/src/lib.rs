//! Arithmetic toolset.

#![warn(missing_docs, clippy::pedantic)]

use std::sync::Arc;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use toolforest_runtime::{Dispatcher, ToolRegistry, ToolResult};

/// Toolset name advertised by `describe_tools`.
pub const TOOLSET_NAME: &str = "math";
/// Toolset version advertised by `describe_tools`.
pub const TOOLSET_VERSION: &str = "0.1.0";

/// Parameters of [`add`].
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AddParams {
    /// First addend
    pub x: f64,
    /// Second addend
    pub y: f64,
}

/// Result of [`add`].
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AddResult {
    /// Sum
    pub value: f64,
}

/// Add two numbers.
///
/// # Errors
///
/// Never fails; the signature matches the registry's handler shape.
#[allow(clippy::unused_async)]
pub async fn add(params: AddParams) -> ToolResult<AddResult> {
    Ok(AddResult {
        value: params.x + params.y,
    })
}

/// Builds the registry holding every math tool.
///
/// # Errors
///
/// Propagates registration failures.
pub fn registry() -> ToolResult<ToolRegistry> {
    let mut registry = ToolRegistry::new().with_toolset(TOOLSET_NAME, TOOLSET_VERSION);
    registry.register_typed("add", "Add two numbers.", add)?;
    Ok(registry)
}

/// Builds a dispatcher serving the math toolset in `environment`.
///
/// # Errors
///
/// Propagates registration failures.
pub fn dispatcher(environment: &str) -> ToolResult<Dispatcher> {
    Ok(Dispatcher::new(Arc::new(registry()?)).with_environment(environment))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn add_unit() {
        let result = add(AddParams { x: 1.0, y: 2.0 }).await.unwrap();
        assert!((result.value - 3.0).abs() < f64::EPSILON);
    }

    #[test]
    fn registry_is_named() {
        let registry = registry().unwrap();
        assert_eq!(registry.toolset_name(), "math");
        assert_eq!(registry.toolset_version(), "0.1.0");
        assert_eq!(registry.names(), vec!["add"]);
    }
}
