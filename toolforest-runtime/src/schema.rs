//! JSON Schema documents with attached validators.

use std::fmt;
use std::sync::Arc;

use jsonschema::JSONSchema;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::registry::{ToolError, ToolResult};

/// One validation failure reported against an instance.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// JSON pointer to the offending value; empty for the root.
    pub path: String,
    /// Human-readable description of the failure.
    pub message: String,
}

impl Diagnostic {
    /// Creates a diagnostic anchored at the instance root.
    #[must_use]
    pub fn root(message: impl Into<String>) -> Self {
        Self {
            path: String::new(),
            message: message.into(),
        }
    }
}

/// Structural type descriptor of a tool's parameters or result.
///
/// The document is always an object schema, so it can be both validated
/// against and rendered for introspection.
#[derive(Clone)]
pub struct Schema {
    document: Value,
    validator: Arc<JSONSchema>,
}

impl fmt::Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema")
            .field("document", &self.document)
            .finish_non_exhaustive()
    }
}

impl Schema {
    /// Derives the schema of a Rust type.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::InvalidSchema`] when `T` does not describe an
    /// object (for example a scalar or an enum).
    pub fn of<T: JsonSchema>() -> ToolResult<Self> {
        let root = schemars::schema_for!(T);
        let document = serde_json::to_value(&root).map_err(|err| ToolError::InvalidSchema {
            reason: format!("failed to render schema: {err}"),
        })?;
        Self::from_value(document)
    }

    /// Wraps an explicit JSON Schema document.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::InvalidSchema`] when the root is not an object
    /// schema or the document does not compile.
    pub fn from_value(document: Value) -> ToolResult<Self> {
        if document.get("type").and_then(Value::as_str) != Some("object") {
            return Err(ToolError::InvalidSchema {
                reason: "schema root must describe an object".into(),
            });
        }

        let validator = JSONSchema::compile(&document).map_err(|err| ToolError::InvalidSchema {
            reason: err.to_string(),
        })?;

        Ok(Self {
            document,
            validator: Arc::new(validator),
        })
    }

    /// Returns the JSON Schema document.
    #[must_use]
    pub fn document(&self) -> &Value {
        &self.document
    }

    /// Returns `true` when `instance` conforms to the schema.
    #[must_use]
    pub fn is_valid(&self, instance: &Value) -> bool {
        self.validator.is_valid(instance)
    }

    /// Validates `instance`, collecting every failure.
    ///
    /// # Errors
    ///
    /// Returns one [`Diagnostic`] per violated constraint.
    pub fn validate(&self, instance: &Value) -> Result<(), Vec<Diagnostic>> {
        self.validator.validate(instance).map_err(|errors| {
            errors
                .map(|err| Diagnostic {
                    path: err.instance_path.to_string(),
                    message: err.to_string(),
                })
                .collect()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[allow(dead_code)]
    #[derive(JsonSchema)]
    struct Point {
        x: f64,
        y: f64,
        label: Option<String>,
    }

    #[test]
    fn derived_schema_validates_instances() {
        let schema = Schema::of::<Point>().unwrap();
        assert_eq!(schema.document()["type"], "object");

        assert!(schema.is_valid(&json!({"x": 1.0, "y": 2})));
        assert!(schema.validate(&json!({"x": 1.0, "y": 2, "label": "p"})).is_ok());

        let diagnostics = schema.validate(&json!({"x": "one"})).unwrap_err();
        assert!(diagnostics.len() >= 2, "{diagnostics:?}");
        assert!(diagnostics.iter().any(|d| d.path == "/x"));
    }

    #[allow(dead_code)]
    #[derive(JsonSchema)]
    struct Window {
        stop: u32,
        start: u32,
        step: Option<u32>,
    }

    #[test]
    fn derived_properties_follow_field_order() {
        let schema = Schema::of::<Window>().unwrap();
        let names: Vec<_> = schema.document()["properties"]
            .as_object()
            .unwrap()
            .keys()
            .cloned()
            .collect();
        assert_eq!(names, vec!["stop", "start", "step"]);
    }

    #[test]
    fn scalar_schemas_are_rejected() {
        assert!(matches!(
            Schema::of::<u32>(),
            Err(ToolError::InvalidSchema { .. })
        ));
        assert!(matches!(
            Schema::from_value(json!({"type": "string"})),
            Err(ToolError::InvalidSchema { .. })
        ));
    }

    #[test]
    fn explicit_documents_compile() {
        let schema = Schema::from_value(json!({
            "type": "object",
            "properties": {"name": {"type": "string", "minLength": 1}},
            "required": ["name"]
        }))
        .unwrap();

        assert!(schema.is_valid(&json!({"name": "ada"})));
        let diagnostics = schema.validate(&json!({"name": ""})).unwrap_err();
        assert_eq!(diagnostics[0].path, "/name");
    }
}
