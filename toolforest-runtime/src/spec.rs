//! Schema-typed tool specifications.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use toolforest_primitives::ToolDescriptor;

use crate::registry::{ToolError, ToolResult};
use crate::schema::{Diagnostic, Schema};

/// Future alias produced by boxed tool implementations.
pub type ToolFuture = Pin<Box<dyn Future<Output = ToolResult<Value>> + Send>>;

/// Trait implemented by tool executors.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Invokes the tool with already validated JSON parameters.
    async fn invoke(&self, params: Value) -> ToolResult<Value>;
}

#[async_trait]
impl<F, Fut> Tool for F
where
    F: Send + Sync + Fn(Value) -> Fut,
    Fut: Future<Output = ToolResult<Value>> + Send,
{
    async fn invoke(&self, params: Value) -> ToolResult<Value> {
        (self)(params).await
    }
}

/// A registrable tool: name, documentation, both schemas, and the callable.
#[derive(Clone)]
pub struct ToolSpec {
    name: String,
    doc: String,
    params_schema: Schema,
    result_schema: Schema,
    implementation: Arc<dyn Tool>,
}

impl fmt::Debug for ToolSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolSpec")
            .field("name", &self.name)
            .field("doc", &self.doc)
            .finish_non_exhaustive()
    }
}

impl ToolSpec {
    /// Starts building a tool specification.
    #[must_use]
    pub fn builder(name: impl Into<String>) -> ToolSpecBuilder {
        ToolSpecBuilder {
            name: name.into(),
            doc: String::new(),
            params_schema: None,
            result_schema: None,
            implementation: None,
        }
    }

    /// Builds a specification from a typed async function.
    ///
    /// Both schemas are derived from `P` and `R`. Parameters are deserialized
    /// into `P` after schema validation; a coercion failure is reported as
    /// [`ToolError::InvalidParams`].
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::InvalidMetadata`] for an empty name or
    /// [`ToolError::InvalidSchema`] when either type is not an object.
    pub fn typed<P, R, F, Fut>(
        name: impl Into<String>,
        doc: impl Into<String>,
        handler: F,
    ) -> ToolResult<Self>
    where
        P: DeserializeOwned + JsonSchema + Send + 'static,
        R: Serialize + JsonSchema + Send + 'static,
        F: Fn(P) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ToolResult<R>> + Send + 'static,
    {
        let handler = Arc::new(handler);
        Self::builder(name)
            .doc(doc)
            .params_schema(Schema::of::<P>()?)
            .result_schema(Schema::of::<R>()?)
            .handler(move |raw: Value| {
                let handler = Arc::clone(&handler);
                async move {
                    let params: P = serde_json::from_value(raw).map_err(|err| {
                        ToolError::InvalidParams {
                            diagnostics: vec![Diagnostic::root(err.to_string())],
                        }
                    })?;
                    let result = handler(params).await?;
                    serde_json::to_value(result).map_err(|err| {
                        ToolError::execution(format!("failed to serialize result: {err}"))
                    })
                }
            })
            .build()
    }

    /// Returns the tool name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the documentation string.
    #[must_use]
    pub fn doc(&self) -> &str {
        &self.doc
    }

    /// Returns the parameter schema.
    #[must_use]
    pub fn params_schema(&self) -> &Schema {
        &self.params_schema
    }

    /// Returns the result schema.
    #[must_use]
    pub fn result_schema(&self) -> &Schema {
        &self.result_schema
    }

    /// Renders the introspectable descriptor advertised by `describe_tools`.
    #[must_use]
    pub fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor {
            name: self.name.clone(),
            doc: self.doc.clone(),
            params_schema: self.params_schema.document().clone(),
            result_schema: self.result_schema.document().clone(),
        }
    }

    /// Executes the underlying implementation without any validation.
    ///
    /// # Errors
    ///
    /// Propagates any error returned by the implementation.
    pub async fn call(&self, params: Value) -> ToolResult<Value> {
        self.implementation.invoke(params).await
    }
}

/// Builder for [`ToolSpec`].
pub struct ToolSpecBuilder {
    name: String,
    doc: String,
    params_schema: Option<Schema>,
    result_schema: Option<Schema>,
    implementation: Option<Arc<dyn Tool>>,
}

impl fmt::Debug for ToolSpecBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolSpecBuilder")
            .field("name", &self.name)
            .field("params_schema", &self.params_schema.is_some())
            .field("result_schema", &self.result_schema.is_some())
            .field("implementation", &self.implementation.is_some())
            .finish_non_exhaustive()
    }
}

impl ToolSpecBuilder {
    /// Sets the documentation string. Surrounding whitespace is trimmed.
    #[must_use]
    pub fn doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = doc.into().trim().to_owned();
        self
    }

    /// Sets the parameter schema.
    #[must_use]
    pub fn params_schema(mut self, schema: Schema) -> Self {
        self.params_schema = Some(schema);
        self
    }

    /// Sets the result schema.
    #[must_use]
    pub fn result_schema(mut self, schema: Schema) -> Self {
        self.result_schema = Some(schema);
        self
    }

    /// Sets the implementation.
    #[must_use]
    pub fn handler<T>(mut self, tool: T) -> Self
    where
        T: Tool + 'static,
    {
        self.implementation = Some(Arc::new(tool));
        self
    }

    /// Finalizes the specification.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::InvalidMetadata`] when the name is blank or any
    /// of the schemas or the implementation is missing.
    pub fn build(self) -> ToolResult<ToolSpec> {
        if self.name.trim().is_empty() {
            return Err(ToolError::InvalidMetadata {
                reason: "tool name cannot be empty".into(),
            });
        }

        let missing = |part: &str| ToolError::InvalidMetadata {
            reason: format!("tool `{}` is missing its {part}", self.name),
        };
        let params_schema = self
            .params_schema
            .ok_or_else(|| missing("parameter schema"))?;
        let result_schema = self
            .result_schema
            .ok_or_else(|| missing("result schema"))?;
        let implementation = self
            .implementation
            .ok_or_else(|| missing("implementation"))?;

        Ok(ToolSpec {
            name: self.name,
            doc: self.doc,
            params_schema,
            result_schema,
            implementation,
        })
    }
}
