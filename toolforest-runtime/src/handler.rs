//! Request dispatcher serving the `describe_tools` / `invoke` protocol.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use serde_json::Value;
use toolforest_primitives::{
    CallContext, ErrorKind, Manifest, RequestEnvelope, ResponseEnvelope, RpcError,
};
use toolforest_telemetry::RequestTelemetry;
use tracing::{debug, error, warn};

use crate::context::InvocationContext;
use crate::registry::{ToolError, ToolRegistry};
use crate::schema::Diagnostic;

const DEFAULT_ENVIRONMENT: &str = "dev";
const MANIFEST_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";
const ENCODE_FAILURE: &[u8] =
    br#"{"error":{"type":"InternalError","message":"failed to encode response"}}"#;

/// Serves requests against a frozen [`ToolRegistry`].
///
/// Every call converges on a [`ResponseEnvelope`]; faults raised by tool
/// implementations, panics included, never cross this boundary.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    registry: Arc<ToolRegistry>,
    environment: String,
}

impl Dispatcher {
    /// Creates a dispatcher for the `dev` environment.
    #[must_use]
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self {
            registry,
            environment: DEFAULT_ENVIRONMENT.to_owned(),
        }
    }

    /// Sets the environment name reported in request telemetry.
    #[must_use]
    pub fn with_environment(mut self, environment: impl Into<String>) -> Self {
        self.environment = environment.into();
        self
    }

    /// Returns the registry being served.
    #[must_use]
    pub fn registry(&self) -> &Arc<ToolRegistry> {
        &self.registry
    }

    /// Returns the environment name.
    #[must_use]
    pub fn environment(&self) -> &str {
        &self.environment
    }

    /// Builds the `describe_tools` payload, stamped with the current UTC time.
    #[must_use]
    pub fn manifest(&self) -> Manifest {
        Manifest {
            toolset: self.registry.toolset_name().to_owned(),
            toolset_version: self.registry.toolset_version().to_owned(),
            manifest_version: chrono::Utc::now()
                .format(MANIFEST_TIMESTAMP_FORMAT)
                .to_string(),
            tools: self.registry.describe(),
        }
    }

    /// Handles one decoded request envelope.
    ///
    /// The caller's token is installed as the [`InvocationContext`] before
    /// routing, and one telemetry record is emitted per call.
    pub async fn handle(&self, request: &Value) -> ResponseEnvelope {
        let call_context = CallContext::from_envelope(request);
        let action = request.get("action").and_then(Value::as_str);
        let telemetry =
            RequestTelemetry::start(&self.environment, action, call_context.user_token.is_some());

        let routed = InvocationContext::from(&call_context)
            .scope(AssertUnwindSafe(self.route(request)).catch_unwind())
            .await;

        let response = match routed {
            Ok(outcome) => ResponseEnvelope::from(outcome),
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                error!(
                    request_id = %telemetry.request_id(),
                    panic = %message,
                    "tool implementation panicked"
                );
                ResponseEnvelope::from_error(RpcError::internal(message))
            }
        };

        telemetry.finish(response.error().map(|body| body.kind.as_str()));
        response
    }

    /// Handles one raw request payload and returns the encoded response.
    ///
    /// Payloads that are not valid JSON yield a `BadRequest` response.
    pub async fn handle_slice(&self, payload: &[u8]) -> Vec<u8> {
        let response = match serde_json::from_slice::<Value>(payload) {
            Ok(request) => self.handle(&request).await,
            Err(err) => {
                let telemetry = RequestTelemetry::start(&self.environment, None, false);
                let response = ResponseEnvelope::from_error(RpcError::bad_request(format!(
                    "request is not valid JSON: {err}"
                )));
                telemetry.finish(Some(ErrorKind::BadRequest.as_str()));
                response
            }
        };

        serde_json::to_vec(&response).unwrap_or_else(|err| {
            error!(%err, "failed to encode response envelope");
            ENCODE_FAILURE.to_vec()
        })
    }

    async fn route(&self, request: &Value) -> Result<Value, RpcError> {
        match RequestEnvelope::from_value(request)? {
            RequestEnvelope::DescribeTools { .. } => {
                debug!(tools = self.registry.len(), "describing toolset");
                serde_json::to_value(self.manifest()).map_err(|err| {
                    RpcError::internal(format!("failed to encode manifest: {err}"))
                })
            }
            RequestEnvelope::Invoke { method, params, .. } => {
                self.invoke(&method, Value::Object(params)).await
            }
        }
    }

    async fn invoke(&self, method: &str, params: Value) -> Result<Value, RpcError> {
        let spec = self
            .registry
            .get(method)
            .ok_or_else(|| RpcError::bad_request(format!("unknown method `{method}`")))?;

        spec.params_schema()
            .validate(&params)
            .map_err(|diagnostics| validation_error(&diagnostics))?;

        let result = spec.call(params).await.map_err(|err| match err {
            ToolError::InvalidParams { diagnostics } => validation_error(&diagnostics),
            ToolError::Execution { reason } => RpcError::internal(reason),
            other => RpcError::internal(other.to_string()),
        })?;

        if let Err(diagnostics) = spec.result_schema().validate(&result) {
            warn!(
                method,
                problems = diagnostics.len(),
                "tool result does not match its declared schema"
            );
            return Err(RpcError::internal(format!(
                "tool `{method}` returned a non-conforming result: {}",
                render(&diagnostics)
            )));
        }

        Ok(result)
    }
}

fn validation_error(diagnostics: &[Diagnostic]) -> RpcError {
    RpcError::validation(render(diagnostics))
}

fn render(diagnostics: &[Diagnostic]) -> String {
    serde_json::to_string(diagnostics).unwrap_or_else(|_| format!("{diagnostics:?}"))
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|message| (*message).to_owned())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "tool implementation panicked".to_owned())
}
