//! Point-to-point request transport.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use toolforest_primitives::RequestEnvelope;
use toolforest_runtime::Dispatcher;

/// Failure to complete a call at the transport level.
///
/// Application-level `{"error": ...}` responses are delivered as successful
/// transport calls and never surface as this type.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The endpoint could not be reached or did not answer.
    #[error("endpoint `{endpoint}` is unavailable: {reason}")]
    Unavailable {
        /// Endpoint reference that was called.
        endpoint: String,
        /// Human-readable failure detail.
        reason: String,
    },
    /// The request or response body could not be encoded or decoded.
    #[error("payload exchanged with `{endpoint}` is not valid JSON: {reason}")]
    Codec {
        /// Endpoint reference that was called.
        endpoint: String,
        /// Human-readable failure detail.
        reason: String,
    },
}

impl TransportError {
    /// Convenience constructor for [`TransportError::Unavailable`].
    #[must_use]
    pub fn unavailable(endpoint: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Unavailable {
            endpoint: endpoint.into(),
            reason: reason.into(),
        }
    }
}

/// Synchronous request/response invocation of a remote toolset.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Sends `request` to `endpoint` and returns the decoded response body.
    async fn invoke(&self, endpoint: &str, request: &RequestEnvelope)
    -> Result<Value, TransportError>;
}

/// Transport that serves endpoints from in-process dispatchers.
///
/// Requests still cross a JSON byte boundary, so callers observe exactly what
/// a deployed toolset would return.
#[derive(Clone, Default)]
pub struct LocalTransport {
    endpoints: HashMap<String, Arc<Dispatcher>>,
}

impl fmt::Debug for LocalTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut endpoints: Vec<_> = self.endpoints.keys().collect();
        endpoints.sort();
        f.debug_struct("LocalTransport")
            .field("endpoints", &endpoints)
            .finish()
    }
}

impl LocalTransport {
    /// Creates a transport with no endpoints.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `endpoint` to `dispatcher`, returning the transport for chaining.
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>, dispatcher: Dispatcher) -> Self {
        self.bind(endpoint, dispatcher);
        self
    }

    /// Binds `endpoint` to `dispatcher`, replacing any previous binding.
    pub fn bind(&mut self, endpoint: impl Into<String>, dispatcher: Dispatcher) {
        self.endpoints.insert(endpoint.into(), Arc::new(dispatcher));
    }
}

#[async_trait]
impl Transport for LocalTransport {
    async fn invoke(
        &self,
        endpoint: &str,
        request: &RequestEnvelope,
    ) -> Result<Value, TransportError> {
        let dispatcher = self
            .endpoints
            .get(endpoint)
            .ok_or_else(|| TransportError::unavailable(endpoint, "no dispatcher bound"))?;

        let payload = serde_json::to_vec(request).map_err(|err| TransportError::Codec {
            endpoint: endpoint.to_owned(),
            reason: err.to_string(),
        })?;
        let body = dispatcher.handle_slice(&payload).await;
        if body.is_empty() {
            return Ok(Value::Object(serde_json::Map::new()));
        }

        serde_json::from_slice(&body).map_err(|err| TransportError::Codec {
            endpoint: endpoint.to_owned(),
            reason: err.to_string(),
        })
    }
}
