//! Request and response envelopes exchanged over the transport.

use std::fmt::{self, Display, Formatter};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Action name used to request a toolset manifest.
pub const ACTION_DESCRIBE_TOOLS: &str = "describe_tools";
/// Action name used to invoke a single tool.
pub const ACTION_INVOKE: &str = "invoke";

/// Error categories emitted by a dispatching service.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Malformed envelope, unknown action or method, or mistyped fields.
    BadRequest,
    /// Parameters were present but failed schema validation.
    ValidationError,
    /// The implementation failed or returned a non-conforming result.
    InternalError,
}

impl ErrorKind {
    /// Returns the stable wire name of the kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::BadRequest => "BadRequest",
            Self::ValidationError => "ValidationError",
            Self::InternalError => "InternalError",
        }
    }
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Typed failure produced while serving a request.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct RpcError {
    kind: ErrorKind,
    message: String,
}

impl RpcError {
    /// Creates an error of the supplied kind.
    #[must_use]
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Creates a [`ErrorKind::BadRequest`] error.
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::BadRequest, message)
    }

    /// Creates a [`ErrorKind::ValidationError`] error.
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ValidationError, message)
    }

    /// Creates a [`ErrorKind::InternalError`] error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InternalError, message)
    }

    /// Returns the error category.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns the human-readable message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// The `error` object of a failed response.
///
/// Both fields decode as empty strings when a peer omits them.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Error category name, e.g. `BadRequest`.
    #[serde(rename = "type", default)]
    pub kind: String,
    /// Human-readable detail.
    #[serde(default)]
    pub message: String,
}

impl From<RpcError> for ErrorBody {
    fn from(value: RpcError) -> Self {
        Self {
            kind: value.kind.as_str().to_owned(),
            message: value.message,
        }
    }
}

/// Response envelope: exactly one of `result` or `error`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseEnvelope {
    /// Successful call payload.
    Result(Value),
    /// Failed call description.
    Error(ErrorBody),
}

impl ResponseEnvelope {
    /// Wraps a typed error into an error envelope.
    #[must_use]
    pub fn from_error(error: RpcError) -> Self {
        Self::Error(error.into())
    }

    /// Returns `true` for error envelopes.
    #[must_use]
    pub const fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }

    /// Returns the error body, if any.
    #[must_use]
    pub fn error(&self) -> Option<&ErrorBody> {
        match self {
            Self::Error(body) => Some(body),
            Self::Result(_) => None,
        }
    }

    /// Converts the envelope into a standard result.
    ///
    /// # Errors
    ///
    /// Returns the [`ErrorBody`] when the envelope carries an error.
    pub fn into_result(self) -> std::result::Result<Value, ErrorBody> {
        match self {
            Self::Result(value) => Ok(value),
            Self::Error(body) => Err(body),
        }
    }
}

impl From<std::result::Result<Value, RpcError>> for ResponseEnvelope {
    fn from(value: std::result::Result<Value, RpcError>) -> Self {
        match value {
            Ok(result) => Self::Result(result),
            Err(err) => Self::from_error(err),
        }
    }
}

/// Caller identity carried alongside a request.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallContext {
    /// Opaque bearer token of the caller.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_token: Option<String>,
}

impl CallContext {
    /// Creates a context carrying the supplied bearer token.
    #[must_use]
    pub fn with_user_token(token: impl Into<String>) -> Self {
        Self {
            user_token: Some(token.into()),
        }
    }

    /// Returns the bearer token, or the empty string when none was supplied.
    #[must_use]
    pub fn user_token(&self) -> &str {
        self.user_token.as_deref().unwrap_or_default()
    }

    /// Extracts the caller context from a raw envelope without validating the
    /// rest of it. Missing or non-string tokens yield the empty token.
    #[must_use]
    pub fn from_envelope(envelope: &Value) -> Self {
        let token = envelope
            .get("context")
            .and_then(|ctx| ctx.get("userToken"))
            .and_then(Value::as_str)
            .filter(|token| !token.is_empty());

        Self {
            user_token: token.map(ToOwned::to_owned),
        }
    }
}

/// Inbound request envelope.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum RequestEnvelope {
    /// Requests the toolset manifest.
    DescribeTools {
        /// Optional caller context.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        context: Option<CallContext>,
    },
    /// Invokes one registered tool.
    Invoke {
        /// Registered tool name.
        method: String,
        /// Named parameters.
        params: Map<String, Value>,
        /// Optional caller context.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        context: Option<CallContext>,
    },
}

impl RequestEnvelope {
    /// Builds a `describe_tools` request.
    #[must_use]
    pub const fn describe_tools() -> Self {
        Self::DescribeTools { context: None }
    }

    /// Builds an `invoke` request.
    #[must_use]
    pub fn invoke(method: impl Into<String>, params: Map<String, Value>) -> Self {
        Self::Invoke {
            method: method.into(),
            params,
            context: None,
        }
    }

    /// Attaches a caller context.
    #[must_use]
    pub fn with_context(mut self, ctx: CallContext) -> Self {
        match &mut self {
            Self::DescribeTools { context } | Self::Invoke { context, .. } => *context = Some(ctx),
        }
        self
    }

    /// Returns the wire name of the action.
    #[must_use]
    pub const fn action(&self) -> &'static str {
        match self {
            Self::DescribeTools { .. } => ACTION_DESCRIBE_TOOLS,
            Self::Invoke { .. } => ACTION_INVOKE,
        }
    }

    /// Returns the caller context, if one was attached.
    #[must_use]
    pub fn context(&self) -> Option<&CallContext> {
        match self {
            Self::DescribeTools { context } | Self::Invoke { context, .. } => context.as_ref(),
        }
    }

    /// Decodes a raw inbound envelope.
    ///
    /// # Errors
    ///
    /// Returns a [`ErrorKind::BadRequest`] error when the envelope is not an
    /// object, the action is missing or unknown, or the `invoke` fields are
    /// missing or mistyped.
    pub fn from_value(value: &Value) -> std::result::Result<Self, RpcError> {
        let Some(object) = value.as_object() else {
            return Err(RpcError::bad_request("request envelope must be a JSON object"));
        };

        let context = Some(CallContext::from_envelope(value)).filter(|ctx| ctx.user_token.is_some());

        match object.get("action").and_then(Value::as_str) {
            Some(ACTION_DESCRIBE_TOOLS) => Ok(Self::DescribeTools { context }),
            Some(ACTION_INVOKE) => {
                let method = match object.get("method") {
                    Some(Value::String(method)) => method.clone(),
                    Some(_) => return Err(RpcError::bad_request("'method' must be a string")),
                    None => return Err(RpcError::bad_request("'method' is required")),
                };
                let params = match object.get("params") {
                    Some(Value::Object(params)) => params.clone(),
                    Some(_) => return Err(RpcError::bad_request("'params' must be an object")),
                    None => return Err(RpcError::bad_request("'params' is required")),
                };
                Ok(Self::Invoke {
                    method,
                    params,
                    context,
                })
            }
            Some(other) => Err(RpcError::bad_request(format!("unknown action `{other}`"))),
            None => Err(RpcError::bad_request("'action' must be a string")),
        }
    }
}
