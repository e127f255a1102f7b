//! Per-request telemetry records.

use std::time::Instant;

use serde::Serialize;
use tracing::info;
use uuid::Uuid;

/// Tracing target under which request records are emitted.
pub const REQUEST_TARGET: &str = "toolforest::request";

/// Terminal outcome of a dispatched request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    /// The response carried a `result`.
    Ok,
    /// The response carried an `error`.
    Error,
}

impl Outcome {
    /// Returns the lowercase label used in log fields.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Error => "error",
        }
    }
}

/// One completed request, as written to the log.
///
/// Carries whether a caller token was present, never the token itself.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RequestRecord {
    /// Identifier generated for the request.
    pub request_id: Uuid,
    /// Deployment environment of the serving process.
    pub env: String,
    /// Requested action, as sent by the caller.
    pub action: Option<String>,
    /// Wall-clock time spent handling the request.
    pub duration_ms: u64,
    /// Whether the caller supplied a bearer token.
    pub has_user_token: bool,
    /// Terminal outcome.
    pub outcome: Outcome,
    /// Error category when `outcome` is [`Outcome::Error`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_type: Option<String>,
}

impl RequestRecord {
    /// Emits the record at `info` level on [`REQUEST_TARGET`].
    pub fn emit(&self) {
        info!(
            target: REQUEST_TARGET,
            event = "tool_request",
            request_id = %self.request_id,
            env = %self.env,
            action = self.action.as_deref().unwrap_or(""),
            duration_ms = self.duration_ms,
            has_user_token = self.has_user_token,
            outcome = self.outcome.as_str(),
            error_type = self.error_type.as_deref().unwrap_or(""),
            "request handled"
        );
    }
}

/// Measures one request from arrival to response.
#[derive(Debug)]
pub struct RequestTelemetry {
    request_id: Uuid,
    started: Instant,
    env: String,
    action: Option<String>,
    has_user_token: bool,
}

impl RequestTelemetry {
    /// Starts timing a request.
    #[must_use]
    pub fn start(env: impl Into<String>, action: Option<&str>, has_user_token: bool) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            started: Instant::now(),
            env: env.into(),
            action: action.map(ToOwned::to_owned),
            has_user_token,
        }
    }

    /// Returns the identifier assigned to the request.
    #[must_use]
    pub const fn request_id(&self) -> Uuid {
        self.request_id
    }

    /// Stops the clock, emits the record, and returns it.
    pub fn finish(self, error_type: Option<&str>) -> RequestRecord {
        let duration_ms = u64::try_from(self.started.elapsed().as_millis()).unwrap_or(u64::MAX);
        let record = RequestRecord {
            request_id: self.request_id,
            env: self.env,
            action: self.action,
            duration_ms,
            has_user_token: self.has_user_token,
            outcome: if error_type.is_some() {
                Outcome::Error
            } else {
                Outcome::Ok
            },
            error_type: error_type.map(ToOwned::to_owned),
        };
        record.emit();
        record
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finish_reports_outcome() {
        let telemetry = RequestTelemetry::start("dev", Some("invoke"), true);
        let id = telemetry.request_id();
        let record = telemetry.finish(Some("BadRequest"));

        assert_eq!(record.request_id, id);
        assert_eq!(record.action.as_deref(), Some("invoke"));
        assert_eq!(record.outcome, Outcome::Error);
        assert_eq!(record.error_type.as_deref(), Some("BadRequest"));
        assert!(record.has_user_token);
    }

    #[test]
    fn serialized_record_never_contains_a_token_field() {
        let record = RequestTelemetry::start("prod", None, false).finish(None);
        let encoded = serde_json::to_value(&record).unwrap();

        assert_eq!(encoded["outcome"], "ok");
        assert_eq!(encoded["has_user_token"], false);
        assert!(encoded.get("error_type").is_none());
        assert!(encoded.get("user_token").is_none());
    }
}
