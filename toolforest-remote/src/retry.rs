//! Bounded exponential backoff for transport calls.

use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tokio::time::sleep;
use toolforest_config::RetrySettings;
use tracing::warn;

use crate::transport::TransportError;

/// Retry policy applied to every remote call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryConfig {
    max_attempts: usize,
    initial_delay: Duration,
    max_delay: Duration,
}

impl RetryConfig {
    /// Creates a new policy.
    #[must_use]
    pub const fn new(max_attempts: usize, initial_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts,
            initial_delay,
            max_delay,
        }
    }

    /// Returns the total number of attempts, including the first.
    #[must_use]
    pub const fn max_attempts(self) -> usize {
        self.max_attempts
    }

    /// Returns the delay before the second attempt.
    #[must_use]
    pub const fn initial_delay(self) -> Duration {
        self.initial_delay
    }

    /// Returns the delay cap.
    #[must_use]
    pub const fn max_delay(self) -> Duration {
        self.max_delay
    }

    /// Validates the policy.
    ///
    /// # Errors
    ///
    /// Returns [`RetryConfigError::InvalidConfig`] when no attempt is allowed
    /// or the delay bounds are inconsistent.
    pub fn validate(self) -> Result<(), RetryConfigError> {
        if self.max_attempts == 0 {
            return Err(RetryConfigError::InvalidConfig(
                "max attempts must be at least one",
            ));
        }
        if self.initial_delay > self.max_delay {
            return Err(RetryConfigError::InvalidConfig(
                "initial retry delay cannot exceed max retry delay",
            ));
        }
        Ok(())
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(2),
        }
    }
}

impl TryFrom<RetrySettings> for RetryConfig {
    type Error = RetryConfigError;

    fn try_from(settings: RetrySettings) -> Result<Self, Self::Error> {
        let config = Self::new(
            settings.max_attempts,
            settings.initial_delay(),
            settings.max_delay(),
        );
        config.validate()?;
        Ok(config)
    }
}

/// Errors raised by retry policy validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RetryConfigError {
    /// The policy was inconsistent.
    #[error("invalid retry configuration: {0}")]
    InvalidConfig(&'static str),
}

/// Final transport failure once the attempt budget is spent.
#[derive(Debug, Error)]
#[error("gave up after {attempts} attempt(s): {source}")]
pub struct RetryExhausted {
    /// Number of attempts made.
    pub attempts: usize,
    /// Failure of the last attempt.
    #[source]
    pub source: TransportError,
}

/// Runs `op` until it succeeds or the attempt budget is spent.
///
/// The delay starts at [`RetryConfig::initial_delay`] and doubles after every
/// failure, capped at [`RetryConfig::max_delay`]. A policy allowing zero
/// attempts still makes one.
///
/// # Errors
///
/// Returns [`RetryExhausted`] carrying the last [`TransportError`].
pub async fn retry_transport<T, F, Fut>(config: RetryConfig, mut op: F) -> Result<T, RetryExhausted>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, TransportError>>,
{
    let mut retry_delay = config.initial_delay();
    let mut attempt = 0;

    loop {
        attempt += 1;
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if attempt >= config.max_attempts() => {
                return Err(RetryExhausted {
                    attempts: attempt,
                    source: err,
                });
            }
            Err(err) => {
                warn!(%err, attempt, delay = ?retry_delay, "transport call failed; retrying");
                sleep(retry_delay).await;
                retry_delay = (retry_delay * 2).min(config.max_delay());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicUsize, Ordering};

    fn fast() -> RetryConfig {
        RetryConfig::new(3, Duration::from_millis(1), Duration::from_millis(2))
    }

    #[test]
    fn default_policy_matches_settings_defaults() {
        let from_settings = RetryConfig::try_from(RetrySettings::default()).unwrap();
        assert_eq!(from_settings, RetryConfig::default());
        assert_eq!(from_settings.max_attempts(), 3);
    }

    #[test]
    fn validation_rejects_inconsistent_policies() {
        assert!(
            RetryConfig::new(0, Duration::from_millis(1), Duration::from_millis(1))
                .validate()
                .is_err()
        );
        assert!(
            RetryConfig::new(3, Duration::from_secs(5), Duration::from_secs(1))
                .validate()
                .is_err()
        );
    }

    #[tokio::test]
    async fn succeeds_on_third_attempt() {
        let calls = AtomicUsize::new(0);
        let result = retry_transport(fast(), || {
            let attempt = calls.fetch_add(1, Ordering::SeqCst) + 1;
            async move {
                if attempt < 3 {
                    Err(TransportError::unavailable("fn:flaky", "throttled"))
                } else {
                    Ok(attempt)
                }
            }
        })
        .await
        .unwrap();

        assert_eq!(result, 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn exhaustion_reports_last_failure() {
        let calls = AtomicUsize::new(0);
        let err = retry_transport(fast(), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err::<(), _>(TransportError::unavailable("fn:down", "refused")) }
        })
        .await
        .unwrap_err();

        assert_eq!(err.attempts, 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(matches!(err.source, TransportError::Unavailable { .. }));
    }

    #[tokio::test]
    async fn sleeps_between_attempts() {
        let config = RetryConfig::new(4, Duration::from_millis(5), Duration::from_millis(8));
        let started = std::time::Instant::now();
        let _ = retry_transport(config, || async {
            Err::<(), _>(TransportError::unavailable("fn:down", "refused"))
        })
        .await;

        // 5 + 8 + 8 ms of sleeping between four attempts.
        assert!(started.elapsed() >= Duration::from_millis(21));
    }
}
