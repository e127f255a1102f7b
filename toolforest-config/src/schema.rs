//! Strongly typed configuration schemas.

use std::fmt::{self, Display, Formatter};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Environment used when `ENV` is not set.
pub const DEFAULT_ENVIRONMENT: &str = "dev";

/// Top-level configuration shared by services and callers.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolforestConfig {
    /// Deployment environment name (`dev`, `prod`, ...).
    pub environment: String,
    /// Logging output settings.
    #[serde(default)]
    pub log: LogSettings,
    /// Service directory settings.
    #[serde(default)]
    pub directory: DirectorySettings,
    /// Retry settings for remote calls.
    #[serde(default)]
    pub retry: RetrySettings,
}

impl ToolforestConfig {
    /// Loads the configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error when a variable is present but cannot be parsed.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads the configuration through an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Returns an error when a value is present but cannot be parsed.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        crate::loader::load_from_lookup(lookup)
    }
}

impl Default for ToolforestConfig {
    fn default() -> Self {
        Self {
            environment: DEFAULT_ENVIRONMENT.to_owned(),
            log: LogSettings::default(),
            directory: DirectorySettings::default(),
            retry: RetrySettings::default(),
        }
    }
}

/// Output format of the tracing subscriber.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Multi-line human readable output.
    Pretty,
    /// Single-line human readable output.
    #[default]
    Compact,
    /// One JSON object per event.
    Json,
}

impl Display for LogFormat {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Pretty => "pretty",
            Self::Compact => "compact",
            Self::Json => "json",
        })
    }
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "compact" | "text" => Ok(Self::Compact),
            "json" => Ok(Self::Json),
            other => Err(format!(
                "unknown log format `{other}` (expected pretty, compact, or json)"
            )),
        }
    }
}

/// Logging configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogSettings {
    /// Output format.
    #[serde(default)]
    pub format: LogFormat,
    /// `EnvFilter` directive string.
    pub filter: String,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            format: LogFormat::default(),
            filter: "info".to_owned(),
        }
    }
}

/// Service directory configuration.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectorySettings {
    /// Filesystem root of a local parameter tree. `None` means the caller
    /// supplies its own store.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root: Option<PathBuf>,
}

/// Retry behaviour for transport-level failures.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetrySettings {
    /// Total attempts, including the first.
    pub max_attempts: usize,
    /// Delay before the second attempt, in milliseconds.
    pub initial_delay_ms: u64,
    /// Upper bound of the exponential delay, in milliseconds.
    pub max_delay_ms: u64,
}

impl RetrySettings {
    /// Returns the initial delay.
    #[must_use]
    pub const fn initial_delay(self) -> Duration {
        Duration::from_millis(self.initial_delay_ms)
    }

    /// Returns the delay cap.
    #[must_use]
    pub const fn max_delay(self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay_ms: 200,
            max_delay_ms: 2_000,
        }
    }
}
