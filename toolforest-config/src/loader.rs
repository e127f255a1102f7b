//! Environment variable loader.

use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context, bail};
use tracing::debug;

use crate::schema::{LogFormat, ToolforestConfig};

const ENVIRONMENT: &str = "ENV";
const LOG_FORMAT: &str = "TOOLFOREST_LOG_FORMAT";
const LOG_FILTER: &str = "TOOLFOREST_LOG_FILTER";
const RUST_LOG: &str = "RUST_LOG";
const DIRECTORY_ROOT: &str = "TOOLFOREST_DIRECTORY_ROOT";
const RETRY_MAX_ATTEMPTS: &str = "TOOLFOREST_RETRY_MAX_ATTEMPTS";
const RETRY_INITIAL_DELAY_MS: &str = "TOOLFOREST_RETRY_INITIAL_DELAY_MS";
const RETRY_MAX_DELAY_MS: &str = "TOOLFOREST_RETRY_MAX_DELAY_MS";

/// Every variable consulted by [`load_from_lookup`].
pub const ENV_VARS: &[&str] = &[
    ENVIRONMENT,
    LOG_FORMAT,
    LOG_FILTER,
    RUST_LOG,
    DIRECTORY_ROOT,
    RETRY_MAX_ATTEMPTS,
    RETRY_INITIAL_DELAY_MS,
    RETRY_MAX_DELAY_MS,
];

/// Builds a [`ToolforestConfig`] from a key lookup, starting from defaults.
///
/// Blank values are treated as unset.
///
/// # Errors
///
/// Returns an error when a value cannot be parsed or the retry bounds are
/// inconsistent.
pub fn load_from_lookup<F>(lookup: F) -> anyhow::Result<ToolforestConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
    let mut config = ToolforestConfig::default();

    if let Some(environment) = get(ENVIRONMENT) {
        config.environment = environment.trim().to_owned();
    }

    if let Some(format) = get(LOG_FORMAT) {
        config.log.format = LogFormat::from_str(&format)
            .map_err(anyhow::Error::msg)
            .with_context(|| format!("invalid {LOG_FORMAT}"))?;
    }

    if let Some(filter) = get(LOG_FILTER).or_else(|| get(RUST_LOG)) {
        config.log.filter = filter;
    }

    if let Some(root) = get(DIRECTORY_ROOT) {
        config.directory.root = Some(PathBuf::from(root));
    }

    if let Some(value) = get(RETRY_MAX_ATTEMPTS) {
        config.retry.max_attempts = parse_number(RETRY_MAX_ATTEMPTS, &value)?;
    }
    if let Some(value) = get(RETRY_INITIAL_DELAY_MS) {
        config.retry.initial_delay_ms = parse_number(RETRY_INITIAL_DELAY_MS, &value)?;
    }
    if let Some(value) = get(RETRY_MAX_DELAY_MS) {
        config.retry.max_delay_ms = parse_number(RETRY_MAX_DELAY_MS, &value)?;
    }

    if config.retry.max_attempts == 0 {
        bail!("{RETRY_MAX_ATTEMPTS} must be at least 1");
    }
    if config.retry.initial_delay_ms > config.retry.max_delay_ms {
        bail!("{RETRY_INITIAL_DELAY_MS} cannot exceed {RETRY_MAX_DELAY_MS}");
    }

    debug!(
        environment = %config.environment,
        log_format = %config.log.format,
        directory_root = ?config.directory.root,
        "configuration loaded"
    );

    Ok(config)
}

fn parse_number<T>(key: &str, value: &str) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value
        .trim()
        .parse::<T>()
        .with_context(|| format!("invalid {key}: `{value}`"))
}
