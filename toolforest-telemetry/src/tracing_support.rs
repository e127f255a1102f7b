//! Structured tracing helpers.

use anyhow::{Context, anyhow};
use toolforest_config::{LogFormat, LogSettings};
use tracing_subscriber::EnvFilter;

/// Installs the global `fmt` subscriber described by `settings`.
///
/// Output goes to stderr; stdout stays free for response payloads.
///
/// # Errors
///
/// Returns an error when the filter directive is invalid or a global
/// subscriber has already been installed.
pub fn init(settings: &LogSettings) -> anyhow::Result<()> {
    let filter = EnvFilter::try_new(&settings.filter)
        .with_context(|| format!("invalid log filter `{}`", settings.filter))?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true);

    let installed = match settings.format {
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Json => builder.json().flatten_event(true).try_init(),
    };

    installed.map_err(|err| anyhow!("failed to install tracing subscriber: {err}"))
}
