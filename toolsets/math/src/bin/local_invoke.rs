//! Serves one request against the math toolset: envelope on stdin, response
//! on stdout.

use std::io::{Read, Write};

use anyhow::{Context, Result};
use clap::Parser;
use toolforest_config::ToolforestConfig;
use tracing::debug;

#[derive(Debug, Parser)]
#[command(name = "math-local-invoke", about = "Invoke the math toolset locally")]
struct Args {
    /// Send `describe_tools` instead of reading a request from stdin.
    #[arg(long)]
    describe: bool,

    /// Environment name reported in telemetry; defaults to `ENV`.
    #[arg(long)]
    env: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let mut config = ToolforestConfig::from_env()?;
    if let Some(env) = args.env {
        config.environment = env;
    }
    toolforest_telemetry::init(&config.log)?;

    let request = if args.describe {
        br#"{"action":"describe_tools"}"#.to_vec()
    } else {
        let mut buffer = Vec::new();
        std::io::stdin()
            .read_to_end(&mut buffer)
            .context("failed to read request from stdin")?;
        buffer
    };
    debug!(bytes = request.len(), "request read");

    let dispatcher = toolset_math::dispatcher(&config.environment)?;
    let response = dispatcher.handle_slice(&request).await;

    let mut stdout = std::io::stdout().lock();
    stdout.write_all(&response)?;
    stdout.write_all(b"\n")?;
    Ok(())
}
