//! Serves every toolset listed in the directory as MCP tools over stdio.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use toolforest::config::ToolforestConfig;
use toolforest::mcp::{McpBridge, McpServer};
use toolforest::primitives::DirectoryEntry;
use toolforest::remote::{
    FsParameterStore, InMemoryParameterStore, LocalTransport, ParameterStore, ProxyBuilder,
    RetryConfig, Transport, directory_path, load_directory,
};
use tracing::{info, warn};

const MATH_ENDPOINT: &str = "local:math";

#[derive(Debug, Parser)]
#[command(name = "toolforest-mcp-server", about = "Expose discovered toolsets to MCP clients")]
struct Args {
    /// Environment whose directory is read; defaults to `ENV`.
    #[arg(long)]
    env: Option<String>,

    /// Directory tree backing the parameter store; defaults to
    /// `TOOLFOREST_DIRECTORY_ROOT`, or a store holding only `math` when unset.
    #[arg(long)]
    directory_root: Option<PathBuf>,
}

fn math_entry(environment: &str) -> Result<String> {
    let entry = DirectoryEntry {
        toolset_id: toolset_math::TOOLSET_NAME.to_owned(),
        name: toolset_math::TOOLSET_NAME.to_owned(),
        lambda_function_arn: MATH_ENDPOINT.to_owned(),
        alias: environment.to_owned(),
        alias_arn: None,
        version: toolset_math::TOOLSET_VERSION.to_owned(),
        manifest_version: String::new(),
    };
    serde_json::to_string(&entry).context("failed to encode directory entry")
}

fn open_store(args: &Args, config: &ToolforestConfig) -> Result<Box<dyn ParameterStore>> {
    match args.directory_root.clone().or_else(|| config.directory.root.clone()) {
        Some(root) => Ok(Box::new(FsParameterStore::new(root))),
        None => {
            let name = format!(
                "{}{}",
                directory_path(&config.environment),
                toolset_math::TOOLSET_NAME
            );
            Ok(Box::new(
                InMemoryParameterStore::new().with_parameter(name, math_entry(&config.environment)?),
            ))
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let mut config = ToolforestConfig::from_env()?;
    if let Some(env) = args.env.clone() {
        config.environment = env;
    }
    toolforest::telemetry::init(&config.log)?;

    let store = open_store(&args, &config)?;
    let entries = load_directory(store.as_ref(), &config.environment).await?;

    let transport: Arc<dyn Transport> = Arc::new(
        LocalTransport::new()
            .with_endpoint(MATH_ENDPOINT, toolset_math::dispatcher(&config.environment)?),
    );
    let proxies = ProxyBuilder::new(transport)
        .with_retry(RetryConfig::try_from(config.retry)?)
        .build(&entries)
        .await;
    for failure in proxies.failures() {
        warn!(toolset = %failure.toolset, error = %failure.error, "toolset unavailable");
    }

    let bridge = McpBridge::from_proxies(&proxies);
    info!(environment = %config.environment, tools = bridge.len(), "bridging toolsets over stdio");

    McpServer::new(bridge)
        .with_server_info("toolforest-mcp-server", env!("CARGO_PKG_VERSION"))
        .serve_stdio()
        .await
        .context("mcp stdio session failed")
}
