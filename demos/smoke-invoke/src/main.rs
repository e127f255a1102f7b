//! End-to-end smoke test: discover the math toolset and call `math.add`.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::Parser;
use serde_json::{Map, Value, json};
use toolforest::config::ToolforestConfig;
use toolforest::primitives::DirectoryEntry;
use toolforest::remote::{
    FsParameterStore, InMemoryParameterStore, LocalTransport, ParameterStore, ProxyBuilder,
    RetryConfig, Transport, directory_path, load_directory,
};
use tracing::{info, warn};

const MATH_ENDPOINT: &str = "local:math";

#[derive(Debug, Parser)]
#[command(name = "smoke-invoke", about = "Call math.add through a discovered proxy")]
struct Args {
    /// Environment whose directory is read; defaults to `ENV`.
    #[arg(long)]
    env: Option<String>,

    /// Directory tree backing the parameter store; defaults to
    /// `TOOLFOREST_DIRECTORY_ROOT`, or an in-memory store when unset.
    #[arg(long)]
    directory_root: Option<PathBuf>,

    /// Write the math entry into the store before reading it.
    #[arg(long)]
    seed: bool,

    /// First addend.
    #[arg(long, default_value_t = 2.0)]
    x: f64,

    /// Second addend.
    #[arg(long, default_value_t = 40.0)]
    y: f64,
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

async fn open_store(
    args: &Args,
    config: &ToolforestConfig,
) -> Result<Box<dyn ParameterStore>> {
    let name = format!("{}{}", directory_path(&config.environment), toolset_math::TOOLSET_NAME);
    let root = args.directory_root.clone().or_else(|| config.directory.root.clone());

    match root {
        Some(root) => {
            let store = FsParameterStore::new(root);
            if args.seed {
                store.put(&name, &math_entry(&config.environment)?).await?;
            }
            Ok(Box::new(store))
        }
        None => {
            if !args.seed {
                warn!("no directory root configured; seeding an in-memory store");
            }
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

    let store = open_store(&args, &config).await?;
    let entries = load_directory(store.as_ref(), &config.environment).await?;
    info!(environment = %config.environment, entries = entries.len(), "directory read");

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

    let Some(add) = proxies.get("math.add") else {
        bail!("math.add not found in registry");
    };

    let params: Map<String, Value> = json!({"x": args.x, "y": args.y})
        .as_object()
        .cloned()
        .unwrap_or_default();
    let result = add.call(params).await?;
    println!("{result}");
    Ok(())
}
