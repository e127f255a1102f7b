use std::sync::Arc;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use toolforest::config::ToolforestConfig;
use toolforest::primitives::{CallContext, Manifest, ResponseEnvelope};
use toolforest::remote::{
    InMemoryParameterStore, LocalTransport, ProxyBuilder, ProxySet, RetryConfig, Transport,
    directory_path, load_directory,
};
use toolforest::runtime::{Dispatcher, ToolError, ToolRegistry, current_user_token};

#[derive(Deserialize, JsonSchema)]
struct NoParams {}

#[derive(Serialize, JsonSchema)]
struct Identity {
    token: String,
}

#[derive(Deserialize, JsonSchema)]
struct RelayParams {
    label: String,
}

#[derive(Serialize, JsonSchema)]
struct Relayed {
    label: String,
    downstream_token: String,
}

fn config() -> ToolforestConfig {
    ToolforestConfig::from_lookup(|key| match key {
        "ENV" => Some("staging".to_owned()),
        "TOOLFOREST_RETRY_INITIAL_DELAY_MS" => Some("1".to_owned()),
        "TOOLFOREST_RETRY_MAX_DELAY_MS" => Some("4".to_owned()),
        _ => None,
    })
    .unwrap()
}

fn identity_dispatcher(environment: &str) -> Dispatcher {
    let mut registry = ToolRegistry::new().with_toolset("identity", "1.0.0");
    registry
        .register_typed("whoami", "Report the caller token.", |_: NoParams| async move {
            Ok(Identity {
                token: current_user_token(),
            })
        })
        .unwrap();
    Dispatcher::new(Arc::new(registry)).with_environment(environment)
}

fn relay_dispatcher(environment: &str, proxies: Arc<ProxySet>) -> Dispatcher {
    let mut registry = ToolRegistry::new().with_toolset("relay", "1.0.0");
    registry
        .register_typed(
            "relay",
            "Ask the identity toolset who is calling.",
            move |params: RelayParams| {
                let proxies = Arc::clone(&proxies);
                async move {
                    let identity = proxies
                        .call("identity.whoami", Map::new())
                        .await
                        .map_err(|err| ToolError::execution(err.to_string()))?;
                    Ok(Relayed {
                        label: params.label,
                        downstream_token: identity["token"].as_str().unwrap_or_default().to_owned(),
                    })
                }
            },
        )
        .unwrap();
    Dispatcher::new(Arc::new(registry)).with_environment(environment)
}

async fn discover(config: &ToolforestConfig, transport: Arc<dyn Transport>) -> ProxySet {
    let base = directory_path(&config.environment);
    let store = InMemoryParameterStore::new()
        .with_parameter(
            format!("{base}identity"),
            r#"{"toolset_id":"identity","name":"identity","lambda_function_arn":"fn:identity"}"#,
        )
        .with_parameter(format!("{base}garbage"), "not json at all");

    let entries = load_directory(&store, &config.environment).await.unwrap();
    ProxyBuilder::new(transport)
        .with_retry(RetryConfig::try_from(config.retry).unwrap())
        .with_context_provider(|| Some(CallContext::with_user_token(current_user_token())))
        .build(&entries)
        .await
        .into_complete()
        .unwrap()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn caller_token_flows_through_chained_toolsets() {
    let config = config();
    let transport: Arc<dyn Transport> = Arc::new(
        LocalTransport::new().with_endpoint("fn:identity", identity_dispatcher(&config.environment)),
    );
    let proxies = Arc::new(discover(&config, transport).await);
    let relay = Arc::new(relay_dispatcher(&config.environment, proxies));

    let handles: Vec<_> = (0..20)
        .map(|i| {
            let relay = Arc::clone(&relay);
            tokio::spawn(async move {
                let token = format!("session-{i}");
                let response = relay
                    .handle(&json!({
                        "action": "invoke",
                        "method": "relay",
                        "params": {"label": format!("call-{i}")},
                        "context": {"userToken": token}
                    }))
                    .await;
                (i, response)
            })
        })
        .collect();

    for handle in handles {
        let (i, response) = handle.await.unwrap();
        assert_eq!(
            response.into_result().unwrap(),
            json!({"label": format!("call-{i}"), "downstream_token": format!("session-{i}")})
        );
    }
}

#[tokio::test]
async fn describe_payload_matches_wire_shape() {
    let encoded = identity_dispatcher("dev")
        .handle_slice(br#"{"action":"describe_tools"}"#)
        .await;
    let raw: Value = serde_json::from_slice(&encoded).unwrap();

    let result = &raw["result"];
    for key in ["toolset", "toolsetVersion", "manifestVersion", "tools"] {
        assert!(result.get(key).is_some(), "missing {key}");
    }
    let tool = &result["tools"][0];
    for key in ["name", "doc", "paramsSchema", "resultSchema"] {
        assert!(tool.get(key).is_some(), "missing {key}");
    }

    let manifest: Manifest = serde_json::from_value(result.clone()).unwrap();
    assert_eq!(manifest.toolset, "identity");
}

#[tokio::test]
async fn unknown_action_over_bytes_is_bad_request() {
    let encoded = identity_dispatcher("dev")
        .handle_slice(br#"{"action":"list_everything"}"#)
        .await;
    let response: ResponseEnvelope = serde_json::from_slice(&encoded).unwrap();
    assert_eq!(
        response.error().map(|body| body.kind.as_str()),
        Some("BadRequest")
    );
}
