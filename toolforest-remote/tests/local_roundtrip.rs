use std::sync::Arc;
use std::time::Duration;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use toolforest_primitives::CallContext;
use toolforest_remote::{
    FsParameterStore, LocalTransport, ProxyBuilder, ProxyError, RetryConfig, Transport,
    directory_path, load_directory,
};
use toolforest_runtime::{Dispatcher, ToolRegistry, current_user_token};

#[derive(Deserialize, JsonSchema)]
struct ConcatParams {
    left: String,
    right: String,
}

#[derive(Serialize, JsonSchema)]
struct ConcatResult {
    value: String,
    caller: String,
}

fn text_dispatcher() -> Dispatcher {
    let mut registry = ToolRegistry::new().with_toolset("text", "2.0.0");
    registry
        .register_typed("concat", "Join two strings.", |p: ConcatParams| async move {
            Ok(ConcatResult {
                value: format!("{}{}", p.left, p.right),
                caller: current_user_token(),
            })
        })
        .unwrap();
    Dispatcher::new(Arc::new(registry))
}

fn args(value: Value) -> Map<String, Value> {
    value.as_object().cloned().unwrap()
}

#[tokio::test]
async fn directory_to_remote_call() {
    let dir = tempfile::tempdir().unwrap();
    let store = FsParameterStore::new(dir.path());
    let base = directory_path("dev");
    store
        .put(
            &format!("{base}text"),
            r#"{"toolset_id":"text","name":"text","lambda_function_arn":"fn:text",
                "alias":"dev","alias_arn":"fn:text:dev","version":"1","manifest_version":""}"#,
        )
        .await
        .unwrap();
    store.put(&format!("{base}broken"), "{").await.unwrap();

    let entries = load_directory(&store, "dev").await.unwrap();
    assert_eq!(entries.len(), 1);

    let transport: Arc<dyn Transport> =
        Arc::new(LocalTransport::new().with_endpoint("fn:text:dev", text_dispatcher()));
    let proxies = ProxyBuilder::new(transport)
        .with_retry(RetryConfig::new(
            3,
            Duration::from_millis(1),
            Duration::from_millis(2),
        ))
        .with_context_provider(|| Some(CallContext::with_user_token("caller-7")))
        .build(&entries)
        .await
        .into_complete()
        .unwrap();

    assert_eq!(proxies.names(), vec!["text.concat"]);
    let concat = proxies.get("text.concat").unwrap();
    assert_eq!(concat.doc(), "Join two strings.");
    assert_eq!(concat.parameter_names(), vec!["left", "right"]);

    let result = concat
        .call(args(json!({"left": "tool", "right": "forest"})))
        .await
        .unwrap();
    assert_eq!(result, json!({"value": "toolforest", "caller": "caller-7"}));
}

#[tokio::test]
async fn remote_validation_errors_surface_verbatim() {
    let transport: Arc<dyn Transport> =
        Arc::new(LocalTransport::new().with_endpoint("fn:text", text_dispatcher()));
    let entry = toolforest_primitives::DirectoryEntry::from_json(
        r#"{"toolset_id":"text","name":"text","lambda_function_arn":"fn:text"}"#,
    )
    .unwrap();

    let proxies = ProxyBuilder::new(transport).build(&[entry]).await;
    let err = proxies
        .call("text.concat", args(json!({"left": "only"})))
        .await
        .unwrap_err();

    match err {
        ProxyError::Remote { kind, .. } => assert_eq!(kind, "ValidationError"),
        other => panic!("unexpected error: {other:?}"),
    }
}
