//! Server integration tests — raw payload → envelope → dispatch → reply.

use kissrpc::envelope::{Outcome, ResponsePayload, StatusCategory};
use kissrpc::types::{Id, ServerConfig};
use kissrpc::{Node, Router, RpcError, RpcServer, SchemaValidator};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use serde_json::{json, Value};
use std::convert::Infallible;
use tracing_test::traced_test;

#[derive(Debug, thiserror::Error)]
#[error("disk on fire")]
struct DiskOnFire;

#[derive(Debug, Clone)]
struct Caller {
    token: Option<String>,
}

fn tree() -> Node<Caller> {
    let hello = Node::validated(
        SchemaValidator::new([json!({"type": "string"})]).unwrap(),
        |_: Caller, args: Vec<Value>| async move {
            let name = args[0].as_str().unwrap_or_default().to_string();
            Ok::<_, Infallible>(json!(format!("Hello, {name}!")))
        },
    );
    let echo = Node::endpoint(|_: Caller, args: Vec<Value>| async move {
        Ok::<_, Infallible>(Value::Array(args))
    });
    let explode = Node::endpoint(|_: Caller, _| async { Err::<Value, _>(DiskOnFire) });
    let me = Node::endpoint(|user: String, _| async move { Ok::<_, Infallible>(json!(user)) });

    Router::new()
        .route("hello", hello)
        .unwrap()
        .route("echo", echo)
        .unwrap()
        .route("explode", explode)
        .unwrap()
        .route(
            "account",
            Node::transform(
                |caller: Caller| async move {
                    caller
                        .token
                        .ok_or_else(|| RpcError::application(-32001, "Unauthorized", None))
                },
                Node::router(Router::new().route("me", me).unwrap()),
            ),
        )
        .unwrap()
        .into()
}

fn server() -> RpcServer<Caller> {
    RpcServer::new(tree())
}

fn anon() -> Caller {
    Caller { token: None }
}

fn single(payload: ResponsePayload) -> kissrpc::envelope::Response {
    match payload {
        ResponsePayload::Single(resp) => resp,
        ResponsePayload::Batch(_) => panic!("expected a single response"),
    }
}

#[tokio::test]
async fn test_hello_world_round_trip() {
    let raw = r#"{"jsonrpc": "2.0", "id": 1, "method": "hello", "params": ["world"]}"#;
    let reply = server().handle_text(anon(), raw).await;

    assert_eq!(reply.status, StatusCategory::Success);
    assert_eq!(reply.http_status(), 200);
    assert_eq!(
        serde_json::from_str::<Value>(&reply.to_json().unwrap()).unwrap(),
        json!({"jsonrpc": "2.0", "id": 1, "result": "Hello, world!"})
    );
}

#[tokio::test]
async fn test_missing_argument_is_invalid_params() {
    let reply = server()
        .handle_value(anon(), json!({"jsonrpc": "2.0", "id": 2, "method": "hello", "params": []}))
        .await;
    assert_eq!(reply.status, StatusCategory::ClientError);
    let err = single(reply.body).error().cloned().unwrap();
    assert_eq!(err.code, -32602);
}

#[tokio::test]
async fn test_unknown_method_is_not_found() {
    let reply = server()
        .handle_value(anon(), json!({"jsonrpc": "2.0", "id": 3, "method": "missing"}))
        .await;
    assert_eq!(reply.status, StatusCategory::NotFound);
    assert_eq!(reply.http_status(), 404);
    assert_eq!(single(reply.body).error().map(|e| e.code), Some(-32601));
}

#[tokio::test]
async fn test_batch_with_one_failure_is_mixed() {
    let payload = json!([
        {"jsonrpc": "2.0", "id": 1, "method": "echo", "params": [1]},
        {"jsonrpc": "2.0", "id": 2, "method": "explode", "params": []},
        {"jsonrpc": "2.0", "id": 3, "method": "echo", "params": [3]},
    ]);
    let reply = server().handle_value(anon(), payload).await;

    assert_eq!(reply.status, StatusCategory::Mixed);
    assert_eq!(reply.http_status(), 207);
    let responses = reply.body.responses();
    assert_eq!(responses.len(), 3);
    assert_eq!(responses[0].outcome, Outcome::Result(json!([1])));
    assert_eq!(responses[1].error().map(|e| e.code), Some(-32603));
    assert_eq!(responses[2].outcome, Outcome::Result(json!([3])));
}

#[tokio::test]
async fn test_undecodable_payload_is_parse_error() {
    let reply = server().handle_text(anon(), "{not json").await;
    assert_eq!(reply.status, StatusCategory::ClientError);
    let resp = single(reply.body);
    assert_eq!(resp.id, Id::Null);
    assert_eq!(resp.error().map(|e| e.code), Some(-32700));
}

#[tokio::test]
async fn test_batch_keeps_rejected_elements_in_place() {
    let payload = json!([
        {"jsonrpc": "2.0", "id": 1, "method": "echo"},
        {"jsonrpc": "1.0", "id": 2, "method": "echo"},
        42,
    ]);
    let reply = server().handle_value(anon(), payload).await;
    let responses = reply.body.responses();
    assert_eq!(responses.len(), 3);
    assert_eq!(responses[0].outcome, Outcome::Result(json!([])));
    assert_eq!(responses[1].error().map(|e| e.code), Some(-32600));
    assert_eq!(responses[2].error().map(|e| e.code), Some(-32600));
    assert_eq!(reply.status, StatusCategory::Mixed);
}

#[tokio::test]
async fn test_empty_batch_is_invalid_request() {
    let reply = server().handle_text(anon(), "[]").await;
    assert_eq!(single(reply.body).error().map(|e| e.code), Some(-32600));
}

#[tokio::test]
async fn test_null_id_still_answered() {
    let reply = server()
        .handle_value(anon(), json!({"jsonrpc": "2.0", "id": null, "method": "echo", "params": ["x"]}))
        .await;
    let resp = single(reply.body);
    assert_eq!(resp.id, Id::Null);
    assert_eq!(resp.outcome, Outcome::Result(json!(["x"])));
}

#[tokio::test]
async fn test_context_transformer_gates_subtree() {
    let request = json!({"jsonrpc": "2.0", "id": "a", "method": "account.me"});

    let denied = server().handle_value(anon(), request.clone()).await;
    assert_eq!(single(denied.body).error().map(|e| e.code), Some(-32001));

    let caller = Caller {
        token: Some("ada".to_string()),
    };
    let allowed = server().handle_value(caller, request).await;
    assert_eq!(single(allowed.body).outcome, Outcome::Result(json!("ada")));
}

#[tokio::test]
#[traced_test]
async fn test_internal_failure_logs_its_cause() {
    let reply = server()
        .handle_value(anon(), json!({"jsonrpc": "2.0", "id": 7, "method": "explode"}))
        .await;
    assert_eq!(reply.status, StatusCategory::ServerError);
    assert!(logs_contain("disk on fire"));
}

#[tokio::test]
async fn test_server_name_is_configurable() {
    let config = ServerConfig {
        name: "inventory".to_string(),
        ..ServerConfig::default()
    };
    let reply = RpcServer::with_config(tree(), config)
        .handle_value(anon(), json!({"jsonrpc": "2.0", "id": 1, "method": "rpc.server"}))
        .await;
    assert_eq!(
        single(reply.body).outcome,
        Outcome::Result(json!({"name": "inventory", "supportedExtensions": []}))
    );
}

proptest! {
    #[test]
    fn prop_batch_preserves_order(args in proptest::collection::vec(any::<i64>(), 1..20)) {
        let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
        let payload: Vec<Value> = args
            .iter()
            .enumerate()
            .map(|(i, n)| json!({"jsonrpc": "2.0", "id": i, "method": "echo", "params": [n]}))
            .collect();

        let reply = runtime.block_on(server().handle_value(anon(), Value::Array(payload)));
        let responses = reply.body.responses();
        prop_assert_eq!(responses.len(), args.len());
        for (i, (resp, n)) in responses.iter().zip(&args).enumerate() {
            prop_assert_eq!(&resp.id, &Id::from(i as u64));
            prop_assert_eq!(&resp.outcome, &Outcome::Result(json!([n])));
        }
    }
}
