//! End-to-end tests: a real server on an ephemeral port driven with reqwest

use json_rpc_dispatch_http::DispatchConfig;
use json_rpc_dispatch_integration_tests::{RpcTestClient, TestFixtures, TestServer, init_tracing};
use reqwest::StatusCode;
use serde_json::{Value, json};

async fn start() -> (TestServer, RpcTestClient) {
    init_tracing();
    let server = TestServer::start(TestFixtures::calculator_methods())
        .await
        .expect("server should start");
    let client = RpcTestClient::new(server.url());
    (server, client)
}

#[tokio::test]
async fn test_call_over_http() {
    let (_server, client) = start().await;

    let response = client.call("add", json!([2, 3]), json!(1)).await.unwrap();
    assert_eq!(response, json!({"jsonrpc":"2.0","result":5,"id":1}));

    let response = client
        .call("greet", json!({"name":"Grace"}), json!("g"))
        .await
        .unwrap();
    assert_eq!(response["result"], "Hello, Grace!");
    assert_eq!(response["id"], "g");
}

#[tokio::test]
async fn test_async_method_over_http() {
    let (_server, client) = start().await;

    let response = client.call("slow_double", json!([21]), json!(7)).await.unwrap();
    assert_eq!(response["result"], 42);
}

#[tokio::test]
async fn test_notification_gets_empty_success() {
    let (_server, client) = start().await;

    let (status, body) = client.notify("notify_hello", json!([1])).await.unwrap();
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(body.is_empty());

    // a failing notification is still silent
    let (status, body) = client.notify("missing", json!([])).await.unwrap();
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(body.is_empty());
}

#[tokio::test]
async fn test_protocol_errors_are_http_ok() {
    let (_server, client) = start().await;

    let (status, body) = client.post_raw(r#"{"jsonrpc":"2.0","method":"foobar,"#).await.unwrap();
    assert_eq!(status, StatusCode::OK);
    let response: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(response["error"]["code"], -32700);
    assert_eq!(response["id"], Value::Null);

    let response = client.call("subtract_all", json!([1]), json!(2)).await.unwrap();
    assert_eq!(
        response,
        json!({"jsonrpc":"2.0","error":{"code":-32601,"message":"Method not found"},"id":2})
    );

    let response = client.call("add", json!({"num1": 2}), json!(3)).await.unwrap();
    assert_eq!(response["error"]["code"], -32602);
    assert_eq!(response["id"], 3);
}

#[tokio::test]
async fn test_batch_over_http() {
    let (_server, client) = start().await;

    let (status, body) = client
        .post_raw(
            json!([
                {"jsonrpc":"2.0","method":"add","params":[1,2],"id":1},
                {"jsonrpc":"2.0","method":"notify_hello","params":[5]},
                {"jsonrpc":"2.0","method":"add","params":["x","y"],"id":2},
                {"jsonrpc":"2.0","method":"slow_double","params":[4],"id":3}
            ])
            .to_string(),
        )
        .await
        .unwrap();
    assert_eq!(status, StatusCode::OK);

    let response: Value = serde_json::from_str(&body).unwrap();
    let items = response.as_array().unwrap();
    assert_eq!(items.len(), 3);
    assert_eq!(items[0]["result"], 3);
    assert_eq!(items[1]["error"]["code"], -32602);
    assert_eq!(items[1]["id"], 2);
    assert_eq!(items[2]["result"], 8);

    let (status, body) = client
        .post_raw(
            json!([
                {"jsonrpc":"2.0","method":"notify_hello","params":[1]},
                {"jsonrpc":"2.0","method":"notify_hello","params":[2]}
            ])
            .to_string(),
        )
        .await
        .unwrap();
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(body.is_empty());
}

#[tokio::test]
async fn test_notification_errors_over_http() {
    init_tracing();
    let server = TestServer::start_with(
        TestFixtures::calculator_methods(),
        DispatchConfig::new().notification_errors(true),
    )
    .await
    .unwrap();
    let client = RpcTestClient::new(server.url());

    let (status, body) = client.notify("missing", json!([])).await.unwrap();
    assert_eq!(status, StatusCode::OK);
    let response: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(response["error"]["code"], -32601);
    assert_eq!(response["id"], Value::Null);
}

#[tokio::test]
async fn test_non_post_methods_and_paths() {
    let (server, _client) = start().await;
    let http = reqwest::Client::new();

    let response = http.get(server.url()).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(response.headers()["allow"], "POST, OPTIONS");

    let response = http
        .request(reqwest::Method::OPTIONS, server.url())
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert_eq!(response.headers()["access-control-allow-origin"], "*");

    let response = http
        .post(format!("http://{}/elsewhere", server.addr()))
        .body("{}")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_concurrent_clients() {
    let (_server, client) = start().await;

    let mut tasks = Vec::new();
    for n in 0..10i64 {
        let client = client.clone();
        tasks.push(tokio::spawn(async move {
            client.call("slow_double", json!([n]), json!(n)).await
        }));
    }
    for (n, task) in tasks.into_iter().enumerate() {
        let response = task.await.unwrap().unwrap();
        assert_eq!(response["id"], n as i64);
        assert_eq!(response["result"], n as i64 * 2);
    }
}
