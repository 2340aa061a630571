//! End-to-end tests for the request/response bridge.

use std::time::{Duration, Instant};

use serde_json::json;
use webserver_bridge::ServerConfig;

mod common;

#[tokio::test]
async fn test_status_roundtrip() {
    let (server, url) = common::start_server(ServerConfig::default()).await;
    common::spawn_responder(&server, |request| {
        assert_eq!(request.method, "GET");
        assert_eq!(request.path, "/status");
        json!({ "status": 200, "body": "ok" })
    });

    let response = reqwest::get(format!("{url}/status")).await.unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(response.text().await.unwrap(), "ok");

    server.stop().await;
}

#[tokio::test]
async fn test_descriptor_carries_query_headers_and_body() {
    let (server, url) = common::start_server(ServerConfig::default()).await;
    common::spawn_responder(&server, |request| {
        assert_eq!(request.method, "POST");
        assert_eq!(request.path, "/echo");
        assert_eq!(request.query["tag"], "abc");
        assert_eq!(request.headers["x-test"], vec!["yes"]);
        let body = request.body.as_ref().expect("body present");
        json!({
            "status": 200,
            "headers": { "content-type": "text/plain" },
            "body": String::from_utf8_lossy(body),
        })
    });

    let client = reqwest::Client::new();
    let response = client
        .post(format!("{url}/echo?tag=abc"))
        .header("x-test", "yes")
        .body("hello bridge")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(response.headers()["content-type"], "text/plain");
    assert_eq!(response.text().await.unwrap(), "hello bridge");

    server.stop().await;
}

#[tokio::test]
async fn test_no_handler_yields_503_without_waiting() {
    let (server, url) = common::start_server(ServerConfig::default()).await;

    let started = Instant::now();
    let response = reqwest::get(&url).await.unwrap();
    assert_eq!(response.status(), 503);
    // Must answer immediately, not after the 30s response timeout.
    assert!(started.elapsed() < Duration::from_secs(5));

    server.stop().await;
}

#[tokio::test]
async fn test_cleared_handler_yields_503() {
    let (server, url) = common::start_server(ServerConfig::default()).await;
    common::spawn_responder(&server, |_| json!({ "status": 200, "body": "ok" }));

    let response = reqwest::get(&url).await.unwrap();
    assert_eq!(response.status(), 200);

    server.clear_handler();
    let response = reqwest::get(&url).await.unwrap();
    assert_eq!(response.status(), 503);

    server.stop().await;
}

#[tokio::test]
async fn test_silent_handler_yields_504_at_timeout() {
    let config = ServerConfig {
        response_timeout_secs: 1,
        ..ServerConfig::default()
    };
    let (server, url) = common::start_server(config).await;
    common::spawn_silent_handler(&server);

    let started = Instant::now();
    let response = reqwest::get(&url).await.unwrap();
    let elapsed = started.elapsed();

    assert_eq!(response.status(), 504);
    assert!(elapsed >= Duration::from_secs(1), "answered early: {elapsed:?}");
    assert!(elapsed < Duration::from_secs(10), "answered late: {elapsed:?}");

    server.stop().await;
}

#[tokio::test]
async fn test_concurrent_requests_resolve_independently() {
    let (server, url) = common::start_server(ServerConfig::default()).await;
    let mut requests = server.register_handler();

    let get = |tag: &str| {
        let url = format!("{url}/?tag={tag}");
        tokio::spawn(async move { reqwest::get(url).await.unwrap() })
    };
    let first = get("a");
    let second = get("b");

    let mut received = Vec::new();
    for _ in 0..2 {
        received.push(requests.recv().await.unwrap());
    }

    // Deliver in reverse arrival order; each wait must get its own payload.
    for request in received.iter().rev() {
        let tag = &request.query["tag"];
        server
            .deliver(
                &request.id.to_string(),
                json!({ "status": 200, "body": format!("tag:{tag}") }),
            )
            .unwrap();
    }

    let first = first.await.unwrap();
    let second = second.await.unwrap();
    assert_eq!(first.text().await.unwrap(), "tag:a");
    assert_eq!(second.text().await.unwrap(), "tag:b");

    server.stop().await;
}

#[tokio::test]
async fn test_handler_replacement_keeps_inflight_request_correlated() {
    let (server, url) = common::start_server(ServerConfig::default()).await;
    let mut original = server.register_handler();

    let request_task = {
        let url = url.clone();
        tokio::spawn(async move { reqwest::get(url).await.unwrap() })
    };
    let pending = original.recv().await.unwrap();

    // Replace the handler while the request is in flight; the identifier,
    // not the handler identity, owns the correlation.
    let _replacement = server.register_handler();
    assert!(original.recv().await.is_none());

    server
        .deliver(
            &pending.id.to_string(),
            json!({ "status": 200, "body": "served after replacement" }),
        )
        .unwrap();

    let response = request_task.await.unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(response.text().await.unwrap(), "served after replacement");

    server.stop().await;
}

#[tokio::test]
async fn test_opaque_payload_rendered_as_json() {
    let (server, url) = common::start_server(ServerConfig::default()).await;
    common::spawn_responder(&server, |_| json!({ "result": [1, 2, 3] }));

    let response = reqwest::get(&url).await.unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(response.headers()["content-type"], "application/json");
    let value: serde_json::Value = response.json().await.unwrap();
    assert_eq!(value, json!({ "result": [1, 2, 3] }));

    server.stop().await;
}

#[tokio::test]
async fn test_malformed_deliveries_rejected() {
    let (server, _url) = common::start_server(ServerConfig::default()).await;

    let err = server.deliver("not-a-uuid", json!({ "status": 200 })).unwrap_err();
    assert!(matches!(
        err,
        webserver_bridge::DeliverError::InvalidIdentifier(_)
    ));

    let id = webserver_bridge::RequestId::new().to_string();
    let err = server.deliver(&id, json!({ "status": 9000 })).unwrap_err();
    assert!(matches!(
        err,
        webserver_bridge::DeliverError::MalformedPayload(_)
    ));

    // A delivery for an unknown identifier is legal and harmless.
    server.deliver(&id, json!({ "status": 200, "body": "unclaimed" })).unwrap();

    server.stop().await;
}

#[tokio::test]
async fn test_oversized_body_rejected() {
    let config = ServerConfig {
        max_body_bytes: 64,
        ..ServerConfig::default()
    };
    let (server, url) = common::start_server(config).await;
    common::spawn_responder(&server, |_| json!({ "status": 200, "body": "ok" }));

    let client = reqwest::Client::new();
    let response = client
        .post(&url)
        .body(vec![0u8; 1024])
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 413);

    server.stop().await;
}
