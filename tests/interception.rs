//! End-to-end tests: a real listener, real sockets, a mock upstream.

mod common;

use std::time::Duration;

use intercept_router::config::RouterConfig;
use intercept_router::lifecycle::build_routes;
use intercept_router::routing::BoxError;
use intercept_router::{InterceptedRequest, KvStore, Response, Router};

fn config_with_upstream(upstream: Option<std::net::SocketAddr>) -> RouterConfig {
    let mut config = RouterConfig::default();
    config.upstream.address = upstream.map(|addr| addr.to_string());
    config
}

#[tokio::test]
async fn test_local_route_answers_without_upstream() {
    let mut routes = Router::new();
    routes
        .get("/home", |_req: InterceptedRequest| async {
            Ok::<_, BoxError>(Response::from("<div>Home Page Content</div>"))
        })
        .unwrap();
    let (addr, shutdown) = common::start_router(config_with_upstream(None), routes).await;

    let response = common::client()
        .get(format!("http://{addr}/home"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(
        response.headers()["content-type"].to_str().unwrap(),
        "text/html"
    );
    assert!(response.headers().contains_key("x-request-id"));
    assert_eq!(response.text().await.unwrap(), "<div>Home Page Content</div>");

    shutdown.trigger();
}

#[tokio::test]
async fn test_unmatched_request_is_forwarded() {
    let upstream = common::start_echo_upstream(200).await;
    let mut routes = Router::new();
    routes
        .get("/home", |_req: InterceptedRequest| async {
            Ok::<_, BoxError>(Response::from("local"))
        })
        .unwrap();
    let (addr, shutdown) = common::start_router(config_with_upstream(Some(upstream)), routes).await;

    let client = common::client();
    let response = client
        .get(format!("http://{addr}/styles/site.css?v=2"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let echoed = response.text().await.unwrap();
    assert!(echoed.starts_with("GET /styles/site.css?v=2 HTTP/1.1\r\n"), "{echoed}");

    // Method mismatch on a registered path is also passed through.
    let response = client
        .post(format!("http://{addr}/home"))
        .send()
        .await
        .unwrap();
    let echoed = response.text().await.unwrap();
    assert!(echoed.starts_with("POST /home HTTP/1.1\r\n"), "{echoed}");

    shutdown.trigger();
}

#[tokio::test]
async fn test_forwarded_headers_and_body_are_unchanged() {
    let upstream = common::start_echo_upstream(200).await;
    let (addr, shutdown) =
        common::start_router(config_with_upstream(Some(upstream)), Router::new()).await;

    let body = "{\"items\":[1,2,3],\"note\":\"caf\u{e9} & <tags>\"}";
    let response = common::client()
        .post(format!("http://{addr}/api/orders?draft=1"))
        .header("x-custom-trace", "abc-123")
        .header("content-type", "application/json")
        .body(body)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let echoed = response.text().await.unwrap();
    let (head, received_body) = echoed.split_once("\r\n\r\n").unwrap();
    assert!(head.starts_with("POST /api/orders?draft=1 HTTP/1.1\r\n"), "{head}");
    let head = head.to_ascii_lowercase();
    assert!(head.contains("\r\nx-custom-trace: abc-123"), "{head}");
    assert!(head.contains("\r\ncontent-type: application/json"), "{head}");
    assert!(head.contains(&format!("\r\ncontent-length: {}", body.len())), "{head}");
    assert_eq!(received_body, body);

    shutdown.trigger();
}

#[tokio::test]
async fn test_http2_client_is_forwarded_to_upstream() {
    let upstream = common::start_echo_upstream(200).await;
    let (addr, shutdown) =
        common::start_router(config_with_upstream(Some(upstream)), Router::new()).await;

    let client = reqwest::Client::builder()
        .http2_prior_knowledge()
        .no_proxy()
        .timeout(Duration::from_secs(10))
        .build()
        .unwrap();
    let response = client
        .get(format!("http://{addr}/styles/site.css"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(response.version(), reqwest::Version::HTTP_2);
    let echoed = response.text().await.unwrap();
    assert!(echoed.starts_with("GET /styles/site.css HTTP/1.1\r\n"), "{echoed}");

    shutdown.trigger();
}

#[tokio::test]
async fn test_upstream_status_is_relayed_unchanged() {
    let upstream = common::start_echo_upstream(404).await;
    let (addr, shutdown) =
        common::start_router(config_with_upstream(Some(upstream)), Router::new()).await;

    let response = common::client()
        .get(format!("http://{addr}/missing"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 404);

    shutdown.trigger();
}

#[tokio::test]
async fn test_forward_failure_is_bad_gateway() {
    let dead = common::closed_port().await;
    let (addr, shutdown) = common::start_router(config_with_upstream(Some(dead)), Router::new()).await;

    let response = common::client()
        .get(format!("http://{addr}/anything"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 502);

    shutdown.trigger();
}

#[tokio::test]
async fn test_no_upstream_is_bad_gateway() {
    let (addr, shutdown) = common::start_router(config_with_upstream(None), Router::new()).await;

    let response = common::client()
        .get(format!("http://{addr}/anything"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 502);

    shutdown.trigger();
}

#[tokio::test]
async fn test_panicking_handler_still_resolves() {
    let mut routes = Router::new();
    routes
        .get("/explode", |_req: InterceptedRequest| async {
            if true {
                panic!("handler exploded");
            }
            Ok::<_, BoxError>(Response::from("unreachable"))
        })
        .unwrap();
    let (addr, shutdown) = common::start_router(config_with_upstream(None), routes).await;

    let response = tokio::time::timeout(
        Duration::from_secs(5),
        common::client().get(format!("http://{addr}/explode")).send(),
    )
    .await
    .expect("request was left pending")
    .unwrap();
    assert_eq!(response.status(), 500);

    shutdown.trigger();
}

#[tokio::test]
async fn test_demo_submit_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = config_with_upstream(None);
    config.demo.enabled = true;
    config.store.path = dir.path().join("store.db");
    let store = KvStore::new(&config.store);
    let routes = build_routes(&config, &store).unwrap();
    let (addr, shutdown) = common::start_router(config, routes).await;

    let client = common::client();
    let response = client
        .post(format!("http://{addr}/submit/7/9/a/b"))
        .form(&[("name", "Ann"), ("email", "ann@example.com")])
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let body = response.text().await.unwrap();
    assert!(body.contains("a/b"));
    assert!(body.contains("ann@example.com"));
    assert!(body.contains("Counter: 1"));

    let response = client
        .post(format!("http://{addr}/submit/7/9/a/b"))
        .form(&[("name", "Ann")])
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);

    let counter: Option<i64> = store.get("counter").await.unwrap();
    assert_eq!(counter, Some(2));

    shutdown.trigger();
}

#[tokio::test]
async fn test_oversized_form_body_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = config_with_upstream(None);
    config.demo.enabled = true;
    config.security.max_body_size = 64;
    config.store.path = dir.path().join("store.db");
    let store = KvStore::new(&config.store);
    let routes = build_routes(&config, &store).unwrap();
    let (addr, shutdown) = common::start_router(config, routes).await;

    let name = "x".repeat(256);
    let response = common::client()
        .post(format!("http://{addr}/submit/1/2/z"))
        .form(&[("name", name.as_str()), ("email", "e")])
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 413);
    assert!(response.text().await.unwrap().contains("Error Processing Form Data"));

    shutdown.trigger();
}
