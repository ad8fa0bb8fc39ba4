//! Tests for request logging middleware

use super::request_log::RequestLogLayer;
use super::test_logs::capture_logs;
use axum::{
    body::Body,
    extract::ConnectInfo,
    http::{header::CONTENT_TYPE, Request, StatusCode},
    routing::get,
    Router,
};
use std::net::SocketAddr;
use tower::ServiceExt;

fn get_request(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

#[tokio::test]
async fn test_logs_method_and_path() {
    let (logs, _guard) = capture_logs();
    let app = Router::new()
        .route("/test-path", get(|| async { StatusCode::OK }))
        .layer(RequestLogLayer);

    let response = app.oneshot(get_request("/test-path")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let records = logs.fields_of("request completed");
    assert_eq!(records.len(), 1, "exactly one record per request");
    assert_eq!(records[0]["method"], "GET");
    assert_eq!(records[0]["path"], "/test-path");
    assert_eq!(records[0]["status"], 200);
    assert!(records[0]["duration_us"].is_u64());
}

#[tokio::test]
async fn test_captures_explicit_status_code() {
    let (logs, _guard) = capture_logs();
    let app = Router::new()
        .route("/missing", get(|| async { StatusCode::NOT_FOUND }))
        .layer(RequestLogLayer);

    let response = app.oneshot(get_request("/missing")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let records = logs.fields_of("request completed");
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["status"], 404);
}

/// A handler that only returns a body is logged as 200
#[tokio::test]
async fn test_body_only_handler_logs_200() {
    let (logs, _guard) = capture_logs();
    let app = Router::new()
        .route("/implicit-ok", get(|| async { "hello" }))
        .layer(RequestLogLayer);

    app.oneshot(get_request("/implicit-ok")).await.unwrap();

    let records = logs.fields_of("request completed");
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["status"], 200);
}

#[tokio::test]
async fn test_unmatched_route_logged_as_404() {
    let (logs, _guard) = capture_logs();
    let app = Router::new()
        .route("/healthz", get(|| async { "ok" }))
        .layer(RequestLogLayer);

    let response = app.oneshot(get_request("/nonexistent")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let records = logs.fields_of("request completed");
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["path"], "/nonexistent");
    assert_eq!(records[0]["status"], 404);
}

#[tokio::test]
async fn test_logs_remote_address_from_connect_info() {
    let (logs, _guard) = capture_logs();
    let app = Router::new()
        .route("/", get(|| async { "ok" }))
        .layer(RequestLogLayer);

    let peer: SocketAddr = "10.1.2.3:45678".parse().unwrap();
    let mut request = get_request("/");
    request.extensions_mut().insert(ConnectInfo(peer));

    app.oneshot(request).await.unwrap();

    let records = logs.fields_of("request completed");
    assert_eq!(records[0]["remote_addr"], "10.1.2.3:45678");
}

#[tokio::test]
async fn test_missing_connect_info_logged_as_unknown() {
    let (logs, _guard) = capture_logs();
    let app = Router::new()
        .route("/", get(|| async { "ok" }))
        .layer(RequestLogLayer);

    app.oneshot(get_request("/")).await.unwrap();

    assert_eq!(logs.fields_of("request completed")[0]["remote_addr"], "unknown");
}

/// The middleware must not touch status, headers or body
#[tokio::test]
async fn test_response_passes_through_unchanged() {
    let (_logs, _guard) = capture_logs();
    let app = Router::new()
        .route(
            "/teapot",
            get(|| async {
                (
                    StatusCode::IM_A_TEAPOT,
                    [("content-type", "text/x-tea"), ("x-brew", "oolong")],
                    "short and stout",
                )
            }),
        )
        .layer(RequestLogLayer);

    let response = app.oneshot(get_request("/teapot")).await.unwrap();

    assert_eq!(response.status(), StatusCode::IM_A_TEAPOT);
    assert_eq!(response.headers()[CONTENT_TYPE], "text/x-tea");
    assert_eq!(response.headers()["x-brew"], "oolong");
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(&body[..], b"short and stout");
}

#[tokio::test]
async fn test_one_record_per_request() {
    let (logs, _guard) = capture_logs();
    let app = Router::new()
        .route("/a", get(|| async { "a" }))
        .layer(RequestLogLayer);

    for _ in 0..3 {
        app.clone().oneshot(get_request("/a")).await.unwrap();
    }

    assert_eq!(logs.fields_of("request completed").len(), 3);
}
