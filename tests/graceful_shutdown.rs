//! Graceful shutdown behaviour of a running server.

mod common;

use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;
use http_toolkit::http::X_REQUEST_ID;
use http_toolkit::testing::TestServer;
use http_toolkit::ServerError;
use tokio::net::TcpStream;
use tokio::sync::Notify;

#[tokio::test]
async fn idle_server_shuts_down_cleanly() {
    let server = TestServer::start(Router::new().route("/", get(|| async { "OK!" })))
        .await
        .unwrap();
    let addr = server.addr();

    let body = common::client().get(server.url()).send().await.unwrap().text().await.unwrap();
    assert_eq!(body, "OK!");

    server.shutdown().await.unwrap();
    assert!(TcpStream::connect(addr).await.is_err(), "listener still open after run returned");
}

#[tokio::test]
async fn zero_timeout_without_requests_is_graceful() {
    let server = TestServer::start_with(
        common::config_with_timeout(Duration::ZERO),
        Router::new().route("/", get(|| async { "OK!" })),
    )
    .await
    .unwrap();

    assert!(server.shutdown().await.is_ok());
}

async fn shutdown_with_idle_keep_alive(timeout: Duration) {
    let server = TestServer::start_with(
        common::config_with_timeout(timeout),
        Router::new().route("/", get(|| async { "OK!" })),
    )
    .await
    .unwrap();
    let client = common::pooled_client();

    for _ in 0..2 {
        let body = client.get(server.url()).send().await.unwrap().text().await.unwrap();
        assert_eq!(body, "OK!");
    }

    let outcome = server.shutdown().await;
    assert!(outcome.is_ok(), "idle connection held up shutdown: {outcome:?}");
}

#[tokio::test]
async fn idle_keep_alive_connection_closes_with_zero_timeout() {
    for _ in 0..5 {
        shutdown_with_idle_keep_alive(Duration::ZERO).await;
    }
}

#[tokio::test]
async fn idle_keep_alive_connection_closes_with_short_timeout() {
    shutdown_with_idle_keep_alive(Duration::from_millis(50)).await;
}

#[tokio::test]
async fn run_waits_for_cancellation() {
    let server = TestServer::start(Router::new()).await.unwrap();

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!server.is_finished());

    server.cancel();
    assert!(server.outcome().await.is_ok());
}

#[tokio::test]
async fn in_flight_request_finishes_within_timeout() {
    let started = Arc::new(Notify::new());
    let server = TestServer::start_with(
        common::config_with_timeout(Duration::from_secs(5)),
        common::sleepy_router(Duration::from_millis(100), started.clone()),
    )
    .await
    .unwrap();

    let request = tokio::spawn(common::client().get(format!("{}/sleep", server.url())).send());
    started.notified().await;

    assert!(server.shutdown().await.is_ok());

    let response = request.await.unwrap().unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.text().await.unwrap(), "slept");
}

#[tokio::test]
async fn slow_request_exceeds_deadline_but_still_completes() {
    let started = Arc::new(Notify::new());
    let server = TestServer::start_with(
        common::config_with_timeout(Duration::from_millis(1)),
        common::sleepy_router(Duration::from_millis(500), started.clone()),
    )
    .await
    .unwrap();

    let request = tokio::spawn(common::client().get(format!("{}/sleep", server.url())).send());
    started.notified().await;

    let err = server.shutdown().await.unwrap_err();
    assert!(err.is_deadline_exceeded(), "unexpected outcome: {err:?}");
    assert!(matches!(
        err,
        ServerError::DeadlineExceeded(timeout) if timeout == Duration::from_millis(1)
    ));

    let response = request.await.unwrap().unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn request_scope_is_cancelled_with_run_context() {
    let started = Arc::new(Notify::new());
    let server = TestServer::start_with(
        common::config_with_timeout(Duration::from_secs(5)),
        common::cancellable_router(started.clone()),
    )
    .await
    .unwrap();

    let request = tokio::spawn(common::client().get(format!("{}/wait", server.url())).send());
    started.notified().await;

    assert!(server.shutdown().await.is_ok());

    let response = request.await.unwrap().unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn handler_errors_do_not_affect_outcome() {
    let router = Router::new().route(
        "/teapot",
        get(|| async { Err::<(), http_toolkit::HandlerError>(StatusCode::IM_A_TEAPOT.into()) }),
    );
    let server = TestServer::start(router).await.unwrap();

    let response = common::client()
        .get(format!("{}/teapot", server.url()))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::IM_A_TEAPOT);

    assert!(server.shutdown().await.is_ok());
}

#[tokio::test]
async fn request_id_is_echoed_or_generated() {
    let server = TestServer::start(Router::new().route("/", get(|| async { "OK!" })))
        .await
        .unwrap();
    let client = common::client();

    let supplied = "5f0c6d1e-8a57-4f7e-9a3b-2d1c0e9f8a7b";
    let response = client
        .get(server.url())
        .header(X_REQUEST_ID.as_str(), supplied)
        .send()
        .await
        .unwrap();
    assert_eq!(response.headers()[X_REQUEST_ID.as_str()], supplied);

    let response = client.get(server.url()).send().await.unwrap();
    let generated = response.headers()[X_REQUEST_ID.as_str()].to_str().unwrap();
    assert!(uuid::Uuid::parse_str(generated).is_ok());
    assert_ne!(generated, supplied);

    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn dropping_test_server_cancels_run() {
    let server = TestServer::start(Router::new()).await.unwrap();
    let ctx = server.context().clone();

    drop(server);
    assert!(ctx.is_cancelled());
}
