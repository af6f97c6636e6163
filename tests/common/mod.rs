//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::time::Duration;

use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;
use http_toolkit::config::ServerConfig;
use http_toolkit::{HandlerError, RequestScope, StatusError};
use tokio::sync::Notify;

/// HTTP client that never reuses connections and ignores proxy settings.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .no_proxy()
        .pool_max_idle_per_host(0)
        .timeout(Duration::from_secs(10))
        .build()
        .expect("build client")
}

/// HTTP client that keeps idle connections open for reuse.
pub fn pooled_client() -> reqwest::Client {
    reqwest::Client::builder()
        .no_proxy()
        .pool_idle_timeout(Duration::from_secs(60))
        .timeout(Duration::from_secs(10))
        .build()
        .expect("build client")
}

/// Server config with the given shutdown timeout.
pub fn config_with_timeout(timeout: Duration) -> ServerConfig {
    ServerConfig::default().with_shutdown_timeout(timeout)
}

/// Router with a handler that sleeps for `delay` and ignores cancellation.
///
/// `started` is notified once the handler is running.
pub fn sleepy_router(delay: Duration, started: std::sync::Arc<Notify>) -> Router {
    Router::new().route(
        "/sleep",
        get(move || {
            let started = started.clone();
            async move {
                started.notify_one();
                tokio::time::sleep(delay).await;
                "slept"
            }
        }),
    )
}

/// Router with a handler that waits for its scope to be cancelled and then
/// fails with 500.
pub fn cancellable_router(started: std::sync::Arc<Notify>) -> Router {
    Router::new().route(
        "/wait",
        get(move |scope: RequestScope| {
            let started = started.clone();
            async move {
                started.notify_one();
                tokio::select! {
                    _ = scope.cancelled() => Err::<&'static str, HandlerError>(
                        StatusError::with_source(StatusCode::INTERNAL_SERVER_ERROR, "cancelled")
                            .into(),
                    ),
                    _ = tokio::time::sleep(Duration::from_secs(30)) => Ok("finished"),
                }
            }
        }),
    )
}
