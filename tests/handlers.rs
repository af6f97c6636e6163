//! Handler error rendering over a real connection.

mod common;

use axum::extract::Request;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use http_toolkit::config::ProblemConfig;
use http_toolkit::http::fallible;
use http_toolkit::problem::PROBLEM_JSON;
use http_toolkit::testing::TestServer;
use http_toolkit::{HandlerError, Problem, ProblemType, RequestScope, StatusError};
use serde_json::{json, Value};

fn router() -> Router {
    Router::new()
        .route("/ok", get(|| async { Ok::<_, HandlerError>("OK!") }))
        .route(
            "/teapot",
            get(|| async {
                Err::<(), HandlerError>(StatusError::new(StatusCode::IM_A_TEAPOT).into())
            }),
        )
        .route(
            "/problem",
            get(|| async {
                let problem = Problem::new(StatusCode::IM_A_TEAPOT, "problem error");
                Err::<(), HandlerError>(problem.into())
            }),
        )
        .route(
            "/typed",
            get(|| async {
                let out_of_credit = ProblemType::new(
                    "https://example.com/probs/out-of-credit",
                    "You do not have enough credit.",
                );
                let problem = Problem::new(
                    StatusCode::FORBIDDEN,
                    "Your current balance is 30, but that costs 50.",
                )
                .with_type(&out_of_credit)
                .with_instance("/account/12345/msgs/abc")
                .with_extension("balance", 30)
                .with_extension("accounts", json!(["/account/12345", "/account/67890"]));
                Err::<(), HandlerError>(problem.into())
            }),
        )
        .route(
            "/prefixed",
            get(|| async {
                let config = ProblemConfig {
                    type_uri_prefix: "https://errors.example.com/".to_string(),
                };
                let problem = config.problem(StatusCode::NOT_FOUND, "no such thing");
                Err::<(), HandlerError>(problem.into())
            }),
        )
        .route(
            "/internal",
            get(|| async {
                Err::<(), HandlerError>(HandlerError::internal("database unreachable"))
            }),
        )
        .route(
            "/dispatch",
            get(fallible(|req: Request, scope: RequestScope| async move {
                if req.uri().query() == Some("fail") {
                    return Err(HandlerError::from(StatusCode::BAD_REQUEST));
                }
                Ok::<Response, HandlerError>(scope.id().to_string().into_response())
            })),
        )
}

fn content_type(response: &reqwest::Response) -> &str {
    response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
}

#[tokio::test]
async fn success_is_passed_through() {
    let server = TestServer::start(router()).await.unwrap();

    let response = common::client().get(format!("{}/ok", server.url())).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.text().await.unwrap(), "OK!");

    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn status_error_renders_reason_phrase() {
    let server = TestServer::start(router()).await.unwrap();

    let response = common::client().get(format!("{}/teapot", server.url())).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::IM_A_TEAPOT);
    assert_eq!(content_type(&response), "text/plain; charset=utf-8");
    assert_eq!(response.headers()["x-content-type-options"], "nosniff");
    assert_eq!(response.text().await.unwrap(), "I'm a teapot");

    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn problem_renders_json_document() {
    let server = TestServer::start(router()).await.unwrap();

    let response = common::client().get(format!("{}/problem", server.url())).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::IM_A_TEAPOT);
    assert_eq!(content_type(&response), PROBLEM_JSON);

    let body: Value = response.json().await.unwrap();
    assert_eq!(
        body,
        json!({
            "detail": "problem error",
            "status": 418,
            "title": "I'm a teapot",
            "type": "https://httpstatuses.io/418",
        })
    );

    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn problem_carries_type_instance_and_extensions() {
    let server = TestServer::start(router()).await.unwrap();

    let response = common::client().get(format!("{}/typed", server.url())).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let problem: Problem = response.json().await.unwrap();
    assert_eq!(problem.type_uri(), "https://example.com/probs/out-of-credit");
    assert_eq!(problem.title(), "You do not have enough credit.");
    assert_eq!(problem.instance(), Some("/account/12345/msgs/abc"));
    assert_eq!(problem.extension("balance"), Some(&json!(30)));
    assert_eq!(problem.extensions().len(), 2);

    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn configured_prefix_is_used_for_default_type() {
    let server = TestServer::start(router()).await.unwrap();

    let body: Value = common::client()
        .get(format!("{}/prefixed", server.url()))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["type"], "https://errors.example.com/404");
    assert_eq!(body["title"], "Not Found");

    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn internal_error_hides_details() {
    let server = TestServer::start(router()).await.unwrap();

    let response = common::client().get(format!("{}/internal", server.url())).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.text().await.unwrap(), "Internal Server Error");

    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn fallible_dispatch_sees_request_scope() {
    let server = TestServer::start(router()).await.unwrap();
    let client = common::client();

    let response = client.get(format!("{}/dispatch", server.url())).send().await.unwrap();
    let echoed = response.headers()["x-request-id"].to_str().unwrap().to_string();
    assert_eq!(response.text().await.unwrap(), echoed);

    let response = client.get(format!("{}/dispatch?fail", server.url())).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(response.text().await.unwrap(), "Bad Request");

    server.shutdown().await.unwrap();
}
