//! http-toolkit demo server.
//!
//! Serves a handful of routes that exercise the toolkit until SIGINT or
//! SIGTERM, then shuts down gracefully:
//!
//! - `GET /` plain success
//! - `GET /slow` ten seconds of work that gives up when shutdown starts
//! - `GET /teapot` status error rendered as plain text
//! - `GET /problem` problem document
//! - `ANY /echo` fallible dispatch function echoing the request ID

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{any, get};
use axum::Router;
use clap::Parser;
use tower_http::trace::TraceLayer;

use http_toolkit::config::{load_config, validate_config, ConfigError, ProblemConfig, ToolkitConfig};
use http_toolkit::http::fallible;
use http_toolkit::lifecycle::shutdown_token;
use http_toolkit::observability::{init_logging, metrics};
use http_toolkit::{HandlerError, Problem, RequestScope, Server, StatusError};

#[derive(Parser)]
#[command(name = "http-toolkit")]
#[command(about = "Demo HTTP server with graceful shutdown", long_about = None)]
struct Cli {
    /// TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the bind address.
    #[arg(short, long)]
    bind: Option<String>,

    /// Override the graceful shutdown timeout.
    #[arg(long)]
    shutdown_timeout_ms: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ToolkitConfig::default(),
    };
    if let Some(bind) = cli.bind {
        config.server.bind_address = bind;
    }
    if let Some(timeout_ms) = cli.shutdown_timeout_ms {
        config.server.shutdown_timeout_ms = timeout_ms;
    }
    validate_config(&config).map_err(ConfigError::Validation)?;

    init_logging(&config.observability)?;
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "http-toolkit starting");

    if config.observability.metrics_enabled {
        metrics::init_metrics(config.observability.metrics_address.parse()?)?;
    }

    let ctx = shutdown_token()?;
    let server = Server::new(config.server.clone(), demo_router(config.problem.clone()));
    server.listen_and_serve(ctx).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

fn demo_router(problems: ProblemConfig) -> Router {
    Router::new()
        .route("/", get(|| async { "OK!" }))
        .route("/slow", get(slow))
        .route("/teapot", get(teapot))
        .route("/problem", get(problem))
        .route("/echo", any(fallible(echo)))
        .with_state(Arc::new(problems))
        .layer(TraceLayer::new_for_http())
}

async fn slow(scope: RequestScope) -> Result<&'static str, HandlerError> {
    tokio::select! {
        _ = tokio::time::sleep(Duration::from_secs(10)) => Ok("done"),
        _ = scope.cancelled() => Err(StatusError::with_source(
            StatusCode::SERVICE_UNAVAILABLE,
            "server is shutting down",
        )
        .into()),
    }
}

async fn teapot() -> Result<(), HandlerError> {
    Err(StatusCode::IM_A_TEAPOT.into())
}

async fn problem(State(problems): State<Arc<ProblemConfig>>) -> Result<(), HandlerError> {
    let problem: Problem = problems
        .problem(StatusCode::IM_A_TEAPOT, "problem error")
        .with_instance("/problem");
    Err(problem.into())
}

async fn echo(req: Request, scope: RequestScope) -> Result<Response, HandlerError> {
    Ok(format!("{} {} {}\n", req.method(), req.uri().path(), scope.id()).into_response())
}
