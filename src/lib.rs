//! HTTP toolkit: a graceful-shutdown server, fallible handlers and RFC 9457
//! problem details on top of axum and hyper.
//!
//! The server runs until a `CancellationToken` is cancelled, then stops
//! accepting, drains in-flight requests within a deadline and returns a
//! single outcome.

pub mod config;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod problem;
pub mod resilience;
pub mod testing;

pub use config::schema::{ServerConfig, ToolkitConfig};
pub use error::{ServerError, ServerResult};
pub use http::{listen_and_serve, HandlerError, RequestScope, Server, StatusError};
pub use problem::{Problem, ProblemType};
pub use tokio_util::sync::CancellationToken;
