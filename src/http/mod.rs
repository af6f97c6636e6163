//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (accept loop, hyper-util connection, graceful shutdown)
//!     → request.rs (request ID, RequestScope with cancellation)
//!     → axum Router → handler
//!     → handler.rs / response.rs (fallible handlers, error rendering)
//!     → Send to client
//! ```

pub mod handler;
pub mod request;
pub mod response;
pub mod server;

pub use handler::{fallible, FallibleHandler};
pub use request::{RequestId, RequestScope, X_REQUEST_ID};
pub use response::{render_error, ErrorRenderer, HandlerError, StatusError};
pub use server::{listen_and_serve, Server};
