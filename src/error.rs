//! Server run outcomes.
//!
//! A run produces exactly one `Result<(), ServerError>`. Callers tell the
//! failure kinds apart by variant, never by message.

use std::time::Duration;

use thiserror::Error;

use crate::net::listener::BindError;

/// Errors that end a server run.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The listener could not be acquired. No shutdown was attempted.
    #[error(transparent)]
    Bind(#[from] BindError),

    /// The accept loop failed on its own.
    #[error("failed to accept connections: {0}")]
    Accept(#[source] std::io::Error),

    /// In-flight connections did not finish before the shutdown deadline.
    #[error("graceful shutdown exceeded its deadline of {0:?}")]
    DeadlineExceeded(Duration),

    /// The listener was closed by a deliberate shutdown.
    ///
    /// Reported by the accept loop after a stop and treated as success by the
    /// coordinator; a run never returns it.
    #[error("server closed")]
    Closed,

    /// The serving task ended without reporting a result (it panicked or was
    /// aborted).
    #[error("serving task terminated without reporting a result")]
    ServeTaskLost,
}

impl ServerError {
    /// Whether this is the shutdown deadline sentinel.
    pub fn is_deadline_exceeded(&self) -> bool {
        matches!(self, ServerError::DeadlineExceeded(_))
    }

    /// Whether this is the "listener closed by shutdown" sentinel.
    pub fn is_closed(&self) -> bool {
        matches!(self, ServerError::Closed)
    }

    /// Short label used for metrics and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            ServerError::Bind(_) => "bind",
            ServerError::Accept(_) => "accept",
            ServerError::DeadlineExceeded(_) => "deadline_exceeded",
            ServerError::Closed => "closed",
            ServerError::ServeTaskLost => "serve_task_lost",
        }
    }
}

/// Result type for server runs.
pub type ServerResult<T = ()> = Result<T, ServerError>;
