//! Per-request scope.
//!
//! # Responsibilities
//! - Assign every request an ID (honouring a valid incoming `x-request-id`)
//! - Carry the request's cancellation token, derived from the run context
//! - Make both available to handlers as an axum extractor
//!
//! # Design Decisions
//! - The scope is installed by the server before the router sees the request
//! - Cancelling the run context cancels every request token; a request's own
//!   token is dropped when the request finishes

use std::fmt;
use std::net::SocketAddr;

use axum::extract::FromRequestParts;
use axum::http::{request::Parts, HeaderMap, HeaderName, StatusCode};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::http::response::StatusError;
use crate::net::ConnectionId;

/// Header carrying the request ID, in both directions.
pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Unique identifier of one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestId(Uuid);

impl RequestId {
    /// Generate a fresh random ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Read the ID a client or upstream proxy supplied, if it is a UUID.
    pub fn from_headers(headers: &HeaderMap) -> Option<Self> {
        headers
            .get(X_REQUEST_ID)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| Uuid::parse_str(v.trim()).ok())
            .map(Self)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Everything a handler needs to know about the request it serves, apart
/// from the request itself.
#[derive(Debug, Clone)]
pub struct RequestScope {
    id: RequestId,
    remote_addr: SocketAddr,
    connection_id: ConnectionId,
    cancellation: CancellationToken,
}

impl RequestScope {
    pub fn new(
        id: RequestId,
        remote_addr: SocketAddr,
        connection_id: ConnectionId,
        cancellation: CancellationToken,
    ) -> Self {
        Self {
            id,
            remote_addr,
            connection_id,
            cancellation,
        }
    }

    pub fn id(&self) -> RequestId {
        self.id
    }

    pub fn remote_addr(&self) -> SocketAddr {
        self.remote_addr
    }

    pub fn connection_id(&self) -> ConnectionId {
        self.connection_id
    }

    /// Token cancelled when the server run is cancelled.
    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancellation
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    /// Resolves once the server run has been cancelled.
    pub async fn cancelled(&self) {
        self.cancellation.cancelled().await
    }
}

impl<S> FromRequestParts<S> for RequestScope
where
    S: Send + Sync,
{
    type Rejection = StatusError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts.extensions.get::<RequestScope>().cloned().ok_or_else(|| {
            tracing::error!("Request scope missing; router is not served by http_toolkit::Server");
            StatusError::new(StatusCode::INTERNAL_SERVER_ERROR)
        })
    }
}
