//! Handler error to response mapping.
//!
//! # Responsibilities
//! - Define the errors a fallible handler may return
//! - Render them for the client: plain status text, or a problem document
//!
//! # Design Decisions
//! - A dispatch failure only shapes its own response; it never reaches the
//!   server's run outcome
//! - Unclassified errors are logged and answered with a bare 500 so internal
//!   messages do not leak to clients

use std::error::Error as StdError;
use std::fmt;

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::problem::Problem;

type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// Renders a handler error into the response sent to the client.
pub type ErrorRenderer = fn(HandlerError) -> Response;

/// An error that carries the status code the client should see.
///
/// Rendered as the status' reason phrase in plain text.
#[derive(Debug)]
pub struct StatusError {
    status: StatusCode,
    source: Option<BoxError>,
}

impl StatusError {
    pub fn new(status: StatusCode) -> Self {
        Self { status, source: None }
    }

    pub fn with_source(status: StatusCode, source: impl Into<BoxError>) -> Self {
        Self {
            status,
            source: Some(source.into()),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl fmt::Display for StatusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.source {
            Some(source) => source.fmt(f),
            None => f.write_str(self.status.canonical_reason().unwrap_or_default()),
        }
    }
}

impl StdError for StatusError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source.as_deref().map(|e| e as &(dyn StdError + 'static))
    }
}

impl IntoResponse for StatusError {
    fn into_response(self) -> Response {
        status_text_response(self.status)
    }
}

/// Failure returned by a fallible handler.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// Answer with a status code and its plain-text reason phrase.
    #[error(transparent)]
    Status(#[from] StatusError),

    /// Answer with a problem document.
    #[error(transparent)]
    Problem(Box<Problem>),

    /// Anything else; answered with 500.
    #[error("{0}")]
    Internal(#[source] BoxError),
}

impl HandlerError {
    pub fn internal(err: impl Into<BoxError>) -> Self {
        HandlerError::Internal(err.into())
    }

    /// Status the client will receive with the default rendering.
    pub fn status(&self) -> StatusCode {
        match self {
            HandlerError::Status(e) => e.status(),
            HandlerError::Problem(p) => p.status(),
            HandlerError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<Problem> for HandlerError {
    fn from(problem: Problem) -> Self {
        HandlerError::Problem(Box::new(problem))
    }
}

impl From<StatusCode> for HandlerError {
    fn from(status: StatusCode) -> Self {
        HandlerError::Status(StatusError::new(status))
    }
}

impl IntoResponse for HandlerError {
    fn into_response(self) -> Response {
        render_error(self)
    }
}

/// Default rendering of handler errors.
pub fn render_error(err: HandlerError) -> Response {
    match err {
        HandlerError::Status(e) => {
            tracing::debug!(status = %e.status(), error = %e, "Handler returned status error");
            status_text_response(e.status())
        }
        HandlerError::Problem(problem) => {
            tracing::debug!(
                status = %problem.status(),
                title = %problem.title(),
                "Handler returned problem"
            );
            problem.into_response()
        }
        HandlerError::Internal(e) => {
            tracing::error!(error = %e, "Handler failed");
            status_text_response(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// Plain-text response whose body is the status' reason phrase.
pub fn status_text_response(status: StatusCode) -> Response {
    let text = status.canonical_reason().unwrap_or_default();
    let mut response = (status, text).into_response();
    response
        .headers_mut()
        .insert(header::X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
    response
}
