//! Fallible request handlers.
//!
//! Any axum handler returning `Result<_, HandlerError>` is already fallible.
//! [`fallible`] additionally adapts a plain dispatch function
//! `(Request, RequestScope) -> Result<Response, HandlerError>` into an axum
//! handler with a replaceable error renderer.

use std::future::Future;
use std::pin::Pin;

use axum::extract::Request;
use axum::handler::Handler;
use axum::http::StatusCode;
use axum::response::Response;

use crate::http::request::RequestScope;
use crate::http::response::{render_error, ErrorRenderer, HandlerError, StatusError};

/// A dispatch function wrapped as an axum handler.
#[derive(Clone)]
pub struct FallibleHandler<F> {
    dispatch: F,
    renderer: ErrorRenderer,
}

/// Wrap `dispatch` so it can be mounted on an axum router.
pub fn fallible<F, Fut>(dispatch: F) -> FallibleHandler<F>
where
    F: Fn(Request, RequestScope) -> Fut + Clone + Send + Sync + 'static,
    Fut: Future<Output = Result<Response, HandlerError>> + Send + 'static,
{
    FallibleHandler {
        dispatch,
        renderer: render_error,
    }
}

impl<F> FallibleHandler<F> {
    /// Replace the default error rendering for this handler.
    pub fn with_renderer(mut self, renderer: ErrorRenderer) -> Self {
        self.renderer = renderer;
        self
    }
}

impl<F, Fut, S> Handler<(), S> for FallibleHandler<F>
where
    F: Fn(Request, RequestScope) -> Fut + Clone + Send + Sync + 'static,
    Fut: Future<Output = Result<Response, HandlerError>> + Send + 'static,
    S: Send + 'static,
{
    type Future = Pin<Box<dyn Future<Output = Response> + Send>>;

    fn call(self, req: Request, _state: S) -> Self::Future {
        Box::pin(async move {
            let Some(scope) = req.extensions().get::<RequestScope>().cloned() else {
                tracing::error!(
                    "Request scope missing; router is not served by http_toolkit::Server"
                );
                return (self.renderer)(StatusError::new(StatusCode::INTERNAL_SERVER_ERROR).into());
            };

            match (self.dispatch)(req, scope).await {
                Ok(response) => response,
                Err(err) => (self.renderer)(err),
            }
        })
    }
}
