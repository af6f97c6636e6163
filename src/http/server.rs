//! HTTP server with graceful shutdown.
//!
//! # Responsibilities
//! - Serve an axum `Router` over HTTP/1.1 and HTTP/2 on a TCP listener
//! - Install a `RequestScope` derived from the run context on every request
//! - Run until the run context is cancelled, then shut down within a deadline
//!
//! # Data Flow
//! ```text
//! Server::serve(listener, ctx)
//!     → accept loop task (owns the listener)
//!         → one task per connection (hyper-util auto builder)
//!             → RequestService (scope, request id, metrics) → Router
//!     → ShutdownCoordinator (waits for ctx, drains, reconciles)
//! ```

use std::convert::Infallible;
use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::ops::ControlFlow;
use std::pin::Pin;
use std::time::Instant;

use axum::extract::ConnectInfo;
use axum::http::{HeaderValue, Request};
use axum::response::Response;
use axum::Router;
use hyper::body::Incoming;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;
use tracing::Instrument;

use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::http::request::{RequestId, RequestScope, X_REQUEST_ID};
use crate::lifecycle::ShutdownCoordinator;
use crate::net::{self, ConnectionId, ConnectionTracker, ListenerGuard};
use crate::observability::metrics;
use crate::resilience::RetryBackoff;

/// HTTP server that shuts down gracefully when its run context is cancelled.
///
/// A server runs once: [`Server::serve`] and [`Server::listen_and_serve`]
/// consume it.
pub struct Server {
    router: Router,
    config: ServerConfig,
}

impl Server {
    /// Create a server dispatching requests to `router`.
    pub fn new(config: ServerConfig, router: Router) -> Self {
        Self { router, config }
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Bind `config.bind_address` and serve until `ctx` is cancelled.
    ///
    /// A bind failure is returned immediately.
    pub async fn listen_and_serve(self, ctx: CancellationToken) -> ServerResult {
        let listener = net::bind(&self.config.bind_address).await?;
        self.serve(listener, ctx).await
    }

    /// Serve on `listener` until `ctx` is cancelled.
    ///
    /// Every request's [`RequestScope`] is a child of `ctx`. On cancellation
    /// the listener is closed and in-flight connections get
    /// `shutdown_timeout` to finish.
    ///
    /// Returns `Ok(())` after a graceful shutdown,
    /// [`ServerError::DeadlineExceeded`] if connections were still busy at
    /// the deadline, or the error that stopped serving. The listener is closed
    /// when this returns.
    pub async fn serve(self, listener: TcpListener, ctx: CancellationToken) -> ServerResult {
        let local_addr = net::local_addr(&listener)?;
        let timeout = self.config.shutdown_timeout();
        tracing::info!(
            address = %local_addr,
            shutdown_timeout_ms = timeout.as_millis() as u64,
            "HTTP server starting"
        );

        let tracker = ConnectionTracker::new();
        let stop = CancellationToken::new();
        let accept = AcceptLoop {
            listener,
            _listening: tracker.listen(),
            tracker: tracker.clone(),
            router: self.router,
            base: ctx.clone(),
            stop: stop.clone(),
            backoff: RetryBackoff::new(
                self.config.accept_backoff_base_ms,
                self.config.accept_backoff_max_ms,
                self.config.max_accept_retries,
            ),
        };

        let (result_tx, result_rx) = oneshot::channel();
        tokio::spawn(async move {
            // Nobody reads this if shutdown already failed; the slot just holds it.
            let _ = result_tx.send(accept.run().await);
        });

        let outcome = ShutdownCoordinator::new(stop, tracker, timeout)
            .run(ctx, result_rx)
            .await;

        match &outcome {
            Ok(()) => {
                metrics::record_shutdown("graceful");
                tracing::info!(address = %local_addr, "HTTP server stopped");
            }
            Err(err) => {
                metrics::record_shutdown(err.kind());
                tracing::error!(
                    address = %local_addr,
                    error = %err,
                    "HTTP server stopped with error"
                );
            }
        }
        outcome
    }
}

/// Bind `addr` and serve `router` until `ctx` is cancelled, using the
/// default shutdown timeout.
pub async fn listen_and_serve(ctx: CancellationToken, addr: &str, router: Router) -> ServerResult {
    Server::new(ServerConfig::default().with_bind_address(addr), router)
        .listen_and_serve(ctx)
        .await
}

/// The serving task. Owns the listener until it stops.
struct AcceptLoop {
    listener: TcpListener,
    _listening: ListenerGuard,
    tracker: ConnectionTracker,
    router: Router,
    base: CancellationToken,
    stop: CancellationToken,
    backoff: RetryBackoff,
}

impl AcceptLoop {
    /// Accept until stopped. Dropping `self` closes the listener, so the
    /// tracker sees it closed before the result is delivered.
    async fn run(mut self) -> ServerResult {
        let builder = auto::Builder::new(TokioExecutor::new());

        loop {
            let accepted = tokio::select! {
                biased;
                _ = self.stop.cancelled() => break,
                accepted = self.listener.accept() => accepted,
            };

            match accepted {
                Ok((stream, remote_addr)) => {
                    self.backoff.reset();
                    self.spawn_connection(&builder, stream, remote_addr);
                }
                Err(err) => {
                    if let ControlFlow::Break(stopped) =
                        recover_from_accept_error(err, &mut self.backoff, &self.stop).await
                    {
                        return Err(stopped);
                    }
                }
            }
        }

        tracing::debug!("Accept loop stopped");
        Err(ServerError::Closed)
    }

    fn spawn_connection(
        &self,
        builder: &auto::Builder<TokioExecutor>,
        stream: TcpStream,
        remote_addr: SocketAddr,
    ) {
        let guard = self.tracker.track();
        let connection_id = guard.id();
        let builder = builder.clone();
        let stop = self.stop.clone();
        let service = RequestService {
            router: self.router.clone(),
            base: self.base.clone(),
            remote_addr,
            connection_id,
        };

        tracing::debug!(
            connection_id = %connection_id,
            peer_addr = %remote_addr,
            active_connections = self.tracker.active_count(),
            "Connection accepted"
        );

        tokio::spawn(async move {
            let _guard = guard;
            let conn = builder.serve_connection_with_upgrades(TokioIo::new(stream), service);
            tokio::pin!(conn);

            let result = tokio::select! {
                result = conn.as_mut() => result,
                _ = stop.cancelled() => {
                    // Finish in-flight requests, refuse new ones on this connection.
                    conn.as_mut().graceful_shutdown();
                    conn.await
                }
            };

            if let Err(err) = result {
                tracing::debug!(
                    connection_id = %connection_id,
                    error = %err,
                    "Connection ended with error"
                );
            }
        });
    }
}

/// Decide what the accept loop does after `accept` failed.
///
/// Connection-level errors are skipped. Other errors wait out the next
/// backoff delay, or end serving with [`ServerError::Accept`] once the retry
/// limit is spent. A stop during the delay ends serving with
/// [`ServerError::Closed`].
async fn recover_from_accept_error(
    err: io::Error,
    backoff: &mut RetryBackoff,
    stop: &CancellationToken,
) -> ControlFlow<ServerError> {
    if is_connection_error(&err) {
        tracing::debug!(error = %err, "Connection dropped during accept");
        return ControlFlow::Continue(());
    }

    let Some(delay) = backoff.next_delay() else {
        tracing::error!(error = %err, attempts = backoff.failures(), "Accept failed, giving up");
        return ControlFlow::Break(ServerError::Accept(err));
    };

    tracing::warn!(
        error = %err,
        attempt = backoff.failures(),
        delay_ms = delay.as_millis() as u64,
        "Accept failed, retrying"
    );
    tokio::select! {
        biased;
        _ = stop.cancelled() => {
            tracing::debug!("Accept loop stopped during backoff");
            ControlFlow::Break(ServerError::Closed)
        }
        _ = tokio::time::sleep(delay) => ControlFlow::Continue(()),
    }
}

/// Errors that concern a single connection, not the listener.
fn is_connection_error(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::ConnectionRefused
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::Interrupted
    )
}

/// Per-connection hyper service: installs the request scope, then hands the
/// request to the router.
#[derive(Clone)]
struct RequestService {
    router: Router,
    base: CancellationToken,
    remote_addr: SocketAddr,
    connection_id: ConnectionId,
}

impl hyper::service::Service<Request<Incoming>> for RequestService {
    type Response = Response;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Response, Infallible>> + Send>>;

    fn call(&self, mut req: Request<Incoming>) -> Self::Future {
        let request_id = RequestId::from_headers(req.headers()).unwrap_or_default();
        let scope = RequestScope::new(
            request_id,
            self.remote_addr,
            self.connection_id,
            self.base.child_token(),
        );
        req.extensions_mut().insert(scope);
        req.extensions_mut().insert(ConnectInfo(self.remote_addr));

        let span = tracing::debug_span!(
            "request",
            request_id = %request_id,
            connection_id = %self.connection_id,
            method = %req.method(),
            path = %req.uri().path(),
        );
        let method = req.method().clone();
        let router = self.router.clone();

        Box::pin(
            async move {
                let started = Instant::now();
                let mut response = match router.oneshot(req).await {
                    Ok(response) => response,
                    Err(never) => match never {},
                };

                if let Ok(value) = HeaderValue::from_str(&request_id.to_string()) {
                    response.headers_mut().insert(X_REQUEST_ID, value);
                }
                metrics::record_request(method.as_str(), response.status().as_u16(), started);
                tracing::debug!(status = %response.status(), "Request completed");
                Ok(response)
            }
            .instrument(span),
        )
    }
}
