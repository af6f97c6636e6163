//! Test support: run a [`Server`] on an ephemeral port in the background.
//!
//! ```rust,ignore
//! let server = TestServer::start(router).await?;
//! let body = reqwest::get(format!("{}/hello", server.url())).await?;
//! server.cancel();
//! assert!(server.outcome().await.is_ok());
//! ```

use std::net::SocketAddr;

use axum::Router;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::http::Server;
use crate::net::{bind_ephemeral, local_addr, BindError};

/// A server running on `127.0.0.1:<random port>`.
///
/// The listener is bound before `start` returns, so requests can be sent
/// right away. Dropping the handle cancels the run.
pub struct TestServer {
    addr: SocketAddr,
    url: String,
    ctx: CancellationToken,
    handle: Option<JoinHandle<ServerResult>>,
}

impl TestServer {
    /// Start `router` with the default server configuration.
    pub async fn start(router: Router) -> Result<Self, BindError> {
        Self::start_with(ServerConfig::default(), router).await
    }

    /// Start `router` with `config`; its bind address is ignored.
    pub async fn start_with(config: ServerConfig, router: Router) -> Result<Self, BindError> {
        let listener = bind_ephemeral().await?;
        let addr = local_addr(&listener)?;

        let ctx = CancellationToken::new();
        let server = Server::new(config, router);
        let handle = tokio::spawn(server.serve(listener, ctx.clone()));

        Ok(Self {
            addr,
            url: format!("http://{addr}"),
            ctx,
            handle: Some(handle),
        })
    }

    /// Base URL, e.g. `http://127.0.0.1:41234`.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Socket address the server listens on.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// The run context; cancelling it shuts the server down.
    pub fn context(&self) -> &CancellationToken {
        &self.ctx
    }

    /// Cancel the run context. Repeated calls are no-ops.
    pub fn cancel(&self) {
        self.ctx.cancel();
    }

    /// Whether the run has returned.
    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().map_or(true, JoinHandle::is_finished)
    }

    /// Wait for the run to return and get its outcome.
    pub async fn outcome(mut self) -> ServerResult {
        match self.handle.take() {
            Some(handle) => handle.await.unwrap_or(Err(ServerError::ServeTaskLost)),
            None => Err(ServerError::ServeTaskLost),
        }
    }

    /// Cancel and wait for the outcome.
    pub async fn shutdown(self) -> ServerResult {
        self.cancel();
        self.outcome().await
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.ctx.cancel();
    }
}
