//! Shutdown coordination for a server run.
//!
//! The coordinator waits for the run context to be cancelled, stops the
//! accept loop, drains in-flight connections under a fresh deadline and
//! reduces everything to a single outcome.
//!
//! Precedence is asymmetric: a shutdown failure (deadline exceeded) always
//! wins, and the serving task's result is only read after shutdown succeeded.

use std::time::Duration;

use tokio::sync::oneshot;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::{ServerError, ServerResult};
use crate::net::ConnectionTracker;

/// Receiving half of the serving task's result slot.
pub type ServingResult = oneshot::Receiver<ServerResult>;

/// Drives one server run from start to its outcome.
#[derive(Debug)]
pub struct ShutdownCoordinator {
    /// Tells the accept loop and every connection to stop.
    stop: CancellationToken,
    tracker: ConnectionTracker,
    timeout: Duration,
}

impl ShutdownCoordinator {
    pub fn new(stop: CancellationToken, tracker: ConnectionTracker, timeout: Duration) -> Self {
        Self {
            stop,
            tracker,
            timeout,
        }
    }

    /// Wait for `ctx` to be cancelled, shut down, and return the run outcome.
    ///
    /// If serving ends before cancellation, its result is returned right
    /// away and no graceful shutdown is attempted.
    pub async fn run(self, ctx: CancellationToken, mut serving: ServingResult) -> ServerResult {
        tokio::select! {
            biased;
            _ = ctx.cancelled() => {
                tracing::info!("Cancellation received, starting graceful shutdown");
            }
            early = &mut serving => {
                // Release whatever connections are still open; nobody waits for them.
                self.stop.cancel();
                let outcome = settle_serving(early);
                if let Err(err) = &outcome {
                    tracing::error!(error = %err, "Serving stopped before cancellation");
                }
                return outcome;
            }
        }

        if let Err(err) = self.shutdown().await {
            tracing::warn!(error = %err, "Graceful shutdown failed");
            return Err(err);
        }

        settle_serving(serving.await)
    }

    /// Stop accepting and wait for in-flight connections.
    ///
    /// The deadline starts now, independent of the cancelled run context.
    /// Closing the listener is not subject to it, so the listener is always
    /// gone when this returns; an idle server shuts down cleanly even with a
    /// zero timeout.
    async fn shutdown(&self) -> ServerResult {
        let deadline = Instant::now() + self.timeout;
        self.stop.cancel();

        self.tracker.listener_closed().await;
        tracing::info!(
            active_connections = self.tracker.active_count(),
            timeout_ms = self.timeout.as_millis() as u64,
            "Listener closed, draining connections"
        );

        match tokio::time::timeout_at(deadline, self.tracker.drained()).await {
            Ok(()) => {
                tracing::info!("All connections drained");
                Ok(())
            }
            Err(_) => Err(ServerError::DeadlineExceeded(self.timeout)),
        }
    }
}

/// Turn what the serving task delivered into the run outcome.
///
/// The "closed by shutdown" sentinel counts as success. A dropped sender
/// means the task died without reporting.
pub fn settle_serving(received: Result<ServerResult, oneshot::error::RecvError>) -> ServerResult {
    match received {
        Ok(Ok(())) | Ok(Err(ServerError::Closed)) => Ok(()),
        Ok(Err(err)) => Err(err),
        Err(_) => Err(ServerError::ServeTaskLost),
    }
}
