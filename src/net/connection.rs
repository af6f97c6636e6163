//! Connection lifecycle tracking.
//!
//! # Responsibilities
//! - Generate unique connection IDs for tracing
//! - Track the open listener and every accepted connection
//! - Let shutdown wait until the listener is closed and connections drained
//!
//! Waiting is driven by a watch channel: every guard drop publishes the new
//! occupancy, so waiters wake exactly when the state changes.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::watch;

use crate::observability::metrics;

/// Global atomic counter for connection IDs.
static CONNECTION_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Generate a new unique connection ID.
    pub fn new() -> Self {
        Self(CONNECTION_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Occupancy {
    listening: bool,
    connections: usize,
}

impl Occupancy {
    fn drained(&self) -> bool {
        !self.listening && self.connections == 0
    }
}

/// Tracks the listener and active connections of one server run.
#[derive(Debug, Clone)]
pub struct ConnectionTracker {
    state: Arc<watch::Sender<Occupancy>>,
}

impl ConnectionTracker {
    /// Create a new connection tracker.
    pub fn new() -> Self {
        let (tx, _) = watch::channel(Occupancy::default());
        Self { state: Arc::new(tx) }
    }

    /// Mark the listener as open. The listener counts as closed once the
    /// returned guard is dropped.
    pub fn listen(&self) -> ListenerGuard {
        self.state.send_modify(|s| s.listening = true);
        ListenerGuard {
            state: Arc::clone(&self.state),
        }
    }

    /// Record a new active connection. Returns a guard that decrements on drop.
    pub fn track(&self) -> ConnectionGuard {
        self.state.send_modify(|s| s.connections += 1);
        metrics::connection_opened();
        ConnectionGuard {
            state: Arc::clone(&self.state),
            id: ConnectionId::new(),
        }
    }

    /// Get current active connection count.
    pub fn active_count(&self) -> usize {
        self.state.borrow().connections
    }

    /// Whether the listener is still open.
    pub fn is_listening(&self) -> bool {
        self.state.borrow().listening
    }

    /// Wait until the listener guard has been dropped.
    pub async fn listener_closed(&self) {
        let mut rx = self.state.subscribe();
        // The sender lives in `self`, so the channel cannot close while we wait.
        let _ = rx.wait_for(|s| !s.listening).await;
    }

    /// Wait until the listener is closed and every connection has finished.
    pub async fn drained(&self) {
        let mut rx = self.state.subscribe();
        let _ = rx.wait_for(Occupancy::drained).await;
    }
}

impl Default for ConnectionTracker {
    fn default() -> Self {
        Self::new()
    }
}

/// Guard that keeps the listener marked as open.
#[derive(Debug)]
pub struct ListenerGuard {
    state: Arc<watch::Sender<Occupancy>>,
}

impl Drop for ListenerGuard {
    fn drop(&mut self) {
        self.state.send_modify(|s| s.listening = false);
        tracing::debug!("Listener closed");
    }
}

/// Guard that tracks a connection's lifetime.
/// Decrements active count when dropped.
#[derive(Debug)]
pub struct ConnectionGuard {
    state: Arc<watch::Sender<Occupancy>>,
    id: ConnectionId,
}

impl ConnectionGuard {
    /// Get this connection's ID.
    pub fn id(&self) -> ConnectionId {
        self.id
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.state.send_modify(|s| s.connections -= 1);
        metrics::connection_closed();
        tracing::trace!(connection_id = %self.id, "Connection closed");
    }
}
