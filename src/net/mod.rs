//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! bind address / supplied listener
//!     → listener.rs (bind, ephemeral bind for tests)
//!     → accept loop (http::server)
//!     → connection.rs (lifecycle tracking for graceful shutdown)
//!     → Hand off to HTTP layer
//! ```
//!
//! # Design Decisions
//! - The listener itself is tracked, so shutdown can tell when it is closed
//! - Each connection holds a guard; drain completes when all guards drop

pub mod connection;
pub mod listener;

pub use connection::{ConnectionGuard, ConnectionId, ConnectionTracker, ListenerGuard};
pub use listener::{bind, bind_ephemeral, local_addr, BindError};
