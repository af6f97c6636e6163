//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → cancel the run context
//!
//! Shutdown (shutdown.rs):
//!     Cancellation observed → Stop accepting → Drain connections → Outcome
//! ```
//!
//! # Design Decisions
//! - Ordered shutdown: stop accept, close listener, drain
//! - Shutdown has timeout: exceeding it is reported, not hidden

pub mod shutdown;
pub mod signals;

pub use shutdown::{settle_serving, ShutdownCoordinator};
pub use signals::shutdown_token;
