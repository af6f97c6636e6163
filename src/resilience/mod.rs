//! Resilience helpers.
//!
//! # Design Decisions
//! - Transient accept failures back off exponentially with jitter
//! - Consecutive failures are bounded; past the limit serving fails

pub mod backoff;

pub use backoff::{calculate_backoff, RetryBackoff};
