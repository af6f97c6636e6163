//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from config files.
//! Every field has an explicit default so minimal files are valid.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::problem::{Problem, DEFAULT_TYPE_URI_PREFIX};
use axum::http::StatusCode;

/// Root configuration for the toolkit binary.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ToolkitConfig {
    /// Server settings (bind address, shutdown timeout, accept retries).
    pub server: ServerConfig,

    /// Problem details defaults.
    pub problem: ProblemConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0:8080"). Unused when a listener is supplied.
    pub bind_address: String,

    /// Maximum time graceful shutdown waits for in-flight requests, in
    /// milliseconds. Zero means do not wait.
    pub shutdown_timeout_ms: u64,

    /// Consecutive transient accept failures tolerated before serving fails.
    pub max_accept_retries: u32,

    /// Base delay for accept retry backoff in milliseconds.
    pub accept_backoff_base_ms: u64,

    /// Maximum delay for accept retry backoff in milliseconds.
    pub accept_backoff_max_ms: u64,
}

/// Default graceful shutdown budget.
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);

impl ServerConfig {
    /// Shutdown timeout as a duration.
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown_timeout_ms)
    }

    /// Set the shutdown timeout.
    ///
    /// The timeout is kept in whole milliseconds; a fraction is rounded up
    /// so a non-zero timeout never becomes zero.
    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout_ms =
            u64::try_from(timeout.as_nanos().div_ceil(1_000_000)).unwrap_or(u64::MAX);
        self
    }

    /// Set the bind address.
    pub fn with_bind_address(mut self, address: impl Into<String>) -> Self {
        self.bind_address = address.into();
        self
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:8080".to_string(),
            shutdown_timeout_ms: DEFAULT_SHUTDOWN_TIMEOUT.as_millis() as u64,
            max_accept_retries: 10,
            accept_backoff_base_ms: 5,
            accept_backoff_max_ms: 1000,
        }
    }
}

/// Problem details configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ProblemConfig {
    /// Prefix of the default problem `type` URI; the status code is appended.
    pub type_uri_prefix: String,
}

impl ProblemConfig {
    /// Build a problem whose default type URI uses the configured prefix.
    pub fn problem(&self, status: StatusCode, detail: impl Into<String>) -> Problem {
        Problem::with_type_prefix(&self.type_uri_prefix, status, detail)
    }
}

impl Default for ProblemConfig {
    fn default() -> Self {
        Self {
            type_uri_prefix: DEFAULT_TYPE_URI_PREFIX.to_string(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human readable, for development.
    #[default]
    Pretty,
    /// One JSON object per line, for log aggregation.
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}
