//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges and formats
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ToolkitConfig → Result<(), Vec<ValidationError>>

use thiserror::Error;
use url::Url;

use crate::config::schema::ToolkitConfig;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// A single semantic problem with the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("server.bind_address must not be empty")]
    EmptyBindAddress,

    #[error("server.accept_backoff_base_ms ({base}) exceeds accept_backoff_max_ms ({max})")]
    BackoffRange { base: u64, max: u64 },

    #[error("problem.type_uri_prefix {0:?} is not an absolute URI")]
    ProblemPrefix(String),

    #[error("observability.log_level {0:?} is not one of trace, debug, info, warn, error")]
    LogLevel(String),

    #[error("observability.metrics_address {0:?} is not a socket address")]
    MetricsAddress(String),
}

/// Check a configuration, collecting every error found.
pub fn validate_config(config: &ToolkitConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.server.bind_address.trim().is_empty() {
        errors.push(ValidationError::EmptyBindAddress);
    }

    if config.server.accept_backoff_base_ms > config.server.accept_backoff_max_ms {
        errors.push(ValidationError::BackoffRange {
            base: config.server.accept_backoff_base_ms,
            max: config.server.accept_backoff_max_ms,
        });
    }

    let prefix = &config.problem.type_uri_prefix;
    match Url::parse(prefix) {
        Ok(url) if !url.cannot_be_a_base() => {}
        _ => errors.push(ValidationError::ProblemPrefix(prefix.clone())),
    }

    let level = config.observability.log_level.to_ascii_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        errors.push(ValidationError::LogLevel(config.observability.log_level.clone()));
    }

    if config.observability.metrics_enabled
        && config
            .observability
            .metrics_address
            .parse::<std::net::SocketAddr>()
            .is_err()
    {
        errors.push(ValidationError::MetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
