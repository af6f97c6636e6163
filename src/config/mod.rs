//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → ToolkitConfig (validated, immutable)
//! ```
//!
//! # Design Decisions
//! - Config is immutable once a server run begins
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{
    LogFormat, ObservabilityConfig, ProblemConfig, ServerConfig, ToolkitConfig,
    DEFAULT_SHUTDOWN_TIMEOUT,
};
pub use validation::{validate_config, ValidationError};
