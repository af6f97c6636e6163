//! RFC 9457 problem details.
//!
//! # Responsibilities
//! - Build problem documents with sensible defaults from a status code
//! - Serialize them as one flat `application/problem+json` object
//! - Render them as HTTP responses
//!
//! # Design Decisions
//! - The default `type` URI prefix is configurable (`ProblemConfig`); the
//!   built-in default is [`DEFAULT_TYPE_URI_PREFIX`]
//! - Extension members are flattened next to the standard members and can
//!   never shadow them

mod document;

pub use document::{Problem, ProblemType, DEFAULT_TYPE_URI_PREFIX, PROBLEM_JSON};
