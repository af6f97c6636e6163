//! Problem document type and its wire format.

use std::collections::BTreeMap;
use std::fmt;

use axum::http::{header, status::InvalidStatusCode, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;

/// Default prefix of the `type` URI of problems built from a bare status.
pub const DEFAULT_TYPE_URI_PREFIX: &str = "https://httpstatuses.io/";

/// Media type of serialized problems.
pub const PROBLEM_JSON: &str = "application/problem+json";

const RESERVED_MEMBERS: &[&str] = &["type", "title", "status", "detail", "instance"];

/// A reusable problem type: a URI identifying the kind of problem and a
/// short human-readable title.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProblemType {
    type_uri: String,
    title: String,
}

impl ProblemType {
    pub fn new(type_uri: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            type_uri: type_uri.into(),
            title: title.into(),
        }
    }

    pub fn type_uri(&self) -> &str {
        &self.type_uri
    }

    pub fn title(&self) -> &str {
        &self.title
    }
}

/// An RFC 9457 problem details document.
///
/// `Problem` is also an error: handlers can return it and it renders as an
/// `application/problem+json` response carrying its status.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "ProblemWire")]
pub struct Problem {
    type_uri: String,
    title: String,
    status: StatusCode,
    detail: Option<String>,
    instance: Option<String>,
    extensions: BTreeMap<String, Value>,
}

impl Problem {
    /// Create a problem for `status` using [`DEFAULT_TYPE_URI_PREFIX`].
    ///
    /// The title is the status' canonical reason phrase. An empty `detail` is
    /// left out of the document.
    pub fn new(status: StatusCode, detail: impl Into<String>) -> Self {
        Self::with_type_prefix(DEFAULT_TYPE_URI_PREFIX, status, detail)
    }

    /// Create a problem whose `type` is `prefix` followed by the status code.
    pub fn with_type_prefix(prefix: &str, status: StatusCode, detail: impl Into<String>) -> Self {
        let detail = detail.into();
        Self {
            type_uri: format!("{}{}", prefix, status.as_u16()),
            title: status.canonical_reason().unwrap_or_default().to_string(),
            status,
            detail: (!detail.is_empty()).then_some(detail),
            instance: None,
            extensions: BTreeMap::new(),
        }
    }

    /// Create a problem whose detail is the error's message.
    pub fn from_error(status: StatusCode, err: &dyn std::error::Error) -> Self {
        Self::new(status, err.to_string())
    }

    /// Use a specific problem type (type URI and title).
    pub fn with_type(mut self, problem_type: &ProblemType) -> Self {
        self.type_uri = problem_type.type_uri.clone();
        self.title = problem_type.title.clone();
        self
    }

    /// Identify the specific occurrence of the problem.
    pub fn with_instance(mut self, instance: impl Into<String>) -> Self {
        self.instance = Some(instance.into());
        self
    }

    /// Add an extension member. Names of standard members are not
    /// serialized as extensions.
    pub fn with_extension(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extensions.insert(key.into(), value.into());
        self
    }

    pub fn type_uri(&self) -> &str {
        &self.type_uri
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn detail(&self) -> Option<&str> {
        self.detail.as_deref()
    }

    pub fn instance(&self) -> Option<&str> {
        self.instance.as_deref()
    }

    pub fn extension(&self, key: &str) -> Option<&Value> {
        self.extensions.get(key)
    }

    pub fn extensions(&self) -> &BTreeMap<String, Value> {
        &self.extensions
    }

    /// Serialize to the JSON wire format.
    pub fn to_json(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }
}

impl fmt::Display for Problem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.title)
    }
}

impl std::error::Error for Problem {}

impl Serialize for Problem {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        // Keys come out sorted; standard members are written last so they win.
        let mut members: BTreeMap<&str, Value> = self
            .extensions
            .iter()
            .filter(|(key, _)| !RESERVED_MEMBERS.contains(&key.as_str()))
            .map(|(key, value)| (key.as_str(), value.clone()))
            .collect();

        members.insert("type", Value::from(self.type_uri.as_str()));
        members.insert("title", Value::from(self.title.as_str()));
        members.insert("status", Value::from(self.status.as_u16()));
        if let Some(detail) = &self.detail {
            members.insert("detail", Value::from(detail.as_str()));
        }
        if let Some(instance) = &self.instance {
            members.insert("instance", Value::from(instance.as_str()));
        }

        members.serialize(serializer)
    }
}

#[derive(Deserialize)]
struct ProblemWire {
    #[serde(rename = "type", default)]
    type_uri: String,
    #[serde(default)]
    title: String,
    status: u16,
    #[serde(default)]
    detail: Option<String>,
    #[serde(default)]
    instance: Option<String>,
    #[serde(flatten)]
    extensions: BTreeMap<String, Value>,
}

impl TryFrom<ProblemWire> for Problem {
    type Error = InvalidStatusCode;

    fn try_from(wire: ProblemWire) -> Result<Self, Self::Error> {
        Ok(Self {
            type_uri: wire.type_uri,
            title: wire.title,
            status: StatusCode::from_u16(wire.status)?,
            detail: wire.detail,
            instance: wire.instance,
            extensions: wire.extensions,
        })
    }
}

impl IntoResponse for Problem {
    fn into_response(self) -> Response {
        match self.to_json() {
            Ok(body) => {
                let mut response = (self.status, body).into_response();
                response
                    .headers_mut()
                    .insert(header::CONTENT_TYPE, HeaderValue::from_static(PROBLEM_JSON));
                response
            }
            Err(err) => {
                tracing::error!(
                    error = %err,
                    status = %self.status,
                    "Failed to encode problem document"
                );
                crate::http::response::status_text_response(StatusCode::INTERNAL_SERVER_ERROR)
            }
        }
    }
}
