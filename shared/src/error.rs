//! Error types for the salon proxy functions.

use serde::Serialize;
use serde_json::{json, Value};
use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Longest upstream body excerpt kept in diagnostics.
pub const BODY_EXCERPT_LIMIT: usize = 2048;

/// Errors that can occur while serving a request.
#[derive(Error, Debug)]
pub enum Error {
    /// Missing or invalid request parameter
    #[error("Validation error: {0}")]
    Validation(String),

    /// Referenced entity does not exist upstream
    #[error("Not found: {message}")]
    NotFound { message: String, details: Value },

    /// Required configuration is missing
    #[error("Configuration error: {0}")]
    Config(String),

    /// AWS SDK error
    #[error("AWS error: {0}")]
    Aws(String),

    /// Every upstream attempt failed
    #[error(transparent)]
    Upstream(#[from] UpstreamFailure),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Get HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            Error::Validation(_) => 400,
            Error::NotFound { .. } => 404,
            Error::Upstream(_) => 502,
            _ => 500,
        }
    }

    /// Machine-readable code placed in the `error` field of failure bodies.
    pub fn code(&self) -> String {
        match self {
            Error::Validation(_) => "invalid_request".to_string(),
            Error::NotFound { .. } => "not_found".to_string(),
            Error::Config(_) => "configuration_error".to_string(),
            Error::Aws(_) => "aws_error".to_string(),
            Error::Upstream(failure) => format!("{}_failed", failure.step),
            Error::Serialization(_) => "serialization_error".to_string(),
            Error::Internal(_) => "internal_error".to_string(),
        }
    }

    /// Diagnostic context for the `details` field, if any.
    pub fn details(&self) -> Option<Value> {
        match self {
            Error::NotFound { details, .. } => Some(details.clone()),
            Error::Upstream(failure) => Some(failure.details()),
            _ => None,
        }
    }
}

/// One failed upstream attempt.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "phase", rename_all = "lowercase")]
pub enum AttemptFailure {
    /// The upstream answered with a non-2xx status
    Http { url: String, status: u16, body: String },
    /// The request never produced a response
    Network { url: String, message: String, code: String },
    /// A 2xx response whose body was not JSON
    Decode { url: String, message: String },
}

impl AttemptFailure {
    pub fn http(url: impl Into<String>, status: u16, body: &str) -> Self {
        AttemptFailure::Http {
            url: url.into(),
            status,
            body: excerpt(body),
        }
    }

    pub fn url(&self) -> &str {
        match self {
            AttemptFailure::Http { url, .. }
            | AttemptFailure::Network { url, .. }
            | AttemptFailure::Decode { url, .. } => url,
        }
    }

    /// HTTP status, when the upstream answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            AttemptFailure::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// All attempts for one resolution step failed.
#[derive(Error, Debug, Clone)]
#[error("{step}: {count} upstream attempt(s) failed", count = .attempts.len())]
pub struct UpstreamFailure {
    /// Resolution step, e.g. `branches` or `staff`
    pub step: &'static str,
    /// Every attempt in the order it was made
    pub attempts: Vec<AttemptFailure>,
}

impl UpstreamFailure {
    pub fn new(step: &'static str, attempts: Vec<AttemptFailure>) -> Self {
        Self { step, attempts }
    }

    pub fn last(&self) -> Option<&AttemptFailure> {
        self.attempts.last()
    }

    /// Last attempt's fields at top level, plus the step and full attempt log.
    pub fn details(&self) -> Value {
        let mut details = match self.last().map(serde_json::to_value) {
            Some(Ok(Value::Object(map))) => map,
            _ => serde_json::Map::new(),
        };
        details.insert("step".to_string(), json!(self.step));
        details.insert("attempts".to_string(), json!(self.attempts));
        Value::Object(details)
    }
}

fn excerpt(body: &str) -> String {
    if body.len() <= BODY_EXCERPT_LIMIT {
        return body.to_string();
    }
    let mut end = BODY_EXCERPT_LIMIT;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    body[..end].to_string()
}
