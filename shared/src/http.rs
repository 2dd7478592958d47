//! HTTP helpers for Lambda functions.

use lambda_http::http::header::{
    HeaderValue, ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS,
    ACCESS_CONTROL_ALLOW_ORIGIN, CONTENT_TYPE,
};
use lambda_http::http::StatusCode;
use lambda_http::{Body, Response};
use serde::Serialize;
use serde_json::Value;
use tracing::error;

use crate::Error;

/// Failure body shared by every function.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub ok: bool,
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl From<&Error> for ErrorBody {
    fn from(err: &Error) -> Self {
        Self {
            ok: false,
            error: err.code(),
            message: err.to_string(),
            details: err.details(),
        }
    }
}

/// Create a JSON response with CORS headers.
pub fn json_response<T: Serialize>(status: u16, data: &T) -> Response<Body> {
    match serde_json::to_string(data) {
        Ok(body) => with_cors(status, Body::from(body)),
        Err(e) => {
            let err = Error::from(e);
            error!(error = %err, "Failed to serialize response");
            let body = serde_json::json!({
                "ok": false,
                "error": err.code(),
                "message": err.to_string(),
            });
            with_cors(err.status_code(), Body::from(body.to_string()))
        }
    }
}

/// Render an error as its JSON failure body.
pub fn error_response(err: &Error) -> Response<Body> {
    json_response(err.status_code(), &ErrorBody::from(err))
}

/// Answer a CORS preflight.
pub fn preflight_response() -> Response<Body> {
    with_cors(204, Body::Empty)
}

pub fn method_not_allowed(method: &str) -> Response<Body> {
    json_response(
        405,
        &ErrorBody {
            ok: false,
            error: "method_not_allowed".to_string(),
            message: format!("{} not allowed", method),
            details: None,
        },
    )
}

fn with_cors(status: u16, body: Body) -> Response<Body> {
    let mut response = Response::new(body);
    *response.status_mut() = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    let headers = response.headers_mut();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    headers.insert(
        ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET, OPTIONS"),
    );
    headers.insert(
        ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("Content-Type"),
    );
    response
}
