//! API error types and HTTP response mapping.
//!
//! Parameter validation failures render as RFC 7807 problem documents
//! (`application/problem+json`); every other error renders as a
//! `{code, message, requestId?}` JSON body.

use axum::Json;
use axum::http::header::{CONTENT_TYPE, HeaderName};
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use marquee_core::Error as CoreError;
use marquee_core::validation::{ValidationError, ValidationErrors};

/// API result type.
pub type ApiResult<T> = Result<T, ApiError>;

const PROBLEM_TYPE: &str = "https://tools.ietf.org/html/rfc7231#section-6.5.1";
const PROBLEM_TITLE: &str = "Parameter validation error";
const PROBLEM_DETAIL: &str = "One or more invalid parameters were specified.";

/// Standard JSON error response body.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiErrorBody {
    /// Stable machine-readable error code.
    pub code: String,
    /// Human-readable message (safe for clients).
    pub message: String,
    /// Optional request ID for correlation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

/// RFC 7807 problem document for parameter validation failures.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProblemBody<'a> {
    /// Problem type URI.
    #[serde(rename = "type")]
    pub problem_type: &'a str,
    /// Short summary.
    pub title: &'a str,
    /// Human-readable explanation.
    pub detail: &'a str,
    /// HTTP status code.
    pub status: u16,
    /// Request path and query that failed validation.
    pub instance: &'a str,
    /// Every failed parameter.
    pub validation_errors: &'a [ValidationError],
}

/// HTTP API error with stable machine-readable code.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: String,
    request_id: Option<String>,
    validation: Option<(String, ValidationErrors)>,
}

impl ApiError {
    /// Returns a problem response listing every failed parameter.
    ///
    /// `instance` is the request path and query string.
    #[must_use]
    pub fn validation(instance: impl Into<String>, errors: ValidationErrors) -> Self {
        Self {
            validation: Some((instance.into(), errors)),
            ..Self::new(StatusCode::BAD_REQUEST, "VALIDATION", PROBLEM_DETAIL)
        }
    }

    /// Returns an error response for missing resources.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, "NOT_FOUND", message)
    }

    /// Returns an error response when the server is at capacity.
    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::SERVICE_UNAVAILABLE,
            "SERVICE_UNAVAILABLE",
            message,
        )
    }

    /// Returns an internal error response.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL", message)
    }

    /// Attaches a request ID for correlation.
    #[must_use]
    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// Returns the human-readable error message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the stable machine-readable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        self.code
    }

    fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
            request_id: None,
            validation: None,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let request_id = self.request_id;
        let mut response = match &self.validation {
            Some((instance, errors)) => {
                let body = ProblemBody {
                    problem_type: PROBLEM_TYPE,
                    title: PROBLEM_TITLE,
                    detail: PROBLEM_DETAIL,
                    status: self.status.as_u16(),
                    instance,
                    validation_errors: errors.as_slice(),
                };
                let mut response = (self.status, Json(body)).into_response();
                response.headers_mut().insert(
                    CONTENT_TYPE,
                    HeaderValue::from_static("application/problem+json"),
                );
                response
            }
            None => (
                self.status,
                Json(ApiErrorBody {
                    code: self.code.to_string(),
                    message: self.message,
                    request_id: request_id.clone(),
                }),
            )
                .into_response(),
        };

        if let Some(request_id) = request_id {
            if let Ok(value) = HeaderValue::from_str(&request_id) {
                response
                    .headers_mut()
                    .insert(HeaderName::from_static("x-request-id"), value);
            }
        }

        response
    }
}

impl From<CoreError> for ApiError {
    fn from(value: CoreError) -> Self {
        match value {
            CoreError::NotFound { resource_type, .. } => {
                Self::not_found(format!("{resource_type} Not Found"))
            }
            CoreError::Timeout { .. } => Self::internal("Data store timed out"),
            CoreError::Store { .. }
            | CoreError::Serialization { .. }
            | CoreError::Config(_)
            | CoreError::Internal { .. } => Self::internal("Internal Server Error"),
        }
    }
}
