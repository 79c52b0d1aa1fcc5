//! API error types and helpers.
//!
//! # Purpose and responsibility
//! Centralizes HTTP error response construction so every endpoint returns the
//! same `{code, message, request_id}` shape, and maps guarded-store failures
//! onto status codes.
//!
//! # Key invariants and assumptions
//! - Error responses must include a stable `code` and human-readable `message`.
//! - Upstream failures (store, authorizer) are 503 and never an implicit allow.
use crate::api::types::ErrorResponse;
use crate::auth::rbac::GuardError;
use axum::Json;
use axum::http::StatusCode;
use axum::response::IntoResponse;

/// Structured API error returned by handlers.
///
/// # Invariants
/// - `status` must match the semantics of `body.code`.
///
/// # Example
/// ```rust
/// use axum::http::StatusCode;
/// use policyplane::api::error::ApiError;
/// use policyplane::api::types::ErrorResponse;
///
/// let err = ApiError {
///     status: StatusCode::NOT_FOUND,
///     body: ErrorResponse {
///         code: "not_found".to_string(),
///         message: "missing".to_string(),
///         request_id: None,
///     },
/// };
/// assert_eq!(err.status, StatusCode::NOT_FOUND);
/// ```
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub body: ErrorResponse,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        (self.status, Json(self.body)).into_response()
    }
}

fn api_error(status: StatusCode, code: &str, message: &str) -> ApiError {
    ApiError {
        status,
        body: ErrorResponse {
            code: code.to_string(),
            message: message.to_string(),
            request_id: None,
        },
    }
}

/// Build a 404 Not Found error.
pub fn api_not_found(message: &str) -> ApiError {
    api_error(StatusCode::NOT_FOUND, "not_found", message)
}

/// Build a 409 Conflict error with a caller-provided code.
pub fn api_conflict(code: &str, message: &str) -> ApiError {
    api_error(StatusCode::CONFLICT, code, message)
}

/// Build a 401 Unauthorized error.
pub fn api_unauthorized(message: &str) -> ApiError {
    api_error(StatusCode::UNAUTHORIZED, "unauthorized", message)
}

/// Build a 403 Forbidden error.
pub fn api_forbidden(message: &str) -> ApiError {
    api_error(StatusCode::FORBIDDEN, "forbidden", message)
}

/// Build a 400 error for requests addressed to the wrong scope.
pub fn api_bad_request(message: &str) -> ApiError {
    api_error(StatusCode::BAD_REQUEST, "bad_request", message)
}

/// Build a 400 Bad Request validation error.
pub fn api_validation_error(message: &str) -> ApiError {
    api_error(StatusCode::BAD_REQUEST, "validation_error", message)
}

/// Build a 503 error for a failing dependency.
///
/// Details are logged server-side; the client sees `message`.
pub fn api_unavailable(message: &str) -> ApiError {
    tracing::error!(error = %message, "policyplane upstream failure");
    api_error(StatusCode::SERVICE_UNAVAILABLE, "unavailable", message)
}

impl From<GuardError> for ApiError {
    fn from(err: GuardError) -> Self {
        match err {
            GuardError::Forbidden(message) => api_forbidden(&message),
            GuardError::BadRequest(message) => api_bad_request(&message),
            GuardError::Invalid(err) => api_validation_error(&err.to_string()),
            GuardError::NotFound(message) => api_not_found(&message),
            GuardError::Conflict(message) => api_conflict("conflict", &message),
            GuardError::Unavailable(message) => api_unavailable(&message),
        }
    }
}
