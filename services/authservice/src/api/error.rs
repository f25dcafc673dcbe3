//! API error types and helpers.
//!
//! # Purpose
//! Centralizes HTTP error response construction so every endpoint returns the
//! same `{code, message, request_id}` shape, and maps domain errors onto
//! status codes.
//!
//! # Key invariants
//! - Authentication failures map to 401 and authorization failures to 403.
//! - Internal errors log details server-side but return generic messages.
//! - Malformed JSON bodies map to 400 rather than axum's default 415/422.
use crate::api::types::ErrorResponse;
use crate::auth::AuthError;
use crate::store::StoreError;
use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, Request};
use axum::http::StatusCode;
use axum::response::IntoResponse;

/// Structured API error returned by handlers.
///
/// # Example
/// ```rust
/// use authservice::api::error::api_not_found;
/// use axum::http::StatusCode;
///
/// let err = api_not_found("user not found");
/// assert_eq!(err.status, StatusCode::NOT_FOUND);
/// assert_eq!(err.body.code, "not_found");
/// ```
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub body: ErrorResponse,
}

impl ApiError {
    fn new(status: StatusCode, code: &str, message: &str) -> Self {
        Self {
            status,
            body: ErrorResponse {
                code: code.to_string(),
                message: message.to_string(),
                request_id: None,
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        (self.status, Json(self.body)).into_response()
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Authentication(message) => api_unauthorized(&message),
            AuthError::Authorization { permission } => {
                api_forbidden(&format!("missing permission {permission}"))
            }
            AuthError::Store(err) => err.into(),
            AuthError::Internal(message) => {
                tracing::error!(error = %message, "auth internal error");
                api_internal_message("internal error")
            }
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(what) => api_not_found(&format!("{what} not found")),
            StoreError::Conflict(message) => api_conflict("already_exists", &message),
            err @ StoreError::Unexpected(_) => api_internal("storage failure", &err),
        }
    }
}

/// JSON body extractor whose rejection uses the API error shape.
#[derive(Debug, Clone, Copy, Default)]
pub struct ApiJson<T>(pub T);

/// A body whose parse failure is surfaced only after the permission gate
/// passes, so unauthenticated callers see 401 regardless of what they sent.
pub type GatedJson<T> = Result<ApiJson<T>, ApiError>;

impl<S, T> FromRequest<S> for ApiJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => Err(api_validation_error(&format!(
                "invalid request body: {}",
                rejection.body_text()
            ))),
        }
    }
}

pub fn api_not_found(message: &str) -> ApiError {
    ApiError::new(StatusCode::NOT_FOUND, "not_found", message)
}

/// Build a 409 Conflict error with a caller-provided code.
pub fn api_conflict(code: &str, message: &str) -> ApiError {
    ApiError::new(StatusCode::CONFLICT, code, message)
}

/// Build a 500 from a store error. The store error is logged, not returned.
pub fn api_internal(message: &str, err: &StoreError) -> ApiError {
    tracing::error!(error = ?err, "authservice storage error");
    ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "internal", message)
}

pub fn api_internal_message(message: &str) -> ApiError {
    ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "internal", message)
}

pub fn api_unauthorized(message: &str) -> ApiError {
    ApiError::new(StatusCode::UNAUTHORIZED, "unauthorized", message)
}

pub fn api_forbidden(message: &str) -> ApiError {
    ApiError::new(StatusCode::FORBIDDEN, "forbidden", message)
}

/// Build a 400 Bad Request validation error.
pub fn api_validation_error(message: &str) -> ApiError {
    ApiError::new(StatusCode::BAD_REQUEST, "validation_error", message)
}
