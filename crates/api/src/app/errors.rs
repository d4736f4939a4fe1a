//! Consistent error responses.
//!
//! Every failure leaves the API as
//! `{"error": {"type": ..., "status_code": ..., "message": ...}}`. Internal
//! deny reasons never reach the client: all credential failures share one
//! message, and only `TokenMissing` is distinguishable.

use axum::extract::rejection::JsonRejection;
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

use taskgate_auth::{AuthError, IssueError, StoreError};
use taskgate_core::DomainError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("email already registered")]
    EmailTaken,

    #[error("incorrect email or password")]
    BadLogin,

    #[error(transparent)]
    Issue(#[from] IssueError),
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::Validation(msg) | DomainError::InvalidId(msg) => ApiError::Validation(msg),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Validation(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Auth(err) => auth_error_to_response(err),
            ApiError::Store(err) => store_error_to_response(err),
            ApiError::Validation(msg) => {
                json_error(StatusCode::UNPROCESSABLE_ENTITY, "validation_error", msg)
            }
            ApiError::EmailTaken => json_error(
                StatusCode::BAD_REQUEST,
                "bad_request",
                "email already registered",
            ),
            ApiError::BadLogin => json_error(
                StatusCode::UNAUTHORIZED,
                "authentication_error",
                "incorrect email or password",
            ),
            ApiError::Issue(err) => {
                tracing::error!(error = %err, "failed to issue credential");
                json_error(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "internal server error",
                )
            }
        }
    }
}

pub fn auth_error_to_response(err: AuthError) -> Response {
    match err {
        AuthError::TokenMissing => json_error(
            StatusCode::UNAUTHORIZED,
            "authentication_error",
            "authentication required",
        ),
        AuthError::TokenMalformed
        | AuthError::SignatureInvalid
        | AuthError::TokenExpired
        | AuthError::PrincipalNotFound => json_error(
            StatusCode::UNAUTHORIZED,
            "authentication_error",
            "invalid or expired credential",
        ),
        AuthError::ResourceNotFound => {
            json_error(StatusCode::NOT_FOUND, "not_found", "resource not found")
        }
        AuthError::OwnershipMismatch => json_error(
            StatusCode::FORBIDDEN,
            "forbidden",
            "not authorized to access this resource",
        ),
        // Handler bug: the context was granted for another operation.
        AuthError::OperationNotGranted { .. } => json_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "internal_error",
            "internal server error",
        ),
        AuthError::Store(err) => store_error_to_response(err),
    }
}

pub fn store_error_to_response(err: StoreError) -> Response {
    tracing::error!(error = %err, "store failure");
    match err {
        StoreError::Unavailable(_) => json_error(
            StatusCode::SERVICE_UNAVAILABLE,
            "service_unavailable",
            "service temporarily unavailable",
        ),
        StoreError::Conflict(_) | StoreError::Backend(_) => json_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "internal_error",
            "internal server error",
        ),
    }
}

pub fn json_error(status: StatusCode, kind: &'static str, message: impl Into<String>) -> Response {
    let mut response = (
        status,
        Json(json!({
            "error": {
                "type": kind,
                "status_code": status.as_u16(),
                "message": message.into(),
            }
        })),
    )
        .into_response();

    if status == StatusCode::UNAUTHORIZED {
        response
            .headers_mut()
            .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
    }
    response
}
