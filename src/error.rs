use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::{
    auth::AuthError, backend::BackendError, credentials::StoreError, pagination::PaginationError,
    password::PasswordError,
};

/// ApiError
///
/// Every failure the gateway can surface to a client. Handlers return
/// `Result<_, ApiError>` and this type owns the translation into a status code
/// and a `{"error": "..."}` body. Each variant is logged exactly once, here.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Bad method, oversized field, unsupported format or malformed pagination.
    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Auth(#[from] AuthError),

    /// Unknown login and wrong password share this variant so the response
    /// does not reveal which one happened.
    #[error("Incorrect login or password")]
    InvalidCredentials,

    #[error("Post not found")]
    NotFound,

    #[error("Login is already taken")]
    Conflict,

    /// Backend, storage or remote-call failure. The detail is logged, never returned.
    #[error("{0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Auth(_) => StatusCode::UNAUTHORIZED,
            ApiError::InvalidCredentials | ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Conflict => StatusCode::CONFLICT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let message = match &self {
            ApiError::Internal(detail) => {
                tracing::error!(error = %detail, "request failed");
                "Internal server error".to_string()
            }
            other => {
                tracing::warn!(status = %status, error = %other, "request rejected");
                other.to_string()
            }
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

impl From<PaginationError> for ApiError {
    fn from(err: PaginationError) -> Self {
        ApiError::Validation(err.to_string())
    }
}

impl From<BackendError> for ApiError {
    fn from(err: BackendError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Duplicate(_) => ApiError::Conflict,
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<PasswordError> for ApiError {
    fn from(err: PasswordError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl From<jsonwebtoken::errors::Error> for ApiError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        ApiError::Internal(format!("token signing failed: {err}"))
    }
}
