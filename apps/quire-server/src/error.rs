//! RPC error taxonomy and its HTTP rendering.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use quire_storage::StoreError;
use serde::Serialize;
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    AlreadyExists(String),
    #[error("{0}")]
    InvalidArgument(String),
    #[error("{0}")]
    PermissionDenied(String),
    #[error("{0}")]
    Unauthenticated(String),
    #[error("{0}")]
    FailedPrecondition(String),
    #[error("deadline exceeded")]
    DeadlineExceeded,
    #[error("internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    /// Map a storage error, naming the thing that was looked up.
    ///
    /// `Conflict` only arises from last-admin protection and no-op role
    /// changes, so `conflict` describes which of those applies.
    pub fn from_store(e: StoreError, what: &str, conflict: &str) -> Self {
        match e {
            StoreError::NotFound => ServiceError::NotFound(format!("{what} not found")),
            StoreError::AlreadyExists => ServiceError::AlreadyExists(format!("{what} already exists")),
            StoreError::Conflict => ServiceError::FailedPrecondition(conflict.to_string()),
            StoreError::Backend(msg) => ServiceError::Internal(msg),
        }
    }

    /// Stable, machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            ServiceError::NotFound(_) => "not_found",
            ServiceError::AlreadyExists(_) => "already_exists",
            ServiceError::InvalidArgument(_) => "invalid_argument",
            ServiceError::PermissionDenied(_) => "permission_denied",
            ServiceError::Unauthenticated(_) => "unauthenticated",
            ServiceError::FailedPrecondition(_) => "failed_precondition",
            ServiceError::DeadlineExceeded => "deadline_exceeded",
            ServiceError::Internal(_) => "internal",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
            ServiceError::AlreadyExists(_) => StatusCode::CONFLICT,
            ServiceError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            ServiceError::PermissionDenied(_) => StatusCode::FORBIDDEN,
            ServiceError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            ServiceError::FailedPrecondition(_) => StatusCode::PRECONDITION_FAILED,
            ServiceError::DeadlineExceeded => StatusCode::GATEWAY_TIMEOUT,
            ServiceError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<StoreError> for ServiceError {
    fn from(e: StoreError) -> Self {
        ServiceError::from_store(e, "resource", "precondition failed")
    }
}

impl From<JsonRejection> for ServiceError {
    fn from(rejection: JsonRejection) -> Self {
        ServiceError::InvalidArgument(rejection.body_text())
    }
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    code: &'a str,
    message: String,
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let message = match &self {
            ServiceError::Internal(detail) => {
                error!(error = %detail, "internal error");
                "internal error".to_string()
            }
            other => other.to_string(),
        };
        let body = ErrorBody {
            code: self.code(),
            message,
        };
        (self.status(), Json(body)).into_response()
    }
}
