use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, error};

use crate::{
    auth::{jwt::AuthError, password::PasswordError},
    store::StoreError,
    validation::ValidationErrors,
};

#[derive(Debug, Serialize)]
struct MessageBody {
    message: String,
}

#[derive(Debug, Serialize)]
struct ValidationBody {
    message: String,
    errors: ValidationErrors,
}

/// Request-level failure. Every variant maps to one status and body shape.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("validation failed")]
    Validation(ValidationErrors),
    /// Parsed but violates a uniqueness rule; reported like a validation error.
    #[error("conflict")]
    Conflict(ValidationErrors),
    /// Body could not be parsed at all.
    #[error("malformed body: {0}")]
    MalformedBody(String),
    #[error("unauthenticated")]
    Unauthenticated,
    #[error("forbidden")]
    Forbidden,
    #[error("not found")]
    NotFound,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::Validation(errors) | AppError::Conflict(errors) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(ValidationBody {
                    message: "The given data was invalid.".into(),
                    errors,
                }),
            )
                .into_response(),
            AppError::MalformedBody(message) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(ValidationBody {
                    message,
                    errors: ValidationErrors::new(),
                }),
            )
                .into_response(),
            AppError::Unauthenticated => message(StatusCode::UNAUTHORIZED, "Unauthorized"),
            AppError::Forbidden => message(StatusCode::FORBIDDEN, "This action is unauthorized."),
            AppError::NotFound => message(StatusCode::NOT_FOUND, "Record not found."),
            AppError::Internal(e) => {
                error!(error = ?e, "request failed");
                message(StatusCode::INTERNAL_SERVER_ERROR, "Server Error")
            }
        }
    }
}

fn message(status: StatusCode, message: &str) -> Response {
    (
        status,
        Json(MessageBody {
            message: message.to_string(),
        }),
    )
        .into_response()
}

impl From<JsonRejection> for AppError {
    fn from(e: JsonRejection) -> Self {
        AppError::MalformedBody(e.body_text())
    }
}

impl From<AuthError> for AppError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::Signing(_) => AppError::Internal(anyhow::Error::new(e)),
            other => {
                debug!(reason = %other, "authentication rejected");
                AppError::Unauthenticated
            }
        }
    }
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        AppError::Internal(anyhow::Error::new(e))
    }
}

impl From<PasswordError> for AppError {
    fn from(e: PasswordError) -> Self {
        AppError::Internal(anyhow::Error::new(e))
    }
}
