//! Application error types.

use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use resultify_core::auth::AuthError;
use thiserror::Error;
use tracing::error;

use crate::models::ErrorResponse;

/// Convenience alias for handler return types.
pub type AppResult<T> = Result<T, AppError>;

/// Application-level errors with HTTP status mapping.
///
/// Messages are fixed per kind; internal details are logged, never returned.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Missing credential")]
    MissingCredential,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Access token required")]
    AccessTokenRequired,

    #[error("Refresh token required")]
    RefreshTokenRequired,

    #[error("Revoked token")]
    RevokedToken,

    #[error("Access denied")]
    AccessDenied,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("User already exists")]
    UserAlreadyExists,

    #[error("Admin already exists")]
    AdminAlreadyExists,

    #[error("User not found")]
    UserNotFound,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Internal server error")]
    Internal(String),
}

impl AppError {
    fn parts(&self) -> (StatusCode, &'static str, &str) {
        match self {
            AppError::MissingCredential => (
                StatusCode::UNAUTHORIZED,
                "missing_credential",
                "Not authenticated",
            ),
            AppError::InvalidToken => (StatusCode::BAD_REQUEST, "invalid_token", "Token is Invalid"),
            AppError::AccessTokenRequired => (
                StatusCode::UNAUTHORIZED,
                "access_token_required",
                "Provide a Valid Access Token",
            ),
            AppError::RefreshTokenRequired => (
                StatusCode::UNAUTHORIZED,
                "refresh_token_required",
                "Provide a Valid Refresh Token",
            ),
            AppError::RevokedToken => (
                StatusCode::BAD_REQUEST,
                "revoked_token",
                "Token has been revoked, please log in again",
            ),
            AppError::AccessDenied => (
                StatusCode::FORBIDDEN,
                "access_denied",
                "You do not have the permissions to perform this action",
            ),
            AppError::InvalidCredentials => (
                StatusCode::BAD_REQUEST,
                "invalid_credentials",
                "Credentials Invalid or Incorrect",
            ),
            AppError::UserAlreadyExists => (
                StatusCode::BAD_REQUEST,
                "user_already_exists",
                "User with email already exists",
            ),
            AppError::AdminAlreadyExists => (
                StatusCode::BAD_REQUEST,
                "admin_already_exists",
                "Admin already exists",
            ),
            AppError::UserNotFound => (StatusCode::NOT_FOUND, "user_not_found", "User is not found"),
            AppError::Validation(m) => (StatusCode::BAD_REQUEST, "validation_error", m.as_str()),
            AppError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                "Internal server error",
            ),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if let AppError::Internal(detail) = &self {
            error!(detail = %detail, "request failed with internal error");
        }
        let (status, error, message) = self.parts();
        let body = Json(ErrorResponse {
            error: error.to_string(),
            message: message.to_string(),
        });
        (status, body).into_response()
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl From<AuthError> for AppError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::MissingCredential => AppError::MissingCredential,
            AuthError::InvalidToken => AppError::InvalidToken,
            AuthError::AccessTokenRequired => AppError::AccessTokenRequired,
            AuthError::RefreshTokenRequired => AppError::RefreshTokenRequired,
            AuthError::RevokedToken => AppError::RevokedToken,
            AuthError::AccessDenied => AppError::AccessDenied,
            AuthError::InvalidCredentials => AppError::InvalidCredentials,
            AuthError::UserAlreadyExists => AppError::UserAlreadyExists,
            AuthError::AdminAlreadyExists => AppError::AdminAlreadyExists,
            AuthError::UserNotFound => AppError::UserNotFound,
            AuthError::Validation(msg) => AppError::Validation(msg),
            AuthError::Config(msg) | AuthError::Internal(msg) => AppError::Internal(msg),
            AuthError::Db(e) => AppError::Internal(e.to_string()),
        }
    }
}
