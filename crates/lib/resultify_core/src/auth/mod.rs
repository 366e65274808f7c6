//! Authentication and authorization logic.
//!
//! Provides password hashing, JWT issuance and verification, the bearer-token
//! state machine, token revocation, principal resolution and role checks.
//! Everything here is constructed once at startup and shared by handle.

pub mod authenticator;
pub mod issuer;
pub mod jwt;
pub mod memory;
pub mod password;
pub mod queries;
pub mod rbac;
pub mod resolver;
pub mod revocation;
pub mod verification;

use thiserror::Error;

/// Authentication errors.
///
/// Every variant except `Db`, `Config` and `Internal` is a request-scoped
/// outcome with a stable [`code`](AuthError::code).
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Missing credential")]
    MissingCredential,

    #[error("Token is invalid")]
    InvalidToken,

    #[error("Access token required")]
    AccessTokenRequired,

    #[error("Refresh token required")]
    RefreshTokenRequired,

    #[error("Token has been revoked")]
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

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Db(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AuthError {
    /// Machine-readable error kind.
    pub fn code(&self) -> &'static str {
        match self {
            AuthError::MissingCredential => "missing_credential",
            AuthError::InvalidToken => "invalid_token",
            AuthError::AccessTokenRequired => "access_token_required",
            AuthError::RefreshTokenRequired => "refresh_token_required",
            AuthError::RevokedToken => "revoked_token",
            AuthError::AccessDenied => "access_denied",
            AuthError::InvalidCredentials => "invalid_credentials",
            AuthError::UserAlreadyExists => "user_already_exists",
            AuthError::AdminAlreadyExists => "admin_already_exists",
            AuthError::UserNotFound => "user_not_found",
            AuthError::Validation(_) => "validation_error",
            AuthError::Config(_) | AuthError::Db(_) | AuthError::Internal(_) => "internal_error",
        }
    }
}
