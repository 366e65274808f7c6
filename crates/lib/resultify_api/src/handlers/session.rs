//! Token-only endpoints shared by the user and admin route groups.

use axum::{Extension, Json};
use axum::extract::State;

use crate::AppState;
use crate::error::AppResult;
use crate::middleware::auth::AuthenticatedToken;
use crate::models::{MessageResponse, RefreshResponse};
use crate::services::auth;

/// `GET /{user,admin}/refresh_token`: new access token from a refresh token.
pub async fn refresh_handler(
    State(state): State<AppState>,
    Extension(AuthenticatedToken(claims)): Extension<AuthenticatedToken>,
) -> AppResult<Json<RefreshResponse>> {
    Ok(Json(auth::refresh(&state, &claims).await?))
}

/// `GET /{user,admin}/logout`: revoke the presented access token.
pub async fn logout_handler(
    State(state): State<AppState>,
    Extension(AuthenticatedToken(claims)): Extension<AuthenticatedToken>,
) -> AppResult<Json<MessageResponse>> {
    Ok(Json(auth::logout(&state, &claims).await?))
}
