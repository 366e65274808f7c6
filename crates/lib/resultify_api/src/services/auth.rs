//! Session service: login, access-token refresh and logout.

use chrono::Utc;
use resultify_core::auth::jwt::TokenClaims;
use resultify_core::models::auth::{Principal, PrincipalKind};
use tracing::{debug, info};

use crate::AppState;
use crate::error::{AppError, AppResult};
use crate::models::{LoginResponse, LoginUser, MessageResponse, RefreshResponse};

/// Authenticate with email + password against the user or admin table.
///
/// Unknown email and wrong password fail identically.
pub async fn login(
    state: &AppState,
    kind: PrincipalKind,
    email: &str,
    password: &str,
) -> AppResult<LoginResponse> {
    let principal = match kind {
        PrincipalKind::User => state
            .principals
            .resolve_user(email)
            .await?
            .map(Principal::User),
        PrincipalKind::Admin => state
            .principals
            .resolve_admin(email)
            .await?
            .map(Principal::Admin),
    };

    let Some(principal) = principal else {
        debug!(?kind, "login for unknown email");
        return Err(AppError::InvalidCredentials);
    };

    let valid = state
        .hasher
        .verify_blocking(password.to_string(), principal.password_hash().to_string())
        .await;
    if !valid {
        debug!(uid = %principal.uid(), "login with wrong password");
        return Err(AppError::InvalidCredentials);
    }

    let pair = state.issuer.issue_pair(&principal)?;
    info!(uid = %principal.uid(), role = principal.role(), "login succeeded");

    Ok(LoginResponse {
        message: "Login successful".to_string(),
        access_token: pair.access_token,
        refresh_token: pair.refresh_token,
        user: LoginUser {
            email: principal.email().to_string(),
            uid: principal.uid(),
        },
    })
}

/// Exchange a verified refresh token for a fresh access token.
pub async fn refresh(state: &AppState, claims: &TokenClaims) -> AppResult<RefreshResponse> {
    let principal = state
        .principals
        .resolve_subject(&claims.user)
        .await?
        .ok_or(AppError::UserNotFound)?;

    let access_token = state.issuer.reissue_access(claims, &principal, Utc::now())?;
    debug!(uid = %principal.uid(), "access token reissued");
    Ok(RefreshResponse { access_token })
}

/// Revoke the presented token's jti. Repeating it is harmless.
pub async fn logout(state: &AppState, claims: &TokenClaims) -> AppResult<MessageResponse> {
    state.revocations.revoke(&claims.jti).await?;
    info!(email = %claims.user.email, "logged out");
    Ok(MessageResponse::new("Logged Out Successfully"))
}
