//! Authentication middleware: bearer verification, revocation, principal
//! resolution and role checks.

use axum::http::header::AUTHORIZATION;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use resultify_core::auth::jwt::{TokenClaims, TokenKind};
use resultify_core::auth::rbac::RoleSet;
use resultify_core::auth::resolver::ResolvedPrincipals;
use resultify_core::models::auth::{Admin, User};
use tracing::debug;

use crate::AppState;
use crate::error::AppError;

/// Verified token claims, stored in request extensions.
#[derive(Debug, Clone)]
pub struct AuthenticatedToken(pub TokenClaims);

/// Token plus the principals it resolved to, for role-guarded routes.
#[derive(Debug, Clone)]
pub struct CurrentPrincipals {
    pub claims: TokenClaims,
    pub principals: ResolvedPrincipals,
}

impl CurrentPrincipals {
    pub fn user(&self) -> Result<&User, AppError> {
        self.principals.user.as_ref().ok_or(AppError::UserNotFound)
    }

    pub fn admin(&self) -> Result<&Admin, AppError> {
        self.principals.admin.as_ref().ok_or(AppError::UserNotFound)
    }
}

fn authorization(request: &Request) -> Option<&str> {
    request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
}

async fn authenticate(
    state: &AppState,
    mut request: Request,
    next: Next,
    required: TokenKind,
) -> Result<Response, AppError> {
    let claims = state
        .authenticator
        .authenticate(authorization(&request), required)?;
    request.extensions_mut().insert(AuthenticatedToken(claims));
    Ok(next.run(request).await)
}

/// Axum middleware: requires an access token and injects [`AuthenticatedToken`].
pub async fn require_access_token(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    authenticate(&state, request, next, TokenKind::Access).await
}

/// Axum middleware: requires a refresh token and injects [`AuthenticatedToken`].
pub async fn require_refresh_token(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    authenticate(&state, request, next, TokenKind::Refresh).await
}

/// Middleware state for role-guarded routes.
#[derive(Clone)]
pub struct RoleGuard {
    state: AppState,
    roles: RoleSet,
}

impl RoleGuard {
    pub fn new(state: AppState, roles: RoleSet) -> Self {
        Self { state, roles }
    }
}

/// Axum middleware: access token → not revoked → resolve principals → role
/// check. Injects [`CurrentPrincipals`].
pub async fn require_roles(
    State(guard): State<RoleGuard>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let state = &guard.state;
    let claims = state
        .authenticator
        .authenticate(authorization(&request), TokenKind::Access)?;

    state.revocations.ensure_active(&claims).await?;

    let principals = state.principals.resolve(&claims.user.email).await?;
    if let Err(e) = principals.authorize(&guard.roles) {
        debug!(
            email = %claims.user.email,
            required = ?guard.roles.iter().collect::<Vec<_>>(),
            "role check failed"
        );
        return Err(e.into());
    }

    request
        .extensions_mut()
        .insert(CurrentPrincipals { claims, principals });
    Ok(next.run(request).await)
}
