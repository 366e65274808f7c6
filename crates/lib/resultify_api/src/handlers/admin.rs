//! Administrator handlers.

use axum::extract::State;
use axum::http::StatusCode;
use axum::{Extension, Json};
use resultify_core::models::auth::PrincipalKind;

use crate::AppState;
use crate::error::AppResult;
use crate::extract::AppJson;
use crate::middleware::auth::CurrentPrincipals;
use crate::models::{AdminProfile, CreateAdminRequest, LoginRequest, LoginResponse};
use crate::services::{accounts, auth};

/// `POST /admin/login`
pub async fn login_handler(
    State(state): State<AppState>,
    AppJson(body): AppJson<LoginRequest>,
) -> AppResult<Json<LoginResponse>> {
    let resp = auth::login(&state, PrincipalKind::Admin, &body.email, &body.password).await?;
    Ok(Json(resp))
}

/// `GET /admin/profile`
pub async fn profile_handler(
    Extension(current): Extension<CurrentPrincipals>,
) -> AppResult<Json<AdminProfile>> {
    Ok(Json(current.admin()?.clone().into()))
}

/// `POST /admin/create`: provision a regular administrator.
pub async fn create_admin_handler(
    State(state): State<AppState>,
    AppJson(body): AppJson<CreateAdminRequest>,
) -> AppResult<(StatusCode, Json<AdminProfile>)> {
    let profile = accounts::create_admin(&state, body).await?;
    Ok((StatusCode::CREATED, Json(profile)))
}
