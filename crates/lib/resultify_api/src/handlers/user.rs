//! User account handlers.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use resultify_core::models::auth::PrincipalKind;
use serde_json::{Map, Value};

use crate::AppState;
use crate::error::AppResult;
use crate::extract::AppJson;
use crate::middleware::auth::CurrentPrincipals;
use crate::models::{LoginRequest, LoginResponse, MessageResponse, SignupRequest, UserProfile};
use crate::services::{accounts, auth};

/// `POST /user/signup`
pub async fn signup_handler(
    State(state): State<AppState>,
    AppJson(body): AppJson<SignupRequest>,
) -> AppResult<(StatusCode, Json<UserProfile>)> {
    let profile = accounts::signup(&state, body).await?;
    Ok((StatusCode::CREATED, Json(profile)))
}

/// `POST /user/login`
pub async fn login_handler(
    State(state): State<AppState>,
    AppJson(body): AppJson<LoginRequest>,
) -> AppResult<Json<LoginResponse>> {
    let resp = auth::login(&state, PrincipalKind::User, &body.email, &body.password).await?;
    Ok(Json(resp))
}

/// `GET /user/verify/{token}`
pub async fn verify_email_handler(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> AppResult<Json<MessageResponse>> {
    Ok(Json(accounts::verify_email(&state, &token).await?))
}

/// `GET /user/profile`
pub async fn profile_handler(
    Extension(current): Extension<CurrentPrincipals>,
) -> AppResult<Json<UserProfile>> {
    Ok(Json(current.user()?.clone().into()))
}

/// `PATCH /user/confirm_payments`
pub async fn confirm_payment_handler(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentPrincipals>,
) -> AppResult<Json<UserProfile>> {
    Ok(Json(accounts::confirm_payment(&state, current.user()?).await?))
}

/// `PUT /user/update_user`: only allow-listed profile fields.
pub async fn update_user_handler(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentPrincipals>,
    AppJson(fields): AppJson<Map<String, Value>>,
) -> AppResult<Json<UserProfile>> {
    Ok(Json(
        accounts::update_user(&state, current.user()?, &fields).await?,
    ))
}

/// `DELETE /user/delete_account`
pub async fn delete_account_handler(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentPrincipals>,
) -> AppResult<StatusCode> {
    accounts::delete_account(&state, current.user()?).await?;
    Ok(StatusCode::NO_CONTENT)
}
